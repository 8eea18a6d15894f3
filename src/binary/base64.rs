use super::{char_at, BinaryEncoding, Decoded, IncrementalDecoder};
use crate::errors::IllFormedError;

/// Marker of bytes that are not part of the Base64 alphabet in [`BASE64_MAP`].
const INVALID: u8 = 0xFF;

/// Maps ASCII bytes to 6-bit Base64 digits.
const BASE64_MAP: [u8; 128] = {
    let mut map = [INVALID; 128];
    let alphabet = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut i = 0;
    while i < alphabet.len() {
        map[alphabet[i] as usize] = i as u8;
        i += 1;
    }
    map
};

/// Decodes Base64 text into bytes, possibly in several steps.
///
/// Whitespace between digits is ignored. Decoding of a group continues across
/// [`decode`] calls, so the text may be split at any character. Padding (`=`)
/// discards the bits of the incomplete group; only whitespace and more
/// padding may follow it, in this and later calls, until the decoder is
/// reset.
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use xml_pipeline::binary::{Base64Decoder, IncrementalDecoder};
///
/// let mut decoder = Base64Decoder::default();
/// let mut buf = [0; 8];
///
/// let first = decoder.decode("SGVs", &mut buf).unwrap();
/// let second = decoder.decode("bG8=", &mut buf[first.produced..]).unwrap();
///
/// assert_eq!(&buf[..first.produced + second.produced], b"Hello");
/// ```
///
/// [`decode`]: IncrementalDecoder::decode
#[derive(Clone, Debug, Default)]
pub struct Base64Decoder {
    /// Bits of the incomplete byte, aligned to the right
    bits: u32,
    /// Number of meaningful bits in `bits`
    filled: u8,
    /// Padding was consumed, no more digits are allowed
    padded: bool,
}

/// Checks that `input` holds only padding and whitespace, which is all that
/// may follow the first padding character.
fn check_after_padding(input: &str) -> Result<(), IllFormedError> {
    match input
        .bytes()
        .position(|b| !matches!(b, b'=' | b' ' | b'\t' | b'\r' | b'\n'))
    {
        Some(offset) => Err(IllFormedError::InvalidBase64(char_at(input, offset))),
        None => Ok(()),
    }
}

impl IncrementalDecoder for Base64Decoder {
    #[inline]
    fn encoding(&self) -> BinaryEncoding {
        BinaryEncoding::Base64
    }

    fn decode(&mut self, input: &str, output: &mut [u8]) -> Result<Decoded, IllFormedError> {
        if output.is_empty() || input.is_empty() {
            return Ok(Decoded::default());
        }
        if self.padded {
            check_after_padding(input)?;
            return Ok(Decoded {
                consumed: input.len(),
                produced: 0,
            });
        }
        let bytes = input.as_bytes();
        let mut consumed = 0;
        let mut produced = 0;

        while consumed < bytes.len() && produced < output.len() {
            let b = bytes[consumed];
            if b == b'=' {
                break;
            }
            consumed += 1;
            if matches!(b, b' ' | b'\t' | b'\r' | b'\n') {
                continue;
            }
            let digit = match BASE64_MAP.get(b as usize) {
                Some(&d) if d != INVALID => d,
                _ => return Err(IllFormedError::InvalidBase64(char_at(input, consumed - 1))),
            };
            self.bits = (self.bits << 6) | digit as u32;
            self.filled += 6;
            if self.filled >= 8 {
                self.filled -= 8;
                output[produced] = (self.bits >> self.filled) as u8;
                self.bits &= (1 << self.filled) - 1;
                produced += 1;
            }
        }

        if produced < output.len() && bytes.get(consumed) == Some(&b'=') {
            self.bits = 0;
            self.filled = 0;
            self.padded = true;
            check_after_padding(&input[consumed..])?;
            consumed = bytes.len();
        }

        Ok(Decoded { consumed, produced })
    }

    #[inline]
    fn finish(&mut self) -> Result<(), IllFormedError> {
        // Trailing bits of an unpadded group do not form a byte
        self.reset();
        Ok(())
    }

    #[inline]
    fn reset(&mut self) {
        self.bits = 0;
        self.filled = 0;
        self.padded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn decode_all(decoder: &mut Base64Decoder, input: &str) -> Vec<u8> {
        let mut buf = [0; 64];
        let decoded = decoder.decode(input, &mut buf).unwrap();
        assert_eq!(decoded.consumed, input.len());
        buf[..decoded.produced].to_vec()
    }

    #[test]
    fn simple() {
        let mut decoder = Base64Decoder::default();
        assert_eq!(decode_all(&mut decoder, "SGVsbG8sIHdvcmxk"), b"Hello, world");
    }

    #[test]
    fn padding() {
        let mut decoder = Base64Decoder::default();
        assert_eq!(decode_all(&mut decoder, "SGk="), b"Hi");
        decoder.reset();
        assert_eq!(decode_all(&mut decoder, "SA=="), b"H");
        decoder.finish().unwrap();
        assert_eq!(decode_all(&mut decoder, "SA"), b"H");
        assert_eq!(decode_all(&mut decoder, "=\n="), b"");
    }

    #[test]
    fn whitespace() {
        let mut decoder = Base64Decoder::default();
        assert_eq!(decode_all(&mut decoder, " SG\r\nVs\tbG8= \n"), b"Hello");
    }

    /// Groups may be split between calls at any character
    #[test]
    fn split_group() {
        let mut decoder = Base64Decoder::default();
        let mut result = Vec::new();
        for part in ["S", "GV", "sb", "G8="] {
            result.extend(decode_all(&mut decoder, part));
        }
        assert_eq!(result, b"Hello");
    }

    #[test]
    fn full_output() {
        let mut decoder = Base64Decoder::default();
        let mut buf = [0; 3];

        let decoded = decoder.decode("SGVsbG8=", &mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                consumed: 4,
                produced: 3
            }
        );
        assert_eq!(&buf, b"Hel");

        let decoded = decoder.decode("bG8=", &mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                consumed: 4,
                produced: 2
            }
        );
        assert_eq!(&buf[..2], b"lo");
    }

    #[test]
    fn empty_output() {
        let mut decoder = Base64Decoder::default();
        assert_eq!(decoder.decode("=", &mut []).unwrap(), Decoded::default());
    }

    #[test]
    fn invalid_char() {
        let mut decoder = Base64Decoder::default();
        let mut buf = [0; 8];
        assert_eq!(
            decoder.decode("SG*s", &mut buf),
            Err(IllFormedError::InvalidBase64('*'))
        );
        assert_eq!(
            decoder.decode("SGé", &mut buf),
            Err(IllFormedError::InvalidBase64('é'))
        );
    }

    #[test]
    fn data_after_padding() {
        let mut decoder = Base64Decoder::default();
        let mut buf = [0; 8];
        assert_eq!(
            decoder.decode("SGk=SGk=", &mut buf),
            Err(IllFormedError::InvalidBase64('S'))
        );
    }

    /// Padding ends the data also for the text passed in later calls
    #[test]
    fn data_after_padding_in_next_call() {
        let mut decoder = Base64Decoder::default();
        let mut buf = [0; 8];
        assert_eq!(decode_all(&mut decoder, "SGk="), b"Hi");
        assert_eq!(decode_all(&mut decoder, " \n"), b"");
        assert_eq!(
            decoder.decode(" SGk=", &mut buf),
            Err(IllFormedError::InvalidBase64('S'))
        );
    }

    /// Padding met when the output is already full is handled by the next call
    #[test]
    fn padding_after_full_output() {
        let mut decoder = Base64Decoder::default();
        let mut buf = [0; 2];
        let decoded = decoder.decode("SGk=SG", &mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                consumed: 3,
                produced: 2
            }
        );
        assert_eq!(
            decoder.decode("=SG", &mut buf),
            Err(IllFormedError::InvalidBase64('S'))
        );
    }
}
