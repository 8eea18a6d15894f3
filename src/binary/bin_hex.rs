use super::{char_at, BinaryEncoding, Decoded, IncrementalDecoder};
use crate::errors::IllFormedError;

/// Decodes BinHex text, that is pairs of hexadecimal digits of either case,
/// into bytes, possibly in several steps.
///
/// Whitespace between digits is ignored, even between the two digits of one
/// byte.
#[derive(Clone, Debug, Default)]
pub struct BinHexDecoder {
    /// The high nibble of the byte when only one digit of it was seen
    pending: Option<u8>,
}

impl IncrementalDecoder for BinHexDecoder {
    #[inline]
    fn encoding(&self) -> BinaryEncoding {
        BinaryEncoding::BinHex
    }

    fn decode(&mut self, input: &str, output: &mut [u8]) -> Result<Decoded, IllFormedError> {
        let bytes = input.as_bytes();
        let mut consumed = 0;
        let mut produced = 0;

        while consumed < bytes.len() && produced < output.len() {
            let b = bytes[consumed];
            consumed += 1;
            let nibble = match b {
                b'0'..=b'9' => b - b'0',
                b'a'..=b'f' => b - b'a' + 10,
                b'A'..=b'F' => b - b'A' + 10,
                b' ' | b'\t' | b'\r' | b'\n' => continue,
                _ => return Err(IllFormedError::InvalidBinHex(char_at(input, consumed - 1))),
            };
            match self.pending.take() {
                Some(high) => {
                    output[produced] = (high << 4) | nibble;
                    produced += 1;
                }
                None => self.pending = Some(nibble),
            }
        }

        Ok(Decoded { consumed, produced })
    }

    fn finish(&mut self) -> Result<(), IllFormedError> {
        match self.pending.take() {
            Some(_) => Err(IllFormedError::OddBinHexCount),
            None => Ok(()),
        }
    }

    #[inline]
    fn reset(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn simple() {
        let mut decoder = BinHexDecoder::default();
        let mut buf = [0; 8];

        let decoded = decoder.decode("48 65\n6C6c6F", &mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                consumed: 12,
                produced: 5
            }
        );
        assert_eq!(&buf[..5], b"Hello");
        assert_eq!(decoder.finish(), Ok(()));
    }

    #[test]
    fn split_byte() {
        let mut decoder = BinHexDecoder::default();
        let mut buf = [0; 2];

        assert_eq!(decoder.decode("4", &mut buf).unwrap().produced, 0);
        assert_eq!(decoder.decode("8", &mut buf).unwrap().produced, 1);
        assert_eq!(buf[0], b'H');
    }

    #[test]
    fn full_output() {
        let mut decoder = BinHexDecoder::default();
        let mut buf = [0; 1];

        let decoded = decoder.decode("4869", &mut buf).unwrap();
        assert_eq!(
            decoded,
            Decoded {
                consumed: 2,
                produced: 1
            }
        );
    }

    #[test]
    fn odd_count() {
        let mut decoder = BinHexDecoder::default();
        let mut buf = [0; 8];

        decoder.decode("486", &mut buf).unwrap();
        assert_eq!(decoder.finish(), Err(IllFormedError::OddBinHexCount));
        // Finishing forgets the dangling digit
        assert_eq!(decoder.finish(), Ok(()));
    }

    #[test]
    fn invalid_char() {
        let mut decoder = BinHexDecoder::default();
        let mut buf = [0; 8];

        assert_eq!(
            decoder.decode("4g", &mut buf),
            Err(IllFormedError::InvalidBinHex('g'))
        );
    }
}
