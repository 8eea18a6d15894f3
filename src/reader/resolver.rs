use std::borrow::Cow;
use std::collections::HashMap;

/// Used to resolve [general entities] (`&...;`) which are not character
/// references while reading.
///
/// The reader calls [`capture`](Self::capture) with the content of each
/// `<!DOCTYPE>` declaration, so a resolver may collect entities declared in
/// the internal subset. Returned text is the [replacement text] of the
/// entity: it is inserted in the document as is, without further expansion.
///
/// # Example
///
/// ```
/// # use pretty_assertions::assert_eq;
/// use std::collections::HashMap;
/// use xml_pipeline::reader::{TextReader, XmlRead};
///
/// let mut entities = HashMap::new();
/// entities.insert("product".to_string(), "xml-pipeline".to_string());
///
/// let mut reader = TextReader::from_str("<p>&product; rocks</p>").with_resolver(entities);
/// reader.read().unwrap();
/// reader.read().unwrap();
/// assert_eq!(reader.value(), "xml-pipeline rocks");
/// ```
///
/// [general entities]: https://www.w3.org/TR/xml11/#gen-entity
/// [replacement text]: https://www.w3.org/TR/xml11/#dt-repltext
pub trait EntityResolver {
    /// Called on contents of each `<!DOCTYPE>` declaration. Does nothing by
    /// default.
    fn capture(&mut self, _doctype: &str) {}

    /// Returns the replacement text of the entity, or `None` if the entity is
    /// unknown. An unknown entity makes the document ill-formed.
    fn resolve(&self, entity: &str) -> Option<Cow<str>>;
}

/// An [`EntityResolver`] that resolves only [predefined entities]:
///
/// | Entity | Resolution
/// |--------|------------
/// |`&lt;`  | `<`
/// |`&gt;`  | `>`
/// |`&amp;` | `&`
/// |`&apos;`| `'`
/// |`&quot;`| `"`
///
/// Readers always consult it before the user resolver, so predefined entities
/// cannot be redefined.
///
/// [predefined entities]: https://www.w3.org/TR/xml11/#sec-predefined-ent
#[derive(Default, Debug, Copy, Clone)]
pub struct PredefinedEntityResolver;

impl EntityResolver for PredefinedEntityResolver {
    #[inline]
    fn resolve(&self, entity: &str) -> Option<Cow<str>> {
        predefined_entity(entity).map(Cow::Borrowed)
    }
}

impl EntityResolver for HashMap<String, String> {
    #[inline]
    fn resolve(&self, entity: &str) -> Option<Cow<str>> {
        self.get(entity).map(|text| Cow::Borrowed(text.as_str()))
    }
}

/// Returns the replacement text of a predefined entity.
pub(crate) fn predefined_entity(entity: &str) -> Option<&'static str> {
    Some(match entity {
        "lt" => "<",
        "gt" => ">",
        "amp" => "&",
        "apos" => "'",
        "quot" => "\"",
        _ => return None,
    })
}

/// Parses a character reference body (`#38` or `#x26`) into a character.
///
/// Returns `None` if `entity` is not a character reference, and `Some(None)`
/// if it is one, but does not designate a valid character.
pub(crate) fn parse_char_ref(entity: &str) -> Option<Option<char>> {
    let number = entity.strip_prefix('#')?;
    let code = match number.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => number.parse::<u32>(),
    };
    Some(code.ok().and_then(char::from_u32).filter(|ch| *ch != '\0'))
}
