//! Module for handling names according to the W3C [Namespaces in XML 1.1 (Second Edition)][spec]
//! specification
//!
//! [spec]: https://www.w3.org/TR/xml-names11

use std::fmt;

/// URI bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
/// URI bound to the `xmlns` prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// An expanded name: a local name together with the namespace it belongs to.
///
/// Used to configure elements whose text content is written as CDATA
/// sections.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-types", derive(serde::Deserialize, serde::Serialize))]
pub struct QualifiedName {
    /// Local part of the name
    pub local_name: String,
    /// Namespace URI, empty for names in no namespace
    pub namespace: String,
}

impl QualifiedName {
    /// Creates a new name.
    pub fn new(local_name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            namespace: namespace.into(),
        }
    }

    /// Returns `true` if the name refers to the given local name and namespace.
    #[inline]
    pub fn matches(&self, local_name: &str, namespace: &str) -> bool {
        self.local_name == local_name && self.namespace == namespace
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local_name)
        }
    }
}

impl From<&str> for QualifiedName {
    fn from(local_name: &str) -> Self {
        Self::new(local_name, "")
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////

/// A namespace binding declared by an `xmlns` or `xmlns:prefix` attribute.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Binding {
    prefix: String,
    uri: String,
}

/// A stack of namespace declarations and `xml:space` values.
///
/// A new scope is pushed for each start element and popped for the matching
/// end element. Lookup walks the stack from the innermost declaration, so
/// redeclarations shadow outer ones.
#[derive(Clone, Debug, Default)]
pub struct NamespaceScope {
    /// All active bindings, innermost last
    bindings: Vec<Binding>,
    /// For each open scope: number of bindings in `bindings` before that scope
    /// was pushed and whether whitespace in it is significant
    scopes: Vec<(usize, bool)>,
}

impl NamespaceScope {
    /// Opens a new scope which inherits the `xml:space` value of its parent.
    pub fn push_scope(&mut self) {
        let preserve = self.preserve_space();
        self.scopes.push((self.bindings.len(), preserve));
    }

    /// Closes the innermost scope, forgetting all declarations made in it.
    /// Does nothing if no scope is open.
    pub fn pop_scope(&mut self) {
        if let Some((len, _)) = self.scopes.pop() {
            self.bindings.truncate(len);
        }
    }

    /// Number of open scopes.
    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declares `prefix` (empty for the default namespace) in the innermost scope.
    pub fn declare(&mut self, prefix: &str, uri: &str) {
        self.bindings.push(Binding {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
        });
    }

    /// Sets the `xml:space` value of the innermost scope.
    pub fn set_preserve_space(&mut self, preserve: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.1 = preserve;
        }
    }

    /// Returns `true` if whitespace is significant in the innermost scope.
    #[inline]
    pub fn preserve_space(&self) -> bool {
        self.scopes.last().map_or(false, |s| s.1)
    }

    /// Resolves the prefix (empty for the default namespace) to the namespace
    /// URI. An unprefixed name without default namespace resolves to `""`.
    pub fn lookup(&self, prefix: &str) -> Option<&str> {
        match prefix {
            "xml" => return Some(XML_NAMESPACE),
            "xmlns" => return Some(XMLNS_NAMESPACE),
            _ => {}
        }
        match self.bindings.iter().rev().find(|b| b.prefix == prefix) {
            Some(b) => Some(&b.uri),
            None if prefix.is_empty() => Some(""),
            None => None,
        }
    }

    /// Returns all bindings visible in the innermost scope, innermost
    /// declarations shadowing outer ones. Undeclarations of the default
    /// namespace (`xmlns=""`) are not reported.
    pub fn in_scope(&self) -> Vec<(String, String)> {
        let mut result: Vec<(String, String)> = Vec::new();
        for b in self.bindings.iter().rev() {
            if !result.iter().any(|(p, _)| *p == b.prefix) {
                result.push((b.prefix.clone(), b.uri.clone()));
            }
        }
        result.retain(|(p, u)| !(p.is_empty() && u.is_empty()));
        result.reverse();
        result
    }
}
