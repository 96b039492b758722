//! Namespace prefix tables
//!
//! Each schema document binds namespace prefixes on its root element
//! (`xmlns:foo="..."`). The bindings are captured once at parse time and
//! consulted during reference resolution; they are never mutated afterwards.

/// The XML Schema namespace.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// The namespace the reserved `xml` prefix is bound to, per the XML spec.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A single prefix binding from the document root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub prefix: String,
    pub uri: String,
}

/// Ordered list of prefix bindings declared on a schema's root element.
///
/// Only prefixed declarations are recorded; the default namespace is covered
/// by the "empty prefix maps to the schema's own target namespace" rule in
/// the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Xmlns {
    bindings: Vec<Binding>,
}

impl Xmlns {
    pub fn new(bindings: Vec<Binding>) -> Self {
        Xmlns { bindings }
    }

    /// Look up the namespace bound to `prefix`. First declaration wins.
    pub fn uri_by_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
    }

    /// Reverse lookup: the first prefix bound to `uri`, if any.
    pub fn prefix_by_uri(&self, uri: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|b| b.uri == uri)
            .map(|b| b.prefix.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Adopt bindings from `other` whose prefixes are not bound here yet;
    /// existing bindings keep priority.
    pub fn extend_missing(&mut self, other: &Xmlns) {
        for b in &other.bindings {
            if self.uri_by_prefix(&b.prefix).is_none() {
                self.bindings.push(b.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Xmlns {
        Xmlns::new(vec![
            Binding {
                prefix: "xsd".to_string(),
                uri: XSD_NAMESPACE.to_string(),
            },
            Binding {
                prefix: "cpe".to_string(),
                uri: "http://cpe.mitre.org/language/2.0".to_string(),
            },
            Binding {
                prefix: "cpe-alias".to_string(),
                uri: "http://cpe.mitre.org/language/2.0".to_string(),
            },
        ])
    }

    #[test]
    fn test_uri_by_prefix() {
        let t = table();
        assert_eq!(t.uri_by_prefix("xsd"), Some(XSD_NAMESPACE));
        assert_eq!(t.uri_by_prefix("nope"), None);
    }

    #[test]
    fn test_prefix_by_uri_first_wins() {
        let t = table();
        assert_eq!(
            t.prefix_by_uri("http://cpe.mitre.org/language/2.0"),
            Some("cpe")
        );
    }
}
