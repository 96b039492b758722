//! Qualified-name references
//!
//! An XSD attribute like `type="cpe2:platform-specification"` names a
//! declaration in another (or the same) schema. A [`Reference`] is the parsed,
//! immutable form of such a qualified name: a namespace prefix plus a local
//! name. Mapping the prefix to an actual namespace is the job of the schema's
//! [`Xmlns`](crate::xmlns::Xmlns) table during compilation.

use std::fmt;

use crate::names;

/// A namespace-qualified symbolic name, e.g. `xml:lang` or `ds:Signature`.
///
/// Immutable after parsing; the empty prefix means "the declaring schema's
/// own target namespace".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    prefix: String,
    local: String,
}

impl Reference {
    /// Parse a qualified name. Everything before the first `:` is the prefix;
    /// a name without a colon has an empty prefix.
    pub fn parse(raw: &str) -> Self {
        match raw.find(':') {
            Some(pos) => Reference {
                prefix: raw[..pos].to_string(),
                local: raw[pos + 1..].to_string(),
            },
            None => Reference {
                prefix: String::new(),
                local: raw.to_string(),
            },
        }
    }

    /// The namespace prefix, possibly empty.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The local name after the prefix.
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Derived identifier for this reference: PascalCase prefix followed by
    /// PascalCase local name.
    pub fn ident(&self) -> String {
        format!(
            "{}{}",
            names::pascal_case(&self.prefix),
            names::pascal_case(&self.local)
        )
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "{}", self.local)
        } else {
            write!(f, "{}:{}", self.prefix, self.local)
        }
    }
}
