//! Built-in primitive type catalog
//!
//! XSD ships a set of built-in simple types (`xsd:string`, `xsd:int`, ...).
//! The catalog maps the subset seen in practical document schemas to target
//! primitive type names. It is intentionally finite: a built-in that is not
//! listed here is a hard error, never a guess. Callers extend the mapping
//! through explicit [type overrides](crate::overrides::TypeOverrides).
//!
//! The catalog is a plain configuration value owned by the workspace, not
//! global state, so independent compilations can carry different mappings.

use std::collections::BTreeMap;

/// Finite map from XSD built-in simple type names to target primitives.
#[derive(Debug, Clone)]
pub struct StaticTypeCatalog {
    mapping: BTreeMap<&'static str, &'static str>,
}

impl Default for StaticTypeCatalog {
    fn default() -> Self {
        let mapping = BTreeMap::from([
            ("string", "String"),
            ("normalizedString", "String"),
            ("token", "String"),
            ("language", "String"),
            ("NCName", "String"),
            ("NMTOKEN", "String"),
            ("NMTOKENS", "String"),
            ("ID", "String"),
            ("IDREF", "String"),
            ("anyURI", "String"),
            ("anySimpleType", "String"),
            ("anyType", "String"),
            ("base64Binary", "String"),
            ("dateTime", "String"),
            ("date", "String"),
            ("time", "String"),
            ("duration", "String"),
            ("gYear", "String"),
            ("gYearMonth", "String"),
            ("gMonthDay", "String"),
            ("gMonth", "String"),
            ("gDay", "String"),
            ("boolean", "bool"),
            ("int", "i32"),
            ("integer", "i64"),
            ("long", "i64"),
            ("short", "i16"),
            ("byte", "i8"),
            ("negativeInteger", "i64"),
            ("nonPositiveInteger", "i64"),
            ("nonNegativeInteger", "u64"),
            ("positiveInteger", "u64"),
            ("unsignedLong", "u64"),
            ("unsignedInt", "u32"),
            ("unsignedShort", "u16"),
            ("unsignedByte", "u8"),
            ("double", "f64"),
            ("float", "f32"),
            // No exact decimal representation is chosen for the caller;
            // see http://books.xmlschemata.org/relaxng/ch19-77057.html
            ("decimal", "f64"),
        ]);
        StaticTypeCatalog { mapping }
    }
}

impl StaticTypeCatalog {
    /// Look up the target primitive for a built-in simple type name.
    pub fn lookup(&self, name: &str) -> Option<&'static str> {
        self.mapping.get(name).copied()
    }

    /// Whether `name` is a known built-in.
    pub fn contains(&self, name: &str) -> bool {
        self.mapping.contains_key(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_builtins() {
        let c = StaticTypeCatalog::default();
        assert_eq!(c.lookup("string"), Some("String"));
        assert_eq!(c.lookup("boolean"), Some("bool"));
        assert_eq!(c.lookup("nonNegativeInteger"), Some("u64"));
        assert_eq!(c.lookup("dateTime"), Some("String"));
    }

    #[test]
    fn test_unknown_builtin_is_a_miss() {
        let c = StaticTypeCatalog::default();
        assert_eq!(c.lookup("ENTITIES"), None);
        assert!(!c.contains("QName"));
    }
}
