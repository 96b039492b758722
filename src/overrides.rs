//! User override tables
//!
//! Two escape hatches keep the resolver's conservative defaults workable:
//!
//! - **Package overrides** rename the output package derived for a target
//!   namespace (`namespace=package`), resolving workspace-level package name
//!   collisions.
//! - **Type overrides** redirect a `(namespace, local name)` type reference
//!   to an explicit target primitive (`namespace:name=Target`), extending the
//!   finite built-in catalog.
//!
//! Both are plain values threaded through the workspace configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Package name overrides keyed by target namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct PackageOverrides {
    by_namespace: BTreeMap<String, String>,
}

impl PackageOverrides {
    /// Parse a list of `namespace=package` arguments.
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut result = PackageOverrides::default();
        for arg in args {
            let arg = arg.as_ref();
            let (namespace, package) = arg.split_once('=').ok_or_else(|| {
                Error::InvalidOverride(format!(
                    "'{arg}': expected exactly one '=' as in namespace=package"
                ))
            })?;
            if namespace.is_empty() || package.is_empty() || package.contains('=') {
                return Err(Error::InvalidOverride(format!(
                    "'{arg}': expected exactly one '=' as in namespace=package"
                )));
            }
            result
                .by_namespace
                .insert(namespace.to_string(), package.to_string());
        }
        Ok(result)
    }

    pub fn get(&self, namespace: &str) -> Option<&str> {
        self.by_namespace.get(namespace).map(String::as_str)
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn merge(&mut self, other: PackageOverrides) {
        self.by_namespace.extend(other.by_namespace);
    }
}

/// Type overrides keyed by `(namespace, local name)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct TypeOverrides {
    by_namespace: BTreeMap<String, BTreeMap<String, String>>,
}

impl TypeOverrides {
    /// Parse a list of `namespace:name=Target` arguments. The namespace part
    /// may itself contain colons (URIs usually do); the local name is
    /// everything after the last `:` before the `=`.
    pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let mut result = TypeOverrides::default();
        for arg in args {
            let arg = arg.as_ref();
            let (qualified, target) = arg.split_once('=').ok_or_else(|| {
                Error::InvalidOverride(format!(
                    "'{arg}': expected at least one '=' as in namespace:name=Target"
                ))
            })?;
            let (namespace, name) = qualified.rsplit_once(':').ok_or_else(|| {
                Error::InvalidOverride(format!(
                    "'{arg}': expected a ':' separating namespace and type name"
                ))
            })?;
            if namespace.is_empty() || name.is_empty() || target.is_empty() {
                return Err(Error::InvalidOverride(format!(
                    "'{arg}': namespace, name and target must be non-empty"
                )));
            }
            result
                .by_namespace
                .entry(namespace.to_string())
                .or_default()
                .insert(name.to_string(), target.to_string());
        }
        Ok(result)
    }

    pub fn get(&self, namespace: &str, name: &str) -> Option<&str> {
        self.by_namespace
            .get(namespace)
            .and_then(|types| types.get(name))
            .map(String::as_str)
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn merge(&mut self, other: TypeOverrides) {
        for (namespace, types) in other.by_namespace {
            self.by_namespace.entry(namespace).or_default().extend(types);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_override_parsing() {
        let o = PackageOverrides::parse_args(&["http://example.org/ns=mypkg"]).unwrap();
        assert_eq!(o.get("http://example.org/ns"), Some("mypkg"));
        assert_eq!(o.get("http://other.org"), None);
    }

    #[test]
    fn test_package_override_rejects_bad_shapes() {
        assert!(PackageOverrides::parse_args(&["no-equals"]).is_err());
        assert!(PackageOverrides::parse_args(&["a=b=c"]).is_err());
        assert!(PackageOverrides::parse_args(&["=pkg"]).is_err());
    }

    #[test]
    fn test_type_override_parsing() {
        let o = TypeOverrides::parse_args(&[
            "http://www.w3.org/2001/XMLSchema:decimal=rust_decimal::Decimal",
        ])
        .unwrap();
        assert_eq!(
            o.get("http://www.w3.org/2001/XMLSchema", "decimal"),
            Some("rust_decimal::Decimal")
        );
        assert_eq!(o.get("http://www.w3.org/2001/XMLSchema", "string"), None);
    }

    #[test]
    fn test_type_override_splits_on_last_colon() {
        let o = TypeOverrides::parse_args(&["urn:a:b:QName=String"]).unwrap();
        assert_eq!(o.get("urn:a:b", "QName"), Some("String"));
    }

    #[test]
    fn test_type_override_rejects_bad_shapes() {
        assert!(TypeOverrides::parse_args(&["nocolon=Target"]).is_err());
        assert!(TypeOverrides::parse_args(&["ns:name"]).is_err());
    }
}
