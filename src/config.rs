//! Resolver configuration
//!
//! All knobs are carried as an explicit value through workspace construction,
//! nothing is global, so one process can run several independent
//! compilations with different overrides.
//!
//! ## Example config file (xsdgen.toml):
//! ```toml
//! module_path = "github.com/example/models"
//!
//! [package_overrides]
//! "http://example.org/common" = "common_v2"
//!
//! [type_overrides."http://www.w3.org/2001/XMLSchema"]
//! decimal = "rust_decimal::Decimal"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::overrides::{PackageOverrides, TypeOverrides};

/// Configuration for a workspace compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Root module path used to qualify cross-schema references in the
    /// exported model (e.g. `github.com/example/models`).
    #[serde(default)]
    pub module_path: String,

    /// Package names by target namespace, overriding the derived ones.
    #[serde(default)]
    pub package_overrides: PackageOverrides,

    /// Target primitives by `(namespace, local name)`, consulted before the
    /// built-in catalog.
    #[serde(default)]
    pub type_overrides: TypeOverrides,
}

impl ResolverConfig {
    /// Load a configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_roundtrip() {
        let cfg: ResolverConfig = toml::from_str(
            r#"
            module_path = "github.com/example/models"

            [package_overrides]
            "http://example.org/common" = "common_v2"

            [type_overrides."http://www.w3.org/2001/XMLSchema"]
            decimal = "rust_decimal::Decimal"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.module_path, "github.com/example/models");
        assert_eq!(
            cfg.package_overrides.get("http://example.org/common"),
            Some("common_v2")
        );
        assert_eq!(
            cfg.type_overrides
                .get("http://www.w3.org/2001/XMLSchema", "decimal"),
            Some("rust_decimal::Decimal")
        );
    }

    #[test]
    fn test_defaults_are_empty() {
        let cfg: ResolverConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.module_path, "");
        assert_eq!(cfg.package_overrides.get("x"), None);
    }
}
