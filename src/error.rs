//! Error types for schema loading and resolution

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading, resolving, or exporting a schema workspace.
///
/// Every variant is fatal for the schema it concerns: the resolved model
/// handed to a renderer is assumed complete, so there is no partial output.
#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("malformed schema document {}: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },

    #[error("unknown namespace prefix '{prefix}' in {}", path.display())]
    UnknownPrefix { prefix: String, path: PathBuf },

    #[error("unresolved reference '{reference}' in {}", path.display())]
    UnresolvedReference { reference: String, path: PathBuf },

    #[error("built-in type 'xsd:{name}' is not implemented; supply a type override for it")]
    UnknownPrimitive { name: String },

    #[error("not implemented: {detail} (in {})", path.display())]
    Unsupported { detail: String, path: PathBuf },

    #[error("circular type derivation involving '{name}'")]
    CircularDerivation { name: String },

    #[error(
        "multiple schemas derive the same package name '{package}':\n - {first}\n - {second}\n\
         Consider providing --package-override={namespace}=mypackage"
    )]
    PackageCollision {
        package: String,
        first: String,
        second: String,
        namespace: String,
    },

    #[error("invalid override: {0}")]
    InvalidOverride(String),

    #[error("cannot serialize the resolved model: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot load config {}: {detail}", path.display())]
    Config { path: PathBuf, detail: String },
}

impl Error {
    /// Shorthand for a `Malformed` error.
    pub(crate) fn malformed(path: &Path, detail: impl Into<String>) -> Self {
        Error::Malformed {
            path: path.to_path_buf(),
            detail: detail.into(),
        }
    }

    /// Shorthand for an `Unsupported` error.
    pub(crate) fn unsupported(path: &Path, detail: impl Into<String>) -> Self {
        Error::Unsupported {
            detail: detail.into(),
            path: path.to_path_buf(),
        }
    }

    /// Shorthand for an `UnresolvedReference` error.
    pub(crate) fn unresolved(path: &Path, reference: impl Into<String>) -> Self {
        Error::UnresolvedReference {
            reference: reference.into(),
            path: path.to_path_buf(),
        }
    }
}
