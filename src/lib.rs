//! # xsdgen
//!
//! Resolver for XML Schema (XSD) workspaces. It loads a set of schema
//! documents, follows their includes and imports, binds every
//! namespace-qualified reference, flattens type inheritance and content
//! models, and produces a renderer-ready [`ResolvedModel`] with
//! deterministic, deduplicated identifiers.
//!
//! ## Pipeline
//!
//! 1. **Parse** ([`parser`]): each `.xsd` document becomes a structural
//!    [`schema::Schema`]; references stay symbolic.
//! 2. **Assemble** ([`workspace`]): includes and same-namespace
//!    continuations are folded into one canonical schema per namespace;
//!    imports are loaded and linked.
//! 3. **Compile** (internal): references are bound, inline element types
//!    are hoisted, content models are flattened with propagated
//!    cardinality.
//! 4. **Export** ([`model`]): inheritance chains are walked into flat
//!    member lists and identifiers are assigned.
//!
//! ## Example
//!
//! ```no_run
//! use xsdgen::{ResolverConfig, Workspace};
//!
//! # fn main() -> xsdgen::Result<()> {
//! let mut workspace = Workspace::new(ResolverConfig::default());
//! workspace.load("schemas/cpe-dictionary_2.3.xsd")?;
//! let model = workspace.export()?;
//! for module in &model.modules {
//!     println!("{}: {} elements", module.package, module.elements.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod ast;
pub mod catalog;
mod compile;
pub mod config;
pub mod error;
pub mod model;
pub mod names;
pub mod overrides;
pub mod parser;
pub mod reference;
pub mod schema;
pub mod workspace;
pub mod xmlns;

pub use config::ResolverConfig;
pub use error::{Error, Result};
pub use model::ResolvedModel;
pub use workspace::Workspace;
