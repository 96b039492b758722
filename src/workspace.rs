//! Multi-schema workspace
//!
//! The workspace owns every loaded schema and orchestrates the pipeline:
//! parse, fold includes and same-namespace continuations, link imports,
//! compile, and finally export the resolved model.
//!
//! Loading is memoized by canonical file path. The cache doubles as the
//! cycle breaker: a schema is registered before its dependencies are
//! processed, so mutually importing schemas terminate with a cache hit
//! instead of recursing forever.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::ast::SchemaId;
use crate::catalog::StaticTypeCatalog;
use crate::compile;
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::model::{self, ResolvedModel};
use crate::parser;
use crate::schema::Schema;

/// A set of schemas compiled together.
#[derive(Debug, Default)]
pub struct Workspace {
    schemas: Vec<Schema>,
    /// Canonical file path to the schema it was folded into.
    cache: HashMap<PathBuf, SchemaId>,
    /// Target namespace to its one canonical schema.
    by_namespace: HashMap<String, SchemaId>,
    /// Load order; export iterates it so output is deterministic.
    order: Vec<SchemaId>,
    config: ResolverConfig,
    catalog: StaticTypeCatalog,
}

impl Workspace {
    pub fn new(config: ResolverConfig) -> Self {
        Workspace {
            config,
            catalog: StaticTypeCatalog::default(),
            ..Workspace::default()
        }
    }

    /// Load and compile the schema document at `path`, together with
    /// everything it includes and imports.
    ///
    /// A document whose target namespace is already present does not become
    /// a schema of its own: it is folded into the namespace's canonical
    /// schema, and the returned id is the canonical one.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<SchemaId> {
        let path = normalize(path.as_ref())?;
        if let Some(&id) = self.cache.get(&path) {
            return Ok(id);
        }

        info!(path = %path.display(), "loading schema");
        let mut schema = parser::parse_file(&path)?;
        if schema.target_namespace.is_empty() {
            let derived = schema.package_name(&self.config);
            warn!(
                path = %path.display(),
                namespace = %derived,
                "schema has no targetNamespace; defaulting to the derived package name"
            );
            schema.target_namespace = derived;
        }
        let namespace = schema.target_namespace.clone();

        let canonical = self.by_namespace.get(&namespace).copied();
        let id = match canonical {
            Some(canonical) => {
                debug!(
                    namespace = %namespace,
                    into = %self.schemas[canonical.0].path.display(),
                    "continuation of an already-loaded namespace"
                );
                self.schemas[canonical.0].merge_from(schema);
                canonical
            }
            None => self.register(schema),
        };
        self.cache.insert(path, id);

        self.process_includes(id)?;
        self.process_imports(id)?;
        compile::compile_schema(self, id)?;
        Ok(id)
    }

    /// Load several entry points in order.
    pub fn load_all<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<Vec<SchemaId>> {
        paths.iter().map(|p| self.load(p)).collect()
    }

    /// Export the resolved model for every non-empty schema, in load order.
    ///
    /// Fails when two schemas derive the same package name; the error names
    /// both documents and the override that untangles them.
    pub fn export(&self) -> Result<ResolvedModel> {
        self.check_package_names()?;
        model::export(self)
    }

    pub fn schema(&self, id: SchemaId) -> &Schema {
        &self.schemas[id.0]
    }

    /// Schemas in load order.
    pub fn iter(&self) -> impl Iterator<Item = (SchemaId, &Schema)> {
        self.order.iter().map(move |&id| (id, &self.schemas[id.0]))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &StaticTypeCatalog {
        &self.catalog
    }

    pub(crate) fn schema_slot(&mut self, id: SchemaId) -> &mut Schema {
        &mut self.schemas[id.0]
    }

    fn register(&mut self, schema: Schema) -> SchemaId {
        let id = SchemaId(self.schemas.len());
        if !schema.target_namespace.is_empty() {
            self.by_namespace
                .insert(schema.target_namespace.clone(), id);
        }
        self.schemas.push(schema);
        self.order.push(id);
        id
    }

    /// Fold pending `xs:include` targets into schema `id`.
    ///
    /// Merging can append further include declarations to the list being
    /// walked (an included document has includes of its own), so this runs
    /// as a worklist over unloaded declarations instead of a plain loop.
    fn process_includes(&mut self, id: SchemaId) -> Result<()> {
        loop {
            let Some(pos) = self.schemas[id.0].includes.iter().position(|i| !i.loaded) else {
                break;
            };
            self.schemas[id.0].includes[pos].loaded = true;
            let location = self.schemas[id.0].includes[pos].location.clone();

            let path = normalize(&self.schemas[id.0].base_dir().join(&location))?;
            if self.cache.get(&path) == Some(&id) {
                // Already folded in; include cycles end here.
                continue;
            }

            debug!(
                path = %path.display(),
                into = %self.schemas[id.0].path.display(),
                "folding included document"
            );
            let included = parser::parse_file(&path)?;
            let own_namespace = &self.schemas[id.0].target_namespace;
            if !included.target_namespace.is_empty()
                && included.target_namespace != *own_namespace
            {
                return Err(Error::malformed(
                    &path,
                    format!(
                        "included document targets '{}' but the including schema targets '{}'",
                        included.target_namespace, own_namespace
                    ),
                ));
            }

            // A chameleon include (no target namespace) may be folded into
            // several schemas, so only same-namespace documents get a cache
            // alias.
            if !included.target_namespace.is_empty() {
                self.cache.insert(path, id);
            }
            self.schemas[id.0].merge_from(included);
        }
        Ok(())
    }

    /// Load pending `xs:import` targets and link them to schema `id`.
    ///
    /// Same worklist shape as includes: recursive loads may merge more
    /// import declarations into this schema mid-walk.
    fn process_imports(&mut self, id: SchemaId) -> Result<()> {
        loop {
            let Some(pos) = self.schemas[id.0].imports.iter().position(|i| !i.loaded) else {
                break;
            };
            let (namespace, location) = {
                let import = &mut self.schemas[id.0].imports[pos];
                import.loaded = true;
                (import.namespace.clone(), import.location.clone())
            };

            let resolved = match location {
                Some(location) => {
                    let path = self.schemas[id.0].base_dir().join(&location);
                    Some(self.load(&path)?)
                }
                // An import without a location links up only if some other
                // entry point brought the namespace in.
                None => self.by_namespace.get(&namespace).copied(),
            };

            // The declaration list may have been extended (and reallocated)
            // by the recursive load; write back through the namespace key.
            if let Some(import) = self.schemas[id.0]
                .imports
                .iter_mut()
                .find(|i| i.namespace == namespace)
            {
                import.resolved = resolved;
            }
        }
        Ok(())
    }

    /// Every non-empty schema must map to a distinct package name.
    fn check_package_names(&self) -> Result<()> {
        let mut seen: HashMap<String, &Path> = HashMap::new();
        for (_, schema) in self.iter() {
            if schema.is_empty() {
                continue;
            }
            let package = schema.package_name(&self.config);
            if let Some(first) = seen.get(&package) {
                return Err(Error::PackageCollision {
                    package,
                    first: first.display().to_string(),
                    second: schema.path.display().to_string(),
                    namespace: schema.target_namespace.clone(),
                });
            }
            seen.insert(package, &schema.path);
        }
        Ok(())
    }
}

fn normalize(path: &Path) -> Result<PathBuf> {
    path.canonicalize().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}
