//! A single parsed schema document
//!
//! [`Schema`] owns every declaration of one `.xsd` file in flat arenas plus
//! document-ordered lists of top-level declaration ids. Includes and
//! continuations fold other documents into the same value via
//! [`Schema::merge_from`], after which the schema is recompiled as a whole.

use std::path::{Path, PathBuf};

use crate::ast::{
    AttributeGroupId, AttributeGroupNode, AttributeId, AttributeNode, ComplexTypeId,
    ComplexTypeNode, ElementId, ElementNode, MergeOffsets, SchemaId, SimpleTypeId, SimpleTypeNode,
};
use crate::config::ResolverConfig;
use crate::names;
use crate::xmlns::Xmlns;

/// An `xs:include` declaration: same namespace, separate file.
#[derive(Debug, Clone)]
pub struct IncludeDecl {
    pub location: String,
    pub(crate) loaded: bool,
}

/// An `xs:import` declaration: foreign namespace, linked not merged.
#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub namespace: String,
    pub location: Option<String>,
    pub(crate) loaded: bool,
    pub(crate) resolved: Option<SchemaId>,
}

/// One schema document (possibly the union of several merged documents).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Path of the document this schema was first loaded from.
    pub path: PathBuf,
    pub target_namespace: String,
    pub xmlns: Xmlns,
    pub documentation: Option<String>,

    pub(crate) includes: Vec<IncludeDecl>,
    pub(crate) imports: Vec<ImportDecl>,

    // Declaration arenas. Nodes reference each other by index; see ast.rs.
    pub(crate) elements: Vec<ElementNode>,
    pub(crate) attributes: Vec<AttributeNode>,
    pub(crate) complex_types: Vec<ComplexTypeNode>,
    pub(crate) simple_types: Vec<SimpleTypeNode>,
    pub(crate) attribute_groups: Vec<AttributeGroupNode>,

    // Top-level declarations in document order.
    pub(crate) top_elements: Vec<ElementId>,
    pub(crate) top_attributes: Vec<AttributeId>,
    pub(crate) top_complex_types: Vec<ComplexTypeId>,
    pub(crate) top_simple_types: Vec<SimpleTypeId>,
    pub(crate) top_attribute_groups: Vec<AttributeGroupId>,

    /// Anonymous inline element types promoted to top level at compile, in
    /// hoisting order.
    pub(crate) hoisted: Vec<ElementId>,
}

impl Schema {
    // -- arena access -------------------------------------------------------

    pub fn element(&self, id: ElementId) -> &ElementNode {
        &self.elements[id.0]
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> &mut ElementNode {
        &mut self.elements[id.0]
    }

    pub fn attribute(&self, id: AttributeId) -> &AttributeNode {
        &self.attributes[id.0]
    }

    pub(crate) fn attribute_mut(&mut self, id: AttributeId) -> &mut AttributeNode {
        &mut self.attributes[id.0]
    }

    pub fn complex_type(&self, id: ComplexTypeId) -> &ComplexTypeNode {
        &self.complex_types[id.0]
    }

    pub fn simple_type(&self, id: SimpleTypeId) -> &SimpleTypeNode {
        &self.simple_types[id.0]
    }

    pub fn attribute_group(&self, id: AttributeGroupId) -> &AttributeGroupNode {
        &self.attribute_groups[id.0]
    }

    // -- top-level lookup by local name --------------------------------------

    pub fn find_element(&self, name: &str) -> Option<ElementId> {
        self.top_elements
            .iter()
            .copied()
            .find(|&id| self.elements[id.0].name.as_deref() == Some(name))
    }

    pub fn find_attribute(&self, name: &str) -> Option<AttributeId> {
        self.top_attributes
            .iter()
            .copied()
            .find(|&id| self.attributes[id.0].name.as_deref() == Some(name))
    }

    pub fn find_complex_type(&self, name: &str) -> Option<ComplexTypeId> {
        self.top_complex_types
            .iter()
            .copied()
            .find(|&id| self.complex_types[id.0].name.as_deref() == Some(name))
    }

    pub fn find_simple_type(&self, name: &str) -> Option<SimpleTypeId> {
        self.top_simple_types
            .iter()
            .copied()
            .find(|&id| self.simple_types[id.0].name.as_deref() == Some(name))
    }

    pub fn find_attribute_group(&self, name: &str) -> Option<AttributeGroupId> {
        self.top_attribute_groups
            .iter()
            .copied()
            .find(|&id| self.attribute_groups[id.0].name.as_deref() == Some(name))
    }

    /// Whether the schema declares nothing usable (continuation shells and
    /// pure-import stubs).
    pub fn is_empty(&self) -> bool {
        self.top_elements.is_empty()
            && self.top_attributes.is_empty()
            && self.top_complex_types.is_empty()
            && self.top_simple_types.is_empty()
            && self.top_attribute_groups.is_empty()
    }

    /// Directory the schema was loaded from; include/import locations are
    /// resolved relative to it.
    pub(crate) fn base_dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Derive the output package name for this schema.
    ///
    /// Precedence: explicit override for the target namespace, then the
    /// prefix this schema binds to its own target namespace, then the file
    /// stem. The result is sanitized into a module identifier.
    pub fn package_name(&self, config: &ResolverConfig) -> String {
        if let Some(pkg) = config.package_overrides.get(&self.target_namespace) {
            return names::package_name(pkg);
        }
        if let Some(prefix) = self.xmlns.prefix_by_uri(&self.target_namespace) {
            if !prefix.is_empty() {
                return names::package_name(prefix);
            }
        }
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        names::package_name(&stem)
    }

    // -- merging -------------------------------------------------------------

    /// Fold `other`'s declarations into this schema.
    ///
    /// Used for `xs:include` targets and same-namespace continuations. The
    /// merged declarations keep their internal structure (indices are
    /// rebased onto this schema's arenas) but lose all resolution state, so
    /// the next compile binds them against this schema's context. Top-level
    /// lists are prepended: included content precedes the including
    /// document's own declarations, matching the lexical position of the
    /// `xs:include` at the top of the file.
    ///
    /// Include and import declarations of `other` are carried over so the
    /// workspace keeps walking the combined dependency lists.
    pub(crate) fn merge_from(&mut self, mut other: Schema) {
        let off = MergeOffsets {
            elements: self.elements.len(),
            attributes: self.attributes.len(),
            complex_types: self.complex_types.len(),
            simple_types: self.simple_types.len(),
            attribute_groups: self.attribute_groups.len(),
        };

        for node in &mut other.elements {
            node.rebase(&off);
        }
        for node in &mut other.attributes {
            node.rebase();
        }
        for node in &mut other.complex_types {
            node.rebase(&off);
        }
        for node in &mut other.simple_types {
            node.rebase(&off);
        }
        for node in &mut other.attribute_groups {
            node.rebase(&off);
        }

        self.elements.append(&mut other.elements);
        self.attributes.append(&mut other.attributes);
        self.complex_types.append(&mut other.complex_types);
        self.simple_types.append(&mut other.simple_types);
        self.attribute_groups.append(&mut other.attribute_groups);

        prepend(
            &mut self.top_elements,
            other.top_elements.iter().map(|&id| off.element(id)),
        );
        prepend(
            &mut self.top_attributes,
            other.top_attributes.iter().map(|&id| off.attribute(id)),
        );
        prepend(
            &mut self.top_complex_types,
            other.top_complex_types.iter().map(|&id| off.complex_type(id)),
        );
        prepend(
            &mut self.top_simple_types,
            other.top_simple_types.iter().map(|&id| off.simple_type(id)),
        );
        prepend(
            &mut self.top_attribute_groups,
            other
                .top_attribute_groups
                .iter()
                .map(|&id| off.attribute_group(id)),
        );

        for inc in other.includes {
            if !self.includes.iter().any(|i| i.location == inc.location) {
                self.includes.push(IncludeDecl {
                    location: inc.location,
                    loaded: false,
                });
            }
        }
        for imp in other.imports {
            if !self.imports.iter().any(|i| i.namespace == imp.namespace) {
                self.imports.push(ImportDecl {
                    namespace: imp.namespace,
                    location: imp.location,
                    loaded: false,
                    resolved: None,
                });
            }
        }

        // Prefix bindings of the merged document extend this schema's table;
        // existing bindings win on conflict (first declaration rule).
        if !other.xmlns.is_empty() {
            self.xmlns.extend_missing(&other.xmlns);
        }

        // Everything must re-bind in the merged context.
        self.hoisted.clear();
    }
}

fn prepend<T>(dest: &mut Vec<T>, head: impl Iterator<Item = T>) {
    let mut merged: Vec<T> = head.collect();
    merged.append(dest);
    *dest = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ElementNode;
    use crate::xmlns::Binding;

    fn schema_with_elements(names: &[&str]) -> Schema {
        let mut s = Schema::default();
        for name in names {
            let id = ElementId(s.elements.len());
            s.elements.push(ElementNode {
                name: Some((*name).to_string()),
                ..ElementNode::default()
            });
            s.top_elements.push(id);
        }
        s
    }

    #[test]
    fn test_find_element_by_name() {
        let s = schema_with_elements(&["alpha", "beta"]);
        assert!(s.find_element("beta").is_some());
        assert!(s.find_element("gamma").is_none());
    }

    #[test]
    fn test_merge_prepends_and_rebases() {
        let mut base = schema_with_elements(&["own"]);
        let other = schema_with_elements(&["merged-a", "merged-b"]);

        base.merge_from(other);

        let names: Vec<_> = base
            .top_elements
            .iter()
            .map(|&id| base.element(id).name.clone().unwrap())
            .collect();
        assert_eq!(names, ["merged-a", "merged-b", "own"]);
        // Lookup still works through the rebased ids.
        assert!(base.find_element("merged-b").is_some());
        assert!(base.find_element("own").is_some());
    }

    #[test]
    fn test_package_name_precedence() {
        let mut s = Schema {
            path: PathBuf::from("/schemas/cpe-dictionary.xsd"),
            target_namespace: "http://example.org/ns".to_string(),
            ..Schema::default()
        };

        // No prefix binding: falls back to the file stem.
        let config = ResolverConfig::default();
        assert_eq!(s.package_name(&config), "cpe_dictionary");

        // A prefix bound to the target namespace wins over the stem.
        s.xmlns = Xmlns::new(vec![Binding {
            prefix: "cpe-lang".to_string(),
            uri: "http://example.org/ns".to_string(),
        }]);
        assert_eq!(s.package_name(&config), "cpe_lang");

        // An explicit override beats both.
        let config = ResolverConfig {
            package_overrides: crate::overrides::PackageOverrides::parse_args(&[
                "http://example.org/ns=renamed",
            ])
            .unwrap(),
            ..ResolverConfig::default()
        };
        assert_eq!(s.package_name(&config), "renamed");
    }
}
