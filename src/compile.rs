//! Reference binding and content-model flattening
//!
//! A parsed schema is compiled in place against the workspace: every symbolic
//! `prefix:local` reference is bound to a concrete [`TypeRef`] or declaration
//! id, inline element types are promoted to top-level exports, and nested
//! model groups are flattened into particle lists with propagated
//! cardinality.
//!
//! Compilation is idempotent per declaration. Each node carries a bound flag
//! that survives recompiles, so folding a continuation document into an
//! already-compiled schema only binds the newly merged declarations.
//!
//! Borrowing discipline: resolution reads the whole workspace, so each
//! declaration is compiled in two phases: resolve everything into locals
//! against `&Schema`, then write the results back through `&mut Schema`.

use std::collections::HashSet;

use crate::ast::{
    AttributeId, ChoiceChild, ChoiceGroup, ComplexTypeNode, ElementId, Group, GroupChild,
    MaxOccurs, Particle, SchemaId, TypeRef,
};
use crate::error::{Error, Result};
use crate::names;
use crate::reference::Reference;
use crate::schema::Schema;
use crate::workspace::Workspace;
use crate::xmlns::{XML_NAMESPACE, XSD_NAMESPACE};

/// Compile the schema `id` in place.
pub(crate) fn compile_schema(ws: &mut Workspace, id: SchemaId) -> Result<()> {
    let mut schema = std::mem::take(ws.schema_slot(id));
    let result = compile_in(ws, id, &mut schema);
    *ws.schema_slot(id) = schema;
    result
}

fn compile_in(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    compile_attributes(ws, id, schema)?;
    compile_elements(ws, id, schema)?;
    register_hoisted_elements(schema)?;
    compile_attribute_groups(ws, id, schema)?;
    compile_simple_types(ws, id, schema)?;
    compile_complex_types(ws, id, schema)?;
    Ok(())
}

fn compile_attributes(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.attributes.len() {
        if schema.attributes[idx].bound {
            continue;
        }

        let node = schema.attribute(AttributeId(idx));
        if node.name.is_none() && node.attribute_ref.is_none() {
            return Err(Error::malformed(&schema.path, "attribute without name or ref"));
        }
        if let Some(reference) = &node.attribute_ref {
            if node.type_ref.is_some() {
                return Err(Error::malformed(
                    &schema.path,
                    format!("attribute ref '{reference}' combines ref with its own type"),
                ));
            }
        }

        let resolver = Resolver { ws, id, schema: &*schema };
        let mut resolved_type = None;
        let mut resolved_ref = None;
        let mut borrowed_name = None;

        if let Some(reference) = node.type_ref.clone() {
            let bound = resolver.resolve_type(&reference)?;
            if matches!(bound, TypeRef::Complex(..) | TypeRef::Group(..)) {
                return Err(Error::malformed(
                    &schema.path,
                    format!("attribute type '{reference}' is not a simple type"),
                ));
            }
            resolved_type = Some(bound);
        }
        if let Some(reference) = node.attribute_ref.clone() {
            match resolver.resolve_attribute_ref(&reference)? {
                AttributeRefTarget::Declared(target) => resolved_ref = Some(target),
                // Attributes from the reserved XML namespace (xml:lang and
                // friends) have no schema to point at; they degrade to a
                // locally named plain-text attribute.
                AttributeRefTarget::XmlBuiltin => {
                    borrowed_name = Some(reference.local_name().to_string());
                }
            }
        }

        let node = schema.attribute_mut(AttributeId(idx));
        node.resolved_type = resolved_type;
        node.resolved_ref = resolved_ref;
        if node.name.is_none() {
            node.name = borrowed_name;
        }
        node.bound = true;
    }
    Ok(())
}

fn compile_elements(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.elements.len() {
        if schema.elements[idx].bound {
            continue;
        }

        let node = schema.element(ElementId(idx));
        let label = node.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        if node.name.is_none() && node.element_ref.is_none() {
            return Err(Error::malformed(&schema.path, "element without name or ref"));
        }
        if node.element_ref.is_some() && (node.type_ref.is_some() || node.inline_complex.is_some())
        {
            return Err(Error::malformed(
                &schema.path,
                format!("element '{label}' combines ref with its own type"),
            ));
        }
        if node.type_ref.is_some() && (node.inline_complex.is_some() || node.inline_simple.is_some())
        {
            return Err(Error::malformed(
                &schema.path,
                format!("element '{label}' has both a type reference and an inline type"),
            ));
        }

        let resolver = Resolver { ws, id, schema: &*schema };
        let mut resolved_type = None;
        let mut resolved_ref = None;

        if let Some(reference) = node.type_ref.clone() {
            let bound = resolver.resolve_type(&reference)?;
            if matches!(bound, TypeRef::Group(..)) {
                return Err(Error::malformed(
                    &schema.path,
                    format!("element type '{reference}' names an attribute group"),
                ));
            }
            resolved_type = Some(bound);
        }
        if let Some(reference) = node.element_ref.clone() {
            resolved_ref = Some(resolver.resolve_element_ref(&reference)?);
        }

        let node = schema.element_mut(ElementId(idx));
        node.resolved_type = resolved_type;
        node.resolved_ref = resolved_ref;
        node.bound = true;
    }
    Ok(())
}

/// Promote elements with inline complex types to top-level exports.
///
/// A nested inline-typed element gets a synthetic name composed from its
/// lexical parent element's name and its own, so `<platform><remark/>` yields
/// `PlatformRemark`. Composition does not chain through grandparents. An
/// inline-typed element without a parent keeps its own name, unless a
/// top-level element already claims it.
fn register_hoisted_elements(schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.elements.len() {
        let id = ElementId(idx);
        if schema.elements[idx].inline_complex.is_none() {
            continue;
        }
        if schema.top_elements.contains(&id) || schema.hoisted.contains(&id) {
            continue;
        }

        let name = match &schema.elements[idx].name {
            Some(name) => name.clone(),
            None => {
                return Err(Error::malformed(
                    &schema.path,
                    "inline-typed element without a name",
                ))
            }
        };

        let synthetic = match schema.elements[idx].parent {
            Some(parent) => {
                let parent_name = schema.elements[parent.0].name.clone().unwrap_or_default();
                Some(format!(
                    "{}{}",
                    names::pascal_case(&parent_name),
                    names::pascal_case(&name)
                ))
            }
            None => {
                if schema.find_element(&name).is_some() {
                    continue;
                }
                None
            }
        };

        schema.elements[idx].synthetic_name = synthetic;
        schema.hoisted.push(id);
    }
    Ok(())
}

fn compile_attribute_groups(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.attribute_groups.len() {
        if schema.attribute_groups[idx].compiled {
            continue;
        }

        let resolver = Resolver { ws, id, schema: &*schema };
        let node = &schema.attribute_groups[idx];
        let mut resolved_refs = Vec::with_capacity(node.group_refs.len());
        for reference in &node.group_refs {
            resolved_refs.push(resolver.resolve_attribute_group(reference)?);
        }

        let node = &mut schema.attribute_groups[idx];
        node.resolved_refs = resolved_refs;
        node.compiled = true;
    }
    Ok(())
}

fn compile_simple_types(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.simple_types.len() {
        if schema.simple_types[idx].compiled {
            continue;
        }

        let resolver = Resolver { ws, id, schema: &*schema };
        let resolved_base = match &schema.simple_types[idx].restriction {
            Some(restriction) => Some(resolver.resolve_type(&restriction.base)?),
            None => None,
        };

        let node = &mut schema.simple_types[idx];
        if let Some(restriction) = &mut node.restriction {
            restriction.resolved_base = resolved_base;
        }
        node.compiled = true;
    }
    Ok(())
}

fn compile_complex_types(ws: &Workspace, id: SchemaId, schema: &mut Schema) -> Result<()> {
    for idx in 0..schema.complex_types.len() {
        if schema.complex_types[idx].compiled {
            continue;
        }

        let shared = &*schema;
        check_content_exclusivity(shared, &shared.complex_types[idx])?;

        let resolver = Resolver { ws, id, schema: shared };
        let node = &shared.complex_types[idx];

        let mut resolved_groups = Vec::with_capacity(node.attribute_groups.len());
        for reference in &node.attribute_groups {
            resolved_groups.push(resolver.resolve_attribute_group(reference)?);
        }

        let sequence_flat = node.sequence.as_ref().map(|g| flatten_group(shared, g));
        let all_flat = node.all.as_ref().map(|g| flatten_group(shared, g));
        let choice_flat = node.choice.as_ref().map(|c| flatten_choice(shared, c));

        let simple_body = node
            .simple_content
            .as_ref()
            .map(|body| compile_content_body(&resolver, shared, body, ContentKind::Simple))
            .transpose()?;
        let complex_body = node
            .complex_content
            .as_ref()
            .map(|body| compile_content_body(&resolver, shared, body, ContentKind::Complex))
            .transpose()?;

        let node = &mut schema.complex_types[idx];
        node.resolved_groups = resolved_groups;
        if let (Some(group), Some(flat)) = (node.sequence.as_mut(), sequence_flat) {
            group.flat = flat;
        }
        if let (Some(group), Some(flat)) = (node.all.as_mut(), all_flat) {
            group.flat = flat;
        }
        if let (Some(choice), Some(flat)) = (node.choice.as_mut(), choice_flat) {
            choice.flat = flat;
        }
        if let (Some(body), Some(compiled)) = (node.simple_content.as_mut(), simple_body) {
            apply_content_body(body, compiled);
        }
        if let (Some(body), Some(compiled)) = (node.complex_content.as_mut(), complex_body) {
            apply_content_body(body, compiled);
        }
        node.compiled = true;
    }
    Ok(())
}

fn check_content_exclusivity(schema: &Schema, node: &ComplexTypeNode) -> Result<()> {
    let slots = [
        node.sequence.is_some(),
        node.all.is_some(),
        node.choice.is_some(),
        node.simple_content.is_some(),
        node.complex_content.is_some(),
    ];
    if slots.iter().filter(|&&s| s).count() > 1 {
        let label = node.name.as_deref().unwrap_or("<anonymous>");
        return Err(Error::malformed(
            &schema.path,
            format!("complex type '{label}' mixes multiple content models"),
        ));
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum ContentKind {
    Simple,
    Complex,
}

struct CompiledBody {
    base: TypeRef,
    groups: Vec<TypeRef>,
    sequence_flat: Option<Vec<Particle>>,
    is_extension: bool,
}

fn compile_content_body(
    resolver: &Resolver,
    schema: &Schema,
    body: &crate::ast::ContentBody,
    kind: ContentKind,
) -> Result<CompiledBody> {
    match (&body.extension, &body.restriction) {
        (Some(_), Some(_)) | (None, None) => Err(Error::malformed(
            &schema.path,
            "content wrapper must hold exactly one extension or restriction",
        )),
        (Some(extension), None) => {
            let base = resolver.resolve_type(&extension.base)?;
            check_base(schema, &extension.base, &base, kind)?;
            let mut groups = Vec::with_capacity(extension.attribute_groups.len());
            for reference in &extension.attribute_groups {
                groups.push(resolver.resolve_attribute_group(reference)?);
            }
            let sequence_flat = extension.sequence.as_ref().map(|g| flatten_group(schema, g));
            Ok(CompiledBody {
                base,
                groups,
                sequence_flat,
                is_extension: true,
            })
        }
        (None, Some(restriction)) => {
            let base = resolver.resolve_type(&restriction.base)?;
            check_base(schema, &restriction.base, &base, kind)?;
            Ok(CompiledBody {
                base,
                groups: Vec::new(),
                sequence_flat: None,
                is_extension: false,
            })
        }
    }
}

fn check_base(schema: &Schema, reference: &Reference, base: &TypeRef, kind: ContentKind) -> Result<()> {
    match base {
        TypeRef::Group(..) => Err(Error::malformed(
            &schema.path,
            format!("derivation base '{reference}' names an attribute group"),
        )),
        TypeRef::Simple(..) | TypeRef::Static(_) if kind == ContentKind::Complex => {
            Err(Error::malformed(
                &schema.path,
                format!("complexContent base '{reference}' is not a complex type"),
            ))
        }
        _ => Ok(()),
    }
}

fn apply_content_body(body: &mut crate::ast::ContentBody, compiled: CompiledBody) {
    if compiled.is_extension {
        if let Some(extension) = &mut body.extension {
            extension.resolved_base = Some(compiled.base);
            extension.resolved_groups = compiled.groups;
            if let (Some(group), Some(flat)) = (extension.sequence.as_mut(), compiled.sequence_flat)
            {
                group.flat = flat;
            }
        }
    } else if let Some(restriction) = &mut body.restriction {
        restriction.resolved_base = Some(compiled.base);
    }
}

// -- content-model flattening -------------------------------------------------

/// Flatten a sequence/all group into a particle list, in document order.
///
/// Cardinality propagates downward: a repeated group makes every leaf
/// repeatable, and an optional group makes every leaf without an explicit
/// lower bound optional.
fn flatten_group(schema: &Schema, group: &Group) -> Vec<Particle> {
    let mut particles = Vec::new();
    for child in &group.children {
        match child {
            GroupChild::Element(id) => particles.push(leaf_particle(schema, *id)),
            GroupChild::Group(inner) => particles.extend(flatten_group(schema, inner)),
            GroupChild::Choice(inner) => particles.extend(flatten_choice(schema, inner)),
            GroupChild::Any(_) => {}
        }
    }
    propagate(&mut particles, group.min_occurs, group.max_occurs, false);
    particles
}

/// Flatten a choice into a particle list. Alternatives stay in document
/// order; each becomes optional, and a repeated choice makes each
/// repeatable.
fn flatten_choice(schema: &Schema, choice: &ChoiceGroup) -> Vec<Particle> {
    let mut particles = Vec::new();
    for child in &choice.children {
        match child {
            ChoiceChild::Element(id) => particles.push(leaf_particle(schema, *id)),
            ChoiceChild::Sequence(inner) => particles.extend(flatten_group(schema, inner)),
        }
    }
    propagate(&mut particles, choice.min_occurs, choice.max_occurs, true);
    particles
}

fn leaf_particle(schema: &Schema, id: ElementId) -> Particle {
    let element = schema.element(id);
    Particle {
        element: id,
        min_occurs: element.min_occurs,
        max_occurs: element.max_occurs,
    }
}

fn propagate(particles: &mut [Particle], min: Option<u32>, max: MaxOccurs, is_choice: bool) {
    let optional = is_choice || min == Some(0);
    for particle in particles {
        if max.is_repeated() {
            particle.max_occurs = MaxOccurs::Unbounded;
        }
        if optional && particle.min_occurs.is_none() {
            particle.min_occurs = Some(0);
        }
    }
}

// -- reference resolution ------------------------------------------------------

enum AttributeRefTarget {
    Declared((SchemaId, AttributeId)),
    XmlBuiltin,
}

/// Resolves references in the context of one schema while that schema is
/// checked out of the workspace for mutation.
struct Resolver<'a> {
    ws: &'a Workspace,
    id: SchemaId,
    schema: &'a Schema,
}

impl Resolver<'_> {
    /// The schema `sid`, routing around the checked-out slot.
    fn schema_ref(&self, sid: SchemaId) -> &Schema {
        if sid == self.id {
            self.schema
        } else {
            self.ws.schema(sid)
        }
    }

    /// Map a namespace prefix to a namespace, per declaration-site rules:
    /// the empty prefix is the declaring schema's target namespace, `xml` is
    /// fixed by the XML spec, and everything else comes from the root
    /// bindings: first of this schema, then transitively of its imports.
    fn uri_by_prefix(&self, prefix: &str) -> Result<String> {
        if prefix.is_empty() {
            return Ok(self.schema.target_namespace.clone());
        }
        if prefix == "xml" {
            return Ok(XML_NAMESPACE.to_string());
        }
        let mut visited = HashSet::new();
        self.uri_by_prefix_in(self.id, prefix, &mut visited)
            .ok_or_else(|| Error::UnknownPrefix {
                prefix: prefix.to_string(),
                path: self.schema.path.clone(),
            })
    }

    fn uri_by_prefix_in(
        &self,
        sid: SchemaId,
        prefix: &str,
        visited: &mut HashSet<SchemaId>,
    ) -> Option<String> {
        if !visited.insert(sid) {
            return None;
        }
        let schema = self.schema_ref(sid);
        if let Some(uri) = schema.xmlns.uri_by_prefix(prefix) {
            return Some(uri.to_string());
        }
        for import in &schema.imports {
            if let Some(target) = import.resolved {
                if let Some(uri) = self.uri_by_prefix_in(target, prefix, visited) {
                    return Some(uri);
                }
            }
        }
        None
    }

    /// Find the schema owning `uri`: the current schema, then its imports,
    /// then their imports.
    fn owner_by_uri(&self, uri: &str) -> Option<SchemaId> {
        let mut visited = HashSet::new();
        self.owner_by_uri_in(self.id, uri, &mut visited)
    }

    fn owner_by_uri_in(
        &self,
        sid: SchemaId,
        uri: &str,
        visited: &mut HashSet<SchemaId>,
    ) -> Option<SchemaId> {
        if !visited.insert(sid) {
            return None;
        }
        let schema = self.schema_ref(sid);
        if schema.target_namespace == uri {
            return Some(sid);
        }
        for import in &schema.imports {
            if import.namespace == uri {
                if let Some(target) = import.resolved {
                    return Some(target);
                }
            }
        }
        for import in &schema.imports {
            if let Some(target) = import.resolved {
                if let Some(owner) = self.owner_by_uri_in(target, uri, visited) {
                    return Some(owner);
                }
            }
        }
        None
    }

    /// Bind a type reference: override table first, then the owning schema's
    /// declarations (complex types, then simple types, then attribute
    /// groups), then the built-in catalog for the XML Schema namespace.
    fn resolve_type(&self, reference: &Reference) -> Result<TypeRef> {
        let uri = self.uri_by_prefix(reference.prefix())?;
        let local = reference.local_name();

        if let Some(target) = self.ws.config().type_overrides.get(&uri, local) {
            return Ok(TypeRef::Static(target.to_string()));
        }

        match self.owner_by_uri(&uri) {
            Some(owner) => {
                let schema = self.schema_ref(owner);
                if let Some(id) = schema.find_complex_type(local) {
                    return Ok(TypeRef::Complex(owner, id));
                }
                if let Some(id) = schema.find_simple_type(local) {
                    return Ok(TypeRef::Simple(owner, id));
                }
                if let Some(id) = schema.find_attribute_group(local) {
                    return Ok(TypeRef::Group(owner, id));
                }
                if schema.target_namespace == XSD_NAMESPACE {
                    return self.static_type(local);
                }
                Err(Error::unresolved(&self.schema.path, reference.to_string()))
            }
            None if uri == XSD_NAMESPACE => self.static_type(local),
            None => Err(Error::unresolved(&self.schema.path, reference.to_string())),
        }
    }

    fn resolve_attribute_group(&self, reference: &Reference) -> Result<TypeRef> {
        match self.resolve_type(reference)? {
            group @ TypeRef::Group(..) => Ok(group),
            _ => Err(Error::malformed(
                &self.schema.path,
                format!("'{reference}' does not name an attribute group"),
            )),
        }
    }

    fn resolve_element_ref(&self, reference: &Reference) -> Result<(SchemaId, ElementId)> {
        let uri = self.uri_by_prefix(reference.prefix())?;
        let owner = self
            .owner_by_uri(&uri)
            .ok_or_else(|| Error::unresolved(&self.schema.path, reference.to_string()))?;
        self.schema_ref(owner)
            .find_element(reference.local_name())
            .map(|id| (owner, id))
            .ok_or_else(|| Error::unresolved(&self.schema.path, reference.to_string()))
    }

    fn resolve_attribute_ref(&self, reference: &Reference) -> Result<AttributeRefTarget> {
        let uri = self.uri_by_prefix(reference.prefix())?;
        if let Some(owner) = self.owner_by_uri(&uri) {
            if let Some(id) = self.schema_ref(owner).find_attribute(reference.local_name()) {
                return Ok(AttributeRefTarget::Declared((owner, id)));
            }
        }
        if uri == XML_NAMESPACE {
            return Ok(AttributeRefTarget::XmlBuiltin);
        }
        Err(Error::unresolved(&self.schema.path, reference.to_string()))
    }

    fn static_type(&self, name: &str) -> Result<TypeRef> {
        self.ws
            .catalog()
            .lookup(name)
            .map(|target| TypeRef::Static(target.to_string()))
            .ok_or_else(|| Error::UnknownPrimitive {
                name: name.to_string(),
            })
    }
}
