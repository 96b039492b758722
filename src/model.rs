//! Resolved output model
//!
//! The final product of a workspace: a renderer-facing description of every
//! schema with all references bound, inheritance flattened away, and
//! identifiers deduplicated. Nothing in here points back at schema
//! internals; the model is plain data and serializes as such.
//!
//! Inheritance is flattened lazily while building the model, with a
//! visiting set guarding against circular derivations. Identifier
//! deduplication is deterministic: declarations are walked in document
//! order, so repeated runs produce identical models.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::ast::{
    AttributeGroupId, AttributeId, ComplexTypeId, ElementId, MaxOccurs, Particle, SchemaId,
    SimpleTypeId, TypeRef,
};
use crate::error::{Error, Result};
use crate::names::{self, IdentDeduper};
use crate::schema::Schema;
use crate::workspace::Workspace;

/// The complete resolved workspace, one module per non-empty schema, in
/// load order.
#[derive(Debug, Serialize)]
pub struct ResolvedModel {
    pub modules: Vec<SchemaModule>,
}

/// One schema's resolved output.
#[derive(Debug, Serialize)]
pub struct SchemaModule {
    pub package: String,
    pub target_namespace: String,
    pub source_path: String,
    pub documentation: Option<String>,
    /// Foreign packages referenced by this module's fields, sorted by
    /// package name.
    pub imports: Vec<ModuleImport>,
    /// Top-level elements followed by hoisted inline-typed elements.
    pub elements: Vec<ExportedStruct>,
    /// Named complex types not already covered by an element of the same
    /// identifier.
    pub complex_types: Vec<ExportedStruct>,
    pub simple_types: Vec<ExportedSimple>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ModuleImport {
    pub module_path: String,
    pub package: String,
}

/// A record-shaped export: an element or a complex type with its flattened
/// members.
#[derive(Debug, Serialize)]
pub struct ExportedStruct {
    pub ident: String,
    pub xml_name: String,
    pub documentation: Option<String>,
    pub attributes: Vec<FlatAttribute>,
    pub elements: Vec<FlatElement>,
    /// Primitive carried as character data, for mixed and simple-content
    /// types.
    pub text_type: Option<String>,
}

/// One flattened child-element field.
#[derive(Debug, Serialize)]
pub struct FlatElement {
    pub ident: String,
    pub xml_name: String,
    pub type_ident: String,
    /// Package qualifier when the type lives in another namespace.
    pub foreign_package: Option<String>,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    /// The child carries character data only, and `type_ident` is a
    /// primitive rather than an exported struct.
    pub plain_text: bool,
}

/// One flattened attribute field.
#[derive(Debug, Serialize)]
pub struct FlatAttribute {
    pub ident: String,
    pub xml_name: String,
    pub type_ident: String,
    pub required: bool,
    /// Occurrence ordinal of the identifier within its struct; 1 unless the
    /// identifier needed a suffix.
    pub ordinal: u32,
}

/// A named simple type, exported when it carries an enumeration worth
/// generating.
#[derive(Debug, Serialize)]
pub struct ExportedSimple {
    pub ident: String,
    pub base_type: String,
    pub documentation: Option<String>,
    pub enums: Vec<FlatEnum>,
}

#[derive(Debug, Serialize)]
pub struct FlatEnum {
    pub ident: String,
    pub value: String,
    pub documentation: Option<String>,
}

/// Build the resolved model for every non-empty schema.
pub(crate) fn export(ws: &Workspace) -> Result<ResolvedModel> {
    let tables: HashMap<SchemaId, NameTable> = ws
        .iter()
        .map(|(id, schema)| (id, NameTable::build(ws, schema)))
        .collect();

    let mut modules = Vec::new();
    for (id, schema) in ws.iter() {
        if schema.is_empty() {
            continue;
        }
        let builder = ModuleBuilder {
            ws,
            tables: &tables,
            id,
        };
        modules.push(builder.build(schema)?);
    }
    Ok(ResolvedModel { modules })
}

/// Per-schema identifier assignments, computed up front so cross-schema
/// references see the same names the owning module exports.
struct NameTable {
    package: String,
    /// Exported struct ident per element, for top-level and hoisted
    /// elements.
    element_idents: HashMap<ElementId, String>,
    /// Ident per named complex type, whether or not it is exported on its
    /// own.
    complex_idents: HashMap<ComplexTypeId, String>,
    /// Export order: top-level elements first, hoisted ones after.
    element_order: Vec<ElementId>,
    /// Complex types that get a struct of their own.
    exported_complex: Vec<(ComplexTypeId, String)>,
    exported_simple: Vec<(SimpleTypeId, String)>,
}

impl NameTable {
    fn build(ws: &Workspace, schema: &Schema) -> NameTable {
        let mut deduper = IdentDeduper::new();
        let mut element_idents = HashMap::new();
        let mut element_order = Vec::new();

        for &id in schema.top_elements.iter().chain(&schema.hoisted) {
            let node = schema.element(id);
            let base = node
                .synthetic_name
                .clone()
                .unwrap_or_else(|| names::pascal_case(&element_name(ws, schema, id)));
            let (ident, _) = deduper.assign(&base);
            element_idents.insert(id, ident);
            element_order.push(id);
        }

        let taken_by_elements: HashSet<&String> = element_idents.values().collect();

        // A named type whose ident matches an element's is already covered
        // by the element's struct; it keeps the shared ident but is not
        // exported a second time.
        let mut complex_idents = HashMap::new();
        let mut exported_complex = Vec::new();
        for &id in &schema.top_complex_types {
            let name = schema.complex_type(id).name.clone().unwrap_or_default();
            let base = names::pascal_case(&name);
            if taken_by_elements.contains(&base) {
                complex_idents.insert(id, base);
                continue;
            }
            let (ident, _) = deduper.assign(&base);
            complex_idents.insert(id, ident.clone());
            exported_complex.push((id, ident));
        }

        let mut exported_simple = Vec::new();
        for &id in &schema.top_simple_types {
            let name = schema.simple_type(id).name.clone().unwrap_or_default();
            let base = names::pascal_case(&name);
            if taken_by_elements.contains(&base) {
                continue;
            }
            let (ident, _) = deduper.assign(&base);
            exported_simple.push((id, ident));
        }

        NameTable {
            package: schema.package_name(ws.config()),
            element_idents,
            complex_idents,
            element_order,
            exported_complex,
            exported_simple,
        }
    }
}

struct ModuleBuilder<'a> {
    ws: &'a Workspace,
    tables: &'a HashMap<SchemaId, NameTable>,
    id: SchemaId,
}

impl ModuleBuilder<'_> {
    fn build(&self, schema: &Schema) -> Result<SchemaModule> {
        let table = &self.tables[&self.id];
        let mut imports = BTreeMap::new();

        let mut elements = Vec::with_capacity(table.element_order.len());
        for &eid in &table.element_order {
            elements.push(self.element_struct(schema, eid, &mut imports)?);
        }

        let mut complex_types = Vec::with_capacity(table.exported_complex.len());
        for (ct, ident) in &table.exported_complex {
            let node = schema.complex_type(*ct);
            let st = self.struct_from_type(
                ident.clone(),
                node.name.clone().unwrap_or_default(),
                node.documentation.clone(),
                self.id,
                *ct,
                &mut imports,
            )?;
            complex_types.push(st);
        }

        let mut simple_types = Vec::with_capacity(table.exported_simple.len());
        for (st, ident) in &table.exported_simple {
            simple_types.push(self.simple_export(schema, *st, ident.clone())?);
        }

        Ok(SchemaModule {
            package: table.package.clone(),
            target_namespace: schema.target_namespace.clone(),
            source_path: schema.path.display().to_string(),
            documentation: schema.documentation.clone(),
            imports: imports
                .into_iter()
                .map(|(package, module_path)| ModuleImport {
                    module_path,
                    package,
                })
                .collect(),
            elements,
            complex_types,
            simple_types,
        })
    }

    fn element_struct(
        &self,
        schema: &Schema,
        eid: ElementId,
        imports: &mut BTreeMap<String, String>,
    ) -> Result<ExportedStruct> {
        let node = schema.element(eid);
        let ident = self.tables[&self.id].element_idents[&eid].clone();
        let xml_name = element_name(self.ws, schema, eid);
        let documentation = node.documentation.clone();

        let (esid, eeid) = self.follow_refs(self.id, eid);
        let effective = self.ws.schema(esid).element(eeid);

        if let Some(ct) = effective.inline_complex {
            return self.struct_from_type(ident, xml_name, documentation, esid, ct, imports);
        }
        if let Some(TypeRef::Complex(ts, tc)) = &effective.resolved_type {
            return self.struct_from_type(ident, xml_name, documentation, *ts, *tc, imports);
        }

        let text_type = if let Some(st) = effective.inline_simple {
            simple_primitive(self.ws, esid, st, &mut HashSet::new())?
        } else {
            match &effective.resolved_type {
                Some(TypeRef::Simple(ts, st)) => {
                    simple_primitive(self.ws, *ts, *st, &mut HashSet::new())?
                }
                Some(TypeRef::Static(target)) => target.clone(),
                _ => "String".to_string(),
            }
        };
        Ok(ExportedStruct {
            ident,
            xml_name,
            documentation,
            attributes: Vec::new(),
            elements: Vec::new(),
            text_type: Some(text_type),
        })
    }

    fn struct_from_type(
        &self,
        ident: String,
        xml_name: String,
        documentation: Option<String>,
        ts: SchemaId,
        tc: ComplexTypeId,
        imports: &mut BTreeMap<String, String>,
    ) -> Result<ExportedStruct> {
        let attrs = collect_attributes(self.ws, ts, tc, &mut HashSet::new())?;
        let parts = collect_elements(self.ws, ts, tc, &mut HashSet::new())?;
        let text_type = text_content(self.ws, ts, tc, &mut HashSet::new())?;

        // Members with the same XML name (a base declaration repeated by a
        // derived type) collapse to the first occurrence. Members with
        // different names colliding on the derived identifier are all kept
        // and the later ones suffixed.
        let mut attributes = Vec::new();
        let mut seen_attrs = HashSet::new();
        let mut attr_dedup = IdentDeduper::new();
        for (asid, aid) in attrs {
            let facts = attribute_facts(self.ws, asid, aid)?;
            if !seen_attrs.insert(facts.name.clone()) {
                continue;
            }
            let (ident, ordinal) = attr_dedup.assign(&names::pascal_case(&facts.name));
            attributes.push(FlatAttribute {
                ident,
                xml_name: facts.name,
                type_ident: facts.type_ident,
                required: facts.required,
                ordinal,
            });
        }

        // Element fields collapse on the derived identifier: one physical
        // field serves all alternatives of a choice, and a base declaration
        // repeated by a derived type folds into the inherited one. The
        // first occurrence wins, even when the masked declarations were
        // distinct in the source.
        let mut elements = Vec::new();
        let mut seen_elements = HashSet::new();
        for (psid, particle) in parts {
            let (esid, eeid) = self.follow_refs(psid, particle.element);
            let effective = self.ws.schema(esid).element(eeid);
            let was_ref = self
                .ws
                .schema(psid)
                .element(particle.element)
                .resolved_ref
                .is_some();

            let elem_name = effective.name.clone().unwrap_or_default();
            let ident = names::pascal_case(&elem_name);
            if !seen_elements.insert(ident.clone()) {
                continue;
            }

            let (type_ident, foreign_package, plain_text) =
                self.field_type(esid, eeid, was_ref, imports)?;
            elements.push(FlatElement {
                ident,
                xml_name: elem_name,
                type_ident,
                foreign_package,
                min_occurs: particle.min_occurs.unwrap_or(1),
                max_occurs: particle.max_occurs,
                plain_text,
            });
        }

        Ok(ExportedStruct {
            ident,
            xml_name,
            documentation,
            attributes,
            elements,
            text_type,
        })
    }

    /// Resolve the field type for a child element: the referenced element's
    /// struct for refs, the hoisted struct for inline types, the type's
    /// ident for named complex types, and a primitive otherwise.
    fn field_type(
        &self,
        esid: SchemaId,
        eeid: ElementId,
        was_ref: bool,
        imports: &mut BTreeMap<String, String>,
    ) -> Result<(String, Option<String>, bool)> {
        let node = self.ws.schema(esid).element(eeid);

        if was_ref || node.inline_complex.is_some() {
            let table = &self.tables[&esid];
            let ident = table
                .element_idents
                .get(&eeid)
                .cloned()
                .unwrap_or_else(|| names::pascal_case(node.name.as_deref().unwrap_or_default()));
            let foreign = self.foreign_package(esid, imports);
            return Ok((ident, foreign, false));
        }

        if let Some(st) = node.inline_simple {
            let primitive = simple_primitive(self.ws, esid, st, &mut HashSet::new())?;
            return Ok((primitive, None, true));
        }

        match &node.resolved_type {
            Some(TypeRef::Complex(ts, tc)) => {
                let ident = self.tables[ts].complex_idents[tc].clone();
                let foreign = self.foreign_package(*ts, imports);
                Ok((ident, foreign, false))
            }
            Some(TypeRef::Simple(ts, st)) => {
                let primitive = simple_primitive(self.ws, *ts, *st, &mut HashSet::new())?;
                Ok((primitive, None, true))
            }
            Some(TypeRef::Static(target)) => Ok((target.clone(), None, true)),
            Some(TypeRef::Group(..)) | None => Ok(("String".to_string(), None, true)),
        }
    }

    /// Package qualifier for a symbol owned by `owner`, registering the
    /// module import. Symbols in the module's own namespace need none.
    fn foreign_package(
        &self,
        owner: SchemaId,
        imports: &mut BTreeMap<String, String>,
    ) -> Option<String> {
        let own_ns = &self.ws.schema(self.id).target_namespace;
        let owner_ns = &self.ws.schema(owner).target_namespace;
        if owner_ns == own_ns {
            return None;
        }
        let package = self.tables[&owner].package.clone();
        let module_path = self.ws.config().module_path.trim_end_matches('/');
        let full = if module_path.is_empty() {
            package.clone()
        } else {
            format!("{module_path}/{package}")
        };
        imports.insert(package.clone(), full);
        Some(package)
    }

    fn simple_export(
        &self,
        schema: &Schema,
        st: SimpleTypeId,
        ident: String,
    ) -> Result<ExportedSimple> {
        let node = schema.simple_type(st);
        let base_type = simple_primitive(self.ws, self.id, st, &mut HashSet::new())?;

        let mut enums = Vec::new();
        if let Some(restriction) = &node.restriction {
            let mut deduper = IdentDeduper::new();
            for facet in &restriction.enums {
                // Values are lowercased first so all-caps literals like
                // "AND" come out as "And" rather than verbatim.
                let base = facet
                    .name_hint
                    .clone()
                    .unwrap_or_else(|| names::pascal_case(&facet.value.to_lowercase()));
                let (ident, _) = deduper.assign(&base);
                enums.push(FlatEnum {
                    ident,
                    value: facet.value.clone(),
                    documentation: facet.documentation.clone(),
                });
            }
        }

        Ok(ExportedSimple {
            ident,
            base_type,
            documentation: node.documentation.clone(),
            enums,
        })
    }

    /// Follow `ref` chains to the declaring element.
    fn follow_refs(&self, mut sid: SchemaId, mut eid: ElementId) -> (SchemaId, ElementId) {
        let mut visited = HashSet::new();
        while let Some((next_sid, next_eid)) = self.ws.schema(sid).element(eid).resolved_ref {
            if !visited.insert((sid, eid)) {
                break;
            }
            sid = next_sid;
            eid = next_eid;
        }
        (sid, eid)
    }
}

/// Declared XML name of an element, borrowed from the referenced
/// declaration when the use site has none.
fn element_name(ws: &Workspace, schema: &Schema, id: ElementId) -> String {
    let mut node = schema.element(id);
    let mut visited = HashSet::new();
    while node.name.is_none() {
        match node.resolved_ref {
            Some(next) if visited.insert(next) => node = ws.schema(next.0).element(next.1),
            _ => break,
        }
    }
    node.name.clone().unwrap_or_default()
}

struct AttributeFacts {
    name: String,
    type_ident: String,
    required: bool,
}

/// Name, primitive, and requiredness of an attribute use, following `ref`
/// to the declaring attribute. Requiredness stays with the use site.
fn attribute_facts(ws: &Workspace, sid: SchemaId, aid: AttributeId) -> Result<AttributeFacts> {
    let required = ws.schema(sid).attribute(aid).required;

    let mut sid = sid;
    let mut aid = aid;
    let mut visited = HashSet::new();
    while let Some((next_sid, next_aid)) = ws.schema(sid).attribute(aid).resolved_ref {
        if !visited.insert((sid, aid)) {
            break;
        }
        sid = next_sid;
        aid = next_aid;
    }

    let node = ws.schema(sid).attribute(aid);
    let type_ident = match &node.resolved_type {
        Some(TypeRef::Static(target)) => target.clone(),
        Some(TypeRef::Simple(ts, st)) => simple_primitive(ws, *ts, *st, &mut HashSet::new())?,
        _ => "String".to_string(),
    };

    Ok(AttributeFacts {
        name: node.name.clone().unwrap_or_default(),
        type_ident,
        required,
    })
}

/// All attribute uses of a complex type, base types first, in document
/// order within each level.
fn collect_attributes(
    ws: &Workspace,
    sid: SchemaId,
    ct: ComplexTypeId,
    visiting: &mut HashSet<(SchemaId, ComplexTypeId)>,
) -> Result<Vec<(SchemaId, AttributeId)>> {
    let node = ws.schema(sid).complex_type(ct);
    if !visiting.insert((sid, ct)) {
        return Err(Error::CircularDerivation {
            name: node.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
        });
    }

    let mut out = Vec::new();
    for body in [&node.simple_content, &node.complex_content].into_iter().flatten() {
        if let Some(extension) = &body.extension {
            if let Some(TypeRef::Complex(bs, bc)) = &extension.resolved_base {
                out.extend(collect_attributes(ws, *bs, *bc, visiting)?);
            }
            out.extend(extension.attributes.iter().map(|&a| (sid, a)));
            for group in &extension.resolved_groups {
                group_attributes(ws, group, &mut HashSet::new(), &mut out);
            }
        }
        if let Some(restriction) = &body.restriction {
            if let Some(TypeRef::Complex(bs, bc)) = &restriction.resolved_base {
                out.extend(collect_attributes(ws, *bs, *bc, visiting)?);
            }
            out.extend(restriction.attributes.iter().map(|&a| (sid, a)));
        }
    }

    out.extend(node.attributes.iter().map(|&a| (sid, a)));
    for group in &node.resolved_groups {
        group_attributes(ws, group, &mut HashSet::new(), &mut out);
    }

    visiting.remove(&(sid, ct));
    Ok(out)
}

fn group_attributes(
    ws: &Workspace,
    group: &TypeRef,
    visited: &mut HashSet<(SchemaId, AttributeGroupId)>,
    out: &mut Vec<(SchemaId, AttributeId)>,
) {
    let TypeRef::Group(sid, gid) = group else {
        return;
    };
    if !visited.insert((*sid, *gid)) {
        return;
    }
    let node = ws.schema(*sid).attribute_group(*gid);
    out.extend(node.attributes.iter().map(|&a| (*sid, a)));
    for nested in &node.resolved_refs {
        group_attributes(ws, nested, visited, out);
    }
}

/// All child-element particles of a complex type, base content first.
fn collect_elements(
    ws: &Workspace,
    sid: SchemaId,
    ct: ComplexTypeId,
    visiting: &mut HashSet<(SchemaId, ComplexTypeId)>,
) -> Result<Vec<(SchemaId, Particle)>> {
    let node = ws.schema(sid).complex_type(ct);
    if !visiting.insert((sid, ct)) {
        return Err(Error::CircularDerivation {
            name: node.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
        });
    }

    let mut out = Vec::new();
    if let Some(body) = &node.complex_content {
        if let Some(extension) = &body.extension {
            if let Some(TypeRef::Complex(bs, bc)) = &extension.resolved_base {
                out.extend(collect_elements(ws, *bs, *bc, visiting)?);
            }
            if let Some(sequence) = &extension.sequence {
                out.extend(sequence.flat.iter().map(|&p| (sid, p)));
            }
        }
    }
    if let Some(group) = &node.sequence {
        out.extend(group.flat.iter().map(|&p| (sid, p)));
    }
    if let Some(group) = &node.all {
        out.extend(group.flat.iter().map(|&p| (sid, p)));
    }
    if let Some(choice) = &node.choice {
        out.extend(choice.flat.iter().map(|&p| (sid, p)));
    }

    visiting.remove(&(sid, ct));
    Ok(out)
}

/// Character-data primitive of a complex type: mixed content and simple
/// content carry text, inherited through the derivation chain.
fn text_content(
    ws: &Workspace,
    sid: SchemaId,
    ct: ComplexTypeId,
    visiting: &mut HashSet<(SchemaId, ComplexTypeId)>,
) -> Result<Option<String>> {
    if !visiting.insert((sid, ct)) {
        return Ok(None);
    }
    let node = ws.schema(sid).complex_type(ct);
    if node.mixed {
        return Ok(Some("String".to_string()));
    }

    if let Some(body) = &node.simple_content {
        let base = body
            .extension
            .as_ref()
            .and_then(|e| e.resolved_base.as_ref())
            .or_else(|| body.restriction.as_ref().and_then(|r| r.resolved_base.as_ref()));
        return match base {
            Some(TypeRef::Static(target)) => Ok(Some(target.clone())),
            Some(TypeRef::Simple(ts, st)) => {
                Ok(Some(simple_primitive(ws, *ts, *st, &mut HashSet::new())?))
            }
            Some(TypeRef::Complex(bs, bc)) => text_content(ws, *bs, *bc, visiting),
            _ => Ok(Some("String".to_string())),
        };
    }

    if let Some(body) = &node.complex_content {
        if let Some(extension) = &body.extension {
            if let Some(TypeRef::Complex(bs, bc)) = &extension.resolved_base {
                return text_content(ws, *bs, *bc, visiting);
            }
        }
    }

    Ok(None)
}

/// Underlying primitive of a simple type, through its restriction chain.
fn simple_primitive(
    ws: &Workspace,
    sid: SchemaId,
    st: SimpleTypeId,
    visiting: &mut HashSet<(SchemaId, SimpleTypeId)>,
) -> Result<String> {
    let node = ws.schema(sid).simple_type(st);
    if !visiting.insert((sid, st)) {
        return Err(Error::CircularDerivation {
            name: node.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
        });
    }

    let primitive = match node.restriction.as_ref().and_then(|r| r.resolved_base.as_ref()) {
        Some(TypeRef::Static(target)) => target.clone(),
        Some(TypeRef::Simple(ts, base)) => simple_primitive(ws, *ts, *base, visiting)?,
        _ => "String".to_string(),
    };

    visiting.remove(&(sid, st));
    Ok(primitive)
}
