//! Schema object model
//!
//! Declarations are stored in per-schema arenas (one `Vec` per declaration
//! kind) and cross-reference each other through index newtypes. This breaks
//! the ownership cycle a naive tree would create: the schema owns every
//! node, and nodes point at each other (and at foreign schemas) with plain
//! keys instead of owning pointers.
//!
//! Parsing fills the structural fields; the compile pass fills the `bound`
//! resolution fields exactly once; everything is frozen afterwards.

use serde::Serialize;

use crate::reference::Reference;

/// Index of a schema inside the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct SchemaId(pub(crate) usize);

/// Index into a schema's element arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ElementId(pub(crate) usize);

/// Index into a schema's attribute arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeId(pub(crate) usize);

/// Index into a schema's complex type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ComplexTypeId(pub(crate) usize);

/// Index into a schema's simple type arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SimpleTypeId(pub(crate) usize);

/// Index into a schema's attribute group arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AttributeGroupId(pub(crate) usize);

/// A resolved type binding: the closed set of things a type reference can
/// point at. Exhaustive matching over this enum is what turns "unsupported
/// combination" checks into compile-time checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Complex(SchemaId, ComplexTypeId),
    Simple(SchemaId, SimpleTypeId),
    Group(SchemaId, AttributeGroupId),
    /// A built-in (or overridden) primitive, carrying the target primitive
    /// name directly.
    Static(String),
}

/// Upper occurrence bound of a particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}

impl Default for MaxOccurs {
    fn default() -> Self {
        MaxOccurs::Bounded(1)
    }
}

impl MaxOccurs {
    /// Whether a particle with this bound may appear more than once.
    pub fn is_repeated(self) -> bool {
        match self {
            MaxOccurs::Unbounded => true,
            MaxOccurs::Bounded(n) => n > 1,
        }
    }
}

/// One element declaration, top-level or nested.
#[derive(Debug, Clone, Default)]
pub struct ElementNode {
    /// Declared name; `None` when the declaration borrows it from `ref`.
    pub name: Option<String>,
    /// `type="..."` reference to a named type.
    pub type_ref: Option<Reference>,
    /// `ref="..."` reference to another top-level element.
    pub element_ref: Option<Reference>,
    /// Inline anonymous complex type owned by this declaration.
    pub inline_complex: Option<ComplexTypeId>,
    /// Inline anonymous simple type owned by this declaration.
    pub inline_simple: Option<SimpleTypeId>,
    /// Lower bound; `None` means "unspecified", which is distinct from 1
    /// when group cardinality is propagated.
    pub min_occurs: Option<u32>,
    pub max_occurs: MaxOccurs,
    /// The element whose inline type lexically contains this declaration;
    /// used to derive hoisted names.
    pub parent: Option<ElementId>,
    pub documentation: Option<String>,

    // Filled by the compile pass.
    pub(crate) bound: bool,
    pub(crate) resolved_type: Option<TypeRef>,
    pub(crate) resolved_ref: Option<(SchemaId, ElementId)>,
    /// Synthetic top-level name assigned when this declaration is hoisted.
    pub(crate) synthetic_name: Option<String>,
}

/// One attribute declaration.
#[derive(Debug, Clone, Default)]
pub struct AttributeNode {
    /// Declared name; `None` when borrowed from `ref`.
    pub name: Option<String>,
    pub type_ref: Option<Reference>,
    pub attribute_ref: Option<Reference>,
    /// `use="required"`; everything else (including absence) is optional.
    pub required: bool,
    pub documentation: Option<String>,

    pub(crate) bound: bool,
    pub(crate) resolved_type: Option<TypeRef>,
    pub(crate) resolved_ref: Option<(SchemaId, AttributeId)>,
}

/// A sequence or all group: ordered children with group-level cardinality.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub children: Vec<GroupChild>,
    pub min_occurs: Option<u32>,
    pub max_occurs: MaxOccurs,
    /// Flattened, cardinality-annotated particle list; filled at compile.
    pub(crate) flat: Vec<Particle>,
}

#[derive(Debug, Clone)]
pub enum GroupChild {
    Element(ElementId),
    Group(Box<Group>),
    Choice(Box<ChoiceGroup>),
    Any(AnyNode),
}

/// A choice group: mutually exclusive alternatives, possibly containing
/// nested sequences.
#[derive(Debug, Clone, Default)]
pub struct ChoiceGroup {
    pub children: Vec<ChoiceChild>,
    pub min_occurs: Option<u32>,
    pub max_occurs: MaxOccurs,
    pub(crate) flat: Vec<Particle>,
}

#[derive(Debug, Clone)]
pub enum ChoiceChild {
    Element(ElementId),
    Sequence(Box<Group>),
}

/// An `xs:any` wildcard particle. Recorded but contributes no fields.
#[derive(Debug, Clone)]
pub struct AnyNode {
    pub namespace: Option<String>,
    pub process_contents: Option<String>,
}

/// One flattened child-element occurrence with propagated cardinality.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub element: ElementId,
    pub min_occurs: Option<u32>,
    pub max_occurs: MaxOccurs,
}

/// An `xs:extension`: composes a base type's members with this level's own.
#[derive(Debug, Clone)]
pub struct Extension {
    pub base: Reference,
    pub attributes: Vec<AttributeId>,
    pub attribute_groups: Vec<Reference>,
    pub sequence: Option<Group>,

    pub(crate) resolved_base: Option<TypeRef>,
    pub(crate) resolved_groups: Vec<TypeRef>,
}

/// An `xs:restriction`: same composition discipline as extension, plus an
/// optional closed enumeration of literal values.
#[derive(Debug, Clone)]
pub struct Restriction {
    pub base: Reference,
    pub attributes: Vec<AttributeId>,
    pub enums: Vec<EnumFacet>,

    pub(crate) resolved_base: Option<TypeRef>,
}

/// One `xs:enumeration` facet.
#[derive(Debug, Clone)]
pub struct EnumFacet {
    pub value: String,
    /// Explicit identifier carried in a `<xs:documentation source="Name">`
    /// annotation, overriding the value-derived one.
    pub name_hint: Option<String>,
    pub documentation: Option<String>,
}

/// Body of a `simpleContent` or `complexContent` wrapper.
#[derive(Debug, Clone, Default)]
pub struct ContentBody {
    pub extension: Option<Extension>,
    pub restriction: Option<Restriction>,
}

/// One complex type definition, named or anonymous.
///
/// At most one of the five content slots may be populated; two at once is a
/// fatal configuration error detected at compile, never resolved by
/// precedence.
#[derive(Debug, Clone, Default)]
pub struct ComplexTypeNode {
    pub name: Option<String>,
    pub mixed: bool,
    /// Direct attributes, in document order.
    pub attributes: Vec<AttributeId>,
    /// Direct `attributeGroup ref="..."` uses, in document order.
    pub attribute_groups: Vec<Reference>,
    pub sequence: Option<Group>,
    pub all: Option<Group>,
    pub choice: Option<ChoiceGroup>,
    pub simple_content: Option<ContentBody>,
    pub complex_content: Option<ContentBody>,
    pub documentation: Option<String>,

    pub(crate) resolved_groups: Vec<TypeRef>,
    pub(crate) compiled: bool,
}

/// One simple type definition, named or anonymous.
#[derive(Debug, Clone, Default)]
pub struct SimpleTypeNode {
    pub name: Option<String>,
    pub restriction: Option<Restriction>,
    pub documentation: Option<String>,

    pub(crate) compiled: bool,
}

/// One named, reusable attribute bag; may reference other groups, which are
/// flattened at resolution time rather than copied.
#[derive(Debug, Clone, Default)]
pub struct AttributeGroupNode {
    pub name: Option<String>,
    pub group_refs: Vec<Reference>,
    pub attributes: Vec<AttributeId>,

    pub(crate) resolved_refs: Vec<TypeRef>,
    pub(crate) compiled: bool,
}

// ---------------------------------------------------------------------------
// Merge support: when one schema's declarations are copied into another
// (includes, continuations), every arena index inside the copied nodes must
// be shifted by the destination arena's prior length, and resolution state
// must be cleared so the destination re-binds them in its own context.
// ---------------------------------------------------------------------------

/// Arena index offsets applied while merging one schema into another.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct MergeOffsets {
    pub elements: usize,
    pub attributes: usize,
    pub complex_types: usize,
    pub simple_types: usize,
    pub attribute_groups: usize,
}

impl MergeOffsets {
    pub(crate) fn element(&self, id: ElementId) -> ElementId {
        ElementId(id.0 + self.elements)
    }
    pub(crate) fn attribute(&self, id: AttributeId) -> AttributeId {
        AttributeId(id.0 + self.attributes)
    }
    pub(crate) fn complex_type(&self, id: ComplexTypeId) -> ComplexTypeId {
        ComplexTypeId(id.0 + self.complex_types)
    }
    pub(crate) fn simple_type(&self, id: SimpleTypeId) -> SimpleTypeId {
        SimpleTypeId(id.0 + self.simple_types)
    }
    pub(crate) fn attribute_group(&self, id: AttributeGroupId) -> AttributeGroupId {
        AttributeGroupId(id.0 + self.attribute_groups)
    }
}

impl ElementNode {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        self.inline_complex = self.inline_complex.map(|id| off.complex_type(id));
        self.inline_simple = self.inline_simple.map(|id| off.simple_type(id));
        self.parent = self.parent.map(|id| off.element(id));
        self.bound = false;
        self.resolved_type = None;
        self.resolved_ref = None;
        self.synthetic_name = None;
    }
}

impl AttributeNode {
    pub(crate) fn rebase(&mut self) {
        self.bound = false;
        self.resolved_type = None;
        self.resolved_ref = None;
    }
}

impl Group {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        for child in &mut self.children {
            match child {
                GroupChild::Element(id) => *id = off.element(*id),
                GroupChild::Group(group) => group.rebase(off),
                GroupChild::Choice(choice) => choice.rebase(off),
                GroupChild::Any(_) => {}
            }
        }
        self.flat.clear();
    }
}

impl ChoiceGroup {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        for child in &mut self.children {
            match child {
                ChoiceChild::Element(id) => *id = off.element(*id),
                ChoiceChild::Sequence(group) => group.rebase(off),
            }
        }
        self.flat.clear();
    }
}

impl ContentBody {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        if let Some(ext) = &mut self.extension {
            for id in &mut ext.attributes {
                *id = off.attribute(*id);
            }
            if let Some(seq) = &mut ext.sequence {
                seq.rebase(off);
            }
            ext.resolved_base = None;
            ext.resolved_groups.clear();
        }
        if let Some(restr) = &mut self.restriction {
            for id in &mut restr.attributes {
                *id = off.attribute(*id);
            }
            restr.resolved_base = None;
        }
    }
}

impl ComplexTypeNode {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        for id in &mut self.attributes {
            *id = off.attribute(*id);
        }
        if let Some(group) = &mut self.sequence {
            group.rebase(off);
        }
        if let Some(group) = &mut self.all {
            group.rebase(off);
        }
        if let Some(choice) = &mut self.choice {
            choice.rebase(off);
        }
        if let Some(body) = &mut self.simple_content {
            body.rebase(off);
        }
        if let Some(body) = &mut self.complex_content {
            body.rebase(off);
        }
        self.resolved_groups.clear();
        self.compiled = false;
    }
}

impl SimpleTypeNode {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        if let Some(restr) = &mut self.restriction {
            for id in &mut restr.attributes {
                *id = off.attribute(*id);
            }
            restr.resolved_base = None;
        }
        self.compiled = false;
    }
}

impl AttributeGroupNode {
    pub(crate) fn rebase(&mut self, off: &MergeOffsets) {
        for id in &mut self.attributes {
            *id = off.attribute(*id);
        }
        self.resolved_refs.clear();
        self.compiled = false;
    }
}
