//! XSD document parsing
//!
//! Turns one `.xsd` file into a [`Schema`] value. Parsing is purely
//! structural: references stay symbolic (`prefix:local` strings), nothing is
//! resolved, and nothing outside the document is touched. The compile pass
//! owns all cross-declaration checks, so the parser stays permissive about
//! combinations it merely records.

use std::fs;
use std::path::Path;

use roxmltree::{Document, Node};

use crate::ast::{
    AnyNode, AttributeGroupId, AttributeGroupNode, AttributeId, AttributeNode, ChoiceChild,
    ChoiceGroup, ComplexTypeId, ComplexTypeNode, ContentBody, ElementId, ElementNode, EnumFacet,
    Extension, Group, GroupChild, MaxOccurs, Restriction, SimpleTypeId, SimpleTypeNode,
};
use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::schema::{ImportDecl, IncludeDecl, Schema};
use crate::xmlns::{Binding, Xmlns, XSD_NAMESPACE};

/// Upper bound on a single schema document. Anything larger is almost
/// certainly not a hand-written schema and would make parse errors useless.
const MAX_DOCUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Parse the schema document at `path`.
pub fn parse_file(path: &Path) -> Result<Schema> {
    let text = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    if text.len() > MAX_DOCUMENT_SIZE {
        return Err(Error::malformed(path, "document exceeds the 16 MiB limit"));
    }
    parse_str(&text, path)
}

/// Parse a schema document already held in memory; `path` is used for error
/// reporting and include/import resolution.
pub(crate) fn parse_str(text: &str, path: &Path) -> Result<Schema> {
    let doc = Document::parse(text).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let root = doc.root_element();
    if !is_xsd(root, "schema") {
        return Err(Error::malformed(
            path,
            format!("root element is '{}', expected 'xs:schema'", root.tag_name().name()),
        ));
    }

    let mut parser = Parser {
        path,
        schema: Schema {
            path: path.to_path_buf(),
            target_namespace: root.attribute("targetNamespace").unwrap_or("").to_string(),
            ..Schema::default()
        },
    };

    // Prefix bindings from the root element. Unprefixed references are
    // handled by the "empty prefix means the target namespace" rule in the
    // resolver, so the default namespace declaration is not recorded.
    let bindings = root
        .namespaces()
        .filter_map(|ns| {
            ns.name().map(|prefix| Binding {
                prefix: prefix.to_string(),
                uri: ns.uri().to_string(),
            })
        })
        .collect();
    parser.schema.xmlns = Xmlns::new(bindings);

    for child in root.children().filter(|n| n.is_element()) {
        if child.tag_name().namespace() != Some(XSD_NAMESPACE) {
            continue;
        }
        match child.tag_name().name() {
            "annotation" => {
                parser.schema.documentation = parse_annotation(child);
            }
            "include" => {
                let location = child.attribute("schemaLocation").ok_or_else(|| {
                    Error::malformed(path, "xs:include without schemaLocation")
                })?;
                parser.schema.includes.push(IncludeDecl {
                    location: location.to_string(),
                    loaded: false,
                });
            }
            "import" => {
                let namespace = child.attribute("namespace").ok_or_else(|| {
                    Error::malformed(path, "xs:import without namespace")
                })?;
                parser.schema.imports.push(ImportDecl {
                    namespace: namespace.to_string(),
                    location: child.attribute("schemaLocation").map(str::to_string),
                    loaded: false,
                    resolved: None,
                });
            }
            "element" => {
                let id = parser.parse_element(child, None)?;
                parser.schema.top_elements.push(id);
            }
            "attribute" => {
                let id = parser.parse_attribute(child)?;
                parser.schema.top_attributes.push(id);
            }
            "complexType" => {
                let id = parser.parse_complex_type(child, None)?;
                parser.schema.top_complex_types.push(id);
            }
            "simpleType" => {
                let id = parser.parse_simple_type(child)?;
                parser.schema.top_simple_types.push(id);
            }
            "attributeGroup" => {
                let id = parser.parse_attribute_group(child)?;
                parser.schema.top_attribute_groups.push(id);
            }
            // Remaining top-level constructs (xs:group, xs:notation, ...)
            // carry nothing the resolved model needs.
            _ => {}
        }
    }

    Ok(parser.schema)
}

struct Parser<'p> {
    path: &'p Path,
    schema: Schema,
}

impl Parser<'_> {
    fn parse_element(&mut self, node: Node, parent: Option<ElementId>) -> Result<ElementId> {
        // Reserve the arena slot first so nested declarations can point back
        // at this element.
        let id = ElementId(self.schema.elements.len());
        self.schema.elements.push(ElementNode::default());

        let mut element = ElementNode {
            name: node.attribute("name").map(str::to_string),
            type_ref: node.attribute("type").map(Reference::parse),
            element_ref: node.attribute("ref").map(Reference::parse),
            min_occurs: self.parse_min_occurs(node)?,
            max_occurs: self.parse_max_occurs(node)?,
            parent,
            ..ElementNode::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => element.documentation = parse_annotation(child),
                "complexType" => {
                    element.inline_complex = Some(self.parse_complex_type(child, Some(id))?);
                }
                "simpleType" => {
                    element.inline_simple = Some(self.parse_simple_type(child)?);
                }
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:element"),
                    ))
                }
            }
        }

        self.schema.elements[id.0] = element;
        Ok(id)
    }

    fn parse_attribute(&mut self, node: Node) -> Result<AttributeId> {
        let mut attribute = AttributeNode {
            name: node.attribute("name").map(str::to_string),
            type_ref: node.attribute("type").map(Reference::parse),
            attribute_ref: node.attribute("ref").map(Reference::parse),
            required: node.attribute("use") == Some("required"),
            ..AttributeNode::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => attribute.documentation = parse_annotation(child),
                // An anonymous simple type restricts the lexical space only;
                // the attribute still maps to the plain-text primitive. It
                // cannot accompany a ref, which carries its own type.
                "simpleType" => {
                    if attribute.attribute_ref.is_some() {
                        return Err(Error::malformed(
                            self.path,
                            "attribute combines ref with an inline simple type",
                        ));
                    }
                }
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:attribute"),
                    ))
                }
            }
        }

        let id = AttributeId(self.schema.attributes.len());
        self.schema.attributes.push(attribute);
        Ok(id)
    }

    fn parse_complex_type(
        &mut self,
        node: Node,
        parent: Option<ElementId>,
    ) -> Result<ComplexTypeId> {
        let id = ComplexTypeId(self.schema.complex_types.len());
        self.schema.complex_types.push(ComplexTypeNode::default());

        let mut ty = ComplexTypeNode {
            name: node.attribute("name").map(str::to_string),
            mixed: node.attribute("mixed") == Some("true"),
            ..ComplexTypeNode::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => ty.documentation = parse_annotation(child),
                "sequence" => ty.sequence = Some(self.parse_group(child, parent)?),
                "all" => ty.all = Some(self.parse_group(child, parent)?),
                "choice" => ty.choice = Some(self.parse_choice(child, parent)?),
                "attribute" => {
                    let attr = self.parse_attribute(child)?;
                    ty.attributes.push(attr);
                }
                "attributeGroup" => {
                    let reference = child.attribute("ref").ok_or_else(|| {
                        Error::malformed(self.path, "xs:attributeGroup use without ref")
                    })?;
                    ty.attribute_groups.push(Reference::parse(reference));
                }
                "simpleContent" => {
                    ty.simple_content = Some(self.parse_content_body(child, parent)?);
                }
                "complexContent" => {
                    ty.complex_content = Some(self.parse_content_body(child, parent)?);
                }
                "anyAttribute" => {}
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:complexType"),
                    ))
                }
            }
        }

        self.schema.complex_types[id.0] = ty;
        Ok(id)
    }

    fn parse_simple_type(&mut self, node: Node) -> Result<SimpleTypeId> {
        let mut ty = SimpleTypeNode {
            name: node.attribute("name").map(str::to_string),
            ..SimpleTypeNode::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => ty.documentation = parse_annotation(child),
                "restriction" => ty.restriction = Some(self.parse_restriction(child)?),
                // Unions and lists collapse to the plain-text primitive.
                "union" | "list" => {}
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:simpleType"),
                    ))
                }
            }
        }

        let id = SimpleTypeId(self.schema.simple_types.len());
        self.schema.simple_types.push(ty);
        Ok(id)
    }

    fn parse_attribute_group(&mut self, node: Node) -> Result<AttributeGroupId> {
        let mut group = AttributeGroupNode {
            name: node.attribute("name").map(str::to_string),
            ..AttributeGroupNode::default()
        };
        if let Some(reference) = node.attribute("ref") {
            group.group_refs.push(Reference::parse(reference));
        }

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => {}
                "attribute" => {
                    let attr = self.parse_attribute(child)?;
                    group.attributes.push(attr);
                }
                "attributeGroup" => {
                    let reference = child.attribute("ref").ok_or_else(|| {
                        Error::malformed(self.path, "xs:attributeGroup use without ref")
                    })?;
                    group.group_refs.push(Reference::parse(reference));
                }
                "anyAttribute" => {}
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:attributeGroup"),
                    ))
                }
            }
        }

        let id = AttributeGroupId(self.schema.attribute_groups.len());
        self.schema.attribute_groups.push(group);
        Ok(id)
    }

    fn parse_group(&mut self, node: Node, parent: Option<ElementId>) -> Result<Group> {
        let mut group = Group {
            min_occurs: self.parse_min_occurs(node)?,
            max_occurs: self.parse_max_occurs(node)?,
            ..Group::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => {}
                "element" => {
                    let id = self.parse_element(child, parent)?;
                    group.children.push(GroupChild::Element(id));
                }
                "sequence" => {
                    let inner = self.parse_group(child, parent)?;
                    group.children.push(GroupChild::Group(Box::new(inner)));
                }
                "choice" => {
                    let inner = self.parse_choice(child, parent)?;
                    group.children.push(GroupChild::Choice(Box::new(inner)));
                }
                "any" => {
                    group.children.push(GroupChild::Any(AnyNode {
                        namespace: child.attribute("namespace").map(str::to_string),
                        process_contents: child.attribute("processContents").map(str::to_string),
                    }));
                }
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside a model group"),
                    ))
                }
            }
        }

        Ok(group)
    }

    fn parse_choice(&mut self, node: Node, parent: Option<ElementId>) -> Result<ChoiceGroup> {
        let mut choice = ChoiceGroup {
            min_occurs: self.parse_min_occurs(node)?,
            max_occurs: self.parse_max_occurs(node)?,
            ..ChoiceGroup::default()
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" | "any" => {}
                "element" => {
                    let id = self.parse_element(child, parent)?;
                    choice.children.push(ChoiceChild::Element(id));
                }
                "sequence" => {
                    let inner = self.parse_group(child, parent)?;
                    choice.children.push(ChoiceChild::Sequence(Box::new(inner)));
                }
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:choice"),
                    ))
                }
            }
        }

        Ok(choice)
    }

    fn parse_content_body(&mut self, node: Node, parent: Option<ElementId>) -> Result<ContentBody> {
        let mut body = ContentBody::default();

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" => {}
                "extension" => body.extension = Some(self.parse_extension(child, parent)?),
                "restriction" => body.restriction = Some(self.parse_restriction(child)?),
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside a content wrapper"),
                    ))
                }
            }
        }

        Ok(body)
    }

    fn parse_extension(&mut self, node: Node, parent: Option<ElementId>) -> Result<Extension> {
        let base = node
            .attribute("base")
            .ok_or_else(|| Error::malformed(self.path, "xs:extension without base"))?;

        let mut extension = Extension {
            base: Reference::parse(base),
            attributes: Vec::new(),
            attribute_groups: Vec::new(),
            sequence: None,
            resolved_base: None,
            resolved_groups: Vec::new(),
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" | "anyAttribute" => {}
                "attribute" => {
                    let attr = self.parse_attribute(child)?;
                    extension.attributes.push(attr);
                }
                "attributeGroup" => {
                    let reference = child.attribute("ref").ok_or_else(|| {
                        Error::malformed(self.path, "xs:attributeGroup use without ref")
                    })?;
                    extension.attribute_groups.push(Reference::parse(reference));
                }
                "sequence" => extension.sequence = Some(self.parse_group(child, parent)?),
                // A bare choice extends the content model like a one-child
                // sequence would.
                "choice" => {
                    let inner = self.parse_choice(child, parent)?;
                    extension.sequence = Some(Group {
                        children: vec![GroupChild::Choice(Box::new(inner))],
                        ..Group::default()
                    });
                }
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:extension"),
                    ))
                }
            }
        }

        Ok(extension)
    }

    fn parse_restriction(&mut self, node: Node) -> Result<Restriction> {
        let base = node
            .attribute("base")
            .ok_or_else(|| Error::malformed(self.path, "xs:restriction without base"))?;

        let mut restriction = Restriction {
            base: Reference::parse(base),
            attributes: Vec::new(),
            enums: Vec::new(),
            resolved_base: None,
        };

        for child in xsd_children(node) {
            match child.tag_name().name() {
                "annotation" | "anyAttribute" => {}
                "attribute" => {
                    let attr = self.parse_attribute(child)?;
                    restriction.attributes.push(attr);
                }
                "enumeration" => {
                    let value = child.attribute("value").ok_or_else(|| {
                        Error::malformed(self.path, "xs:enumeration without value")
                    })?;
                    let mut facet = EnumFacet {
                        value: value.to_string(),
                        name_hint: None,
                        documentation: None,
                    };
                    for ann in xsd_children(child).filter(|n| n.tag_name().name() == "annotation")
                    {
                        for doc in xsd_children(ann).filter(|n| n.tag_name().name() == "documentation")
                        {
                            let text = doc.text().map(str::trim).unwrap_or("").to_string();
                            // `source` marks the annotation as an explicit
                            // identifier for the facet.
                            if doc.attribute("source").is_some() {
                                facet.name_hint = Some(text);
                            } else if !text.is_empty() {
                                facet.documentation = Some(text);
                            }
                        }
                    }
                    restriction.enums.push(facet);
                }
                // Lexical facets (pattern, length bounds, whiteSpace, ...)
                // do not change the resolved primitive.
                "pattern" | "minLength" | "maxLength" | "length" | "whiteSpace"
                | "minInclusive" | "maxInclusive" | "minExclusive" | "maxExclusive"
                | "totalDigits" | "fractionDigits" | "simpleType" => {}
                other => {
                    return Err(Error::unsupported(
                        self.path,
                        format!("'{other}' inside xs:restriction"),
                    ))
                }
            }
        }

        Ok(restriction)
    }

    fn parse_min_occurs(&self, node: Node) -> Result<Option<u32>> {
        match node.attribute("minOccurs") {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| {
                Error::malformed(self.path, format!("invalid minOccurs value '{raw}'"))
            }),
        }
    }

    fn parse_max_occurs(&self, node: Node) -> Result<MaxOccurs> {
        match node.attribute("maxOccurs") {
            None => Ok(MaxOccurs::default()),
            Some("unbounded") => Ok(MaxOccurs::Unbounded),
            Some(raw) => raw.parse().map(MaxOccurs::Bounded).map_err(|_| {
                Error::malformed(self.path, format!("invalid maxOccurs value '{raw}'"))
            }),
        }
    }
}

fn is_xsd(node: Node, name: &str) -> bool {
    node.tag_name().namespace() == Some(XSD_NAMESPACE) && node.tag_name().name() == name
}

fn xsd_children<'a, 'd>(node: Node<'a, 'd>) -> impl Iterator<Item = Node<'a, 'd>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().namespace() == Some(XSD_NAMESPACE))
}

fn parse_annotation(node: Node) -> Option<String> {
    let docs: Vec<String> = xsd_children(node)
        .filter(|n| n.tag_name().name() == "documentation")
        .filter_map(|n| n.text())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if docs.is_empty() {
        None
    } else {
        Some(docs.join("\n"))
    }
}
