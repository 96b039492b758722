//! End-to-end workspace tests: documents on disk in, resolved model out.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use xsdgen::ast::MaxOccurs;
use xsdgen::model::{ExportedStruct, ResolvedModel, SchemaModule};
use xsdgen::overrides::{PackageOverrides, TypeOverrides};
use xsdgen::{Error, ResolverConfig, Workspace};

fn write_schema(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

fn resolve_one(body: &str) -> ResolvedModel {
    resolve_one_with(body, ResolverConfig::default())
}

fn resolve_one_with(body: &str, config: ResolverConfig) -> ResolvedModel {
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, "schema.xsd", body);
    let mut workspace = Workspace::new(config);
    workspace.load(&path).unwrap();
    workspace.export().unwrap()
}

fn complex<'a>(module: &'a SchemaModule, ident: &str) -> &'a ExportedStruct {
    module
        .complex_types
        .iter()
        .find(|t| t.ident == ident)
        .unwrap_or_else(|| panic!("no complex type '{ident}' in {}", module.package))
}

#[test]
fn test_colliding_attribute_idents_are_kept_and_suffixed() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:element name="entry">
               <xs:complexType>
                 <xs:attribute name="id" type="xs:string"/>
                 <xs:attribute name="Id" type="xs:string"/>
               </xs:complexType>
             </xs:element>
           </xs:schema>"#,
    );

    let entry = &model.modules[0].elements[0];
    let fields: Vec<(&str, &str, u32)> = entry
        .attributes
        .iter()
        .map(|a| (a.ident.as_str(), a.xml_name.as_str(), a.ordinal))
        .collect();
    assert_eq!(fields, [("Id", "id", 1), ("Id2", "Id", 2)]);
}

#[test]
fn test_element_fields_collapse_on_derived_ident() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="holder">
               <xs:choice>
                 <xs:element name="fact-ref" type="xs:string"/>
                 <xs:element name="fact.ref" type="xs:string"/>
               </xs:choice>
             </xs:complexType>
           </xs:schema>"#,
    );

    // Both alternatives derive the ident 'FactRef'; one field serves them.
    let holder = complex(&model.modules[0], "Holder");
    assert_eq!(holder.elements.len(), 1);
    assert_eq!(holder.elements[0].ident, "FactRef");
    assert_eq!(holder.elements[0].xml_name, "fact-ref");
}

#[test]
fn test_repeated_choice_flattens_in_document_order() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="expr">
               <xs:choice maxOccurs="unbounded">
                 <xs:element name="a" type="xs:string"/>
                 <xs:sequence>
                   <xs:element name="b" type="xs:string"/>
                   <xs:element name="c" type="xs:string"/>
                 </xs:sequence>
               </xs:choice>
             </xs:complexType>
           </xs:schema>"#,
    );

    let expr = complex(&model.modules[0], "Expr");
    let names: Vec<&str> = expr.elements.iter().map(|e| e.xml_name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    for field in &expr.elements {
        assert_eq!(field.min_occurs, 0, "{} must be optional", field.xml_name);
        assert_eq!(
            field.max_occurs,
            MaxOccurs::Unbounded,
            "{} must be repeatable",
            field.xml_name
        );
    }
}

#[test]
fn test_extension_composes_base_attributes_first() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="base-type">
               <xs:attribute name="lang" type="xs:string"/>
               <xs:attribute name="id" type="xs:string" use="required"/>
             </xs:complexType>
             <xs:complexType name="derived-type">
               <xs:complexContent>
                 <xs:extension base="t:base-type">
                   <xs:attribute name="status" type="xs:string"/>
                   <xs:attribute name="lang" type="xs:string"/>
                 </xs:extension>
               </xs:complexContent>
             </xs:complexType>
           </xs:schema>"#,
    );

    let derived = complex(&model.modules[0], "DerivedType");
    let attrs: Vec<&str> = derived.attributes.iter().map(|a| a.xml_name.as_str()).collect();
    // Base attributes first, the repeated 'lang' collapsed to one.
    assert_eq!(attrs, ["lang", "id", "status"]);
    assert!(derived.attributes[1].required);
    assert!(!derived.attributes[0].required);
}

#[test]
fn test_same_namespace_documents_fold_into_one_module() {
    let dir = TempDir::new().unwrap();
    let first = write_schema(
        &dir,
        "first.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:element name="alpha" type="xs:string"/>
           </xs:schema>"#,
    );
    let second = write_schema(
        &dir,
        "second.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:element name="beta" type="xs:string"/>
           </xs:schema>"#,
    );

    let mut workspace = Workspace::new(ResolverConfig::default());
    let first_id = workspace.load(&first).unwrap();
    let second_id = workspace.load(&second).unwrap();
    assert_eq!(first_id, second_id);

    let model = workspace.export().unwrap();
    assert_eq!(model.modules.len(), 1);
    let mut idents: Vec<&str> = model.modules[0]
        .elements
        .iter()
        .map(|e| e.ident.as_str())
        .collect();
    idents.sort_unstable();
    assert_eq!(idents, ["Alpha", "Beta"]);
}

#[test]
fn test_mutually_importing_schemas_terminate_and_link() {
    let dir = TempDir::new().unwrap();
    let a = write_schema(
        &dir,
        "a.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:a="urn:a" xmlns:b="urn:b" targetNamespace="urn:a">
             <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
             <xs:element name="root" type="b:item-type"/>
           </xs:schema>"#,
    );
    write_schema(
        &dir,
        "b.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:a="urn:a" xmlns:b="urn:b" targetNamespace="urn:b">
             <xs:import namespace="urn:a" schemaLocation="a.xsd"/>
             <xs:complexType name="item-type">
               <xs:sequence>
                 <xs:element ref="a:root" minOccurs="0"/>
               </xs:sequence>
             </xs:complexType>
           </xs:schema>"#,
    );

    let config = ResolverConfig {
        module_path: "github.com/example/models".to_string(),
        ..ResolverConfig::default()
    };
    let mut workspace = Workspace::new(config);
    workspace.load(&a).unwrap();
    let model = workspace.export().unwrap();
    assert_eq!(model.modules.len(), 2);

    let module_b = model.modules.iter().find(|m| m.package == "b").unwrap();
    let item = complex(module_b, "ItemType");
    assert_eq!(item.elements[0].xml_name, "root");
    assert_eq!(item.elements[0].type_ident, "Root");
    assert_eq!(item.elements[0].foreign_package.as_deref(), Some("a"));
    assert_eq!(item.elements[0].min_occurs, 0);

    assert_eq!(module_b.imports.len(), 1);
    assert_eq!(module_b.imports[0].package, "a");
    assert_eq!(module_b.imports[0].module_path, "github.com/example/models/a");
}

#[test]
fn test_package_collision_is_fatal_and_fixable_by_override() {
    let dir = TempDir::new().unwrap();
    let one = write_schema(
        &dir,
        "one.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:common="urn:one" targetNamespace="urn:one">
             <xs:element name="a" type="xs:string"/>
           </xs:schema>"#,
    );
    let two = write_schema(
        &dir,
        "two.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:common="urn:two" targetNamespace="urn:two">
             <xs:element name="b" type="xs:string"/>
           </xs:schema>"#,
    );

    let mut workspace = Workspace::new(ResolverConfig::default());
    workspace.load_all(&[&one, &two]).unwrap();
    let err = workspace.export().unwrap_err();
    match &err {
        Error::PackageCollision { package, namespace, .. } => {
            assert_eq!(package, "common");
            assert_eq!(namespace, "urn:two");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("--package-override=urn:two="));

    let config = ResolverConfig {
        package_overrides: PackageOverrides::parse_args(&["urn:two=other"]).unwrap(),
        ..ResolverConfig::default()
    };
    let mut workspace = Workspace::new(config);
    workspace.load_all(&[&one, &two]).unwrap();
    let model = workspace.export().unwrap();
    let mut packages: Vec<&str> = model.modules.iter().map(|m| m.package.as_str()).collect();
    packages.sort_unstable();
    assert_eq!(packages, ["common", "other"]);
}

#[test]
fn test_mutual_includes_fold_once() {
    let dir = TempDir::new().unwrap();
    let main = write_schema(
        &dir,
        "main.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:i="urn:inc" targetNamespace="urn:inc">
             <xs:include schemaLocation="part.xsd"/>
             <xs:element name="doc" type="i:doc-type"/>
           </xs:schema>"#,
    );
    write_schema(
        &dir,
        "part.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:i="urn:inc" targetNamespace="urn:inc">
             <xs:include schemaLocation="main.xsd"/>
             <xs:complexType name="doc-type">
               <xs:sequence>
                 <xs:element name="note" type="xs:string"/>
               </xs:sequence>
             </xs:complexType>
           </xs:schema>"#,
    );

    let mut workspace = Workspace::new(ResolverConfig::default());
    workspace.load(&main).unwrap();
    let model = workspace.export().unwrap();
    assert_eq!(model.modules.len(), 1);

    let doc = model.modules[0]
        .elements
        .iter()
        .find(|e| e.ident == "Doc")
        .unwrap();
    assert_eq!(doc.elements[0].xml_name, "note");
    assert!(doc.elements[0].plain_text);
}

#[test]
fn test_type_override_redirects_resolution() {
    let config = ResolverConfig {
        type_overrides: TypeOverrides::parse_args(&["urn:ext:money=Decimal"]).unwrap(),
        ..ResolverConfig::default()
    };
    let model = resolve_one_with(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" xmlns:m="urn:ext" targetNamespace="urn:t">
             <xs:element name="price" type="m:money"/>
             <xs:complexType name="line-item">
               <xs:sequence>
                 <xs:element name="amount" type="m:money"/>
               </xs:sequence>
             </xs:complexType>
           </xs:schema>"#,
        config,
    );

    let module = &model.modules[0];
    let price = module.elements.iter().find(|e| e.ident == "Price").unwrap();
    assert_eq!(price.text_type.as_deref(), Some("Decimal"));

    let line = complex(module, "LineItem");
    assert_eq!(line.elements[0].type_ident, "Decimal");
    assert!(line.elements[0].plain_text);
}

#[test]
fn test_unknown_builtin_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(
        &dir,
        "schema.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="refs" type="xs:ENTITIES"/>
           </xs:schema>"#,
    );
    let mut workspace = Workspace::new(ResolverConfig::default());
    let err = workspace.load(&path).unwrap_err();
    assert!(matches!(err, Error::UnknownPrimitive { name } if name == "ENTITIES"));
}

#[test]
fn test_unknown_prefix_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(
        &dir,
        "schema.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="thing" type="nope:thing"/>
           </xs:schema>"#,
    );
    let mut workspace = Workspace::new(ResolverConfig::default());
    let err = workspace.load(&path).unwrap_err();
    assert!(matches!(err, Error::UnknownPrefix { prefix, .. } if prefix == "nope"));
}

#[test]
fn test_inline_types_are_hoisted_with_parent_derived_names() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="platform">
               <xs:complexType>
                 <xs:sequence>
                   <xs:element name="remark" maxOccurs="unbounded">
                     <xs:complexType>
                       <xs:sequence>
                         <xs:element name="text" type="xs:string"/>
                       </xs:sequence>
                     </xs:complexType>
                   </xs:element>
                 </xs:sequence>
               </xs:complexType>
             </xs:element>
           </xs:schema>"#,
    );

    let module = &model.modules[0];
    let idents: Vec<&str> = module.elements.iter().map(|e| e.ident.as_str()).collect();
    assert_eq!(idents, ["Platform", "PlatformRemark"]);

    let platform = &module.elements[0];
    assert_eq!(platform.elements[0].ident, "Remark");
    assert_eq!(platform.elements[0].type_ident, "PlatformRemark");
    assert_eq!(platform.elements[0].max_occurs, MaxOccurs::Unbounded);
    assert!(!platform.elements[0].plain_text);

    // The hoisted struct keeps its lexical XML name.
    assert_eq!(module.elements[1].xml_name, "remark");
    assert!(module.elements[1].elements[0].plain_text);
}

#[test]
fn test_enumerated_simple_types_are_exported() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:simpleType name="operatorEnumeration">
               <xs:restriction base="xs:string">
                 <xs:enumeration value="AND"/>
                 <xs:enumeration value="OR"/>
               </xs:restriction>
             </xs:simpleType>
             <xs:simpleType name="version">
               <xs:restriction base="t:operatorEnumeration"/>
             </xs:simpleType>
           </xs:schema>"#,
    );

    let module = &model.modules[0];
    let operator = &module.simple_types[0];
    assert_eq!(operator.ident, "OperatorEnumeration");
    assert_eq!(operator.base_type, "String");
    // All-caps literals are lowercased before deriving the ident.
    let values: Vec<&str> = operator.enums.iter().map(|e| e.ident.as_str()).collect();
    assert_eq!(values, ["And", "Or"]);

    // Restriction chains bottom out at the same primitive.
    assert_eq!(module.simple_types[1].base_type, "String");
}

#[test]
fn test_export_is_deterministic() {
    let body = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
           xmlns:t="urn:t" targetNamespace="urn:t">
         <xs:complexType name="holder">
           <xs:sequence>
             <xs:element name="id" type="xs:string"/>
             <xs:element name="Id" type="xs:string"/>
             <xs:element name="name" type="xs:string"/>
           </xs:sequence>
         </xs:complexType>
         <xs:element name="holder" type="t:holder"/>
       </xs:schema>"#;

    // Resolve the same on-disk document twice so the embedded source_path
    // is identical and the assertion exercises determinism alone.
    let dir = TempDir::new().unwrap();
    let path = write_schema(&dir, "schema.xsd", body);
    let resolve = || {
        let mut workspace = Workspace::new(ResolverConfig::default());
        workspace.load(&path).unwrap();
        workspace.export().unwrap()
    };

    let first = serde_json::to_string(&resolve()).unwrap();
    let second = serde_json::to_string(&resolve()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_type_sharing_an_element_ident_is_not_exported_twice() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="holder">
               <xs:sequence>
                 <xs:element name="name" type="xs:string"/>
               </xs:sequence>
             </xs:complexType>
             <xs:element name="holder" type="t:holder"/>
           </xs:schema>"#,
    );

    let module = &model.modules[0];
    assert_eq!(module.elements.len(), 1);
    assert_eq!(module.elements[0].ident, "Holder");
    assert!(module.complex_types.is_empty());
}

#[test]
fn test_restriction_composes_base_attributes() {
    let model = resolve_one(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="base-type">
               <xs:attribute name="id" type="xs:string"/>
               <xs:attribute name="lang" type="xs:string"/>
             </xs:complexType>
             <xs:complexType name="narrow-type">
               <xs:complexContent>
                 <xs:restriction base="t:base-type">
                   <xs:attribute name="status" type="xs:string"/>
                 </xs:restriction>
               </xs:complexContent>
             </xs:complexType>
           </xs:schema>"#,
    );

    let narrow = complex(&model.modules[0], "NarrowType");
    let attrs: Vec<&str> = narrow.attributes.iter().map(|a| a.xml_name.as_str()).collect();
    // Base attributes first, then the restriction's own, as for extension.
    assert_eq!(attrs, ["id", "lang", "status"]);
}

#[test]
fn test_attribute_ref_with_own_type_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(
        &dir,
        "schema.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:attribute name="marker" type="xs:string"/>
             <xs:complexType name="holder">
               <xs:attribute ref="t:marker" type="xs:string"/>
             </xs:complexType>
           </xs:schema>"#,
    );
    let mut workspace = Workspace::new(ResolverConfig::default());
    let err = workspace.load(&path).unwrap_err();
    assert!(matches!(err, Error::Malformed { .. }), "got: {err}");
}

#[test]
fn test_missing_target_namespace_defaults_to_package_name() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let first = write_schema(
        &dir_a,
        "common.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="alpha" type="xs:string"/>
           </xs:schema>"#,
    );
    let second = write_schema(
        &dir_b,
        "common.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
             <xs:element name="beta" type="xs:string"/>
           </xs:schema>"#,
    );

    let mut workspace = Workspace::new(ResolverConfig::default());
    let first_id = workspace.load(&first).unwrap();
    let second_id = workspace.load(&second).unwrap();
    // Both documents default to the namespace 'common', so the second is a
    // continuation of the first.
    assert_eq!(first_id, second_id);

    let model = workspace.export().unwrap();
    assert_eq!(model.modules.len(), 1);
    assert_eq!(model.modules[0].target_namespace, "common");
    assert_eq!(model.modules[0].package, "common");
    let mut idents: Vec<&str> = model.modules[0]
        .elements
        .iter()
        .map(|e| e.ident.as_str())
        .collect();
    idents.sort_unstable();
    assert_eq!(idents, ["Alpha", "Beta"]);
}

#[test]
fn test_top_level_element_ref_borrows_the_declared_name() {
    let dir = TempDir::new().unwrap();
    write_schema(
        &dir,
        "a.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:a="urn:a" targetNamespace="urn:a">
             <xs:element name="root" type="xs:string"/>
           </xs:schema>"#,
    );
    let b = write_schema(
        &dir,
        "b.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:a="urn:a" xmlns:b="urn:b" targetNamespace="urn:b">
             <xs:import namespace="urn:a" schemaLocation="a.xsd"/>
             <xs:element ref="a:root"/>
           </xs:schema>"#,
    );

    let mut workspace = Workspace::new(ResolverConfig::default());
    workspace.load(&b).unwrap();
    let model = workspace.export().unwrap();

    let module_b = model.modules.iter().find(|m| m.package == "b").unwrap();
    assert_eq!(module_b.elements.len(), 1);
    assert_eq!(module_b.elements[0].ident, "Root");
    assert_eq!(module_b.elements[0].xml_name, "root");
    assert_eq!(module_b.elements[0].text_type.as_deref(), Some("String"));
}

#[test]
fn test_circular_derivation_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_schema(
        &dir,
        "schema.xsd",
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:t" targetNamespace="urn:t">
             <xs:complexType name="ouroboros">
               <xs:complexContent>
                 <xs:extension base="t:ouroboros">
                   <xs:attribute name="x" type="xs:string"/>
                 </xs:extension>
               </xs:complexContent>
             </xs:complexType>
             <xs:element name="snake" type="t:ouroboros"/>
           </xs:schema>"#,
    );
    let mut workspace = Workspace::new(ResolverConfig::default());
    workspace.load(&path).unwrap();
    let err = workspace.export().unwrap_err();
    assert!(matches!(err, Error::CircularDerivation { name } if name == "ouroboros"));
}
