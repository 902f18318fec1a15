//! End-to-end pipeline tests: register defined types, resolve specifiers
//! through imports, autofill enum backings, and run the validation pass.

use std::collections::BTreeMap;

use ridl::annotation::Annotation;
use ridl::ast::Location;
use ridl::decl::{
    DefinedType, EnumDecl, Enumerator, InterfaceDecl, Parcelable, StructuredParcelable, UnionDecl,
};
use ridl::diagnostics::{AdvisoryKind, DiagnosticKind, Diagnostics, ErrorCode};
use ridl::document::{Document, Import};
use ridl::members::{Argument, Direction, Member, Method, Variable};
use ridl::typenames::Typenames;
use ridl::types::{Backend, TypeSpecifier};
use ridl::value::ConstExpr;
use ridl::writer::CodeWriter;

fn loc() -> Location {
    Location::internal()
}

fn spec(name: &str) -> TypeSpecifier {
    TypeSpecifier::new(loc(), name, false, None, "")
}

fn annotation(name: &str, params: &[(&str, ConstExpr)]) -> Annotation {
    let map: BTreeMap<String, ConstExpr> = params
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Annotation::parse(loc(), name, map).expect("known annotation")
}

fn enum_decl(name: &str, annotations: Vec<Annotation>, values: &[(&str, Option<i64>)]) -> EnumDecl {
    let enumerators = values
        .iter()
        .map(|(n, v)| Enumerator::new(loc(), *n, v.map(ConstExpr::integral), ""))
        .collect();
    EnumDecl::new(loc(), name, "p", "", annotations, enumerators)
}

/// Runs the whole pipeline over one document and returns the verdict plus
/// the accumulated diagnostics.
fn compile(mut doc: Document) -> (bool, Diagnostics, Document, Typenames) {
    let mut diag = Diagnostics::new();
    let mut tn = Typenames::new();
    let mut ok = tn.add_document(&doc, &mut diag);
    ok &= doc.resolve(&tn, &mut diag);
    ok &= doc.check_valid(&tn, &mut diag);
    (ok, diag, doc, tn)
}

#[test]
fn enum_typed_field_with_reference_default_compiles() {
    let field = Variable::with_default(loc(), spec("Kind"), "kind", ConstExpr::reference("Kind.A"));
    let parcelable = StructuredParcelable::new(
        loc(),
        "State",
        "p",
        "",
        vec![],
        None,
        vec![Member::Field(field)],
    );
    let doc = Document::new(
        vec![Import::new(loc(), "p.Kind")],
        vec![
            DefinedType::Enum(enum_decl("Kind", vec![], &[("A", None), ("B", None)])),
            DefinedType::StructuredParcelable(parcelable),
        ],
    );
    let (ok, diag, doc, tn) = compile(doc);
    assert!(ok, "diagnostics: {:?}", diag.kinds());
    assert!(!diag.has_errors());

    // The field's rendered default is decorated with the canonical enum name.
    let decorator =
        |t: &TypeSpecifier, raw: String| ridl::types::decorate_constant(&tn, t, raw);
    let fields = doc.defined_types()[1].fields();
    assert_eq!(fields[0].value_string(&decorator), "p.Kind.A");
}

#[test]
fn backing_annotation_widens_the_enumerator_range() {
    let backing = annotation("Backing", &[("type", ConstExpr::string("int"))]);
    let doc = Document::new(
        vec![],
        vec![DefinedType::Enum(enum_decl(
            "Big",
            vec![backing],
            &[("HUGE", Some(100_000))],
        ))],
    );
    let (ok, diag, doc, _) = compile(doc);
    // 100000 fits int but triggers the nonzero-first advisory.
    assert!(ok, "diagnostics: {:?}", diag.kinds());
    assert!(!diag.has_errors());
    let e = doc.defined_types()[0].as_enum().unwrap();
    assert_eq!(e.backing_type().map(|b| b.name()), Some("int"));
}

#[test]
fn default_byte_backing_rejects_wide_enumerators() {
    let doc = Document::new(
        vec![],
        vec![DefinedType::Enum(enum_decl(
            "Small",
            vec![],
            &[("HUGE", Some(100_000))],
        ))],
    );
    let (ok, diag, _, _) = compile(doc);
    assert!(!ok);
    assert!(diag.kinds().contains(&DiagnosticKind::Error(
        ErrorCode::EnumeratorTypeMismatch
    )));
}

#[test]
fn union_first_enum_member_requires_an_explicit_default() {
    let build = |default: Option<ConstExpr>| {
        let field = match default {
            Some(v) => Variable::with_default(loc(), spec("Kind"), "kind", v),
            None => Variable::new(loc(), spec("Kind"), "kind"),
        };
        Document::new(
            vec![Import::new(loc(), "p.Kind")],
            vec![
                DefinedType::Enum(enum_decl("Kind", vec![], &[("A", None)])),
                DefinedType::Union(UnionDecl::new(
                    loc(),
                    "Value",
                    "p",
                    "",
                    vec![],
                    vec![Member::Field(field)],
                )),
            ],
        )
    };

    let (ok, diag, _, _) = compile(build(None));
    assert!(!ok);
    assert!(diag.kinds().contains(&DiagnosticKind::Error(
        ErrorCode::UnionFirstFieldNeedsDefault
    )));

    let (ok, diag, _, _) = compile(build(Some(ConstExpr::reference("Kind.A"))));
    assert!(ok, "diagnostics: {:?}", diag.kinds());
}

#[test]
fn interfaces_resolve_imported_parcelables_across_documents() {
    let mut diag = Diagnostics::new();
    let mut tn = Typenames::new();

    let mut lib = Document::new(
        vec![],
        vec![DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "Rect",
            "gfx",
            "",
            vec![],
            None,
            vec![Member::Field(Variable::new(loc(), spec("int"), "w"))],
        ))],
    );
    let method = Method::new(
        loc(),
        false,
        spec("void"),
        "draw",
        vec![Argument::with_direction(
            loc(),
            Direction::In,
            spec("Rect"),
            "rect",
        )],
        "",
    );
    let mut app = Document::new(
        vec![Import::new(loc(), "gfx.Rect")],
        vec![DefinedType::Interface(InterfaceDecl::new(
            loc(),
            "ICanvas",
            "app",
            "",
            false,
            vec![],
            vec![Member::Method(method)],
        ))],
    );

    assert!(tn.add_document(&lib, &mut diag));
    assert!(tn.add_document(&app, &mut diag));
    assert!(lib.resolve(&tn, &mut diag));
    assert!(app.resolve(&tn, &mut diag));
    assert!(lib.check_valid(&tn, &mut diag));
    assert!(app.check_valid(&tn, &mut diag));
    assert!(!diag.has_errors());

    let arg_ty = &app.defined_types()[0].methods()[0].arguments()[0];
    assert_eq!(arg_ty.ty().name(), "gfx.Rect");
}

#[test]
fn redefining_a_type_is_reported_at_registration() {
    let make = || {
        DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "Rect",
            "gfx",
            "",
            vec![],
            None,
            vec![],
        ))
    };
    let doc = Document::new(vec![], vec![make(), make()]);
    let mut diag = Diagnostics::new();
    let mut tn = Typenames::new();
    assert!(!tn.add_document(&doc, &mut diag));
    assert_eq!(
        diag.kinds(),
        vec![DiagnosticKind::Error(ErrorCode::DuplicateDefinedType)]
    );
}

#[test]
fn fixed_size_parcelables_reject_variable_size_fields() {
    let fixed = annotation("FixedSize", &[]);
    let doc = Document::new(
        vec![],
        vec![DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "Packet",
            "p",
            "",
            vec![fixed],
            None,
            vec![
                Member::Field(Variable::new(loc(), spec("int"), "id")),
                Member::Field(Variable::new(loc(), spec("String"), "label")),
            ],
        ))],
    );
    let (ok, diag, _, _) = compile(doc);
    assert!(!ok);
    let non_fixed = diag
        .kinds()
        .into_iter()
        .filter(|k| *k == DiagnosticKind::Error(ErrorCode::NonFixedSizeField))
        .count();
    assert_eq!(non_fixed, 1);
}

#[test]
fn validation_is_idempotent() {
    let doc = Document::new(
        vec![],
        vec![DefinedType::Enum(enum_decl(
            "Kind",
            vec![],
            &[("A", Some(3))],
        ))],
    );
    let mut diag = Diagnostics::new();
    let mut tn = Typenames::new();
    let mut doc = doc;
    tn.add_document(&doc, &mut diag);
    doc.resolve(&tn, &mut diag);

    let mut first = Diagnostics::new();
    doc.check_valid(&tn, &mut first);
    let mut second = Diagnostics::new();
    doc.check_valid(&tn, &mut second);
    assert_eq!(first.kinds(), second.kinds());
    assert_eq!(
        first.kinds(),
        vec![DiagnosticKind::Advisory(AdvisoryKind::EnumZero)]
    );
}

#[test]
fn rust_backend_rejects_parcelable_holder_fields() {
    let doc = Document::new(
        vec![],
        vec![DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "Bag",
            "p",
            "",
            vec![],
            None,
            vec![Member::Field(Variable::new(
                loc(),
                spec("ParcelableHolder"),
                "ext",
            ))],
        ))],
    );
    let (ok, diag, doc, tn) = compile(doc);
    assert!(ok, "diagnostics: {:?}", diag.kinds());

    let mut backend_diag = Diagnostics::new();
    assert!(!doc.language_specific_check_valid(&tn, Backend::Rust, &mut backend_diag));
    assert!(backend_diag.kinds().contains(&DiagnosticKind::Error(
        ErrorCode::BackendRestriction
    )));
    assert!(doc.language_specific_check_valid(&tn, Backend::Java, &mut Diagnostics::new()));
}

#[test]
fn dump_round_trips_a_small_document() {
    let method = Method::new(
        loc(),
        true,
        spec("void"),
        "ping",
        vec![Argument::with_direction(
            loc(),
            Direction::In,
            spec("int"),
            "token",
        )],
        "",
    );
    let doc = Document::new(
        vec![],
        vec![DefinedType::Interface(InterfaceDecl::new(
            loc(),
            "IHeartbeat",
            "net",
            "",
            false,
            vec![],
            vec![Member::Method(method)],
        ))],
    );
    let (ok, diag, doc, tn) = compile(doc);
    assert!(ok, "diagnostics: {:?}", diag.kinds());

    let mut w = CodeWriter::new();
    doc.dump(&mut w, &tn);
    assert_eq!(
        w.as_str(),
        "interface IHeartbeat {\n  oneway void ping(in int token);\n}\n"
    );
}

#[test]
fn descriptor_annotation_overrides_the_canonical_name() {
    let descriptor = annotation("Descriptor", &[("value", ConstExpr::string("android.IFoo"))]);
    let iface = InterfaceDecl::new(loc(), "IFoo", "com.example", "", false, vec![descriptor], vec![]);
    assert_eq!(iface.descriptor(), "android.IFoo");
}

#[test]
fn unstructured_parcelables_validate_without_members() {
    let doc = Document::new(
        vec![],
        vec![DefinedType::Parcelable(Parcelable::new(
            loc(),
            "Bundle",
            "os",
            "",
            vec![],
            "\"os/bundle.h\"",
            None,
            vec![],
        ))],
    );
    let (ok, diag, doc, tn) = compile(doc);
    assert!(ok, "diagnostics: {:?}", diag.kinds());
    assert!(doc.language_specific_check_valid(&tn, Backend::Cpp, &mut Diagnostics::new()));
}
