//! Diagnostic-surface tests: accumulation across a whole document, stable
//! machine codes, and the JSON dump.

use miette::Diagnostic as _;

use ridl::ast::{Location, Point};
use ridl::decl::{DefinedType, InterfaceDecl, StructuredParcelable};
use ridl::diagnostics::{DiagnosticKind, Diagnostics, ErrorCode};
use ridl::document::Document;
use ridl::members::{Member, Method, Variable};
use ridl::typenames::Typenames;
use ridl::types::TypeSpecifier;

fn loc() -> Location {
    Location::new("doc.ridl", Point::new(2, 1), Point::new(2, 10))
}

fn spec(name: &str) -> TypeSpecifier {
    TypeSpecifier::new(loc(), name, false, None, "")
}

#[test]
fn one_pass_reports_problems_in_every_type() {
    // A parcelable with a void field and an interface with a oneway method
    // returning a value. Neither failure masks the other.
    let parcelable = StructuredParcelable::new(
        loc(),
        "Broken",
        "p",
        "",
        vec![],
        None,
        vec![Member::Field(Variable::new(loc(), spec("void"), "nothing"))],
    );
    let iface = InterfaceDecl::new(
        loc(),
        "IBroken",
        "p",
        "",
        false,
        vec![],
        vec![Member::Method(Method::new(
            loc(),
            true,
            spec("int"),
            "get",
            vec![],
            "",
        ))],
    );
    let mut doc = Document::new(
        vec![],
        vec![
            DefinedType::StructuredParcelable(parcelable),
            DefinedType::Interface(iface),
        ],
    );

    let mut diag = Diagnostics::new();
    let mut tn = Typenames::new();
    tn.add_document(&doc, &mut diag);
    doc.resolve(&tn, &mut diag);
    assert!(!doc.check_valid(&tn, &mut diag));

    let kinds = diag.kinds();
    assert!(kinds.contains(&DiagnosticKind::Error(ErrorCode::VoidDeclaration)));
    assert!(kinds.contains(&DiagnosticKind::Error(ErrorCode::OnewayReturn)));
}

#[test]
fn diagnostics_carry_stable_codes_and_locations() {
    let mut diag = Diagnostics::new();
    diag.error(&loc(), ErrorCode::EmptyUnion, "The union 'U' has no fields.");

    let d = diag.iter().next().unwrap();
    assert_eq!(d.code().unwrap().to_string(), "ridl::validation::empty_union");
    assert_eq!(d.severity(), Some(miette::Severity::Error));
    assert_eq!(d.to_string(), "doc.ridl:2.1-10: The union 'U' has no fields.");
}

#[test]
fn json_dump_is_an_array_of_structured_entries() {
    let mut diag = Diagnostics::new();
    diag.error(&loc(), ErrorCode::DuplicateField, "'P' has duplicate field name 'x'");

    let json = diag.to_json();
    let entries = json.as_array().expect("array of diagnostics");
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0]["message"],
        serde_json::json!("'P' has duplicate field name 'x'")
    );
    assert_eq!(entries[0]["kind"]["Error"], serde_json::json!("DuplicateField"));
}
