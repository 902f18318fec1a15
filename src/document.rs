//! A compilation unit: its import list and defined types.
//!
//! The document drives the pipeline ordering: register types, resolve every
//! specifier through the imports, autofill enum backing types, then run the
//! grand validation pass. Resolution and validation never stop at the first
//! failing type.

use crate::ast::{Location, Node};
use crate::decl::DefinedType;
use crate::diagnostics::{Diagnostics, ErrorCode};
use crate::typenames::Typenames;
use crate::types::{Backend, TypeSpecifier};
use crate::writer::CodeWriter;

/// One `import` statement.
#[derive(Debug, Clone)]
pub struct Import {
    location: Location,
    needed_class: String,
}

impl Import {
    pub fn new(location: Location, needed_class: impl Into<String>) -> Self {
        Self {
            location,
            needed_class: needed_class.into(),
        }
    }

    pub fn needed_class(&self) -> &str {
        &self.needed_class
    }
}

impl Node for Import {
    fn location(&self) -> &Location {
        &self.location
    }
}

#[derive(Debug)]
pub struct Document {
    imports: Vec<Import>,
    types: Vec<DefinedType>,
}

impl Document {
    pub fn new(imports: Vec<Import>, types: Vec<DefinedType>) -> Self {
        Self { imports, types }
    }

    pub fn imports(&self) -> &[Import] {
        &self.imports
    }

    pub fn defined_types(&self) -> &[DefinedType] {
        &self.types
    }

    /// Expands a written name to a fully qualified one via the imports:
    ///   - `SimpleName` with `import p.SimpleName` becomes `p.SimpleName`
    ///   - `Outer.Inner` with `import p.Outer` becomes `p.Outer`
    ///   - `p.SimpleName` stays as is
    /// An unmatched name passes through unchanged; `None` means two imports
    /// claimed the same simple name.
    pub fn resolve_name(&self, unresolved_name: &str, diag: &mut Diagnostics) -> Option<String> {
        resolve_with_imports(&self.imports, unresolved_name, diag)
    }

    /// Resolves every type specifier in the document, including generic
    /// type parameters, then autofills enum backing types. Keeps going past
    /// failures so one pass reports every unresolved name.
    pub fn resolve(&mut self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let imports = &self.imports;
        let mut ok = true;
        for defined in &mut self.types {
            defined.for_each_specifier_mut(&mut |spec| {
                ok &= resolve_specifier(spec, imports, typenames, diag);
            });
        }
        for defined in &mut self.types {
            if let Some(e) = defined.as_enum_mut() {
                ok &= e.autofill(typenames, diag);
            }
        }
        ok
    }

    /// Validates every defined type. All diagnostics accumulate; the return
    /// value is the overall verdict.
    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        for defined in &self.types {
            ok &= defined.check_valid(typenames, diag);
        }
        ok
    }

    /// The backend-gated pass over every defined type.
    pub fn language_specific_check_valid(
        &self,
        typenames: &Typenames,
        backend: Backend,
        diag: &mut Diagnostics,
    ) -> bool {
        let mut ok = true;
        for defined in &self.types {
            ok &= defined.language_specific_check_valid(typenames, backend, diag);
        }
        ok
    }

    pub fn dump(&self, writer: &mut CodeWriter, typenames: &Typenames) {
        for defined in &self.types {
            defined.dump(writer, typenames);
        }
    }
}

fn resolve_with_imports(
    imports: &[Import],
    unresolved_name: &str,
    diag: &mut Diagnostics,
) -> Option<String> {
    let class_name = unresolved_name
        .split('.')
        .next()
        .unwrap_or(unresolved_name);
    let mut canonical_name = String::new();
    for import in imports {
        let fq_name = import.needed_class();
        let imported_type_name = fq_name.rsplit('.').next().unwrap_or(fq_name);
        if imported_type_name == class_name {
            if !canonical_name.is_empty() && canonical_name != fq_name {
                diag.error(
                    import.location(),
                    ErrorCode::AmbiguousImport,
                    format!("Ambiguous type: {} vs. {}", canonical_name, fq_name),
                );
                return None;
            }
            canonical_name = fq_name.to_string();
        }
    }
    if canonical_name.is_empty() {
        return Some(unresolved_name.to_string());
    }
    Some(canonical_name)
}

fn resolve_specifier(
    spec: &mut TypeSpecifier,
    imports: &[Import],
    typenames: &Typenames,
    diag: &mut Diagnostics,
) -> bool {
    let mut ok = true;
    for param in spec.type_parameters_mut() {
        ok &= resolve_specifier(param, imports, typenames, diag);
    }
    let candidate = match resolve_with_imports(imports, spec.unresolved_name(), diag) {
        Some(candidate) => candidate,
        None => return false,
    };
    if !spec.resolve_as(&candidate, typenames) {
        diag.error(
            spec.location(),
            ErrorCode::UnresolvedType,
            format!("Failed to resolve '{}'", spec.unresolved_name()),
        );
        ok = false;
    }
    ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;

    fn loc() -> Location {
        Location::internal()
    }

    fn doc_with_imports(imports: &[&str]) -> Document {
        let imports = imports.iter().map(|i| Import::new(loc(), *i)).collect();
        Document::new(imports, vec![])
    }

    #[test]
    fn simple_names_expand_through_imports() {
        let doc = doc_with_imports(&["com.example.Foo"]);
        let mut diag = Diagnostics::new();
        assert_eq!(
            doc.resolve_name("Foo", &mut diag).as_deref(),
            Some("com.example.Foo")
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn nested_names_resolve_through_the_outer_import() {
        let doc = doc_with_imports(&["com.example.Outer"]);
        let mut diag = Diagnostics::new();
        assert_eq!(
            doc.resolve_name("Outer.Inner", &mut diag).as_deref(),
            Some("com.example.Outer")
        );
    }

    #[test]
    fn unmatched_names_pass_through_unchanged() {
        let doc = doc_with_imports(&["com.example.Foo"]);
        let mut diag = Diagnostics::new();
        assert_eq!(
            doc.resolve_name("com.other.Bar", &mut diag).as_deref(),
            Some("com.other.Bar")
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn conflicting_imports_are_ambiguous() {
        let doc = doc_with_imports(&["com.a.Foo", "com.b.Foo"]);
        let mut diag = Diagnostics::new();
        assert_eq!(doc.resolve_name("Foo", &mut diag), None);
        assert_eq!(
            diag.kinds(),
            vec![DiagnosticKind::Error(ErrorCode::AmbiguousImport)]
        );
        let message = diag.iter().next().map(|d| d.message.clone()).unwrap();
        assert_eq!(message, "Ambiguous type: com.a.Foo vs. com.b.Foo");
    }

    #[test]
    fn repeated_identical_imports_are_not_ambiguous() {
        let doc = doc_with_imports(&["com.a.Foo", "com.a.Foo"]);
        let mut diag = Diagnostics::new();
        assert_eq!(
            doc.resolve_name("Foo", &mut diag).as_deref(),
            Some("com.a.Foo")
        );
        assert!(diag.is_empty());
    }
}
