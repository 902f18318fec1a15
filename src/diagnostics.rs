//! Accumulate-and-continue diagnostics
//!
//! Validation never stops at the first problem: every `check_valid` routine
//! threads an explicit [`Diagnostics`] context and keeps checking siblings
//! after a failure, so one compilation attempt surfaces the full problem set.
//! Two severities exist: hard errors block code generation, advisories are
//! style/compatibility recommendations that do not.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Location;

/// Stable machine-readable code for every hard error the validators emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    // Annotation framework
    UnrecognizedAnnotation,
    UnsupportedParameter,
    ReferenceNotAllowed,
    InvalidParameterValue,
    MissingRequiredParameter,
    AnnotationNotSupportedHere,
    DuplicateAnnotation,

    // Type resolution and specifier rules
    UnresolvedType,
    InvalidGenericType,
    Utf8Restriction,
    VoidUsage,
    ArrayRestriction,
    NullabilityRestriction,
    BackendRestriction,
    MissingNativeHeader,
    DuplicateTypeParameter,

    // Members
    VoidDeclaration,
    InvalidDefaultValue,
    InvalidConstantValue,
    UnsupportedConstantType,

    // Declaration kinds
    DuplicateField,
    DuplicateConstant,
    DuplicateGetter,
    NonImmutableField,
    NonFixedSizeField,
    EmptyUnion,
    UnionFirstFieldNeedsDefault,
    HolderNotAllowed,
    EnumHasMembers,
    MissingBackingType,
    EnumeratorTypeMismatch,

    // Interfaces
    OnewayReturn,
    OnewayOutParameter,
    DuplicateArgument,
    MissingDirection,
    InvalidDirection,
    ReservedArgumentName,
    DuplicateMethod,
    ReservedMethod,

    // Documents
    AmbiguousImport,
    DuplicateDefinedType,
}

impl ErrorCode {
    /// Suffix used in diagnostic codes (`ridl::validation::<suffix>`).
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::UnrecognizedAnnotation => "unrecognized_annotation",
            Self::UnsupportedParameter => "unsupported_parameter",
            Self::ReferenceNotAllowed => "reference_not_allowed",
            Self::InvalidParameterValue => "invalid_parameter_value",
            Self::MissingRequiredParameter => "missing_required_parameter",
            Self::AnnotationNotSupportedHere => "annotation_not_supported_here",
            Self::DuplicateAnnotation => "duplicate_annotation",
            Self::UnresolvedType => "unresolved_type",
            Self::InvalidGenericType => "invalid_generic_type",
            Self::Utf8Restriction => "utf8_restriction",
            Self::VoidUsage => "void_usage",
            Self::ArrayRestriction => "array_restriction",
            Self::NullabilityRestriction => "nullability_restriction",
            Self::BackendRestriction => "backend_restriction",
            Self::MissingNativeHeader => "missing_native_header",
            Self::DuplicateTypeParameter => "duplicate_type_parameter",
            Self::VoidDeclaration => "void_declaration",
            Self::InvalidDefaultValue => "invalid_default_value",
            Self::InvalidConstantValue => "invalid_constant_value",
            Self::UnsupportedConstantType => "unsupported_constant_type",
            Self::DuplicateField => "duplicate_field",
            Self::DuplicateConstant => "duplicate_constant",
            Self::DuplicateGetter => "duplicate_getter",
            Self::NonImmutableField => "non_immutable_field",
            Self::NonFixedSizeField => "non_fixed_size_field",
            Self::EmptyUnion => "empty_union",
            Self::UnionFirstFieldNeedsDefault => "union_first_field_needs_default",
            Self::HolderNotAllowed => "holder_not_allowed",
            Self::EnumHasMembers => "enum_has_members",
            Self::MissingBackingType => "missing_backing_type",
            Self::EnumeratorTypeMismatch => "enumerator_type_mismatch",
            Self::OnewayReturn => "oneway_return",
            Self::OnewayOutParameter => "oneway_out_parameter",
            Self::DuplicateArgument => "duplicate_argument",
            Self::MissingDirection => "missing_direction",
            Self::InvalidDirection => "invalid_direction",
            Self::ReservedArgumentName => "reserved_argument_name",
            Self::DuplicateMethod => "duplicate_method",
            Self::ReservedMethod => "reserved_method",
            Self::AmbiguousImport => "ambiguous_import",
            Self::DuplicateDefinedType => "duplicate_defined_type",
        }
    }
}

/// The fixed set of non-fatal advisory kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisoryKind {
    /// The first enumerator of an enum should be zero.
    EnumZero,
    /// Interface names should start with `I`.
    InterfaceName,
    /// `inout` parameters are confusing; prefer `in` + `out` pairs.
    InoutParameter,
}

impl AdvisoryKind {
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::EnumZero => "enum_zero",
            Self::InterfaceName => "interface_name",
            Self::InoutParameter => "inout_parameter",
        }
    }
}

/// What a diagnostic is: a hard error or an advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    Error(ErrorCode),
    Advisory(AdvisoryKind),
}

impl DiagnosticKind {
    pub fn is_error(&self) -> bool {
        matches!(self, DiagnosticKind::Error(_))
    }

    pub fn code(&self) -> String {
        match self {
            DiagnosticKind::Error(c) => format!("ridl::validation::{}", c.code_suffix()),
            DiagnosticKind::Advisory(a) => format!("ridl::advisory::{}", a.code_suffix()),
        }
    }
}

/// A single reported problem: where, what, and the rendered message.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{location}: {message}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub location: Location,
    pub message: String,
}

impl MietteDiagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.kind {
            DiagnosticKind::Error(_) => miette::Severity::Error,
            DiagnosticKind::Advisory(_) => miette::Severity::Advice,
        })
    }
}

/// The diagnostic-collecting context threaded through every validation call.
///
/// Not a global sink: tests construct one, run a validator, and assert on
/// the exact diagnostic multiset.
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, location: &Location, code: ErrorCode, message: impl Into<String>) {
        self.items.push(Diagnostic {
            kind: DiagnosticKind::Error(code),
            location: location.clone(),
            message: message.into(),
        });
    }

    pub fn advise(&mut self, location: &Location, kind: AdvisoryKind, message: impl Into<String>) {
        self.items.push(Diagnostic {
            kind: DiagnosticKind::Advisory(kind),
            location: location.clone(),
            message: message.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.kind.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.kind.is_error()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// The kinds in emission order, for multiset assertions in tests.
    pub fn kinds(&self) -> Vec<DiagnosticKind> {
        self.items.iter().map(|d| d.kind).collect()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Machine-readable dump of the accumulated diagnostics.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.items).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Point;

    fn loc() -> Location {
        Location::new("x.ridl", Point::new(1, 1), Point::new(1, 4))
    }

    #[test]
    fn errors_and_advisories_are_counted_separately() {
        let mut diag = Diagnostics::new();
        diag.error(&loc(), ErrorCode::DuplicateField, "dup");
        diag.advise(&loc(), AdvisoryKind::EnumZero, "should be zero");
        assert!(diag.has_errors());
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.len(), 2);
    }

    #[test]
    fn diagnostic_display_is_location_prefixed() {
        let mut diag = Diagnostics::new();
        diag.error(&loc(), ErrorCode::EmptyUnion, "the union has no fields");
        let rendered = diag.iter().next().unwrap().to_string();
        assert_eq!(rendered, "x.ridl:1.1-4: the union has no fields");
    }

    #[test]
    fn advisories_alone_do_not_fail_compilation() {
        let mut diag = Diagnostics::new();
        diag.advise(&loc(), AdvisoryKind::InterfaceName, "should start with I");
        assert!(!diag.has_errors());
        assert_eq!(
            diag.kinds(),
            vec![DiagnosticKind::Advisory(AdvisoryKind::InterfaceName)]
        );
    }

    #[test]
    fn miette_codes_are_stable_slugs() {
        use miette::Diagnostic as _;
        let mut diag = Diagnostics::new();
        diag.error(&loc(), ErrorCode::AmbiguousImport, "ambiguous");
        let d = diag.iter().next().unwrap();
        assert_eq!(
            d.code().unwrap().to_string(),
            "ridl::validation::ambiguous_import"
        );
        assert_eq!(d.severity(), Some(miette::Severity::Error));
    }
}
