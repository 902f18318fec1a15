//! Type specifiers and the resolution/validation rules that govern them.
//!
//! A `TypeSpecifier` is a (possibly generic, possibly array) reference to a
//! type by name. It starts unresolved, is resolved against the type-name
//! table exactly once, and then carries the canonical dotted name plus a
//! handle to the defined type it names (`None` for built-ins/primitives).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotatable, Annotation, AnnotationKind};
use crate::ast::{has_hide_comment, Location, Node};
use crate::diagnostics::{Diagnostics, ErrorCode};
use crate::typenames::{DefinedTypeId, Typenames};

/// Target language backends. The backend-gated checks in
/// [`TypeSpecifier::language_specific_check_valid`] are kept separate from
/// the backend-agnostic pass; the set of legal constructs is meant to
/// converge toward backend-independence over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    Java,
    Cpp,
    Ndk,
    Rust,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Java => "java",
            Backend::Cpp => "cpp",
            Backend::Ndk => "ndk",
            Backend::Rust => "rust",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone)]
struct Resolution {
    canonical: String,
    defined: Option<DefinedTypeId>,
}

/// A reference to a type, as written in source.
#[derive(Debug, Clone)]
pub struct TypeSpecifier {
    location: Location,
    annotations: Vec<Annotation>,
    unresolved_name: String,
    is_array: bool,
    type_params: Option<Vec<TypeSpecifier>>,
    comments: String,
    resolution: Option<Resolution>,
}

impl TypeSpecifier {
    pub fn new(
        location: Location,
        unresolved_name: impl Into<String>,
        is_array: bool,
        type_params: Option<Vec<TypeSpecifier>>,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            location,
            annotations: Vec::new(),
            unresolved_name: unresolved_name.into(),
            is_array,
            type_params,
            comments: comments.into(),
            resolution: None,
        }
    }

    pub fn set_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations = annotations;
    }

    /// Canonical dotted name once resolved, the written name before that.
    pub fn name(&self) -> &str {
        match &self.resolution {
            Some(r) => &r.canonical,
            None => &self.unresolved_name,
        }
    }

    pub fn unresolved_name(&self) -> &str {
        &self.unresolved_name
    }

    pub fn is_array(&self) -> bool {
        self.is_array
    }

    pub fn is_generic(&self) -> bool {
        self.type_params.is_some()
    }

    pub fn type_parameters(&self) -> &[TypeSpecifier] {
        self.type_params.as_deref().unwrap_or(&[])
    }

    pub(crate) fn type_parameters_mut(&mut self) -> &mut [TypeSpecifier] {
        self.type_params.as_deref_mut().unwrap_or(&mut [])
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn is_hidden(&self) -> bool {
        has_hide_comment(&self.comments)
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }

    /// Handle to the defined type this specifier names, once resolved.
    /// `None` for primitives and other built-ins.
    pub fn defined_type(&self) -> Option<DefinedTypeId> {
        self.resolution.as_ref().and_then(|r| r.defined)
    }

    /// The element type of an array specifier: the same specifier with the
    /// array flag cleared. Arrays of generic types are a grammar error, so
    /// both preconditions are programming contracts.
    pub fn array_base(&self) -> TypeSpecifier {
        assert!(self.is_array, "array_base() on non-array '{}'", self.name());
        assert!(
            !self.is_generic(),
            "array_base() on generic '{}'",
            self.name()
        );
        let mut base = self.clone();
        base.is_array = false;
        base
    }

    /// Resolves this specifier against the type-name table. May be called
    /// exactly once per instance; re-resolution is a programming error.
    pub fn resolve(&mut self, typenames: &Typenames) -> bool {
        let name = self.unresolved_name.clone();
        self.resolve_as(&name, typenames)
    }

    /// Resolves using `candidate` (the import-expanded name) instead of the
    /// written name. Used by document-level resolution.
    pub(crate) fn resolve_as(&mut self, candidate: &str, typenames: &Typenames) -> bool {
        assert!(
            self.resolution.is_none(),
            "type '{}' is already resolved",
            self.unresolved_name
        );
        let result = typenames.resolve_typename(candidate);
        if result.is_resolved {
            self.resolution = Some(Resolution {
                canonical: result.canonical_name,
                defined: result.defined_type,
            });
        }
        result.is_resolved
    }

    /// Canonical name, `<param,param>` if generic, `[]` if array. Used in
    /// diagnostics and method-overload uniqueness.
    pub fn signature(&self) -> String {
        let mut ret = self.name().to_string();
        if self.is_generic() {
            let params: Vec<String> = self
                .type_parameters()
                .iter()
                .map(|p| p.signature())
                .collect();
            ret.push('<');
            ret.push_str(&params.join(","));
            ret.push('>');
        }
        if self.is_array {
            ret.push_str("[]");
        }
        ret
    }

    /// Signature prefixed with the sorted annotation rendering.
    pub fn to_code(&self) -> String {
        let annotations = self.annotations_code();
        if annotations.is_empty() {
            self.signature()
        } else {
            format!("{} {}", annotations, self.signature())
        }
    }

    /// Backend-agnostic validity: annotation rules, generic containment and
    /// arity, utf8/void/array/nullability restrictions. Each rule group is
    /// reported independently.
    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = self.check_annotations(diag);

        if self.is_generic() {
            ok &= self.check_generic(typenames, diag);
        }

        let is_generic_string_list = self.name() == "List"
            && self.is_generic()
            && self.type_parameters().len() == 1
            && self.type_parameters()[0].name() == "String";
        if self.is_utf8_in_cpp() && self.name() != "String" && !is_generic_string_list {
            diag.error(
                &self.location,
                ErrorCode::Utf8Restriction,
                "@utf8InCpp can only be used on String, String[], and List<String>.",
            );
            ok = false;
        }

        if self.name() == "void" && (self.is_array || self.is_nullable() || self.is_utf8_in_cpp()) {
            diag.error(
                &self.location,
                ErrorCode::VoidUsage,
                "void type cannot be an array or nullable or utf8 string",
            );
            ok = false;
        }

        if self.is_array {
            if typenames
                .try_get_defined_type(self.name())
                .is_some_and(|e| e.is_interface())
            {
                diag.error(
                    &self.location,
                    ErrorCode::ArrayRestriction,
                    "Binder type cannot be an array",
                );
                ok = false;
            }
            if self.name() == "ParcelableHolder" {
                diag.error(
                    &self.location,
                    ErrorCode::HolderNotAllowed,
                    "Arrays of ParcelableHolder are not supported.",
                );
                ok = false;
            }
        }

        if self.is_nullable() {
            if Typenames::is_primitive_typename(self.name()) && !self.is_array {
                diag.error(
                    &self.location,
                    ErrorCode::NullabilityRestriction,
                    "Primitive type cannot get nullable annotation",
                );
                ok = false;
            }
            if typenames.get_enum(self).is_some() && !self.is_array {
                diag.error(
                    &self.location,
                    ErrorCode::NullabilityRestriction,
                    "Enum type cannot get nullable annotation",
                );
                ok = false;
            }
            if self.name() == "ParcelableHolder" {
                diag.error(
                    &self.location,
                    ErrorCode::HolderNotAllowed,
                    "ParcelableHolder cannot be nullable.",
                );
                ok = false;
            }
        }

        ok
    }

    fn check_generic(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        let name = self.name().to_string();
        let params = self.type_parameters();

        if name == "List" || name == "Map" {
            let has_scalar_param = params.iter().any(|p| {
                Typenames::is_primitive_typename(p.name()) || typenames.get_enum(p).is_some()
            });
            if has_scalar_param {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    "A generic type cannot have any primitive type parameters.",
                );
                ok = false;
            }
        }

        let entry = typenames.try_get_defined_type(&name);
        let user_generic_arity = entry.and_then(|e| e.generic_arity());

        if name == "List" {
            if params.len() != 1 {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    format!(
                        "List can only have one type parameter, but got: '{}'",
                        self.signature()
                    ),
                );
                return false;
            }
            let contained = &params[0];
            let contained_name = contained.name();
            let unsupported = if Typenames::is_builtin_typename(contained_name) {
                !matches!(contained_name, "String" | "IBinder" | "ParcelFileDescriptor")
            } else {
                typenames.get_interface(contained).is_some()
            };
            if unsupported {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    format!(
                        "List<{}> is not supported. List<T> supports parcelable/union, String, \
                         IBinder, and ParcelFileDescriptor.",
                        contained_name
                    ),
                );
                ok = false;
            }
        } else if name == "Map" {
            if !params.is_empty() && params.len() != 2 {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    format!(
                        "Map must have 0 or 2 type parameters, but got '{}'",
                        self.signature()
                    ),
                );
                return false;
            }
            if params.len() == 2 && params[0].name() != "String" {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    format!(
                        "The type of key in map must be String, but it is '{}'",
                        params[0].name()
                    ),
                );
                ok = false;
            }
        } else if let Some(allowed) = user_generic_arity {
            if params.len() != allowed {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidGenericType,
                    format!(
                        "{} must have {} type parameters, but got {}",
                        name,
                        allowed,
                        params.len()
                    ),
                );
                ok = false;
            }
        } else {
            diag.error(
                &self.location,
                ErrorCode::InvalidGenericType,
                format!("{} is not a generic type.", name),
            );
            ok = false;
        }

        ok
    }

    /// The second, backend-gated pass. Applied only when generating for a
    /// concrete backend; kept separable from `check_valid` on purpose.
    pub fn language_specific_check_valid(
        &self,
        typenames: &Typenames,
        backend: Backend,
        diag: &mut Diagnostics,
    ) -> bool {
        let mut ok = true;
        let narrow = matches!(backend, Backend::Ndk | Backend::Rust);

        if narrow && self.is_array && self.name() == "IBinder" {
            diag.error(
                &self.location,
                ErrorCode::BackendRestriction,
                format!("The {} backend does not support array of IBinder", backend),
            );
            ok = false;
        }
        if backend == Backend::Rust && self.name() == "ParcelableHolder" {
            diag.error(
                &self.location,
                ErrorCode::BackendRestriction,
                "The rust backend does not support ParcelableHolder yet.",
            );
            ok = false;
        }
        if narrow && self.is_array && self.is_nullable() {
            if self.name() == "ParcelFileDescriptor" {
                diag.error(
                    &self.location,
                    ErrorCode::BackendRestriction,
                    format!(
                        "The {} backend does not support nullable array of ParcelFileDescriptor",
                        backend
                    ),
                );
                ok = false;
            }
            if typenames
                .try_get_defined_type(self.name())
                .is_some_and(|e| e.is_parcelable())
            {
                diag.error(
                    &self.location,
                    ErrorCode::BackendRestriction,
                    format!(
                        "The {} backend does not support nullable array of parcelable",
                        backend
                    ),
                );
                ok = false;
            }
        }
        if narrow && self.name() == "FileDescriptor" {
            diag.error(
                &self.location,
                ErrorCode::BackendRestriction,
                format!("FileDescriptor isn't supported by the {} backend.", backend),
            );
            ok = false;
        }
        if self.is_generic() && self.name() == "List" && backend == Backend::Ndk {
            if let Some(contained) = self.type_parameters().first() {
                if typenames.get_interface(contained).is_some() {
                    diag.error(
                        &self.location,
                        ErrorCode::BackendRestriction,
                        format!(
                            "List<{}> is not supported. List in NDK doesn't support interface.",
                            contained.name()
                        ),
                    );
                    ok = false;
                }
                if contained.name() == "IBinder" {
                    diag.error(
                        &self.location,
                        ErrorCode::BackendRestriction,
                        "List<IBinder> is not supported. List in NDK doesn't support IBinder.",
                    );
                    ok = false;
                }
            }
        }
        if self.is_array && matches!(self.name(), "List" | "Map" | "CharSequence") {
            diag.error(
                &self.location,
                ErrorCode::BackendRestriction,
                format!("{}[] is not supported.", self.name()),
            );
            ok = false;
        }
        if backend != Backend::Java {
            if self.name() == "List" && !self.is_generic() {
                diag.error(
                    &self.location,
                    ErrorCode::BackendRestriction,
                    "Currently, only the Java backend supports non-generic List.",
                );
                ok = false;
            }
            if matches!(self.name(), "Map" | "CharSequence") {
                diag.error(
                    &self.location,
                    ErrorCode::BackendRestriction,
                    format!("Currently, only Java backend supports {}.", self.name()),
                );
                ok = false;
            }
        }
        ok
    }
}

impl Node for TypeSpecifier {
    fn location(&self) -> &Location {
        &self.location
    }
}

impl Annotatable for TypeSpecifier {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    fn supported_annotations(&self) -> &'static [AnnotationKind] {
        // Return-value annotations are not distinguished from other
        // specifier positions.
        &[
            AnnotationKind::Nullable,
            AnnotationKind::Utf8InCpp,
            AnnotationKind::UnsupportedAppUsage,
            AnnotationKind::Hide,
            AnnotationKind::JavaPassthrough,
        ]
    }
}

/// The default constant-value decorator: enum-typed constants render as
/// `EnumName.MEMBER`, everything else passes through.
pub fn decorate_constant(typenames: &Typenames, ty: &TypeSpecifier, raw: String) -> String {
    if ty.is_array() {
        return raw;
    }
    if let Some(id) = ty.defined_type() {
        let entry = typenames.entry(id);
        assert!(entry.is_enum(), "invalid type for \"{}\"", raw);
        let member = raw.rsplit('.').next().unwrap_or(&raw);
        return format!("{}.{}", ty.name(), member);
    }
    raw
}
