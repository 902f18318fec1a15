//! Annotation framework
//!
//! A closed, process-wide schema registry plus the annotation-instance type
//! that validates itself against its schema, and the `Annotatable` trait
//! that attaches annotation sets to declarations and type specifiers.
//!
//! The registry is a fixed list initialized once; it is not user-extensible
//! and holds no resources.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ast::{Location, Node};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, ErrorCode};
use crate::types::{Backend, TypeSpecifier};
use crate::value::{plain_decorator, ConstExpr, Decorator};

/// Every annotation kind the language knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    Nullable,
    Utf8InCpp,
    SensitiveData,
    VintfStability,
    UnsupportedAppUsage,
    JavaStableParcelable,
    Hide,
    Backing,
    JavaPassthrough,
    JavaDerive,
    JavaOnlyImmutable,
    FixedSize,
    Descriptor,
    RustDerive,
}

impl AnnotationKind {
    /// Source-text name of the annotation, per its schema.
    pub fn name(self) -> &'static str {
        schema_for(self).name
    }
}

/// Registry entry: what an annotation accepts and requires.
#[derive(Debug)]
pub struct Schema {
    pub kind: AnnotationKind,
    pub name: &'static str,
    /// Parameter name to its declared type.
    pub parameters: BTreeMap<&'static str, TypeSpecifier>,
    pub repeatable: bool,
    pub required: &'static [&'static str],
}

fn param_ty(name: &str) -> TypeSpecifier {
    TypeSpecifier::new(Location::internal(), name, false, None, "")
}

fn params(entries: &[(&'static str, &str)]) -> BTreeMap<&'static str, TypeSpecifier> {
    entries.iter().map(|(n, t)| (*n, param_ty(t))).collect()
}

static SCHEMAS: Lazy<Vec<Schema>> = Lazy::new(|| {
    vec![
        Schema {
            kind: AnnotationKind::Nullable,
            name: "nullable",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::Utf8InCpp,
            name: "utf8InCpp",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::SensitiveData,
            name: "SensitiveData",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::VintfStability,
            name: "VintfStability",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::UnsupportedAppUsage,
            name: "UnsupportedAppUsage",
            parameters: params(&[
                ("expectedSignature", "String"),
                ("implicitMember", "String"),
                ("maxTargetSdk", "int"),
                ("publicAlternatives", "String"),
                ("trackingBug", "long"),
            ]),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::JavaStableParcelable,
            name: "JavaOnlyStableParcelable",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::Hide,
            name: "Hide",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::Backing,
            name: "Backing",
            parameters: params(&[("type", "String")]),
            repeatable: false,
            required: &["type"],
        },
        Schema {
            kind: AnnotationKind::JavaPassthrough,
            name: "JavaPassthrough",
            parameters: params(&[("annotation", "String")]),
            repeatable: true,
            required: &["annotation"],
        },
        Schema {
            kind: AnnotationKind::JavaDerive,
            name: "JavaDerive",
            parameters: params(&[("toString", "boolean"), ("equals", "boolean")]),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::JavaOnlyImmutable,
            name: "JavaOnlyImmutable",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::FixedSize,
            name: "FixedSize",
            parameters: BTreeMap::new(),
            repeatable: false,
            required: &[],
        },
        Schema {
            kind: AnnotationKind::Descriptor,
            name: "Descriptor",
            parameters: params(&[("value", "String")]),
            repeatable: false,
            required: &["value"],
        },
        Schema {
            kind: AnnotationKind::RustDerive,
            name: "RustDerive",
            parameters: params(&[
                ("Copy", "boolean"),
                ("Clone", "boolean"),
                ("PartialOrd", "boolean"),
                ("Ord", "boolean"),
                ("PartialEq", "boolean"),
                ("Eq", "boolean"),
                ("Hash", "boolean"),
            ]),
            repeatable: false,
            required: &[],
        },
    ]
});

fn schema_for(kind: AnnotationKind) -> &'static Schema {
    SCHEMAS
        .iter()
        .find(|s| s.kind == kind)
        .unwrap_or_else(|| panic!("no schema registered for {:?}", kind))
}

/// An annotation use: a schema reference plus its raw (unevaluated)
/// parameter map.
#[derive(Debug, Clone)]
pub struct Annotation {
    location: Location,
    schema: &'static Schema,
    parameters: BTreeMap<String, ConstExpr>,
}

impl Annotation {
    /// Binds a written annotation to its schema. The parameter values are
    /// not yet evaluated; `check_valid` does that.
    pub fn parse(
        location: Location,
        name: &str,
        parameters: BTreeMap<String, ConstExpr>,
    ) -> Result<Annotation, Diagnostic> {
        let schema = match SCHEMAS.iter().find(|s| s.name == name) {
            Some(schema) => schema,
            None => {
                let valid: Vec<&str> = SCHEMAS.iter().map(|s| s.name).collect();
                return Err(Diagnostic {
                    kind: DiagnosticKind::Error(ErrorCode::UnrecognizedAnnotation),
                    location,
                    message: format!(
                        "'{}' is not a recognized annotation. It must be one of: {}.",
                        name,
                        valid.join(", ")
                    ),
                });
            }
        };
        Ok(Annotation {
            location,
            schema,
            parameters,
        })
    }

    pub fn kind(&self) -> AnnotationKind {
        self.schema.kind
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn repeatable(&self) -> bool {
        self.schema.repeatable
    }

    /// Validates every supplied parameter against the schema, then checks
    /// that all required parameters are present. Does not short-circuit:
    /// one call surfaces every problem.
    pub fn check_valid(&self, diag: &mut Diagnostics) -> bool {
        let mut success = true;
        for (param_name, value) in &self.parameters {
            let declared = match self.schema.parameters.get(param_name.as_str()) {
                Some(ty) => ty,
                None => {
                    self.report_unsupported_parameter(param_name, diag);
                    success = false;
                    continue;
                }
            };

            if let Some(referenced) = value.first_reference() {
                diag.error(
                    &self.location,
                    ErrorCode::ReferenceNotAllowed,
                    format!(
                        "Value must be a constant expression but contains reference to {}.",
                        referenced
                    ),
                );
                success = false;
                continue;
            }

            if !value.check_valid() || value.value_string(declared, &plain_decorator).is_empty() {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidParameterValue,
                    format!(
                        "Invalid value for parameter {} on annotation {}.",
                        param_name,
                        self.name()
                    ),
                );
                success = false;
            }
        }

        for required in self.schema.required {
            if !self.parameters.contains_key(*required) {
                diag.error(
                    &self.location,
                    ErrorCode::MissingRequiredParameter,
                    format!("Missing '{}' on @{}.", required, self.name()),
                );
                success = false;
            }
        }
        success
    }

    /// Renders every syntactically valid parameter to its display string.
    /// Invalid parameters are diagnosed and skipped; rendering is
    /// best-effort for error-reporting contexts.
    pub fn params(&self, decorator: Decorator, diag: &mut Diagnostics) -> BTreeMap<String, String> {
        let mut rendered = BTreeMap::new();
        for (param_name, value) in &self.parameters {
            let declared = match self.schema.parameters.get(param_name.as_str()) {
                Some(ty) => ty,
                None => {
                    self.report_unsupported_parameter(param_name, diag);
                    continue;
                }
            };
            if !value.check_valid() {
                diag.error(
                    &self.location,
                    ErrorCode::InvalidParameterValue,
                    format!(
                        "Invalid value for parameter {} on annotation {}.",
                        param_name,
                        self.name()
                    ),
                );
                continue;
            }
            rendered.insert(param_name.clone(), value.value_string(declared, decorator));
        }
        rendered
    }

    fn report_unsupported_parameter(&self, param_name: &str, diag: &mut Diagnostics) {
        let supported: Vec<&str> = self.schema.parameters.keys().copied().collect();
        diag.error(
            &self.location,
            ErrorCode::UnsupportedParameter,
            format!(
                "Parameter {} not supported for annotation {}. It must be one of: {}",
                param_name,
                self.name(),
                supported.join(", ")
            ),
        );
    }

    /// The string-typed parameter's content, if present and a string.
    pub fn string_param(&self, name: &str) -> Option<String> {
        match self.parameters.get(name) {
            Some(ConstExpr::Str(s)) => Some(s.clone()),
            _ => None,
        }
    }

    /// The boolean-typed parameter's value, if present and a boolean.
    pub fn bool_param(&self, name: &str) -> Option<bool> {
        match self.parameters.get(name) {
            Some(ConstExpr::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// `@Name` or `@Name(k=v, ...)`. Schema parameters are never
    /// enum-typed, so the plain decorator suffices.
    pub fn to_code(&self) -> String {
        if self.parameters.is_empty() {
            return format!("@{}", self.name());
        }
        let mut scratch = Diagnostics::new();
        let rendered: Vec<String> = self
            .params(&plain_decorator, &mut scratch)
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("@{}({})", self.name(), rendered.join(", "))
    }
}

impl Node for Annotation {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// Any node carrying a set of annotation instances.
///
/// Each implementor declares its own fixed supported-kind set; validation
/// rejects unsupported kinds and duplicate non-repeatable kinds, and
/// delegates per-use checks to [`Annotation::check_valid`].
pub trait Annotatable: Node {
    fn annotations(&self) -> &[Annotation];
    fn supported_annotations(&self) -> &'static [AnnotationKind];

    /// Fetches the single instance of a kind. Fetching a repeatable kind
    /// this way is a programming error.
    fn annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        let found = self.annotations().iter().find(|a| a.kind() == kind)?;
        assert!(
            !found.repeatable(),
            "trying to get a single annotation when '{}' is repeatable",
            found.name()
        );
        Some(found)
    }

    fn is_nullable(&self) -> bool {
        self.annotation(AnnotationKind::Nullable).is_some()
    }

    fn is_utf8_in_cpp(&self) -> bool {
        self.annotation(AnnotationKind::Utf8InCpp).is_some()
    }

    fn is_sensitive_data(&self) -> bool {
        self.annotation(AnnotationKind::SensitiveData).is_some()
    }

    fn is_vintf_stability(&self) -> bool {
        self.annotation(AnnotationKind::VintfStability).is_some()
    }

    fn is_java_only_immutable(&self) -> bool {
        self.annotation(AnnotationKind::JavaOnlyImmutable).is_some()
    }

    fn is_fixed_size(&self) -> bool {
        self.annotation(AnnotationKind::FixedSize).is_some()
    }

    fn is_hide(&self) -> bool {
        self.annotation(AnnotationKind::Hide).is_some()
    }

    fn is_stable_api_parcelable(&self, backend: Backend) -> bool {
        backend == Backend::Java
            && self
                .annotation(AnnotationKind::JavaStableParcelable)
                .is_some()
    }

    /// True when `@JavaDerive` requests the given derived method.
    fn java_derive(&self, method: &str) -> bool {
        self.annotation(AnnotationKind::JavaDerive)
            .and_then(|a| a.bool_param(method))
            .unwrap_or(false)
    }

    fn descriptor(&self) -> Option<String> {
        self.annotation(AnnotationKind::Descriptor)?
            .string_param("value")
    }

    fn backing_annotation(&self) -> Option<&Annotation> {
        self.annotation(AnnotationKind::Backing)
    }

    /// Rejects unsupported kinds, delegates per-use validation, then scans
    /// for duplicate non-repeatable kinds (first occurrence wins, later
    /// duplicates cite it). All diagnostics accumulate.
    fn check_annotations(&self, diag: &mut Diagnostics) -> bool {
        let supported = self.supported_annotations();
        let mut ok = true;
        for annotation in self.annotations() {
            if !supported.contains(&annotation.kind()) {
                let names: Vec<&str> = supported.iter().map(|k| k.name()).collect();
                diag.error(
                    annotation.location(),
                    ErrorCode::AnnotationNotSupportedHere,
                    format!(
                        "'{}' is not a supported annotation for this node. It must be one of: {}",
                        annotation.name(),
                        names.join(", ")
                    ),
                );
                ok = false;
                continue;
            }
            ok &= annotation.check_valid(diag);
        }

        let mut declared: BTreeMap<AnnotationKind, &Location> = BTreeMap::new();
        for annotation in self.annotations() {
            match declared.get(&annotation.kind()) {
                None => {
                    declared.insert(annotation.kind(), annotation.location());
                }
                Some(previous) if !annotation.repeatable() => {
                    diag.error(
                        annotation.location(),
                        ErrorCode::DuplicateAnnotation,
                        format!(
                            "'{}' is repeated, but not allowed. Previous location: {}",
                            annotation.name(),
                            previous
                        ),
                    );
                    ok = false;
                }
                Some(_) => {}
            }
        }
        ok
    }

    /// Deterministic (sorted) rendering of the attached annotations.
    fn annotations_code(&self) -> String {
        let mut rendered: Vec<String> = self.annotations().iter().map(|a| a.to_code()).collect();
        rendered.sort();
        rendered.join(" ")
    }
}
