//! Defined types: parcelables, structured parcelables, unions, enums, and
//! interfaces.
//!
//! Each kind is its own struct wrapping a shared [`DeclBody`]; the
//! [`DefinedType`] sum type is what documents and the type-name table work
//! with. Kind-specific validation lives on the kind structs, the shared
//! member rules on the body.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::annotation::{Annotatable, Annotation, AnnotationKind};
use crate::ast::{has_hide_comment, Location, Node};
use crate::diagnostics::{AdvisoryKind, Diagnostics, ErrorCode};
use crate::members::{ConstantDecl, Direction, Member, Method, Variable};
use crate::typenames::Typenames;
use crate::types::{Backend, TypeSpecifier};
use crate::value::{fits_integral, ConstExpr};
use crate::writer::CodeWriter;

/// The five kinds of defined type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Parcelable,
    StructuredParcelable,
    Union,
    Enum,
    Interface,
}

/// Names reserved in generated code. Matches the Java keyword set plus the
/// literals; argument names colliding with these break at least one backend.
const RESERVED_WORDS: &[&str] = &[
    "abstract",
    "assert",
    "boolean",
    "break",
    "byte",
    "case",
    "catch",
    "char",
    "class",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extends",
    "final",
    "finally",
    "float",
    "for",
    "goto",
    "if",
    "implements",
    "import",
    "instanceof",
    "int",
    "interface",
    "long",
    "native",
    "new",
    "package",
    "private",
    "protected",
    "public",
    "return",
    "short",
    "static",
    "strictfp",
    "super",
    "switch",
    "synchronized",
    "this",
    "throw",
    "throws",
    "transient",
    "try",
    "void",
    "volatile",
    "while",
    "true",
    "false",
    "null",
];

/// Method signatures every generated stub defines itself.
const RESERVED_METHODS: &[&str] = &[
    "asBinder()",
    "getInterfaceHash()",
    "getInterfaceVersion()",
    "getTransactionName(int)",
];

/// The state shared by every defined-type kind: identity, annotations, and
/// the member lists partitioned once at construction.
#[derive(Debug)]
pub struct DeclBody {
    location: Location,
    name: String,
    package: String,
    comments: String,
    annotations: Vec<Annotation>,
    constants: Vec<ConstantDecl>,
    fields: Vec<Variable>,
    methods: Vec<Method>,
}

impl DeclBody {
    fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        annotations: Vec<Annotation>,
        members: Vec<Member>,
    ) -> Self {
        let mut constants = Vec::new();
        let mut fields = Vec::new();
        let mut methods = Vec::new();
        for member in members {
            match member {
                Member::Constant(c) => constants.push(c),
                Member::Field(f) => fields.push(f),
                Member::Method(m) => methods.push(m),
            }
        }
        Self {
            location,
            name: name.into(),
            package: package.into(),
            comments: comments.into(),
            annotations,
            constants,
            fields,
            methods,
        }
    }

    fn canonical_name(&self) -> String {
        if self.package.is_empty() {
            return self.name.clone();
        }
        format!("{}.{}", self.package, self.name)
    }

    fn find_annotation(&self, kind: AnnotationKind) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.kind() == kind)
    }

    fn check_fields(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        for field in &self.fields {
            ok &= field.check_valid(typenames, diag);
        }

        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if !seen.insert(field.name()) {
                diag.error(
                    field.location(),
                    ErrorCode::DuplicateField,
                    format!("'{}' has duplicate field name '{}'", self.name, field.name()),
                );
                ok = false;
            }
        }
        ok
    }

    fn check_constants(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        let mut seen = BTreeSet::new();
        for constant in &self.constants {
            if !seen.insert(constant.name()) {
                diag.error(
                    constant.location(),
                    ErrorCode::DuplicateConstant,
                    format!("Found duplicate constant name '{}'", constant.name()),
                );
                ok = false;
            }
            ok &= constant.check_valid(typenames, diag);
        }
        ok
    }

    fn check_immutable_fields(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        for field in &self.fields {
            if !typenames.can_be_java_only_immutable(field.ty()) {
                diag.error(
                    field.location(),
                    ErrorCode::NonImmutableField,
                    format!(
                        "The @JavaOnlyImmutable '{}' has a non-immutable field named '{}'.",
                        self.name,
                        field.name()
                    ),
                );
                ok = false;
            }
        }
        ok
    }

    /// Getter-producing kinds need field names unique after capitalization
    /// (`foo` and `Foo` would both produce `getFoo`).
    fn check_getter_names(&self, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        let mut getters = BTreeSet::new();
        for field in &self.fields {
            if !getters.insert(field.capitalized_name()) {
                diag.error(
                    field.location(),
                    ErrorCode::DuplicateGetter,
                    format!(
                        "'{}' has duplicate field name '{}' after capitalizing the first letter",
                        self.name,
                        field.name()
                    ),
                );
                ok = false;
            }
        }
        ok
    }

    fn dump_members(&self, writer: &mut CodeWriter, typenames: &Typenames) {
        for field in &self.fields {
            if field.ty().is_hidden() {
                writer.write("/* @hide */\n");
            }
            writer.write(&format!("{};\n", field.to_code(typenames)));
        }
        for constant in &self.constants {
            if constant.ty().is_hidden() {
                writer.write("/* @hide */\n");
            }
            writer.write(&format!("{};\n", constant.to_code(typenames)));
        }
    }
}

fn check_unique_type_params(
    type_params: Option<&[String]>,
    location: &Location,
    diag: &mut Diagnostics,
) -> bool {
    let params = match type_params {
        Some(p) => p,
        None => return true,
    };
    let set: BTreeSet<&String> = params.iter().collect();
    if set.len() != params.len() {
        diag.error(
            location,
            ErrorCode::DuplicateTypeParameter,
            "Every type parameter should be unique.",
        );
        return false;
    }
    true
}

/// An unstructured parcelable: declared here, implemented by hand
/// elsewhere. The C++ backends need a header to include for it.
#[derive(Debug)]
pub struct Parcelable {
    body: DeclBody,
    cpp_header: String,
    type_params: Option<Vec<String>>,
}

impl Parcelable {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        annotations: Vec<Annotation>,
        cpp_header: impl Into<String>,
        type_params: Option<Vec<String>>,
        members: Vec<Member>,
    ) -> Self {
        // The header arrives quoted from the parser.
        let cpp_header = cpp_header.into();
        let cpp_header = cpp_header
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .map(str::to_string)
            .unwrap_or(cpp_header);
        Self {
            body: DeclBody::new(location, name, package, comments, annotations, members),
            cpp_header,
            type_params,
        }
    }

    pub fn cpp_header(&self) -> &str {
        &self.cpp_header
    }

    fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = self.body.check_fields(typenames, diag);
        ok &= self.body.check_constants(typenames, diag);
        if self
            .body
            .find_annotation(AnnotationKind::JavaOnlyImmutable)
            .is_some()
        {
            ok &= self.body.check_immutable_fields(typenames, diag);
        }
        ok
    }
}

/// A structured parcelable: fields are declared here and the wire format is
/// derived from them.
#[derive(Debug)]
pub struct StructuredParcelable {
    body: DeclBody,
    type_params: Option<Vec<String>>,
}

impl StructuredParcelable {
    pub fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        annotations: Vec<Annotation>,
        type_params: Option<Vec<String>>,
        members: Vec<Member>,
    ) -> Self {
        Self {
            body: DeclBody::new(location, name, package, comments, annotations, members),
            type_params,
        }
    }

    fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = self.body.check_fields(typenames, diag);
        ok &= self.body.check_constants(typenames, diag);

        if self
            .body
            .find_annotation(AnnotationKind::FixedSize)
            .is_some()
        {
            for field in &self.body.fields {
                if !typenames.can_be_fixed_size(field.ty()) {
                    diag.error(
                        field.location(),
                        ErrorCode::NonFixedSizeField,
                        format!(
                            "The @FixedSize parcelable '{}' has a non-fixed size field named {}.",
                            self.body.name,
                            field.name()
                        ),
                    );
                    ok = false;
                }
            }
        }

        if self
            .body
            .find_annotation(AnnotationKind::JavaOnlyImmutable)
            .is_some()
        {
            // Immutable parcelables provide getters.
            ok &= self.body.check_getter_names(diag);
            ok &= self.body.check_immutable_fields(typenames, diag);
        }
        ok
    }
}

/// A tagged union. Exactly one field is set at a time; the first field is
/// the implicit default and must be default-initializable.
#[derive(Debug)]
pub struct UnionDecl {
    body: DeclBody,
}

impl UnionDecl {
    pub fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        annotations: Vec<Annotation>,
        members: Vec<Member>,
    ) -> Self {
        Self {
            body: DeclBody::new(location, name, package, comments, annotations, members),
        }
    }

    fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = self.body.check_fields(typenames, diag);
        ok &= self.body.check_constants(typenames, diag);
        // Unions provide getters always.
        ok &= self.body.check_getter_names(diag);
        if self
            .body
            .find_annotation(AnnotationKind::JavaOnlyImmutable)
            .is_some()
        {
            ok &= self.body.check_immutable_fields(typenames, diag);
        }

        for field in &self.body.fields {
            if field.ty().name() == "ParcelableHolder" {
                diag.error(
                    field.location(),
                    ErrorCode::HolderNotAllowed,
                    format!(
                        "A union can't have a member of ParcelableHolder '{}'",
                        field.name()
                    ),
                );
                ok = false;
            }
        }

        let first = match self.body.fields.first() {
            Some(first) => first,
            None => {
                diag.error(
                    &self.body.location,
                    ErrorCode::EmptyUnion,
                    format!("The union '{}' has no fields.", self.body.name),
                );
                return false;
            }
        };

        if !first.has_useful_default() {
            // Most types can be initialized without a default value. Enum
            // types need an explicit reference, and arrays a value list or
            // nullability, so that default-initialized unions work in every
            // backend.
            if !first.ty().is_array() && typenames.get_enum(first.ty()).is_some() {
                diag.error(
                    first.location(),
                    ErrorCode::UnionFirstFieldNeedsDefault,
                    "The union's first member should have a useful default value. Enum types \
                     can be initialized with a reference. (e.g. ... = MyEnum.FOO;)",
                );
                ok = false;
            }
            if first.ty().is_array() {
                diag.error(
                    first.location(),
                    ErrorCode::UnionFirstFieldNeedsDefault,
                    "The union's first member should have a useful default value. Arrays can \
                     be initialized with values(e.g. ... = { values... };) or marked as \
                     @nullable.",
                );
                ok = false;
            }
        }
        ok
    }
}

/// One enum member. A written value is kept as-is; a missing one is
/// backfilled at enum construction.
#[derive(Debug)]
pub struct Enumerator {
    location: Location,
    name: String,
    value: Option<ConstExpr>,
    value_user_specified: bool,
    comments: String,
}

impl Enumerator {
    pub fn new(
        location: Location,
        name: impl Into<String>,
        value: Option<ConstExpr>,
        comments: impl Into<String>,
    ) -> Self {
        let value_user_specified = value.is_some();
        Self {
            location,
            name: name.into(),
            value,
            value_user_specified,
            comments: comments.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&ConstExpr> {
        self.value.as_ref()
    }

    pub fn value_user_specified(&self) -> bool {
        self.value_user_specified
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }
}

impl Node for Enumerator {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// An enum declaration with an integral backing type.
#[derive(Debug)]
pub struct EnumDecl {
    body: DeclBody,
    enumerators: Vec<Enumerator>,
    backing_type: Option<TypeSpecifier>,
}

impl EnumDecl {
    /// Missing enumerator values are filled here with `<prev> + 1` (or `0`
    /// for the first), symbolically. It can't wait until `autofill` because
    /// reference resolution depends on it: in `enum E { A, B = A }`, `B`'s
    /// reference to `A` needs `A` to have a value.
    pub fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        annotations: Vec<Annotation>,
        enumerators: Vec<Enumerator>,
    ) -> Self {
        let mut enumerators = enumerators;
        let mut previous: Option<String> = None;
        for enumerator in &mut enumerators {
            if enumerator.value.is_none() {
                enumerator.value = Some(match &previous {
                    None => ConstExpr::integral(0),
                    Some(prev) => ConstExpr::binary(
                        ConstExpr::reference(prev.clone()),
                        "+",
                        ConstExpr::integral(1),
                    ),
                });
            }
            previous = Some(enumerator.name.clone());
        }
        Self {
            body: DeclBody::new(location, name, package, comments, annotations, Vec::new()),
            enumerators,
            backing_type: None,
        }
    }

    pub fn enumerators(&self) -> &[Enumerator] {
        &self.enumerators
    }

    /// The resolved backing type, once `autofill` has run.
    pub fn backing_type(&self) -> Option<&TypeSpecifier> {
        self.backing_type.as_ref()
    }

    /// Fills in the backing type from `@Backing(type=...)`, defaulting to
    /// `byte`, and resolves it. Runs after type resolution and before the
    /// grand validation pass.
    pub(crate) fn autofill(&mut self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut backing = match self.body.find_annotation(AnnotationKind::Backing) {
            Some(annotation) => {
                if !annotation.check_valid(diag) {
                    return false;
                }
                let name = match annotation.string_param("type") {
                    Some(name) => name,
                    None => return false,
                };
                TypeSpecifier::new(annotation.location().clone(), name, false, None, "")
            }
            None => TypeSpecifier::new(Location::internal(), "byte", false, None, ""),
        };
        if !backing.resolve(typenames) {
            diag.error(
                &self.body.location,
                ErrorCode::UnresolvedType,
                format!("Invalid backing type: {}", backing.name()),
            );
        }
        self.backing_type = Some(backing);
        true
    }

    /// Folds every enumerator to its integral value, resolving references
    /// to earlier enumerators. `None` marks an unfoldable entry.
    pub fn enumerator_values(&self) -> Vec<Option<i64>> {
        let mut env: BTreeMap<String, i64> = BTreeMap::new();
        let mut values = Vec::with_capacity(self.enumerators.len());
        for enumerator in &self.enumerators {
            let value = enumerator.value.as_ref().and_then(|v| {
                v.evaluate(&|name: &str| {
                    // Both `PREV` and `EnumName.PREV` refer to a sibling.
                    let simple = name.rsplit('.').next().unwrap_or(name);
                    env.get(simple).copied()
                })
            });
            if let Some(value) = value {
                env.insert(enumerator.name.clone(), value);
            }
            values.push(value);
        }
        values
    }

    fn check_valid(&self, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        if !self.body.fields.is_empty()
            || !self.body.constants.is_empty()
            || !self.body.methods.is_empty()
        {
            diag.error(
                &self.body.location,
                ErrorCode::EnumHasMembers,
                "Enum doesn't support fields/constants/methods.",
            );
            ok = false;
        }

        let backing = match &self.backing_type {
            Some(backing) => backing,
            None => {
                diag.error(
                    &self.body.location,
                    ErrorCode::MissingBackingType,
                    "Enum declaration missing backing type.",
                );
                return false;
            }
        };
        assert!(
            !self.enumerators.is_empty(),
            "the enum '{}' has no enumerators",
            self.body.name
        );
        if !backing.is_resolved() {
            // Diagnosed by autofill already.
            return false;
        }

        let values = self.enumerator_values();
        let mut values_ok = true;
        for (enumerator, value) in self.enumerators.iter().zip(&values) {
            let fits = matches!(value, Some(v) if fits_integral(backing.name(), *v));
            if !fits {
                diag.error(
                    enumerator.location(),
                    ErrorCode::EnumeratorTypeMismatch,
                    "Enumerator type differs from enum backing type.",
                );
                values_ok = false;
            }
        }
        if !values_ok {
            return false;
        }

        if let (Some(first), Some(Some(value))) = (self.enumerators.first(), values.first()) {
            if *value != 0 {
                diag.advise(
                    first.location(),
                    AdvisoryKind::EnumZero,
                    format!(
                        "The first enumerator '{}' should be 0, but it is {}.",
                        first.name(),
                        value
                    ),
                );
            }
        }
        ok
    }
}

/// An interface declaration: methods and constants.
#[derive(Debug)]
pub struct InterfaceDecl {
    body: DeclBody,
    oneway: bool,
}

impl InterfaceDecl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        location: Location,
        name: impl Into<String>,
        package: impl Into<String>,
        comments: impl Into<String>,
        oneway: bool,
        annotations: Vec<Annotation>,
        members: Vec<Member>,
    ) -> Self {
        let mut body = DeclBody::new(location, name, package, comments, annotations, members);
        for method in &mut body.methods {
            method.apply_interface_oneway(oneway);
        }
        Self { body, oneway }
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    pub fn methods(&self) -> &[Method] {
        &self.body.methods
    }

    /// `@Descriptor(value=...)` if present, the canonical name otherwise.
    pub fn descriptor(&self) -> String {
        self.body
            .find_annotation(AnnotationKind::Descriptor)
            .and_then(|a| a.string_param("value"))
            .unwrap_or_else(|| self.body.canonical_name())
    }

    fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        // Overloads are legal; uniqueness is keyed by the full signature.
        let mut signatures: BTreeMap<String, &Method> = BTreeMap::new();
        for method in &self.body.methods {
            ok &= self.check_method(method, typenames, diag);

            let signature = method.signature();
            match signatures.get(signature.as_str()) {
                None => {
                    signatures.insert(signature, method);
                }
                Some(previous) => {
                    diag.error(
                        method.location(),
                        ErrorCode::DuplicateMethod,
                        format!("attempt to redefine method {}:", signature),
                    );
                    diag.error(
                        previous.location(),
                        ErrorCode::DuplicateMethod,
                        "previously defined here.",
                    );
                    ok = false;
                }
            }

            if RESERVED_METHODS.contains(&method.signature().as_str()) {
                diag.error(
                    method.location(),
                    ErrorCode::ReservedMethod,
                    format!("method {} is reserved for internal use.", method.signature()),
                );
                ok = false;
            }
        }

        ok &= self.body.check_constants(typenames, diag);

        if !self.body.name.starts_with('I') {
            diag.advise(
                &self.body.location,
                AdvisoryKind::InterfaceName,
                "Interface names should start with I.",
            );
        }
        ok
    }

    fn check_method(&self, method: &Method, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = method.return_type().check_valid(typenames, diag);

        if method.return_type().name() == "ParcelableHolder" {
            diag.error(
                method.location(),
                ErrorCode::HolderNotAllowed,
                "ParcelableHolder cannot be a return type",
            );
            ok = false;
        }
        if method.is_oneway() && method.return_type().name() != "void" {
            diag.error(
                method.location(),
                ErrorCode::OnewayReturn,
                format!("oneway method '{}' cannot return a value", method.name()),
            );
            ok = false;
        }

        let mut argument_names = BTreeSet::new();
        for arg in method.arguments() {
            if !argument_names.insert(arg.name()) {
                diag.error(
                    method.location(),
                    ErrorCode::DuplicateArgument,
                    format!(
                        "method '{}' has duplicate argument name '{}'",
                        method.name(),
                        arg.name()
                    ),
                );
                ok = false;
            }

            ok &= arg.check_valid(typenames, diag);

            if arg.ty().name() == "ParcelableHolder" {
                diag.error(
                    arg.location(),
                    ErrorCode::HolderNotAllowed,
                    "ParcelableHolder cannot be an argument type",
                );
                ok = false;
            }
            if method.is_oneway() && arg.is_out() {
                diag.error(
                    method.location(),
                    ErrorCode::OnewayOutParameter,
                    format!(
                        "oneway method '{}' cannot have out parameters",
                        method.name()
                    ),
                );
                ok = false;
            }

            let (can_be_out, type_aspect) = typenames.can_be_out_parameter(arg.ty());
            if !arg.direction_specified() && can_be_out {
                diag.error(
                    arg.location(),
                    ErrorCode::MissingDirection,
                    format!(
                        "'{}' can be an out type, so you must declare it as in, out, or inout.",
                        arg.ty().signature()
                    ),
                );
                ok = false;
            }
            if arg.direction() != Direction::In && !can_be_out {
                diag.error(
                    arg.location(),
                    ErrorCode::InvalidDirection,
                    format!(
                        "'{}' can't be an {} parameter because {} can only be an in parameter.",
                        arg.name(),
                        arg.direction(),
                        type_aspect
                    ),
                );
                ok = false;
            }

            if RESERVED_WORDS.contains(&arg.name()) {
                diag.error(
                    arg.location(),
                    ErrorCode::ReservedArgumentName,
                    "Argument name is a reserved keyword",
                );
                ok = false;
            }
            // A namespace reserved for generated locals.
            if arg.name().starts_with("_ridl") {
                diag.error(
                    arg.location(),
                    ErrorCode::ReservedArgumentName,
                    "Argument name cannot begin with '_ridl'",
                );
                ok = false;
            }

            if arg.direction() == Direction::Inout {
                diag.advise(
                    arg.location(),
                    AdvisoryKind::InoutParameter,
                    format!(
                        "{} is 'inout'. Avoid inout parameters. This is somewhat confusing for \
                         clients because although the parameters are 'in', they look like 'out' \
                         parameters.",
                        arg.name()
                    ),
                );
            }
        }
        ok
    }
}

/// A defined type of any kind.
#[derive(Debug)]
pub enum DefinedType {
    Parcelable(Parcelable),
    StructuredParcelable(StructuredParcelable),
    Union(UnionDecl),
    Enum(EnumDecl),
    Interface(InterfaceDecl),
}

impl DefinedType {
    fn body(&self) -> &DeclBody {
        match self {
            DefinedType::Parcelable(d) => &d.body,
            DefinedType::StructuredParcelable(d) => &d.body,
            DefinedType::Union(d) => &d.body,
            DefinedType::Enum(d) => &d.body,
            DefinedType::Interface(d) => &d.body,
        }
    }

    fn body_mut(&mut self) -> &mut DeclBody {
        match self {
            DefinedType::Parcelable(d) => &mut d.body,
            DefinedType::StructuredParcelable(d) => &mut d.body,
            DefinedType::Union(d) => &mut d.body,
            DefinedType::Enum(d) => &mut d.body,
            DefinedType::Interface(d) => &mut d.body,
        }
    }

    pub fn kind(&self) -> DeclKind {
        match self {
            DefinedType::Parcelable(_) => DeclKind::Parcelable,
            DefinedType::StructuredParcelable(_) => DeclKind::StructuredParcelable,
            DefinedType::Union(_) => DeclKind::Union,
            DefinedType::Enum(_) => DeclKind::Enum,
            DefinedType::Interface(_) => DeclKind::Interface,
        }
    }

    pub fn name(&self) -> &str {
        &self.body().name
    }

    pub fn package(&self) -> &str {
        &self.body().package
    }

    pub fn canonical_name(&self) -> String {
        self.body().canonical_name()
    }

    pub fn comments(&self) -> &str {
        &self.body().comments
    }

    pub fn is_hidden(&self) -> bool {
        has_hide_comment(&self.body().comments)
    }

    pub fn fields(&self) -> &[Variable] {
        &self.body().fields
    }

    pub fn constants(&self) -> &[ConstantDecl] {
        &self.body().constants
    }

    pub fn methods(&self) -> &[Method] {
        &self.body().methods
    }

    pub fn as_interface(&self) -> Option<&InterfaceDecl> {
        match self {
            DefinedType::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match self {
            DefinedType::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub(crate) fn as_enum_mut(&mut self) -> Option<&mut EnumDecl> {
        match self {
            DefinedType::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Declared type-parameter count for user-defined generics.
    pub fn generic_arity(&self) -> Option<usize> {
        match self {
            DefinedType::Parcelable(d) => d.type_params.as_ref().map(Vec::len),
            DefinedType::StructuredParcelable(d) => d.type_params.as_ref().map(Vec::len),
            _ => None,
        }
    }

    fn type_params(&self) -> Option<&[String]> {
        match self {
            DefinedType::Parcelable(d) => d.type_params.as_deref(),
            DefinedType::StructuredParcelable(d) => d.type_params.as_deref(),
            _ => None,
        }
    }

    /// Validates this declaration and every member against the shared and
    /// kind-specific rules. All diagnostics accumulate; the return value is
    /// the overall verdict.
    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut ok = self.check_annotations(diag);
        ok &= check_unique_type_params(self.type_params(), &self.body().location, diag);
        ok &= match self {
            DefinedType::Parcelable(d) => d.check_valid(typenames, diag),
            DefinedType::StructuredParcelable(d) => d.check_valid(typenames, diag),
            DefinedType::Union(d) => d.check_valid(typenames, diag),
            DefinedType::Enum(d) => d.check_valid(diag),
            DefinedType::Interface(d) => d.check_valid(typenames, diag),
        };
        ok
    }

    /// The backend-gated pass over every type used by this declaration.
    pub fn language_specific_check_valid(
        &self,
        typenames: &Typenames,
        backend: Backend,
        diag: &mut Diagnostics,
    ) -> bool {
        let mut ok = true;
        if let DefinedType::Parcelable(d) = self {
            if matches!(backend, Backend::Cpp | Backend::Ndk) && d.cpp_header.is_empty() {
                diag.error(
                    &d.body.location,
                    ErrorCode::MissingNativeHeader,
                    "Unstructured parcelable must have C++ header defined.",
                );
                ok = false;
            }
        }
        for field in &self.body().fields {
            ok &= field
                .ty()
                .language_specific_check_valid(typenames, backend, diag);
        }
        for method in &self.body().methods {
            ok &= method
                .return_type()
                .language_specific_check_valid(typenames, backend, diag);
            for arg in method.arguments() {
                ok &= arg
                    .ty()
                    .language_specific_check_valid(typenames, backend, diag);
            }
        }
        ok
    }

    /// Applies `f` to every type specifier owned by this declaration.
    /// Callers recurse into generic type parameters themselves.
    pub(crate) fn for_each_specifier_mut(&mut self, f: &mut dyn FnMut(&mut TypeSpecifier)) {
        let body = self.body_mut();
        for constant in &mut body.constants {
            f(constant.ty_mut());
        }
        for field in &mut body.fields {
            f(field.ty_mut());
        }
        for method in &mut body.methods {
            f(method.return_type_mut());
            for arg in method.arguments_mut() {
                f(arg.ty_mut());
            }
        }
    }

    /// Pretty-prints the declaration in source form.
    pub fn dump(&self, writer: &mut CodeWriter, typenames: &Typenames) {
        if self.is_hidden() {
            writer.write("/* @hide */\n");
        }
        let annotations = self.annotations_code();
        if !annotations.is_empty() {
            writer.write(&annotations);
            writer.write("\n");
        }
        match self {
            DefinedType::Parcelable(d) => {
                writer.write(&format!("parcelable {} ;\n", d.body.name));
            }
            DefinedType::StructuredParcelable(d) => {
                writer.write(&format!("parcelable {} {{\n", d.body.name));
                writer.indent();
                d.body.dump_members(writer, typenames);
                writer.dedent();
                writer.write("}\n");
            }
            DefinedType::Union(d) => {
                writer.write(&format!("union {} {{\n", d.body.name));
                writer.indent();
                d.body.dump_members(writer, typenames);
                writer.dedent();
                writer.write("}\n");
            }
            DefinedType::Enum(d) => {
                writer.write(&format!("enum {} {{\n", d.body.name));
                writer.indent();
                for (enumerator, value) in d.enumerators.iter().zip(d.enumerator_values()) {
                    let rendered = value.map(|v| v.to_string()).unwrap_or_default();
                    writer.write(&format!("{} = {},\n", enumerator.name(), rendered));
                }
                writer.dedent();
                writer.write("}\n");
            }
            DefinedType::Interface(d) => {
                writer.write(&format!("interface {} {{\n", d.body.name));
                writer.indent();
                for method in &d.body.methods {
                    if method.is_hidden() {
                        writer.write("/* @hide */\n");
                    }
                    writer.write(&format!("{};\n", method.to_code(typenames)));
                }
                for constant in &d.body.constants {
                    if constant.ty().is_hidden() {
                        writer.write("/* @hide */\n");
                    }
                    writer.write(&format!("{};\n", constant.to_code(typenames)));
                }
                writer.dedent();
                writer.write("}\n");
            }
        }
    }
}

impl Node for DefinedType {
    fn location(&self) -> &Location {
        &self.body().location
    }
}

impl Annotatable for DefinedType {
    fn annotations(&self) -> &[Annotation] {
        &self.body().annotations
    }

    fn supported_annotations(&self) -> &'static [AnnotationKind] {
        match self.kind() {
            DeclKind::Parcelable => &[
                AnnotationKind::VintfStability,
                AnnotationKind::UnsupportedAppUsage,
                AnnotationKind::JavaStableParcelable,
                AnnotationKind::Hide,
                AnnotationKind::JavaPassthrough,
                AnnotationKind::JavaOnlyImmutable,
            ],
            DeclKind::StructuredParcelable => &[
                AnnotationKind::VintfStability,
                AnnotationKind::UnsupportedAppUsage,
                AnnotationKind::Hide,
                AnnotationKind::JavaPassthrough,
                AnnotationKind::JavaDerive,
                AnnotationKind::JavaOnlyImmutable,
                AnnotationKind::FixedSize,
                AnnotationKind::RustDerive,
            ],
            DeclKind::Union => &[
                AnnotationKind::VintfStability,
                AnnotationKind::Hide,
                AnnotationKind::JavaPassthrough,
                AnnotationKind::JavaDerive,
                AnnotationKind::JavaOnlyImmutable,
                AnnotationKind::RustDerive,
            ],
            DeclKind::Enum => &[
                AnnotationKind::VintfStability,
                AnnotationKind::Backing,
                AnnotationKind::Hide,
                AnnotationKind::JavaPassthrough,
            ],
            DeclKind::Interface => &[
                AnnotationKind::SensitiveData,
                AnnotationKind::VintfStability,
                AnnotationKind::UnsupportedAppUsage,
                AnnotationKind::Hide,
                AnnotationKind::JavaPassthrough,
                AnnotationKind::Descriptor,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticKind;
    use crate::members::Argument;

    fn loc() -> Location {
        Location::internal()
    }

    fn spec(name: &str) -> TypeSpecifier {
        TypeSpecifier::new(loc(), name, false, None, "")
    }

    fn field(ty: &str, name: &str) -> Member {
        Member::Field(Variable::new(loc(), spec(ty), name))
    }

    fn simple_enum(names: &[(&str, Option<ConstExpr>)]) -> EnumDecl {
        let enumerators = names
            .iter()
            .map(|(n, v)| Enumerator::new(loc(), *n, v.clone(), ""))
            .collect();
        EnumDecl::new(loc(), "Kind", "p", "", vec![], enumerators)
    }

    #[test]
    fn implicit_enumerator_values_count_from_zero() {
        let e = simple_enum(&[("A", None), ("B", None), ("C", None)]);
        assert_eq!(
            e.enumerator_values(),
            vec![Some(0), Some(1), Some(2)]
        );
    }

    #[test]
    fn implicit_enumerator_values_continue_from_the_previous() {
        let e = simple_enum(&[("A", Some(ConstExpr::integral(5))), ("B", None), ("C", None)]);
        assert_eq!(
            e.enumerator_values(),
            vec![Some(5), Some(6), Some(7)]
        );
    }

    #[test]
    fn enum_defaults_to_byte_backing() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let mut e = simple_enum(&[("A", None)]);
        assert!(e.autofill(&tn, &mut diag));
        assert_eq!(e.backing_type().map(|b| b.name()), Some("byte"));
        assert!(diag.is_empty());
    }

    #[test]
    fn enumerator_out_of_backing_range_is_a_mismatch() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let mut e = simple_enum(&[("A", Some(ConstExpr::integral(300)))]);
        assert!(e.autofill(&tn, &mut diag));
        let decl = DefinedType::Enum(e);
        assert!(!decl.check_valid(&tn, &mut diag));
        assert!(diag.kinds().contains(&DiagnosticKind::Error(
            ErrorCode::EnumeratorTypeMismatch
        )));
    }

    #[test]
    fn nonzero_first_enumerator_is_advisory_only() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let mut e = simple_enum(&[("A", Some(ConstExpr::integral(1))), ("B", None)]);
        assert!(e.autofill(&tn, &mut diag));
        let decl = DefinedType::Enum(e);
        assert!(decl.check_valid(&tn, &mut diag));
        assert!(!diag.has_errors());
        assert_eq!(
            diag.kinds(),
            vec![DiagnosticKind::Advisory(AdvisoryKind::EnumZero)]
        );
    }

    #[test]
    fn empty_union_is_rejected() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let u = DefinedType::Union(UnionDecl::new(loc(), "U", "p", "", vec![], vec![]));
        assert!(!u.check_valid(&tn, &mut diag));
        assert!(diag
            .kinds()
            .contains(&DiagnosticKind::Error(ErrorCode::EmptyUnion)));
    }

    #[test]
    fn union_first_array_member_needs_a_default() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let arr = TypeSpecifier::new(loc(), "int", true, None, "");
        let u = DefinedType::Union(UnionDecl::new(
            loc(),
            "U",
            "p",
            "",
            vec![],
            vec![Member::Field(Variable::new(loc(), arr, "values"))],
        ));
        assert!(!u.check_valid(&tn, &mut diag));
        assert!(diag.kinds().contains(&DiagnosticKind::Error(
            ErrorCode::UnionFirstFieldNeedsDefault
        )));
    }

    #[test]
    fn duplicate_fields_are_reported_per_occurrence() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let p = DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "P",
            "p",
            "",
            vec![],
            None,
            vec![field("int", "x"), field("long", "x")],
        ));
        assert!(!p.check_valid(&tn, &mut diag));
        assert!(diag
            .kinds()
            .contains(&DiagnosticKind::Error(ErrorCode::DuplicateField)));
    }

    #[test]
    fn duplicate_type_parameters_are_rejected() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let p = DefinedType::StructuredParcelable(StructuredParcelable::new(
            loc(),
            "P",
            "p",
            "",
            vec![],
            Some(vec!["T".to_string(), "T".to_string()]),
            vec![],
        ));
        assert!(!p.check_valid(&tn, &mut diag));
        assert!(diag.kinds().contains(&DiagnosticKind::Error(
            ErrorCode::DuplicateTypeParameter
        )));
    }

    fn method(oneway: bool, ret: &str, name: &str, args: Vec<Argument>) -> Member {
        Member::Method(Method::new(loc(), oneway, spec(ret), name, args, ""))
    }

    fn interface(members: Vec<Member>) -> DefinedType {
        DefinedType::Interface(InterfaceDecl::new(
            loc(),
            "ICalc",
            "p",
            "",
            false,
            vec![],
            members,
        ))
    }

    #[test]
    fn overloads_differing_in_argument_types_coexist() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = interface(vec![
            method(
                false,
                "void",
                "set",
                vec![Argument::new(loc(), spec("int"), "v")],
            ),
            method(
                false,
                "void",
                "set",
                vec![Argument::new(loc(), spec("long"), "v")],
            ),
        ]);
        assert!(i.check_valid(&tn, &mut diag));
        assert!(!diag.has_errors());
    }

    #[test]
    fn identical_signatures_cite_the_previous_definition() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = interface(vec![
            method(false, "void", "ping", vec![]),
            method(false, "void", "ping", vec![]),
        ]);
        assert!(!i.check_valid(&tn, &mut diag));
        let dups: Vec<_> = diag
            .kinds()
            .into_iter()
            .filter(|k| *k == DiagnosticKind::Error(ErrorCode::DuplicateMethod))
            .collect();
        assert_eq!(dups.len(), 2);
    }

    #[test]
    fn oneway_methods_cannot_return_values_or_take_out_parameters() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let arr = TypeSpecifier::new(loc(), "int", true, None, "");
        let i = interface(vec![
            method(true, "int", "get", vec![]),
            method(
                true,
                "void",
                "fill",
                vec![Argument::with_direction(loc(), Direction::Out, arr, "buf")],
            ),
        ]);
        assert!(!i.check_valid(&tn, &mut diag));
        let kinds = diag.kinds();
        assert!(kinds.contains(&DiagnosticKind::Error(ErrorCode::OnewayReturn)));
        assert!(kinds.contains(&DiagnosticKind::Error(ErrorCode::OnewayOutParameter)));
    }

    #[test]
    fn out_capable_arguments_require_an_explicit_direction() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let arr = TypeSpecifier::new(loc(), "int", true, None, "");
        let i = interface(vec![method(
            false,
            "void",
            "fill",
            vec![Argument::new(loc(), arr, "buf")],
        )]);
        assert!(!i.check_valid(&tn, &mut diag));
        assert!(diag
            .kinds()
            .contains(&DiagnosticKind::Error(ErrorCode::MissingDirection)));
    }

    #[test]
    fn primitives_cannot_flow_out() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = interface(vec![method(
            false,
            "void",
            "get",
            vec![Argument::with_direction(
                loc(),
                Direction::Out,
                spec("int"),
                "v",
            )],
        )]);
        assert!(!i.check_valid(&tn, &mut diag));
        let message = diag
            .iter()
            .find(|d| d.kind == DiagnosticKind::Error(ErrorCode::InvalidDirection))
            .map(|d| d.message.clone())
            .unwrap_or_default();
        assert!(message.contains("a primitive type"));
    }

    #[test]
    fn reserved_argument_names_are_rejected() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = interface(vec![method(
            false,
            "void",
            "run",
            vec![
                Argument::new(loc(), spec("int"), "class"),
                Argument::new(loc(), spec("int"), "_ridl_tmp"),
            ],
        )]);
        assert!(!i.check_valid(&tn, &mut diag));
        let reserved = diag
            .kinds()
            .into_iter()
            .filter(|k| *k == DiagnosticKind::Error(ErrorCode::ReservedArgumentName))
            .count();
        assert_eq!(reserved, 2);
    }

    #[test]
    fn reserved_method_signatures_are_rejected() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = interface(vec![method(false, "IBinder", "asBinder", vec![])]);
        assert!(!i.check_valid(&tn, &mut diag));
        assert!(diag
            .kinds()
            .contains(&DiagnosticKind::Error(ErrorCode::ReservedMethod)));
    }

    #[test]
    fn interface_names_should_start_with_i() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let i = DefinedType::Interface(InterfaceDecl::new(
            loc(),
            "Calc",
            "p",
            "",
            false,
            vec![],
            vec![],
        ));
        assert!(i.check_valid(&tn, &mut diag));
        assert_eq!(
            diag.kinds(),
            vec![DiagnosticKind::Advisory(AdvisoryKind::InterfaceName)]
        );
    }

    #[test]
    fn interface_oneway_marks_every_method() {
        let i = InterfaceDecl::new(
            loc(),
            "IEvents",
            "p",
            "",
            true,
            vec![],
            vec![method(false, "void", "onEvent", vec![])],
        );
        assert!(i.methods()[0].is_oneway());
    }

    #[test]
    fn descriptor_falls_back_to_the_canonical_name() {
        let i = InterfaceDecl::new(loc(), "IFoo", "com.example", "", false, vec![], vec![]);
        assert_eq!(i.descriptor(), "com.example.IFoo");
    }

    #[test]
    fn unstructured_parcelable_header_is_unquoted() {
        let p = Parcelable::new(
            loc(),
            "Rect",
            "p",
            "",
            vec![],
            "\"ui/rect.h\"",
            None,
            vec![],
        );
        assert_eq!(p.cpp_header(), "ui/rect.h");
    }

    #[test]
    fn cpp_backends_require_a_native_header() {
        let tn = Typenames::new();
        let p = DefinedType::Parcelable(Parcelable::new(
            loc(),
            "Rect",
            "p",
            "",
            vec![],
            "",
            None,
            vec![],
        ));
        let mut diag = Diagnostics::new();
        assert!(!p.language_specific_check_valid(&tn, Backend::Cpp, &mut diag));
        assert!(p.language_specific_check_valid(&tn, Backend::Java, &mut Diagnostics::new()));
    }

    #[test]
    fn dump_renders_an_enum_with_folded_values() {
        let tn = Typenames::new();
        let mut diag = Diagnostics::new();
        let mut e = simple_enum(&[("A", None), ("B", None)]);
        assert!(e.autofill(&tn, &mut diag));
        let decl = DefinedType::Enum(e);
        let mut w = CodeWriter::new();
        decl.dump(&mut w, &tn);
        assert_eq!(w.as_str(), "enum Kind {\n  A = 0,\n  B = 1,\n}\n");
    }
}
