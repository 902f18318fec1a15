//! Member declarations: fields, arguments, constants, and methods.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{has_hide_comment, Location, Node};
use crate::diagnostics::{Diagnostics, ErrorCode};
use crate::typenames::Typenames;
use crate::types::{decorate_constant, TypeSpecifier};
use crate::value::{ConstExpr, Decorator};

/// A variable declaration: a field of a parcelable/union, or the base of a
/// method argument.
#[derive(Debug, Clone)]
pub struct Variable {
    location: Location,
    ty: TypeSpecifier,
    name: String,
    default_value: Option<ConstExpr>,
    default_user_specified: bool,
}

impl Variable {
    /// A field without an explicit default: one is synthesized from the
    /// type where the type has a representable implicit default. Affects
    /// only rendering, not validation.
    pub fn new(location: Location, ty: TypeSpecifier, name: impl Into<String>) -> Self {
        let default_value = ConstExpr::default_for(&ty);
        Self {
            location,
            ty,
            name: name.into(),
            default_value,
            default_user_specified: false,
        }
    }

    pub fn with_default(
        location: Location,
        ty: TypeSpecifier,
        name: impl Into<String>,
        default_value: ConstExpr,
    ) -> Self {
        Self {
            location,
            ty,
            name: name.into(),
            default_value: Some(default_value),
            default_user_specified: true,
        }
    }

    pub fn ty(&self) -> &TypeSpecifier {
        &self.ty
    }

    pub(crate) fn ty_mut(&mut self) -> &mut TypeSpecifier {
        &mut self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_value(&self) -> Option<&ConstExpr> {
        self.default_value.as_ref()
    }

    pub fn default_user_specified(&self) -> bool {
        self.default_user_specified
    }

    /// A default that actually initializes the field: an explicit (or
    /// synthesized) value, or nullability. Drives the union
    /// first-member rule.
    pub fn has_useful_default(&self) -> bool {
        use crate::annotation::Annotatable;
        self.default_value.is_some() || self.ty.is_nullable()
    }

    pub fn value_string(&self, decorator: Decorator) -> String {
        match &self.default_value {
            Some(value) => value.value_string(&self.ty, decorator),
            None => String::new(),
        }
    }

    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut valid = self.ty.check_valid(typenames, diag);

        if self.ty.name() == "void" {
            diag.error(
                &self.location,
                ErrorCode::VoidDeclaration,
                format!(
                    "Declaration {} is void, but declarations cannot be of void type.",
                    self.name
                ),
            );
            valid = false;
        }

        let default_value = match &self.default_value {
            Some(value) => value,
            None => return valid,
        };
        if !default_value.check_valid() {
            diag.error(
                &self.location,
                ErrorCode::InvalidDefaultValue,
                format!("Invalid default value for '{}'.", self.name),
            );
            return false;
        }
        if !valid {
            return false;
        }

        let decorator = |t: &TypeSpecifier, raw: String| decorate_constant(typenames, t, raw);
        if self.value_string(&decorator).is_empty() {
            diag.error(
                &self.location,
                ErrorCode::InvalidDefaultValue,
                format!(
                    "Invalid default value for '{}' of type {}.",
                    self.name,
                    self.ty.signature()
                ),
            );
            return false;
        }
        true
    }

    /// Field name with its first letter capitalized, as a getter would
    /// spell it. An empty name is a broken invariant upstream.
    pub fn capitalized_name(&self) -> String {
        let mut chars = self.name.chars();
        let first = chars.next().expect("field name can't be empty");
        first.to_uppercase().collect::<String>() + chars.as_str()
    }

    pub fn signature(&self) -> String {
        format!("{} {}", self.ty.signature(), self.name)
    }

    pub fn to_code(&self, typenames: &Typenames) -> String {
        let mut ret = format!("{} {}", self.ty.to_code(), self.name);
        if self.default_value.is_some() && self.default_user_specified {
            let decorator = |t: &TypeSpecifier, raw: String| decorate_constant(typenames, t, raw);
            ret.push_str(" = ");
            ret.push_str(&self.value_string(&decorator));
        }
        ret
    }
}

impl Node for Variable {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// Data-flow direction of a method argument relative to the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    In,
    Out,
    Inout,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Inout => "inout",
        };
        write!(f, "{}", name)
    }
}

/// A method argument: a variable plus a direction. The direction may be
/// absent in source; whether that is acceptable for the type is decided by
/// interface validation, not here.
#[derive(Debug, Clone)]
pub struct Argument {
    var: Variable,
    direction: Direction,
    direction_specified: bool,
}

impl Argument {
    pub fn new(location: Location, ty: TypeSpecifier, name: impl Into<String>) -> Self {
        Self {
            var: Variable::new(location, ty, name),
            direction: Direction::In,
            direction_specified: false,
        }
    }

    pub fn with_direction(
        location: Location,
        direction: Direction,
        ty: TypeSpecifier,
        name: impl Into<String>,
    ) -> Self {
        Self {
            var: Variable::new(location, ty, name),
            direction,
            direction_specified: true,
        }
    }

    pub fn ty(&self) -> &TypeSpecifier {
        self.var.ty()
    }

    pub(crate) fn ty_mut(&mut self) -> &mut TypeSpecifier {
        self.var.ty_mut()
    }

    pub fn name(&self) -> &str {
        self.var.name()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn direction_specified(&self) -> bool {
        self.direction_specified
    }

    /// Data flows into the callee.
    pub fn is_in(&self) -> bool {
        matches!(self.direction, Direction::In | Direction::Inout)
    }

    /// Data flows back to the caller.
    pub fn is_out(&self) -> bool {
        matches!(self.direction, Direction::Out | Direction::Inout)
    }

    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        self.var.check_valid(typenames, diag)
    }

    pub fn to_code(&self, typenames: &Typenames) -> String {
        if self.direction_specified {
            format!("{} {}", self.direction, self.var.to_code(typenames))
        } else {
            self.var.to_code(typenames)
        }
    }
}

impl Node for Argument {
    fn location(&self) -> &Location {
        self.var.location()
    }
}

/// The fixed set of legal constant-declaration types.
const SUPPORTED_CONST_TYPES: &[&str] = &["String", "byte", "int", "long"];

/// A named constant with a required value.
#[derive(Debug, Clone)]
pub struct ConstantDecl {
    location: Location,
    ty: TypeSpecifier,
    name: String,
    value: ConstExpr,
}

impl ConstantDecl {
    pub fn new(
        location: Location,
        ty: TypeSpecifier,
        name: impl Into<String>,
        value: ConstExpr,
    ) -> Self {
        Self {
            location,
            ty,
            name: name.into(),
            value,
        }
    }

    pub fn ty(&self) -> &TypeSpecifier {
        &self.ty
    }

    pub(crate) fn ty_mut(&mut self) -> &mut TypeSpecifier {
        &mut self.ty
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &ConstExpr {
        &self.value
    }

    pub fn value_string(&self, decorator: Decorator) -> String {
        self.value.value_string(&self.ty, decorator)
    }

    pub fn check_valid(&self, typenames: &Typenames, diag: &mut Diagnostics) -> bool {
        let mut valid = self.ty.check_valid(typenames, diag);
        if !self.value.check_valid() {
            diag.error(
                &self.location,
                ErrorCode::InvalidConstantValue,
                format!("Invalid value for constant '{}'.", self.name),
            );
            valid = false;
        }
        if !valid {
            return false;
        }

        if !SUPPORTED_CONST_TYPES.contains(&self.ty.signature().as_str()) {
            diag.error(
                &self.location,
                ErrorCode::UnsupportedConstantType,
                format!("Constant of type {} is not supported.", self.ty.signature()),
            );
            return false;
        }
        true
    }

    pub fn signature(&self) -> String {
        format!("{} {}", self.ty.signature(), self.name)
    }

    pub fn to_code(&self, typenames: &Typenames) -> String {
        let decorator = |t: &TypeSpecifier, raw: String| decorate_constant(typenames, t, raw);
        format!(
            "const {} {} = {}",
            self.ty.to_code(),
            self.name,
            self.value_string(&decorator)
        )
    }
}

impl Node for ConstantDecl {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// An interface method.
///
/// The argument list is partitioned by direction once at construction.
/// The optional explicit transaction id keeps wire ordering stable across
/// edits; an absent id means "assign by declaration order", which is the
/// code generator's concern.
#[derive(Debug, Clone)]
pub struct Method {
    location: Location,
    oneway: bool,
    return_type: TypeSpecifier,
    name: String,
    arguments: Vec<Argument>,
    in_indices: Vec<usize>,
    out_indices: Vec<usize>,
    id: Option<i32>,
    comments: String,
}

impl Method {
    pub fn new(
        location: Location,
        oneway: bool,
        return_type: TypeSpecifier,
        name: impl Into<String>,
        arguments: Vec<Argument>,
        comments: impl Into<String>,
    ) -> Self {
        let mut in_indices = Vec::new();
        let mut out_indices = Vec::new();
        for (i, arg) in arguments.iter().enumerate() {
            if arg.is_in() {
                in_indices.push(i);
            }
            if arg.is_out() {
                out_indices.push(i);
            }
        }
        Self {
            location,
            oneway,
            return_type,
            name: name.into(),
            arguments,
            in_indices,
            out_indices,
            id: None,
            comments: comments.into(),
        }
    }

    pub fn with_id(
        location: Location,
        oneway: bool,
        return_type: TypeSpecifier,
        name: impl Into<String>,
        arguments: Vec<Argument>,
        comments: impl Into<String>,
        id: i32,
    ) -> Self {
        let mut method = Self::new(location, oneway, return_type, name, arguments, comments);
        method.id = Some(id);
        method
    }

    pub fn is_oneway(&self) -> bool {
        self.oneway
    }

    /// Interface-level `oneway` marks every method.
    pub(crate) fn apply_interface_oneway(&mut self, oneway: bool) {
        self.oneway |= oneway;
    }

    pub fn return_type(&self) -> &TypeSpecifier {
        &self.return_type
    }

    pub(crate) fn return_type_mut(&mut self) -> &mut TypeSpecifier {
        &mut self.return_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Argument] {
        &self.arguments
    }

    pub(crate) fn arguments_mut(&mut self) -> &mut [Argument] {
        &mut self.arguments
    }

    pub fn in_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.in_indices.iter().map(|&i| &self.arguments[i])
    }

    pub fn out_arguments(&self) -> impl Iterator<Item = &Argument> {
        self.out_indices.iter().map(|&i| &self.arguments[i])
    }

    pub fn has_id(&self) -> bool {
        self.id.is_some()
    }

    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub fn comments(&self) -> &str {
        &self.comments
    }

    pub fn is_hidden(&self) -> bool {
        has_hide_comment(&self.comments)
    }

    /// `name(tySig, tySig, ...)` — the overload-uniqueness key.
    pub fn signature(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| a.ty().signature())
            .collect();
        format!("{}({})", self.name, args.join(", "))
    }

    pub fn to_code(&self, typenames: &Typenames) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| a.to_code(typenames))
            .collect();
        let mut ret = format!(
            "{}{} {}({})",
            if self.oneway { "oneway " } else { "" },
            self.return_type.to_code(),
            self.name,
            args.join(", ")
        );
        if let Some(id) = self.id {
            ret.push_str(&format!(" = {}", id));
        }
        ret
    }
}

impl Node for Method {
    fn location(&self) -> &Location {
        &self.location
    }
}

/// A raw member as the parser produced it; defined types partition these
/// into constants, fields, and methods at construction.
#[derive(Debug, Clone)]
pub enum Member {
    Constant(ConstantDecl),
    Field(Variable),
    Method(Method),
}
