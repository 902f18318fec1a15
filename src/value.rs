//! Constant-value expressions
//!
//! The semantic core treats constant expressions as an opaque value type:
//! it needs `check_valid`, a rendered string for a declared type (empty
//! string is the canonical "invalid/unrenderable" sentinel), a walker for
//! reference discovery, and integral constructors for enum autofill.
//! Arithmetic folding happens here only for integral expressions; anything
//! richer belongs to a full constant evaluator, which is out of scope.

use serde::{Deserialize, Serialize};

use crate::types::TypeSpecifier;

/// Renders a raw constant string for its declared type. The default
/// decorator special-cases enum-typed constants (`EnumName.MEMBER`); the
/// plain one passes the value through.
pub type Decorator<'a> = &'a dyn Fn(&TypeSpecifier, String) -> String;

/// Pass-through decorator for contexts with no enum-typed values
/// (annotation parameters, schema defaults).
pub fn plain_decorator(_: &TypeSpecifier, raw: String) -> String {
    raw
}

/// A constant expression, unevaluated until rendered against a type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstExpr {
    Boolean(bool),
    Integral { value: i64, raw: String },
    Floating { raw: String },
    Str(String),
    Array(Vec<ConstExpr>),
    /// A symbolic reference to another named constant (`FOO`, `Type.FOO`).
    Ref(String),
    Unary { op: String, operand: Box<ConstExpr> },
    Binary { lhs: Box<ConstExpr>, op: String, rhs: Box<ConstExpr> },
}

impl ConstExpr {
    pub fn integral(value: i64) -> Self {
        ConstExpr::Integral {
            value,
            raw: value.to_string(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        ConstExpr::Str(value.into())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        ConstExpr::Ref(name.into())
    }

    pub fn binary(lhs: ConstExpr, op: impl Into<String>, rhs: ConstExpr) -> Self {
        ConstExpr::Binary {
            lhs: Box::new(lhs),
            op: op.into(),
            rhs: Box::new(rhs),
        }
    }

    /// Structural well-formedness, independent of any declared type.
    pub fn check_valid(&self) -> bool {
        match self {
            ConstExpr::Boolean(_) | ConstExpr::Integral { .. } | ConstExpr::Str(_) => true,
            ConstExpr::Floating { raw } => raw.trim_end_matches(['f', 'F']).parse::<f64>().is_ok(),
            ConstExpr::Array(items) => items.iter().all(|i| i.check_valid()),
            ConstExpr::Ref(name) => !name.is_empty(),
            ConstExpr::Unary { operand, .. } => operand.check_valid(),
            ConstExpr::Binary { lhs, rhs, .. } => lhs.check_valid() && rhs.check_valid(),
        }
    }

    /// Preorder walk over the expression tree.
    pub fn walk(&self, visit: &mut dyn FnMut(&ConstExpr)) {
        visit(self);
        match self {
            ConstExpr::Array(items) => {
                for item in items {
                    item.walk(visit);
                }
            }
            ConstExpr::Unary { operand, .. } => operand.walk(visit),
            ConstExpr::Binary { lhs, rhs, .. } => {
                lhs.walk(visit);
                rhs.walk(visit);
            }
            _ => {}
        }
    }

    /// The first symbolic reference in the tree, if any. Stops at the first
    /// match; used to reject references where compile-time constants are
    /// required.
    pub fn first_reference(&self) -> Option<&str> {
        match self {
            ConstExpr::Ref(name) => Some(name),
            ConstExpr::Array(items) => items.iter().find_map(|i| i.first_reference()),
            ConstExpr::Unary { operand, .. } => operand.first_reference(),
            ConstExpr::Binary { lhs, rhs, .. } => {
                lhs.first_reference().or_else(|| rhs.first_reference())
            }
            _ => None,
        }
    }

    /// Folds an integral expression, resolving references through
    /// `resolver`. `None` means the expression is not integral, a reference
    /// did not resolve, or arithmetic overflowed.
    pub fn evaluate(&self, resolver: &dyn Fn(&str) -> Option<i64>) -> Option<i64> {
        match self {
            ConstExpr::Integral { value, .. } => Some(*value),
            ConstExpr::Ref(name) => resolver(name),
            ConstExpr::Unary { op, operand } => {
                let v = operand.evaluate(resolver)?;
                match op.as_str() {
                    "+" => Some(v),
                    "-" => v.checked_neg(),
                    "~" => Some(!v),
                    _ => None,
                }
            }
            ConstExpr::Binary { lhs, op, rhs } => {
                let l = lhs.evaluate(resolver)?;
                let r = rhs.evaluate(resolver)?;
                match op.as_str() {
                    "+" => l.checked_add(r),
                    "-" => l.checked_sub(r),
                    "*" => l.checked_mul(r),
                    "/" => l.checked_div(r),
                    "%" => l.checked_rem(r),
                    "&" => Some(l & r),
                    "|" => Some(l | r),
                    "^" => Some(l ^ r),
                    "<<" => u32::try_from(r).ok().and_then(|s| l.checked_shl(s)),
                    ">>" => u32::try_from(r).ok().and_then(|s| l.checked_shr(s)),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Renders the expression for its declared type, then decorates it.
    /// Returns the empty string when the value cannot represent the type.
    pub fn value_string(&self, ty: &TypeSpecifier, decorator: Decorator) -> String {
        if !self.check_valid() {
            return String::new();
        }
        match self.render_for(ty) {
            Some(raw) => decorator(ty, raw),
            None => String::new(),
        }
    }

    fn render_for(&self, ty: &TypeSpecifier) -> Option<String> {
        if ty.is_array() {
            let items = match self {
                ConstExpr::Array(items) => items,
                _ => return None,
            };
            let base = ty.array_base();
            let rendered = items
                .iter()
                .map(|i| i.render_for(&base))
                .collect::<Option<Vec<_>>>()?;
            return Some(format!("{{{}}}", rendered.join(", ")));
        }

        if ty.defined_type().is_some() {
            // Enum-typed values must be references; the decorator rewrites
            // them to `EnumName.MEMBER`.
            return match self {
                ConstExpr::Ref(name) => Some(name.clone()),
                _ => None,
            };
        }

        match ty.name() {
            "boolean" => match self {
                ConstExpr::Boolean(b) => Some(b.to_string()),
                _ => None,
            },
            "byte" | "char" | "int" | "long" => {
                let v = self.evaluate(&|_| None)?;
                fits_integral(ty.name(), v).then(|| v.to_string())
            }
            "float" | "double" => match self {
                ConstExpr::Floating { raw } => Some(raw.clone()),
                ConstExpr::Integral { raw, .. } => Some(raw.clone()),
                _ => None,
            },
            "String" => match self {
                ConstExpr::Str(s) => Some(format!("\"{}\"", s)),
                _ => None,
            },
            _ => None,
        }
    }

    /// The implicit default synthesized for a field declared without one.
    /// `None` for types with no representable implicit default.
    pub fn default_for(ty: &TypeSpecifier) -> Option<ConstExpr> {
        if ty.is_array() || ty.is_generic() {
            return None;
        }
        match ty.name() {
            "boolean" => Some(ConstExpr::Boolean(false)),
            "byte" | "char" | "int" | "long" => Some(ConstExpr::integral(0)),
            "float" | "double" => Some(ConstExpr::Floating {
                raw: "0.0".to_string(),
            }),
            _ => None,
        }
    }
}

/// Range check for the integral backing and constant types.
pub(crate) fn fits_integral(type_name: &str, value: i64) -> bool {
    match type_name {
        "byte" => i8::try_from(value).is_ok(),
        "char" => (0..=u16::MAX as i64).contains(&value),
        "int" => i32::try_from(value).is_ok(),
        "long" => true,
        _ => false,
    }
}
