//! The type-name table
//!
//! Maps declared and imported names to their defining declarations, and
//! answers the category probes and capability predicates that validation
//! needs: primitive/built-in classification, interface/enum lookup, and the
//! immutable / fixed-size / out-parameter capabilities.

use std::collections::BTreeMap;

use crate::annotation::Annotatable;
use crate::ast::Node;
use crate::decl::{DeclKind, DefinedType};
use crate::diagnostics::{Diagnostics, ErrorCode};
use crate::document::Document;
use crate::types::TypeSpecifier;

/// Non-owning handle from a resolved type specifier to the defined type it
/// names. Indexes the table's registration order, keeping node ownership
/// strictly tree-shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefinedTypeId(usize);

/// The outcome of a name lookup.
#[derive(Debug, Clone)]
pub struct ResolvedTypename {
    pub is_resolved: bool,
    pub canonical_name: String,
    pub defined_type: Option<DefinedTypeId>,
}

/// What the table remembers about one registered defined type.
#[derive(Debug, Clone)]
pub struct TypeEntry {
    canonical: String,
    kind: DeclKind,
    generic_arity: Option<usize>,
    immutable: bool,
    fixed_size: bool,
}

impl TypeEntry {
    pub fn canonical_name(&self) -> &str {
        &self.canonical
    }

    pub fn kind(&self) -> DeclKind {
        self.kind
    }

    /// Number of declared type parameters, for user-defined generics.
    pub fn generic_arity(&self) -> Option<usize> {
        self.generic_arity
    }

    pub fn is_interface(&self) -> bool {
        self.kind == DeclKind::Interface
    }

    pub fn is_enum(&self) -> bool {
        self.kind == DeclKind::Enum
    }

    /// Any parcelable-like kind: unstructured, structured, or union.
    pub fn is_parcelable(&self) -> bool {
        matches!(
            self.kind,
            DeclKind::Parcelable | DeclKind::StructuredParcelable | DeclKind::Union
        )
    }
}

const PRIMITIVES: &[&str] = &[
    "void", "boolean", "byte", "char", "int", "long", "float", "double",
];

const BUILTINS: &[&str] = &[
    "String",
    "List",
    "Map",
    "IBinder",
    "FileDescriptor",
    "CharSequence",
    "ParcelFileDescriptor",
    "ParcelableHolder",
];

/// The registry queried during resolution and capability checks.
#[derive(Debug, Default)]
pub struct Typenames {
    entries: Vec<TypeEntry>,
    by_name: BTreeMap<String, DefinedTypeId>,
}

impl Typenames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every defined type of a document under its canonical name.
    /// Redefinitions are reported and skipped.
    pub fn add_document(&mut self, document: &Document, diag: &mut Diagnostics) -> bool {
        let mut ok = true;
        for defined in document.defined_types() {
            ok &= self.add_defined_type(defined, diag);
        }
        ok
    }

    fn add_defined_type(&mut self, defined: &DefinedType, diag: &mut Diagnostics) -> bool {
        let canonical = defined.canonical_name();
        if self.by_name.contains_key(&canonical) || Self::is_builtin_typename(&canonical) {
            diag.error(
                defined.location(),
                ErrorCode::DuplicateDefinedType,
                format!("Redefinition of '{}'.", canonical),
            );
            return false;
        }
        let id = DefinedTypeId(self.entries.len());
        self.entries.push(TypeEntry {
            canonical: canonical.clone(),
            kind: defined.kind(),
            generic_arity: defined.generic_arity(),
            immutable: defined.is_java_only_immutable(),
            fixed_size: defined.is_fixed_size(),
        });
        self.by_name.insert(canonical, id);
        true
    }

    pub fn is_primitive_typename(name: &str) -> bool {
        PRIMITIVES.contains(&name)
    }

    pub fn is_builtin_typename(name: &str) -> bool {
        Self::is_primitive_typename(name) || BUILTINS.contains(&name)
    }

    /// Resolves a (canonical or built-in) name. Import expansion happens at
    /// the document level before this is consulted.
    pub fn resolve_typename(&self, name: &str) -> ResolvedTypename {
        if Self::is_builtin_typename(name) {
            return ResolvedTypename {
                is_resolved: true,
                canonical_name: name.to_string(),
                defined_type: None,
            };
        }
        match self.by_name.get(name) {
            Some(&id) => ResolvedTypename {
                is_resolved: true,
                canonical_name: self.entries[id.0].canonical.clone(),
                defined_type: Some(id),
            },
            None => ResolvedTypename {
                is_resolved: false,
                canonical_name: name.to_string(),
                defined_type: None,
            },
        }
    }

    pub fn try_get_defined_type(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).map(|&id| &self.entries[id.0])
    }

    /// Entry for a handle previously produced by resolution. An invalid
    /// handle is a broken invariant upstream.
    pub fn entry(&self, id: DefinedTypeId) -> &TypeEntry {
        &self.entries[id.0]
    }

    /// The interface entry a specifier names, if any.
    pub fn get_interface(&self, ty: &TypeSpecifier) -> Option<&TypeEntry> {
        self.try_get_defined_type(ty.name())
            .filter(|e| e.is_interface())
    }

    /// The enum entry a specifier names, if any.
    pub fn get_enum(&self, ty: &TypeSpecifier) -> Option<&TypeEntry> {
        self.try_get_defined_type(ty.name()).filter(|e| e.is_enum())
    }

    /// Whether a field of this type can live in an immutable parcelable.
    pub fn can_be_java_only_immutable(&self, ty: &TypeSpecifier) -> bool {
        if ty.is_array() {
            return false;
        }
        let name = ty.name();
        if matches!(name, "List" | "Map") {
            return ty
                .type_parameters()
                .iter()
                .all(|p| self.can_be_java_only_immutable(p));
        }
        if Self::is_primitive_typename(name) || matches!(name, "String" | "CharSequence") {
            return true;
        }
        match self.try_get_defined_type(name) {
            Some(entry) => match entry.kind {
                DeclKind::Enum | DeclKind::Interface => true,
                DeclKind::Parcelable | DeclKind::StructuredParcelable | DeclKind::Union => {
                    entry.immutable
                }
            },
            // Binder handles are immutable; the descriptor-carrying
            // builtins are not.
            None => name == "IBinder",
        }
    }

    /// Whether a field of this type can live in a fixed-size parcelable.
    pub fn can_be_fixed_size(&self, ty: &TypeSpecifier) -> bool {
        if ty.is_array() || ty.is_generic() {
            return false;
        }
        let name = ty.name();
        if Self::is_primitive_typename(name) && name != "void" {
            return true;
        }
        match self.try_get_defined_type(name) {
            Some(entry) => {
                entry.is_enum() || (entry.kind == DeclKind::StructuredParcelable && entry.fixed_size)
            }
            None => false,
        }
    }

    /// Whether an argument of this type can flow out of a method call.
    /// When it cannot, the second element names the offending type
    /// category for diagnostics.
    pub fn can_be_out_parameter(&self, ty: &TypeSpecifier) -> (bool, &'static str) {
        if ty.is_array() {
            return (true, "");
        }
        let name = ty.name();
        if Self::is_primitive_typename(name) {
            return (false, "a primitive type");
        }
        if matches!(name, "String" | "CharSequence") {
            return (false, "a string");
        }
        if name == "IBinder" {
            return (false, "a binder");
        }
        if matches!(
            name,
            "List" | "Map" | "ParcelFileDescriptor" | "FileDescriptor" | "ParcelableHolder"
        ) {
            return (true, "");
        }
        match self.try_get_defined_type(name) {
            Some(entry) => match entry.kind {
                DeclKind::Enum => (false, "an enum type"),
                DeclKind::Interface => (false, "an interface"),
                _ => (true, ""),
            },
            None => (false, "an unknown type"),
        }
    }
}
