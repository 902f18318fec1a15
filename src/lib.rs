pub use crate::annotation::{Annotatable, Annotation, AnnotationKind};
pub use crate::diagnostics::{AdvisoryKind, Diagnostic, DiagnosticKind, Diagnostics, ErrorCode};

pub mod annotation;
pub mod ast;
pub mod decl;
pub mod diagnostics;
pub mod document;
pub mod members;
pub mod typenames;
pub mod types;
pub mod value;
pub mod writer;
