//! Core AST infrastructure for the ridl language
//!
//! Every node in the tree records the source span it was parsed from and
//! exposes a uniform diagnostic-printing contract. Concrete node types live
//! in `types`, `members`, and `decl`; this module owns only the shared base.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A line/column pair inside a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Point {
    pub line: usize,
    pub column: usize,
}

impl Point {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Whether a location was parsed from user source or synthesized by the
/// compiler (autofilled enumerator values, schema-internal types, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    Parsed,
    Derived,
}

/// A source span: file path plus begin/end points. Immutable once created;
/// every node owns exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    file: String,
    begin: Point,
    end: Point,
    provenance: Provenance,
}

impl Location {
    pub fn new(file: impl Into<String>, begin: Point, end: Point) -> Self {
        Self {
            file: file.into(),
            begin,
            end,
            provenance: Provenance::Parsed,
        }
    }

    /// A location for nodes the compiler synthesizes itself.
    pub fn internal() -> Self {
        Self {
            file: "<internal>".to_string(),
            begin: Point::default(),
            end: Point::default(),
            provenance: Provenance::Derived,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn begin(&self) -> Point {
        self.begin
    }

    pub fn end(&self) -> Point {
        self.end
    }

    /// True when the span points at real user source.
    pub fn is_known(&self) -> bool {
        self.provenance == Provenance::Parsed
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if self.is_known() {
            write!(f, ":{}.{}-", self.begin.line, self.begin.column)?;
            if self.begin.line != self.end.line {
                write!(f, "{}.", self.end.line)?;
            }
            write!(f, "{}", self.end.column)?;
        }
        Ok(())
    }
}

/// Base identity for every AST element: a node owns its location and can
/// print it in the two canonical diagnostic forms.
pub trait Node {
    fn location(&self) -> &Location;

    /// `file:line`, the short form used in error prefixes.
    fn print_line(&self) -> String {
        let loc = self.location();
        format!("{}:{}", loc.file(), loc.begin().line)
    }

    /// `file:line:col:line:col`, the full-span form.
    fn print_location(&self) -> String {
        let loc = self.location();
        format!(
            "{}:{}:{}:{}:{}",
            loc.file(),
            loc.begin().line,
            loc.begin().column,
            loc.end().line,
            loc.end().column
        )
    }
}

static HIDE_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"@hide\b").expect("hide-tag regex"));

/// True when a doc comment carries an `@hide` tag.
pub(crate) fn has_hide_comment(comments: &str) -> bool {
    HIDE_TAG.is_match(comments)
}
