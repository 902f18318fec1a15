//! Line-oriented code writer with indent/dedent scoping.
//!
//! Consumed by the pretty-printing (`dump`) path only; validation never
//! writes through it.

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct CodeWriter {
    buf: String,
    depth: usize,
    at_line_start: bool,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            depth: 0,
            at_line_start: true,
        }
    }

    /// Writes text, applying the current indent at each line start.
    pub fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.buf.push('\n');
                self.at_line_start = true;
                continue;
            }
            if self.at_line_start {
                for _ in 0..self.depth {
                    self.buf.push_str(INDENT);
                }
                self.at_line_start = false;
            }
            self.buf.push(ch);
        }
    }

    pub fn indent(&mut self) {
        self.depth += 1;
    }

    pub fn dedent(&mut self) {
        debug_assert!(self.depth > 0, "dedent below zero");
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indentation_applies_per_line() {
        let mut w = CodeWriter::new();
        w.write("union U {\n");
        w.indent();
        w.write("int a;\n");
        w.write("int b;\n");
        w.dedent();
        w.write("}\n");
        assert_eq!(w.as_str(), "union U {\n  int a;\n  int b;\n}\n");
    }

    #[test]
    fn partial_lines_do_not_re_indent() {
        let mut w = CodeWriter::new();
        w.indent();
        w.write("a");
        w.write("b\n");
        assert_eq!(w.into_string(), "  ab\n");
    }
}
