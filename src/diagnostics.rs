/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Compile-time diagnostics with source snippets and caret pointers.

use crate::ast::SourceSpan;
use std::fmt;

/// One source-mapped message produced by the parser or the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Human-readable error message.
    pub message: String,
    /// 1-based line number (`0` when unavailable).
    pub line: usize,
    /// 1-based column number (`0` when unavailable).
    pub column: usize,
    /// Source line snippet where the error occurred.
    pub snippet: String,
    /// Caret pointer aligned to `snippet`.
    pub pointer: String,
}

impl Diagnostic {
    /// Creates a diagnostic with no location information.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: 0,
            column: 0,
            snippet: String::new(),
            pointer: String::new(),
        }
    }

    /// Creates a source-mapped diagnostic from a [`SourceSpan`].
    pub fn from_span(message: impl Into<String>, source: &str, span: &SourceSpan) -> Self {
        let message = message.into();
        // Pull the exact source line where the parser/compiler reported the span.
        let snippet = source
            .lines()
            .nth(span.line.saturating_sub(1))
            .unwrap_or("")
            .to_string();
        // Compute a safe caret range even when spans extend past line boundaries.
        let line_len = snippet.chars().count();
        let pointer_column = span.column.saturating_sub(1).min(line_len);
        let requested_len = span.len().max(1);
        let max_len = line_len.saturating_sub(pointer_column).max(1);
        let pointer_len = requested_len.min(max_len);
        let pointer = format!("{}{}", " ".repeat(pointer_column), "^".repeat(pointer_len));

        Self {
            message,
            line: span.line,
            column: span.column,
            snippet,
            pointer,
        }
    }

    /// Returns whether this diagnostic points into the source.
    pub fn has_location(&self) -> bool {
        self.line != 0 && self.column != 0
    }

    fn render(&self, f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
        if !self.has_location() {
            if label.is_empty() {
                return write!(f, "{}", self.message);
            }
            return write!(f, "{} ({})", self.message, label);
        }

        let location = if label.is_empty() {
            format!("line {}, column {}", self.line, self.column)
        } else {
            format!("{}:{}:{}", label, self.line, self.column)
        };

        write!(
            f,
            "{}\n --> {}\n  |\n{:>3} | {}\n  | {}",
            self.message, location, self.line, self.snippet, self.pointer
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.render(f, "")
    }
}

/// Failure to compile a formula source.
///
/// Carries every diagnostic found, in source order. A compile error means the
/// card definition itself is broken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Source label used in rendered locations (`"<formula>"`, a card name).
    pub label: String,
    /// Collected diagnostics; never empty.
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    /// Wraps a single diagnostic.
    pub fn single(label: impl Into<String>, diagnostic: Diagnostic) -> Self {
        Self {
            label: label.into(),
            diagnostics: vec![diagnostic],
        }
    }

    /// Wraps collected diagnostics, sorted by source position.
    pub fn from_diagnostics(label: impl Into<String>, mut diagnostics: Vec<Diagnostic>) -> Self {
        if diagnostics.is_empty() {
            diagnostics.push(Diagnostic::message_only("Compilation failed"));
        }
        diagnostics.sort_by_key(|d| (d.line, d.column));
        Self {
            label: label.into(),
            diagnostics,
        }
    }

    /// Returns the first diagnostic.
    pub fn primary(&self) -> Option<&Diagnostic> {
        self.diagnostics.first()
    }

    /// Returns all diagnostic messages without location decoration.
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Compilation failed:")?;
        for diagnostic in &self.diagnostics {
            writeln!(f)?;
            diagnostic.render(f, &self.label)?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}
