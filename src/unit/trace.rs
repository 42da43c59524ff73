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

//! Source locations attached to runtime faults.

use crate::ast::SourceSpan;
use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statement location captured at compile time for fault reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultLocation {
    /// Procedure containing the statement.
    pub procedure: String,
    /// 1-based source line.
    pub line: usize,
    /// 1-based source column.
    pub column: usize,
    /// Source line snippet.
    pub snippet: String,
    /// Caret pointer for `snippet`.
    pub pointer: String,
}

impl FaultLocation {
    pub(crate) fn new(procedure: &str, source: &str, span: &SourceSpan) -> Self {
        let marker = Diagnostic::from_span("statement", source, span);
        Self {
            procedure: procedure.to_string(),
            line: marker.line,
            column: marker.column,
            snippet: marker.snippet,
            pointer: marker.pointer,
        }
    }
}

impl fmt::Display for FaultLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in {} at line {}, column {}\n{:>3} | {}\n    | {}",
            self.procedure, self.line, self.column, self.line, self.snippet, self.pointer
        )
    }
}

/// One helper call on the way to a fault, innermost first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceFrame {
    /// Calling procedure.
    pub procedure: String,
    /// 1-based line of the call site.
    pub line: usize,
    /// 1-based column of the call site.
    pub column: usize,
}

impl From<&FaultLocation> for TraceFrame {
    fn from(location: &FaultLocation) -> Self {
        Self {
            procedure: location.procedure.clone(),
            line: location.line,
            column: location.column,
        }
    }
}
