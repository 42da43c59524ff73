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

//! `nom` parser for card formulas.
//!
//! The grammar supports:
//! - leading `using A.B;` directives
//! - top-level `class` definitions holding methods
//! - top-level method definitions (wrapped in an implicit class later)
//! - bare statements (wrapped in an implicit `Calculate` method later)
//!
//! Statements support declarations, (compound) assignment, `if`/`else`,
//! blocks, `return`, `throw new Exception(...)` and call statements. There are
//! no loops.
//!
//! Expressions support:
//! - numeric, string and boolean literals
//! - identifiers, dotted names (`Math.PI`) and calls (`Math.Pow(x, 2)`)
//! - unary `- + !` and casts (`(int)x`)
//! - binary `* / %`, `+ -`, comparisons, `== !=`, `&& ||`
//! - the conditional operator `c ? a : b`

mod expr;
mod statements;
mod utils;

use crate::ast::{Program, SourceSpan, Span};
use crate::diagnostics::{CompileError, Diagnostic};
use nom::{
    IResult,
    combinator::all_consuming,
    error::{VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::delimited,
};

use self::statements::{TopItem, top_item};
use self::utils::ws0;

type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

/// Parses a formula source into a spanned AST program.
pub fn parse_program(source: &str) -> Result<Program, CompileError> {
    parse_program_in_source(source, "<formula>")
}

/// Parses a formula source while tagging diagnostics with a source label.
pub(crate) fn parse_program_in_source(
    source: &str,
    source_name: &str,
) -> Result<Program, CompileError> {
    let input = Span::new(source);
    // `all_consuming` ensures trailing garbage is treated as syntax error.
    let (_, items) = match all_consuming(delimited(ws0, many0(top_item), ws0))(input) {
        Ok(v) => v,
        Err(err) => {
            return Err(CompileError::single(
                source_name,
                parse_error_to_diagnostic(err, source),
            ));
        }
    };

    let mut program = Program::default();
    for item in items {
        match item {
            TopItem::Using(name) => program.usings.push(name),
            TopItem::Class(class) => program.classes.push(class),
            TopItem::Method(method) => program.methods.push(method),
            TopItem::Stmt(stmt) => program.statements.push(stmt),
        }
    }
    Ok(program)
}

/// Converts a `nom` verbose error to a source-mapped diagnostic.
fn parse_error_to_diagnostic(err: nom::Err<VerboseError<Span<'_>>>, source: &str) -> Diagnostic {
    match err {
        nom::Err::Incomplete(_) => Diagnostic::message_only("Incomplete input"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // The first entry is the deepest failure point; outer entries add context.
            let Some((anchor, first_kind)) = e.errors.first() else {
                return Diagnostic::message_only("Syntax error");
            };
            let kind = e
                .errors
                .iter()
                .map(|(_, kind)| kind)
                .find(|kind| matches!(kind, VerboseErrorKind::Context(_)))
                .unwrap_or(first_kind);
            let span = SourceSpan::from_bounds(*anchor, *anchor);
            let detail = match kind {
                VerboseErrorKind::Context(ctx) => format!("Syntax error: expected {ctx}"),
                VerboseErrorKind::Char(c) => format!("Syntax error: expected '{c}'"),
                VerboseErrorKind::Nom(nom::error::ErrorKind::Eof) => {
                    "Syntax error: unexpected input".to_string()
                }
                VerboseErrorKind::Nom(kind) => format!("Syntax error near {kind:?}"),
            };
            Diagnostic::from_span(detail, source, &span)
        }
    }
}
