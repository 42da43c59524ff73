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

//! Parser trivia and lexical helpers.

use crate::ast::{Span, TypeName};
use nom::Parser;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1, none_of, one_of, satisfy},
    combinator::{cut, map, not, opt, recognize, value, verify},
    error::context,
    multi::{fold_many0, many0},
    sequence::{delimited, pair, preceded, terminated},
};

use super::PResult;

/// Words that can never be identifiers.
const RESERVED: &[&str] = &[
    "abstract", "bool", "class", "const", "decimal", "double", "else", "false", "float", "if",
    "int", "internal", "long", "new", "out", "private", "protected", "public", "return", "sealed",
    "static", "string", "throw", "true", "using", "var", "void",
];

/// Returns whether `word` is a reserved keyword.
pub(super) fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Parses a keyword that is not immediately followed by an identifier char.
pub(super) fn keyword<'a>(kw: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    move |input| terminated(tag(kw), not(satisfy(is_ident_continue))).parse(input)
}

/// Parses declaration type keywords.
pub(super) fn type_name(input: Span<'_>) -> PResult<'_, TypeName> {
    alt((
        map(keyword("double"), |_| TypeName::Double),
        map(keyword("float"), |_| TypeName::Double),
        map(keyword("decimal"), |_| TypeName::Double),
        map(keyword("int"), |_| TypeName::Int),
        map(keyword("long"), |_| TypeName::Int),
        map(keyword("string"), |_| TypeName::String),
        map(keyword("bool"), |_| TypeName::Bool),
    ))
    .parse(input)
}

/// Parses a return type: `void` (as `None`) or a value type.
pub(super) fn return_type(input: Span<'_>) -> PResult<'_, Option<TypeName>> {
    alt((map(keyword("void"), |_| None), map(type_name, Some))).parse(input)
}

/// Parses identifiers (`[A-Za-z_][A-Za-z0-9_]*`) that are not reserved words.
pub(super) fn identifier(input: Span<'_>) -> PResult<'_, String> {
    map(
        verify(
            recognize(pair(
                take_while1(is_ident_start),
                take_while(is_ident_continue),
            )),
            |s: &Span<'_>| !is_reserved(s.fragment()),
        ),
        |s: Span<'_>| s.fragment().to_string(),
    )
    .parse(input)
}

/// Parses a dotted name (`Math`, `Math.Pow`, `System.Math.PI`).
pub(super) fn dotted_name(input: Span<'_>) -> PResult<'_, String> {
    let (input, first) = identifier(input)?;
    let (input, rest) = many0(preceded(ws_char('.'), ws(identifier))).parse(input)?;
    let mut name = first;
    for segment in rest {
        name.push('.');
        name.push_str(&segment);
    }
    Ok((input, name))
}

/// Returns whether a char can start an identifier.
fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Returns whether a char can continue an identifier.
fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Parses a double-quoted string literal with `\\ \" \n \t \r` escapes.
pub(super) fn string_literal(input: Span<'_>) -> PResult<'_, String> {
    delimited(
        char('"'),
        fold_many0(
            alt((
                preceded(
                    char('\\'),
                    cut(context(
                        "escape sequence",
                        map(one_of("\\\"ntr0"), |c| match c {
                            'n' => '\n',
                            't' => '\t',
                            'r' => '\r',
                            '0' => '\0',
                            other => other,
                        }),
                    )),
                ),
                none_of("\\\"\n\r"),
            )),
            String::new,
            |mut acc, c| {
                acc.push(c);
                acc
            },
        ),
        cut(context("closing quote", char('"'))),
    )
    .parse(input)
}

/// Skips zero-or-more whitespace/comments.
pub(super) fn ws0(input: Span<'_>) -> PResult<'_, ()> {
    // Treat spaces/newlines and comments uniformly as trivia.
    value((), many0(alt((value((), multispace1), line_comment, block_comment)))).parse(input)
}

/// Parses `// ...` comments.
fn line_comment(input: Span<'_>) -> PResult<'_, ()> {
    value(
        (),
        pair(tag("//"), opt(nom::character::complete::not_line_ending)),
    )
    .parse(input)
}

/// Parses `/* ... */` comments.
fn block_comment(input: Span<'_>) -> PResult<'_, ()> {
    value(
        (),
        delimited(
            tag("/*"),
            take_until("*/"),
            cut(context("end of comment", tag("*/"))),
        ),
    )
    .parse(input)
}

/// Wraps a parser with leading/trailing whitespace/comment skipping.
pub(super) fn ws<'a, O, P>(mut parser: P) -> impl FnMut(Span<'a>) -> PResult<'a, O>
where
    P: FnMut(Span<'a>) -> PResult<'a, O>,
{
    // This helper keeps grammar rules free from manual trivia handling.
    move |input| delimited(ws0, &mut parser, ws0)(input)
}

/// Parses a specific character token with surrounding whitespace/comments.
pub(super) fn ws_char<'a>(c: char) -> impl FnMut(Span<'a>) -> PResult<'a, char> {
    ws(char(c))
}

/// Parses a one-char operator that must not be directly followed by any of
/// `forbidden_next` (so `+` does not eat the start of `+=`).
pub(super) fn op_char<'a>(
    c: char,
    forbidden_next: &'static str,
) -> impl FnMut(Span<'a>) -> PResult<'a, char> {
    ws(terminated(char(c), not(one_of(forbidden_next))))
}

/// Parses a specific multi-character token with surrounding whitespace/comments.
pub(super) fn ws_tag<'a>(t: &'static str) -> impl FnMut(Span<'a>) -> PResult<'a, Span<'a>> {
    ws(tag(t))
}
