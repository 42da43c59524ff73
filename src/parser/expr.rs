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

//! Expression parser.

use crate::ast::{BinOp, Expr, ExprKind, SourceSpan, Span, UnaryOp};
use nom::Parser;
use nom::{
    branch::alt,
    character::complete::one_of,
    combinator::{cut, map, map_res, not, opt},
    error::context,
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::{delimited, pair, terminated},
};

use super::PResult;
use super::utils::{dotted_name, keyword, op_char, string_literal, type_name, ws, ws_char, ws_tag};

/// Top-level expression parser.
pub(super) fn expr(input: Span<'_>) -> PResult<'_, Expr> {
    parse_conditional(input)
}

/// Parses `cond ? a : b` (right-associative).
fn parse_conditional(input: Span<'_>) -> PResult<'_, Expr> {
    let (input, cond) = parse_or(input)?;
    let (input, question) = opt(ws_char('?')).parse(input)?;
    if question.is_none() {
        return Ok((input, cond));
    }
    let (input, then_value) = cut(context("expression after '?'", expr)).parse(input)?;
    let (input, _) = cut(context("':'", ws_char(':'))).parse(input)?;
    let (input, else_value) = cut(context("expression after ':'", expr)).parse(input)?;
    let span = cond.span.merge(&else_value.span);
    Ok((
        input,
        Expr {
            kind: ExprKind::Conditional {
                cond: Box::new(cond),
                then_value: Box::new(then_value),
                else_value: Box::new(else_value),
            },
            span,
        },
    ))
}

/// Folds a left-associative chain of `operand (op operand)*`.
fn fold_binary<'a>(
    input: Span<'a>,
    operand: fn(Span<'a>) -> PResult<'a, Expr>,
    operator: fn(Span<'a>) -> PResult<'a, BinOp>,
) -> PResult<'a, Expr> {
    let (mut input, mut left) = operand(input)?;
    loop {
        let (next, op) = opt(operator).parse(input)?;
        let Some(op) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = cut(context("operand", operand)).parse(next)?;
        let span = left.span.merge(&right.span);
        left = Expr {
            kind: ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        };
        input = next;
    }
    Ok((input, left))
}

fn parse_or(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_and, |i| map(ws_tag("||"), |_| BinOp::Or).parse(i))
}

fn parse_and(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_equality, |i| {
        map(ws_tag("&&"), |_| BinOp::And).parse(i)
    })
}

fn parse_equality(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_relational, |i| {
        alt((
            map(ws_tag("=="), |_| BinOp::Eq),
            map(ws_tag("!="), |_| BinOp::Ne),
        ))
        .parse(i)
    })
}

fn parse_relational(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_additive, |i| {
        alt((
            map(ws_tag("<="), |_| BinOp::Le),
            map(ws_tag(">="), |_| BinOp::Ge),
            map(ws_char('<'), |_| BinOp::Lt),
            map(ws_char('>'), |_| BinOp::Gt),
        ))
        .parse(i)
    })
}

fn parse_additive(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_multiplicative, |i| {
        // `+=`/`-=` belong to assignment statements, never to expressions.
        alt((
            map(op_char('+', "="), |_| BinOp::Add),
            map(op_char('-', "="), |_| BinOp::Sub),
        ))
        .parse(i)
    })
}

fn parse_multiplicative(input: Span<'_>) -> PResult<'_, Expr> {
    fold_binary(input, parse_unary, |i| {
        alt((
            map(op_char('*', "="), |_| BinOp::Mul),
            map(op_char('/', "="), |_| BinOp::Div),
            map(op_char('%', "="), |_| BinOp::Rem),
        ))
        .parse(i)
    })
}

/// Parses prefix operators and casts.
fn parse_unary(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    // Prefix operators are parsed recursively to support chains like `--x`.
    let (rest, op) = opt(alt((
        map(ws_char('-'), |_| UnaryOp::Neg),
        map(ws_char('+'), |_| UnaryOp::Plus),
        map(op_char('!', "="), |_| UnaryOp::Not),
    )))
    .parse(input)?;
    if let Some(op) = op {
        let (rest, operand) = cut(context("operand", parse_unary)).parse(rest)?;
        let span = SourceSpan::from_bounds(start, rest);
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            },
        ));
    }

    // A parenthesized type keyword is always a cast since type names are reserved.
    let (rest, cast) = opt(delimited(ws_char('('), ws(type_name), ws_char(')'))).parse(input)?;
    if let Some(ty) = cast {
        let (rest, operand) = cut(context("operand of cast", parse_unary)).parse(rest)?;
        let span = SourceSpan::from_bounds(start, rest);
        return Ok((
            rest,
            Expr {
                kind: ExprKind::Cast {
                    ty,
                    operand: Box::new(operand),
                },
                span,
            },
        ));
    }

    parse_primary(input)
}

/// Parses expression atoms.
fn parse_primary(input: Span<'_>) -> PResult<'_, Expr> {
    context(
        "expression",
        alt((
            parse_parenthesized,
            parse_number,
            parse_string,
            parse_bool,
            parse_ident_or_call,
        )),
    )
    .parse(input)
}

/// Parses parenthesized expressions.
fn parse_parenthesized(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, _) = ws_char('(').parse(input)?;
    let (input, inner) = cut(expr).parse(input)?;
    let (input, _) = cut(context("')'", ws_char(')'))).parse(input)?;
    let mut inner = inner;
    // Preserve outer range for better diagnostics around parenthesized terms.
    inner.span = SourceSpan::from_bounds(start, input);
    Ok((input, inner))
}

/// Parses numeric literals, honouring C-style `d f m` / `l` suffixes.
fn parse_number(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, kind) = ws(map_res(
        pair(
            recognize_float,
            opt(terminated(
                one_of("dDfFmMlL"),
                not(nom::character::complete::satisfy(|c: char| {
                    c == '_' || c.is_ascii_alphanumeric()
                })),
            )),
        ),
        |(digits, suffix): (Span<'_>, Option<char>)| number_kind(digits.fragment(), suffix),
    ))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((input, Expr { kind, span }))
}

/// Classifies a numeric literal as integer or floating point.
fn number_kind(digits: &str, suffix: Option<char>) -> Result<ExprKind, String> {
    let looks_real = digits.contains(['.', 'e', 'E']);
    match suffix {
        Some('d' | 'D' | 'f' | 'F' | 'm' | 'M') => digits
            .parse::<f64>()
            .map(ExprKind::Number)
            .map_err(|err| err.to_string()),
        _ if looks_real => digits
            .parse::<f64>()
            .map(ExprKind::Number)
            .map_err(|err| err.to_string()),
        _ => digits
            .parse::<i64>()
            .map(ExprKind::Integer)
            .map_err(|err| err.to_string()),
    }
}

/// Parses string literal expressions.
fn parse_string(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, text) = ws(string_literal).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Text(text),
            span,
        },
    ))
}

/// Parses `true` / `false`.
fn parse_bool(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, value) = ws(alt((
        map(keyword("true"), |_| true),
        map(keyword("false"), |_| false),
    )))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Expr {
            kind: ExprKind::Bool(value),
            span,
        },
    ))
}

/// Parses either a (dotted) identifier or a call expression.
fn parse_ident_or_call(input: Span<'_>) -> PResult<'_, Expr> {
    let start = input;
    let (input, name) = ws(dotted_name).parse(input)?;
    let (input, args) = opt(call_args).parse(input)?;

    let span = SourceSpan::from_bounds(start, input);
    // A name followed by `(...)` is parsed as call, otherwise identifier.
    let kind = if let Some(args) = args {
        ExprKind::Call { name, args }
    } else {
        ExprKind::Ident(name)
    };

    Ok((input, Expr { kind, span }))
}

/// Parses a parenthesized, comma-separated argument list.
pub(super) fn call_args(input: Span<'_>) -> PResult<'_, Vec<Expr>> {
    let (input, _) = ws_char('(').parse(input)?;
    let (input, args) = separated_list0(ws_char(','), expr).parse(input)?;
    let (input, _) = cut(context("')'", ws_char(')'))).parse(input)?;
    Ok((input, args))
}
