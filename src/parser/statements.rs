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

//! Statement and top-level item parsers.

use crate::ast::{
    AssignOp, ClassDef, Decl, Expr, ExprKind, Method, Param, ParamMode, SourceSpan, Span, Stmt,
    StmtKind, TypeName,
};
use nom::Parser;
use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::char,
    combinator::{cut, map, not, opt},
    error::context,
    multi::{many0, separated_list0},
    sequence::{preceded, terminated},
};

use super::PResult;
use super::expr::{call_args, expr};
use super::utils::{dotted_name, identifier, keyword, return_type, type_name, ws, ws_char};

/// One top-level AST item.
pub(super) enum TopItem {
    Using(String),
    Class(ClassDef),
    Method(Method),
    Stmt(Stmt),
}

/// Parses one top-level item.
pub(super) fn top_item(input: Span<'_>) -> PResult<'_, TopItem> {
    // Try definitions first to avoid treating their headers as declarations.
    alt((
        map(using_directive, TopItem::Using),
        map(class_def, TopItem::Class),
        map(method_def, TopItem::Method),
        map(statement, TopItem::Stmt),
    ))
    .parse(input)
}

/// Parses `using System;` / `using System.Collections.Generic;`.
fn using_directive(input: Span<'_>) -> PResult<'_, String> {
    let (input, _) = ws(keyword("using")).parse(input)?;
    let (input, name) = cut(context("namespace", ws(dotted_name))).parse(input)?;
    let (input, _) = cut(context("';'", ws_char(';'))).parse(input)?;
    Ok((input, name))
}

/// Parses declaration modifiers and reports whether `abstract` was present.
fn modifiers(input: Span<'_>) -> PResult<'_, bool> {
    let (input, words) = many0(ws(alt((
        keyword("public"),
        keyword("private"),
        keyword("protected"),
        keyword("internal"),
        keyword("static"),
        keyword("sealed"),
        keyword("abstract"),
    ))))
    .parse(input)?;
    Ok((input, words.iter().any(|w| *w.fragment() == "abstract")))
}

/// Parses a `class` definition.
fn class_def(input: Span<'_>) -> PResult<'_, ClassDef> {
    let start = input;
    let (input, is_abstract) = modifiers(input)?;
    let (input, _) = ws(keyword("class")).parse(input)?;
    let (input, name) = cut(context("class name", ws(identifier))).parse(input)?;
    let (input, _) = cut(context("'{'", ws_char('{'))).parse(input)?;
    let (input, methods) = many0(method_def).parse(input)?;
    let (input, _) = cut(context("'}'", ws_char('}'))).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        ClassDef {
            name,
            is_abstract,
            methods,
            span,
        },
    ))
}

/// Parses a method definition (`[modifiers] ret Name(params) { body }`).
pub(super) fn method_def(input: Span<'_>) -> PResult<'_, Method> {
    let start = input;
    let (input, _) = modifiers(input)?;
    let (input, return_ty) = ws(return_type).parse(input)?;
    let (input, name) = ws(identifier).parse(input)?;
    // `type name (` can only start a method, so commit from here on.
    let (input, _) = ws_char('(').parse(input)?;
    let (input, params) = cut(separated_list0(ws_char(','), param)).parse(input)?;
    let (input, _) = cut(context("')'", ws_char(')'))).parse(input)?;
    let (input, body) = cut(context("method body", block)).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Method {
            name,
            return_ty,
            params,
            body,
            span,
        },
    ))
}

/// Parses one method parameter (`[out] type name`).
fn param(input: Span<'_>) -> PResult<'_, Param> {
    let start = input;
    let (input, out) = opt(ws(keyword("out"))).parse(input)?;
    let (input, ty) = context("parameter type", ws(type_name)).parse(input)?;
    let (input, name) = cut(context("parameter name", ws(identifier))).parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    let mode = if out.is_some() {
        ParamMode::Out
    } else {
        ParamMode::In
    };
    Ok((
        input,
        Param {
            mode,
            ty,
            name,
            span,
        },
    ))
}

/// Parses `{ statements }`.
fn block(input: Span<'_>) -> PResult<'_, Vec<Stmt>> {
    let (input, _) = ws_char('{').parse(input)?;
    let (input, body) = many0(statement).parse(input)?;
    let (input, _) = cut(context("'}'", ws_char('}'))).parse(input)?;
    Ok((input, body))
}

/// Parses one statement.
pub(super) fn statement(input: Span<'_>) -> PResult<'_, Stmt> {
    let start = input;
    let (input, kind) = alt((
        map(block, StmtKind::Block),
        if_stmt,
        return_stmt,
        throw_stmt,
        map(let_stmt, StmtKind::Let),
        assign_stmt,
        expr_stmt,
    ))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((input, Stmt { kind, span }))
}

/// Parses the trailing `;` of a simple statement.
fn semicolon(input: Span<'_>) -> PResult<'_, char> {
    cut(context("';'", ws_char(';'))).parse(input)
}

/// Parses `if (cond) stmt [else stmt]`.
fn if_stmt(input: Span<'_>) -> PResult<'_, StmtKind> {
    let (input, _) = ws(keyword("if")).parse(input)?;
    let (input, _) = cut(context("'('", ws_char('('))).parse(input)?;
    let (input, cond) = cut(context("condition", expr)).parse(input)?;
    let (input, _) = cut(context("')'", ws_char(')'))).parse(input)?;
    let (input, then_branch) = cut(context("statement", statement)).parse(input)?;
    let (input, else_branch) =
        opt(preceded(ws(keyword("else")), cut(context("statement", statement)))).parse(input)?;
    Ok((
        input,
        StmtKind::If {
            cond,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        },
    ))
}

/// Parses `return [expr];`.
fn return_stmt(input: Span<'_>) -> PResult<'_, StmtKind> {
    let (input, _) = ws(keyword("return")).parse(input)?;
    let (input, value) = opt(expr).parse(input)?;
    let (input, _) = semicolon(input)?;
    Ok((input, StmtKind::Return(value)))
}

/// Parses `throw new Exception([message]);`.
fn throw_stmt(input: Span<'_>) -> PResult<'_, StmtKind> {
    let (input, _) = ws(keyword("throw")).parse(input)?;
    let (input, _) = cut(context("'new'", ws(keyword("new")))).parse(input)?;
    let (input, exception) = cut(context("exception type", ws(dotted_name))).parse(input)?;
    let (input, args) = cut(context("'('", call_args)).parse(input)?;
    let (input, _) = semicolon(input)?;
    Ok((
        input,
        StmtKind::Throw {
            exception,
            message: args.into_iter().next(),
        },
    ))
}

/// Parses a local declaration (`[const] type a [= e], b [= e];` or `var a = e;`).
fn let_stmt<'a>(input: Span<'a>) -> PResult<'a, Vec<Decl>> {
    let start = input;
    let (input, is_const) = map(opt(ws(keyword("const"))), |c| c.is_some()).parse(input)?;
    let (input, ty) = alt((
        map(ws(type_name), Some),
        map(ws(keyword("var")), |_| None::<TypeName>),
    ))
    .parse(input)?;
    // A type keyword at statement start can only begin a declaration.
    let (input, first) = cut(|i: Span<'a>| declarator(i, start, ty, is_const)).parse(input)?;
    let (input, rest) = many0(preceded(
        ws_char(','),
        cut(|i: Span<'a>| declarator(i, i, ty, is_const)),
    ))
    .parse(input)?;
    let (input, _) = semicolon(input)?;

    let mut decls = Vec::with_capacity(rest.len() + 1);
    decls.push(first);
    decls.extend(rest);
    Ok((input, decls))
}

/// Parses `name [= init]` for one declarator.
fn declarator<'a>(
    input: Span<'a>,
    start: Span<'a>,
    ty: Option<TypeName>,
    is_const: bool,
) -> PResult<'a, Decl> {
    let (input, name) = context("identifier", ws(identifier)).parse(input)?;
    let (input, init) = opt(preceded(
        ws(terminated(char('='), not(char('=')))),
        cut(context("initializer", expr)),
    ))
    .parse(input)?;
    let span = SourceSpan::from_bounds(start, input);
    Ok((
        input,
        Decl {
            ty,
            is_const,
            name,
            init,
            span,
        },
    ))
}

/// Parses `name op= expr;`, `name++;` and `name--;`.
fn assign_stmt(input: Span<'_>) -> PResult<'_, StmtKind> {
    let target_start = input;
    let (input, target) = ws(identifier).parse(input)?;
    let target_span = SourceSpan::from_bounds(target_start, input);

    let step_start = input;
    let (input, step) = opt(ws(alt((
        map(tag("++"), |_| AssignOp::Add),
        map(tag("--"), |_| AssignOp::Sub),
    ))))
    .parse(input)?;
    if let Some(op) = step {
        let (input, _) = semicolon(input)?;
        let value = Expr {
            kind: ExprKind::Integer(1),
            span: SourceSpan::from_bounds(step_start, input),
        };
        return Ok((
            input,
            StmtKind::Assign {
                target,
                target_span,
                op,
                value,
            },
        ));
    }

    let (input, op) = ws(alt((
        map(tag("+="), |_| AssignOp::Add),
        map(tag("-="), |_| AssignOp::Sub),
        map(tag("*="), |_| AssignOp::Mul),
        map(tag("/="), |_| AssignOp::Div),
        map(tag("%="), |_| AssignOp::Rem),
        map(terminated(char('='), not(char('='))), |_| AssignOp::Set),
    )))
    .parse(input)?;
    let (input, value) = cut(context("expression", expr)).parse(input)?;
    let (input, _) = semicolon(input)?;
    Ok((
        input,
        StmtKind::Assign {
            target,
            target_span,
            op,
            value,
        },
    ))
}

/// Parses `expr;`.
fn expr_stmt(input: Span<'_>) -> PResult<'_, StmtKind> {
    let (input, value) = expr(input)?;
    let (input, _) = semicolon(input)?;
    Ok((input, StmtKind::Expr(value)))
}
