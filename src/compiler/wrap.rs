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

//! Normalisation of the three accepted source forms into class definitions.

use super::*;
use crate::ast::Param;
use crate::unit::{IMPLICIT_CLASS, SourceForm};

impl LowerContext<'_> {
    /// Wraps the parsed program into classes and reports mixed forms.
    pub(super) fn wrap_program(&mut self, program: &Program) -> Lowered<(SourceForm, Vec<ClassDef>)> {
        if !program.classes.is_empty() {
            let stray = program
                .methods
                .first()
                .map(|m| &m.span)
                .or_else(|| program.statements.first().map(|s| &s.span));
            if let Some(span) = stray {
                return Err(self.error_at(
                    "Top-level methods or statements cannot be mixed with class definitions",
                    span,
                ));
            }
            return Ok((SourceForm::Classes, program.classes.clone()));
        }

        if let Some(first) = program.methods.first() {
            if let Some(stmt) = program.statements.first() {
                return Err(self.error_at(
                    "Top-level statements cannot be mixed with method definitions",
                    &stmt.span,
                ));
            }
            let class = ClassDef {
                name: IMPLICIT_CLASS.to_string(),
                is_abstract: false,
                methods: program.methods.clone(),
                span: first.span.clone(),
            };
            return Ok((SourceForm::Methods, vec![class]));
        }

        let (Some(first), Some(last)) = (program.statements.first(), program.statements.last())
        else {
            return Err(self.error("Formula source defines no class, method or statement"));
        };
        let span = first.span.merge(&last.span);
        let method = infer_entry_method(&program.statements, span.clone());
        let class = ClassDef {
            name: IMPLICIT_CLASS.to_string(),
            is_abstract: false,
            methods: vec![method],
            span,
        };
        Ok((SourceForm::Body, vec![class]))
    }
}

/// Builds the implicit entry method around bare statements.
///
/// Names read before any declaration become `double` inputs, names assigned
/// without declaration become `out double` outputs (inputs first, each group
/// in order of first appearance), and the method returns `double` when any
/// `return` carries a value.
fn infer_entry_method(statements: &[Stmt], span: SourceSpan) -> Method {
    let mut inference = Inference::default();
    inference.visit_stmts(statements);

    let params = inference
        .inputs
        .into_iter()
        .map(|(name, span)| Param {
            mode: ParamMode::In,
            ty: TypeName::Double,
            name,
            span,
        })
        .chain(inference.outputs.into_iter().map(|(name, span)| Param {
            mode: ParamMode::Out,
            ty: TypeName::Double,
            name,
            span,
        }))
        .collect();

    Method {
        name: ENTRY_POINT.to_string(),
        return_ty: inference.returns_value.then_some(TypeName::Double),
        params,
        body: statements.to_vec(),
        span,
    }
}

#[derive(Default)]
struct Inference {
    declared: HashSet<String>,
    inputs: Vec<(String, SourceSpan)>,
    outputs: Vec<(String, SourceSpan)>,
    returns_value: bool,
}

impl Inference {
    fn is_known(&self, name: &str) -> bool {
        self.declared.contains(name)
            || self.inputs.iter().any(|(n, _)| n == name)
            || self.outputs.iter().any(|(n, _)| n == name)
    }

    fn read(&mut self, name: &str, span: &SourceSpan) {
        if !self.is_known(name) {
            self.inputs.push((name.to_string(), span.clone()));
        }
    }

    fn write(&mut self, name: &str, span: &SourceSpan) {
        if !self.is_known(name) {
            self.outputs.push((name.to_string(), span.clone()));
        }
    }

    fn visit_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.visit_stmt(stmt);
        }
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Let(decls) => {
                for decl in decls {
                    if let Some(init) = &decl.init {
                        self.visit_expr(init);
                    }
                    self.declared.insert(decl.name.clone());
                }
            }
            StmtKind::Assign {
                target,
                target_span,
                op,
                value,
            } => {
                if op.binary_op().is_some() {
                    self.read(target, target_span);
                }
                self.visit_expr(value);
                self.write(target, target_span);
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.visit_expr(cond);
                self.visit_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.visit_stmt(else_branch);
                }
            }
            StmtKind::Block(body) => self.visit_stmts(body),
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.returns_value = true;
                    self.visit_expr(value);
                }
            }
            StmtKind::Throw { message, .. } => {
                if let Some(message) = message {
                    self.visit_expr(message);
                }
            }
            StmtKind::Expr(expr) => self.visit_expr(expr),
        }
    }

    fn visit_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Number(_) | ExprKind::Integer(_) | ExprKind::Text(_) | ExprKind::Bool(_) => {}
            // Dotted names are constants such as `Math.PI`, never inputs.
            ExprKind::Ident(name) if name.contains('.') => {}
            ExprKind::Ident(name) => self.read(name, &expr.span),
            ExprKind::Unary { operand, .. } | ExprKind::Cast { operand, .. } => {
                self.visit_expr(operand)
            }
            ExprKind::Binary { left, right, .. } => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then_value);
                self.visit_expr(else_value);
            }
            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.visit_expr(arg);
                }
            }
        }
    }
}
