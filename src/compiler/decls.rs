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

//! Declaration and statement lowering.

use super::*;

impl LowerContext<'_> {
    /// Lowers one statement, appending its IR to `out`. Errors are recorded
    /// and lowering continues with the next statement.
    pub(super) fn lower_stmt(&mut self, stmt: &Stmt, out: &mut Vec<IrStmt>) {
        match &stmt.kind {
            StmtKind::Let(decls) => {
                for decl in decls {
                    self.lower_decl(decl, out);
                }
            }
            StmtKind::Assign {
                target,
                target_span,
                op,
                value,
            } => {
                if let Ok(ir) = self.lower_assign(target, target_span, *op, value) {
                    let site = self.site(&stmt.span);
                    out.push(IrStmt { kind: ir, site });
                }
            }
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_ir = self
                    .lower_expr(cond)
                    .and_then(|ir| self.expect_condition(ir, &cond.span));
                let then_body = self.lower_branch(then_branch);
                let else_body = else_branch
                    .as_deref()
                    .map(|branch| self.lower_branch(branch))
                    .unwrap_or_default();
                if let Ok(cond) = cond_ir {
                    let site = self.site(&stmt.span);
                    out.push(IrStmt {
                        kind: IrStmtKind::If {
                            cond,
                            then_body,
                            else_body,
                        },
                        site,
                    });
                }
            }
            StmtKind::Block(body) => {
                self.push_scope();
                let mut lowered = Vec::with_capacity(body.len());
                for inner in body {
                    self.lower_stmt(inner, &mut lowered);
                }
                self.pop_scope();
                let site = self.site(&stmt.span);
                out.push(IrStmt {
                    kind: IrStmtKind::Block(lowered),
                    site,
                });
            }
            StmtKind::Return(value) => {
                if let Ok(ir) = self.lower_return(value.as_ref(), &stmt.span) {
                    let site = self.site(&stmt.span);
                    out.push(IrStmt {
                        kind: IrStmtKind::Return(ir),
                        site,
                    });
                }
            }
            StmtKind::Throw { exception, message } => {
                let message_ir = match message {
                    Some(expr) => match self.lower_expr(expr) {
                        Ok(ir) if ir.ty == DataType::Text => Ok(Some(ir)),
                        Ok(ir) => Err(self.error_at(
                            format!("Argument 1: cannot convert from '{}' to 'string'", ir.ty),
                            &expr.span,
                        )),
                        Err(reported) => Err(reported),
                    },
                    None => Ok(None),
                };
                if let Ok(message) = message_ir {
                    let site = self.site(&stmt.span);
                    out.push(IrStmt {
                        kind: IrStmtKind::Throw {
                            exception: exception.clone(),
                            message,
                        },
                        site,
                    });
                }
            }
            StmtKind::Expr(expr) => {
                if let Ok(ir) = self.lower_expr_stmt(expr) {
                    let site = self.site(&stmt.span);
                    out.push(IrStmt {
                        kind: IrStmtKind::Eval(ir),
                        site,
                    });
                }
            }
        }
    }

    fn lower_decl(&mut self, decl: &Decl, out: &mut Vec<IrStmt>) {
        if decl.ty.is_none() && decl.init.is_none() {
            self.error_at("Implicitly-typed variables must be initialized", &decl.span);
            self.declare_poisoned(&decl.name);
            return;
        }
        if decl.is_const && decl.init.is_none() {
            self.error_at("A const field requires a value to be provided", &decl.span);
            self.declare_poisoned(&decl.name);
            return;
        }

        // The initializer is lowered before the name enters scope.
        let init = match &decl.init {
            Some(expr) => match self.lower_expr(expr) {
                Ok(ir) => match decl.ty {
                    Some(ty) => self.coerce(ir, data_type(ty), &expr.span).map(Some),
                    None => Ok(Some(ir)),
                },
                Err(reported) => Err(reported),
            },
            None => Ok(None),
        };
        let init = match init {
            Ok(init) => init,
            Err(Reported) => {
                self.declare_poisoned(&decl.name);
                return;
            }
        };

        let ty = match (decl.ty, &init) {
            (Some(ty), _) => data_type(ty),
            (None, Some(ir)) => ir.ty,
            (None, None) => DataType::Double,
        };
        let Ok(slot) = self.declare(&decl.name, ty, decl.is_const, &decl.span) else {
            return;
        };
        if let Some(value) = init {
            let site = self.site(&decl.span);
            out.push(IrStmt {
                kind: IrStmtKind::Store { slot, value },
                site,
            });
        }
    }

    fn lower_assign(
        &mut self,
        target: &str,
        target_span: &SourceSpan,
        op: AssignOp,
        value: &Expr,
    ) -> Lowered<IrStmtKind> {
        let binding = self.resolve_binding(target);
        let value_ir = self.lower_expr(value);
        let Some(binding) = binding else {
            return Err(self.error_at(
                format!("The name '{target}' does not exist in the current context"),
                target_span,
            ));
        };
        if binding.poisoned {
            return Err(Reported);
        }
        if binding.is_const {
            return Err(self.error_at(
                "The left-hand side of an assignment must be a variable, property or indexer",
                target_span,
            ));
        }

        let value_ir = value_ir?;
        let value_ir = match op.binary_op() {
            Some(bin) => {
                let current = IrExpr::new(IrExprKind::Load(binding.slot), binding.ty);
                let combined = self.lower_binary(bin, current, value_ir, &value.span)?;
                // `x += 1.5` on an int target narrows and is rejected.
                self.coerce(combined, binding.ty, &value.span)?
            }
            None => self.coerce(value_ir, binding.ty, &value.span)?,
        };
        Ok(IrStmtKind::Store {
            slot: binding.slot,
            value: value_ir,
        })
    }

    fn lower_branch(&mut self, branch: &Stmt) -> Vec<IrStmt> {
        self.push_scope();
        let mut body = Vec::new();
        self.lower_stmt(branch, &mut body);
        self.pop_scope();
        body
    }

    fn expect_condition(&mut self, ir: IrExpr, span: &SourceSpan) -> Lowered<IrExpr> {
        if ir.ty == DataType::Bool {
            return Ok(ir);
        }
        Err(self.error_at(
            format!("Cannot implicitly convert type '{}' to 'bool'", ir.ty),
            span,
        ))
    }

    fn lower_return(&mut self, value: Option<&Expr>, span: &SourceSpan) -> Lowered<Option<IrExpr>> {
        match (self.return_type, value) {
            (None, None) => Ok(None),
            (None, Some(expr)) => {
                // Still type-check the expression for its own diagnostics.
                let _ = self.lower_expr(expr);
                let name = self.current_name.clone();
                Err(self.error_at(
                    format!(
                        "Since '{name}' returns void, a return keyword must not be followed by an object expression"
                    ),
                    &expr.span,
                ))
            }
            (Some(ty), None) => Err(self.error_at(
                format!("An object of a type convertible to '{ty}' is required"),
                span,
            )),
            (Some(ty), Some(expr)) => {
                let ir = self.lower_expr(expr)?;
                self.coerce(ir, ty, &expr.span).map(Some)
            }
        }
    }

    fn lower_expr_stmt(&mut self, expr: &Expr) -> Lowered<IrExpr> {
        let ExprKind::Call { name, args } = &expr.kind else {
            return Err(self.error_at(
                "Only assignment, call, increment, decrement, await, and new object expressions can be used as a statement",
                &expr.span,
            ));
        };
        if let Some(member) = builtins::function_name(name) {
            return self.lower_builtin(member, args, &expr.span);
        }
        self.lower_helper_call(name, args, &expr.span, false)
            .map(|(call, _)| call)
    }
}

/// Whether control can never fall off the end of `body`.
pub(super) fn always_exits(body: &[Stmt]) -> bool {
    body.iter().any(stmt_exits)
}

fn stmt_exits(stmt: &Stmt) -> bool {
    match &stmt.kind {
        StmtKind::Return(_) | StmtKind::Throw { .. } => true,
        StmtKind::Block(body) => always_exits(body),
        StmtKind::If {
            then_branch,
            else_branch: Some(else_branch),
            ..
        } => stmt_exits(then_branch) && stmt_exits(else_branch),
        _ => false,
    }
}
