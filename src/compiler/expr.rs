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

//! Expression lowering and type rules.

use super::*;

impl LowerContext<'_> {
    /// Recursively lowers an AST expression into a typed IR expression.
    pub(super) fn lower_expr(&mut self, expr: &Expr) -> Lowered<IrExpr> {
        match &expr.kind {
            ExprKind::Number(v) => Ok(constant(Scalar::Double(*v), DataType::Double)),
            ExprKind::Integer(v) => Ok(constant(Scalar::Int(*v), DataType::Int)),
            ExprKind::Text(s) => Ok(constant(Scalar::Text(s.clone()), DataType::Text)),
            ExprKind::Bool(b) => Ok(constant(Scalar::Bool(*b), DataType::Bool)),
            ExprKind::Ident(name) => self.lower_ident(name, &expr.span),
            ExprKind::Unary { op, operand } => {
                let operand = self.lower_expr(operand)?;
                self.lower_unary(*op, operand, &expr.span)
            }
            ExprKind::Binary { op, left, right } => {
                // Lower both sides before failing so each reports its own errors.
                let left = self.lower_expr(left);
                let right = self.lower_expr(right);
                self.lower_binary(*op, left?, right?, &expr.span)
            }
            ExprKind::Cast { ty, operand } => {
                let operand = self.lower_expr(operand)?;
                self.lower_cast(data_type(*ty), operand, &expr.span)
            }
            ExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => self.lower_conditional(cond, then_value, else_value, &expr.span),
            ExprKind::Call { name, args } => {
                if let Some(func) = builtins::function_name(name) {
                    return self.lower_builtin(func, args, &expr.span);
                }
                self.lower_helper_call(name, args, &expr.span, true)
                    .map(|(call, _)| call)
            }
        }
    }

    fn lower_ident(&mut self, name: &str, span: &SourceSpan) -> Lowered<IrExpr> {
        if let Some(value) = builtins::constant_value(name) {
            return Ok(constant(Scalar::Double(value), DataType::Double));
        }
        let Some(binding) = self.resolve_binding(name) else {
            return Err(self.error_at(
                format!("The name '{name}' does not exist in the current context"),
                span,
            ));
        };
        if binding.poisoned {
            return Err(Reported);
        }
        Ok(IrExpr::new(IrExprKind::Load(binding.slot), binding.ty))
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: IrExpr, span: &SourceSpan) -> Lowered<IrExpr> {
        match op {
            UnaryOp::Neg | UnaryOp::Plus if operand.ty.is_numeric() => {
                if op == UnaryOp::Plus {
                    return Ok(operand);
                }
                let ty = operand.ty;
                Ok(IrExpr::new(IrExprKind::Neg(Box::new(operand)), ty))
            }
            UnaryOp::Not if operand.ty == DataType::Bool => Ok(IrExpr::new(
                IrExprKind::Not(Box::new(operand)),
                DataType::Bool,
            )),
            _ => {
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Plus => "+",
                    UnaryOp::Not => "!",
                };
                Err(self.error_at(
                    format!(
                        "Operator '{symbol}' cannot be applied to operand of type '{}'",
                        operand.ty
                    ),
                    span,
                ))
            }
        }
    }

    /// Lowers binary expressions with type-directed dispatch.
    pub(super) fn lower_binary(
        &mut self,
        op: BinOp,
        left: IrExpr,
        right: IrExpr,
        span: &SourceSpan,
    ) -> Lowered<IrExpr> {
        let (lt, rt) = (left.ty, right.ty);
        let mismatch = |ctx: &mut Self| {
            ctx.error_at(
                format!(
                    "Operator '{}' cannot be applied to operands of type '{lt}' and '{rt}'",
                    op.symbol()
                ),
                span,
            )
        };

        match op {
            // String concatenation renders the other operand as text.
            BinOp::Add if lt == DataType::Text || rt == DataType::Text => Ok(IrExpr::new(
                IrExprKind::Concat(Box::new(as_text(left)), Box::new(as_text(right))),
                DataType::Text,
            )),
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                let Some((left, right, ty)) = widen(left, right) else {
                    return Err(mismatch(self));
                };
                let arith = match op {
                    BinOp::Add => ArithOp::Add,
                    BinOp::Sub => ArithOp::Sub,
                    BinOp::Mul => ArithOp::Mul,
                    BinOp::Div => ArithOp::Div,
                    _ => ArithOp::Rem,
                };
                Ok(IrExpr::new(
                    IrExprKind::Arith {
                        op: arith,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    ty,
                ))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let Some((left, right, _)) = widen(left, right) else {
                    return Err(mismatch(self));
                };
                Ok(comparison(op, left, right))
            }
            BinOp::Eq | BinOp::Ne => {
                if let Some((left, right, _)) = widen(left.clone(), right.clone()) {
                    return Ok(comparison(op, left, right));
                }
                if lt != rt {
                    return Err(mismatch(self));
                }
                Ok(comparison(op, left, right))
            }
            BinOp::And | BinOp::Or => {
                if lt != DataType::Bool || rt != DataType::Bool {
                    return Err(mismatch(self));
                }
                let (left, right) = (Box::new(left), Box::new(right));
                let kind = if op == BinOp::And {
                    IrExprKind::And(left, right)
                } else {
                    IrExprKind::Or(left, right)
                };
                Ok(IrExpr::new(kind, DataType::Bool))
            }
        }
    }

    /// Lowers explicit casts between numeric types.
    fn lower_cast(&mut self, target: DataType, operand: IrExpr, span: &SourceSpan) -> Lowered<IrExpr> {
        match (operand.ty, target) {
            (from, to) if from == to => Ok(operand),
            (DataType::Int, DataType::Double) => {
                Ok(operand.convert(Conversion::IntToDouble, DataType::Double))
            }
            (DataType::Double, DataType::Int) => {
                Ok(operand.convert(Conversion::DoubleToInt, DataType::Int))
            }
            (from, to) => Err(self.error_at(
                format!("Cannot convert type '{from}' to '{to}'"),
                span,
            )),
        }
    }

    fn lower_conditional(
        &mut self,
        cond: &Expr,
        then_value: &Expr,
        else_value: &Expr,
        span: &SourceSpan,
    ) -> Lowered<IrExpr> {
        let cond_ir = self.lower_expr(cond);
        let then_ir = self.lower_expr(then_value);
        let else_ir = self.lower_expr(else_value);
        let (cond_ir, then_ir, else_ir) = (cond_ir?, then_ir?, else_ir?);

        let cond_ir = self.coerce(cond_ir, DataType::Bool, &cond.span)?;
        let (then_ty, else_ty) = (then_ir.ty, else_ir.ty);
        let (then_ir, else_ir, ty) = if then_ty == else_ty {
            (then_ir, else_ir, then_ty)
        } else if let Some(widened) = widen(then_ir, else_ir) {
            widened
        } else {
            return Err(self.error_at(
                format!(
                    "Type of conditional expression cannot be determined because there is no implicit conversion between '{then_ty}' and '{else_ty}'"
                ),
                span,
            ));
        };
        Ok(IrExpr::new(
            IrExprKind::Conditional {
                cond: Box::new(cond_ir),
                then_value: Box::new(then_ir),
                else_value: Box::new(else_ir),
            },
            ty,
        ))
    }
}

fn constant(value: Scalar, ty: DataType) -> IrExpr {
    IrExpr::new(IrExprKind::Const(value), ty)
}

fn as_text(expr: IrExpr) -> IrExpr {
    if expr.ty == DataType::Text {
        expr
    } else {
        expr.convert(Conversion::ToText, DataType::Text)
    }
}

/// Brings two numeric operands to a common type; `int` widens to `double`.
pub(super) fn widen(left: IrExpr, right: IrExpr) -> Option<(IrExpr, IrExpr, DataType)> {
    match (left.ty, right.ty) {
        (DataType::Int, DataType::Int) => Some((left, right, DataType::Int)),
        (DataType::Double, DataType::Double) => Some((left, right, DataType::Double)),
        (DataType::Int, DataType::Double) => Some((
            left.convert(Conversion::IntToDouble, DataType::Double),
            right,
            DataType::Double,
        )),
        (DataType::Double, DataType::Int) => Some((
            left,
            right.convert(Conversion::IntToDouble, DataType::Double),
            DataType::Double,
        )),
        _ => None,
    }
}

fn comparison(op: BinOp, left: IrExpr, right: IrExpr) -> IrExpr {
    let op = match op {
        BinOp::Eq => CompareOp::Eq,
        BinOp::Ne => CompareOp::Ne,
        BinOp::Lt => CompareOp::Lt,
        BinOp::Le => CompareOp::Le,
        BinOp::Gt => CompareOp::Gt,
        _ => CompareOp::Ge,
    };
    IrExpr::new(
        IrExprKind::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
        DataType::Bool,
    )
}
