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

//! `Math.*` functions and constants available to formulas.

use super::*;
use crate::unit::ir::Builtin;

/// Strips the `Math.` (or `System.Math.`) qualifier from a callee name.
pub(super) fn function_name(name: &str) -> Option<&str> {
    let name = name.strip_prefix("System.").unwrap_or(name);
    name.strip_prefix("Math.")
}

/// Value of a named `Math` constant.
pub(super) fn constant_value(name: &str) -> Option<f64> {
    match function_name(name)? {
        "PI" => Some(std::f64::consts::PI),
        "E" => Some(std::f64::consts::E),
        "Tau" => Some(std::f64::consts::TAU),
        _ => None,
    }
}

/// Argument shape of a builtin overload.
#[derive(Clone, Copy)]
enum Shape {
    /// Every argument is `double`; result is `double`.
    Real,
    /// `int` when every argument is `int`, otherwise `double`.
    Generic,
    /// Result is always `int`; `int` arguments keep their type.
    Sign,
    /// `(double, int)`; result is `double`.
    RealDigits,
}

fn lookup(member: &str, arity: usize) -> Option<(Builtin, Shape)> {
    let entry = match (member, arity) {
        ("Pow", 2) => (Builtin::Pow, Shape::Real),
        ("Sqrt", 1) => (Builtin::Sqrt, Shape::Real),
        ("Cbrt", 1) => (Builtin::Cbrt, Shape::Real),
        ("Abs", 1) => (Builtin::Abs, Shape::Generic),
        ("Min", 2) => (Builtin::Min, Shape::Generic),
        ("Max", 2) => (Builtin::Max, Shape::Generic),
        ("Sin", 1) => (Builtin::Sin, Shape::Real),
        ("Cos", 1) => (Builtin::Cos, Shape::Real),
        ("Tan", 1) => (Builtin::Tan, Shape::Real),
        ("Asin", 1) => (Builtin::Asin, Shape::Real),
        ("Acos", 1) => (Builtin::Acos, Shape::Real),
        ("Atan", 1) => (Builtin::Atan, Shape::Real),
        ("Atan2", 2) => (Builtin::Atan2, Shape::Real),
        ("Sinh", 1) => (Builtin::Sinh, Shape::Real),
        ("Cosh", 1) => (Builtin::Cosh, Shape::Real),
        ("Tanh", 1) => (Builtin::Tanh, Shape::Real),
        ("Exp", 1) => (Builtin::Exp, Shape::Real),
        ("Log", 1) => (Builtin::Log, Shape::Real),
        ("Log", 2) => (Builtin::LogBase, Shape::Real),
        ("Log10", 1) => (Builtin::Log10, Shape::Real),
        ("Floor", 1) => (Builtin::Floor, Shape::Real),
        ("Ceiling", 1) => (Builtin::Ceiling, Shape::Real),
        ("Round", 1) => (Builtin::Round, Shape::Real),
        ("Round", 2) => (Builtin::RoundDigits, Shape::RealDigits),
        ("Truncate", 1) => (Builtin::Truncate, Shape::Real),
        ("Sign", 1) => (Builtin::Sign, Shape::Sign),
        _ => return None,
    };
    Some(entry)
}

fn is_known(member: &str) -> bool {
    (0..=2).any(|arity| lookup(member, arity).is_some())
}

impl LowerContext<'_> {
    /// Lowers a `Math.*` call with overload selection by argument types.
    pub(super) fn lower_builtin(
        &mut self,
        member: &str,
        args: &[Expr],
        span: &SourceSpan,
    ) -> Lowered<IrExpr> {
        if !is_known(member) {
            return Err(self.error_at(
                format!("'Math' does not contain a definition for '{member}'"),
                span,
            ));
        }
        let Some((func, shape)) = lookup(member, args.len()) else {
            return Err(self.error_at(
                format!(
                    "No overload for method '{member}' takes {} arguments",
                    args.len()
                ),
                span,
            ));
        };

        let mut lowered = Vec::with_capacity(args.len());
        let mut failed = false;
        for arg in args {
            match self.lower_expr(arg) {
                Ok(ir) => lowered.push(ir),
                Err(Reported) => failed = true,
            }
        }
        if failed {
            return Err(Reported);
        }

        for (arg, ir) in args.iter().zip(&lowered) {
            if !ir.ty.is_numeric() {
                return Err(self.error_at(
                    format!("Argument of 'Math.{member}': cannot convert from '{}' to 'double'", ir.ty),
                    &arg.span,
                ));
            }
        }

        let all_int = lowered.iter().all(|ir| ir.ty == DataType::Int);
        let (args, ty) = match shape {
            Shape::Real => (to_double(lowered), DataType::Double),
            Shape::Generic if all_int => (lowered, DataType::Int),
            Shape::Generic => (to_double(lowered), DataType::Double),
            Shape::Sign if all_int => (lowered, DataType::Int),
            Shape::Sign => (to_double(lowered), DataType::Int),
            Shape::RealDigits => {
                let mut iter = lowered.into_iter();
                let (Some(value), Some(digits)) = (iter.next(), iter.next()) else {
                    return Err(Reported);
                };
                if digits.ty != DataType::Int {
                    let digits_span = args.get(1).map_or(span, |a| &a.span);
                    return Err(self.error_at(
                        "Argument 2 of 'Math.Round': cannot convert from 'double' to 'int'",
                        digits_span,
                    ));
                }
                (vec![widen_to_double(value), digits], DataType::Double)
            }
        };

        Ok(IrExpr::new(IrExprKind::Builtin { func, args }, ty))
    }
}

fn widen_to_double(ir: IrExpr) -> IrExpr {
    if ir.ty == DataType::Int {
        ir.convert(Conversion::IntToDouble, DataType::Double)
    } else {
        ir
    }
}

fn to_double(args: Vec<IrExpr>) -> Vec<IrExpr> {
    args.into_iter().map(widen_to_double).collect()
}
