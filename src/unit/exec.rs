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

//! Tree-walking interpreter over the slot IR.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

use super::ir::{
    ArithOp, Builtin, CompareOp, Conversion, IrExpr, IrExprKind, IrStmt, IrStmtKind, Scalar,
};
use super::{
    DataType, ExecutableUnit, ExecutionError, ExecutionResult, ParamKind, Procedure, ResolvedInputs,
    RuntimeFault,
};
use crate::value::{Value, is_integral};

impl ExecutableUnit {
    /// Invokes the entry procedure exactly once.
    ///
    /// Output parameters start at their type default; input parameters are
    /// bound by name from `inputs` and converted to the declared type, and a
    /// missing input starts at its type default. Every runtime fault, panics
    /// included, is returned as [`ExecutionError::Fault`].
    pub fn execute(&self, inputs: &ResolvedInputs) -> Result<ExecutionResult, ExecutionError> {
        let (class, procedure) = self.entry_point()?;
        debug!(
            unit = %self.id,
            class = %class.name,
            inputs = inputs.len(),
            "invoking entry point"
        );

        let args = bind_arguments(procedure, inputs).map_err(ExecutionError::Fault)?;
        let interpreter = Interpreter { unit: self };
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            interpreter.invoke(procedure, args)
        }));
        let (return_value, frame) = match outcome {
            Ok(Ok(done)) => done,
            Ok(Err(fault)) => {
                warn!(unit = %self.id, message = %fault.message, "formula faulted");
                return Err(ExecutionError::Fault(fault));
            }
            Err(payload) => {
                let fault = RuntimeFault::new(format!(
                    "Internal interpreter fault: {}",
                    panic_message(payload.as_ref())
                ));
                warn!(unit = %self.id, message = %fault.message, "interpreter panicked");
                return Err(ExecutionError::Fault(fault));
            }
        };

        let mut result = ExecutionResult {
            return_value: return_value.map(|v| v.to_value()),
            ..ExecutionResult::default()
        };
        for (slot, param) in procedure.signature.params.iter().enumerate() {
            if param.kind != ParamKind::Output {
                continue;
            }
            let value = frame
                .get(slot)
                .map(Scalar::to_value)
                .unwrap_or_else(|| Scalar::default_for(param.ty).to_value());
            result.outputs.insert(param.name.clone(), value);
        }
        Ok(result)
    }
}

/// Builds the argument list of the entry procedure from resolved inputs.
fn bind_arguments(
    procedure: &Procedure,
    inputs: &ResolvedInputs,
) -> Result<Vec<Scalar>, RuntimeFault> {
    let mut args = Vec::with_capacity(procedure.signature.params.len());
    for param in &procedure.signature.params {
        let arg = match (param.kind, inputs.get(&param.name)) {
            (ParamKind::Input, Some(value)) => {
                convert_input(value, param.ty).ok_or_else(|| {
                    RuntimeFault::new(format!(
                        "Input '{}' with value '{}' cannot be converted to {}",
                        param.name, value, param.ty
                    ))
                })?
            }
            _ => Scalar::default_for(param.ty),
        };
        args.push(arg);
    }
    Ok(args)
}

/// Converts an exchanged value to a parameter type.
fn convert_input(value: &Value, ty: DataType) -> Option<Scalar> {
    match (ty, value) {
        (DataType::Double, Value::Number(n)) => Some(Scalar::Double(*n)),
        (DataType::Double, Value::Text(s)) => s.trim().parse().ok().map(Scalar::Double),
        (DataType::Int, Value::Number(n)) => is_integral(*n).then(|| Scalar::Int(*n as i64)),
        (DataType::Int, Value::Text(s)) => s.trim().parse().ok().map(Scalar::Int),
        (DataType::Text, Value::Text(s)) => Some(Scalar::Text(s.clone())),
        (DataType::Text, Value::Number(n)) => Some(Scalar::Text(n.to_string())),
        (DataType::Bool, Value::Number(n)) => Some(Scalar::Bool(*n != 0.0)),
        (DataType::Bool, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Scalar::Bool(true)),
            "false" => Some(Scalar::Bool(false)),
            _ => None,
        },
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

enum Flow {
    Next,
    Return(Option<Scalar>),
}

struct Interpreter<'u> {
    unit: &'u ExecutableUnit,
}

impl Interpreter<'_> {
    /// Runs one procedure on a fresh frame and returns its result and final
    /// frame.
    fn invoke(
        &self,
        procedure: &Procedure,
        args: Vec<Scalar>,
    ) -> Result<(Option<Scalar>, Vec<Scalar>), RuntimeFault> {
        let mut frame: Vec<Scalar> = procedure
            .slots
            .iter()
            .map(|ty| Scalar::default_for(*ty))
            .collect();
        for (slot, arg) in frame.iter_mut().zip(args) {
            *slot = arg;
        }

        let returned = match self.exec_block(procedure, &procedure.body, &mut frame)? {
            Flow::Return(value) => value,
            Flow::Next => None,
        };
        Ok((returned, frame))
    }

    fn exec_block(
        &self,
        procedure: &Procedure,
        body: &[IrStmt],
        frame: &mut [Scalar],
    ) -> Result<Flow, RuntimeFault> {
        for stmt in body {
            if let Flow::Return(value) = self.exec_stmt(procedure, stmt, frame)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn exec_stmt(
        &self,
        procedure: &Procedure,
        stmt: &IrStmt,
        frame: &mut [Scalar],
    ) -> Result<Flow, RuntimeFault> {
        let site = procedure.sites.get(stmt.site);
        // Nested statement lists attach their own locations.
        let locate = |fault: RuntimeFault| match site {
            Some(site) => fault.at(site),
            None => fault,
        };

        match &stmt.kind {
            IrStmtKind::Store { slot, value } => {
                let value = self.eval(value, frame).map_err(locate)?;
                let target = frame
                    .get_mut(*slot)
                    .ok_or_else(|| locate(invalid_slot(*slot)))?;
                *target = value;
                Ok(Flow::Next)
            }
            IrStmtKind::If {
                cond,
                then_body,
                else_body,
            } => {
                let taken = truthy(&self.eval(cond, frame).map_err(locate)?).map_err(locate)?;
                if taken {
                    self.exec_block(procedure, then_body, frame)
                } else {
                    self.exec_block(procedure, else_body, frame)
                }
            }
            IrStmtKind::Block(body) => self.exec_block(procedure, body, frame),
            IrStmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => Some(self.eval(expr, frame).map_err(locate)?),
                    None => None,
                };
                Ok(Flow::Return(value))
            }
            IrStmtKind::Throw { exception, message } => {
                let message = match message {
                    Some(expr) => self.eval(expr, frame).map_err(locate)?.render(),
                    None => format!("Exception of type '{exception}' was thrown."),
                };
                Err(locate(RuntimeFault::new(message)))
            }
            IrStmtKind::Eval(expr) => {
                self.eval(expr, frame).map_err(locate)?;
                Ok(Flow::Next)
            }
        }
    }

    fn eval(&self, expr: &IrExpr, frame: &[Scalar]) -> Result<Scalar, RuntimeFault> {
        match &expr.kind {
            IrExprKind::Const(value) => Ok(value.clone()),
            IrExprKind::Load(slot) => frame.get(*slot).cloned().ok_or_else(|| invalid_slot(*slot)),
            IrExprKind::Neg(operand) => match self.eval(operand, frame)? {
                Scalar::Double(v) => Ok(Scalar::Double(-v)),
                Scalar::Int(v) => Ok(Scalar::Int(v.wrapping_neg())),
                other => Err(type_fault("-", &other)),
            },
            IrExprKind::Not(operand) => {
                let value = self.eval(operand, frame)?;
                Ok(Scalar::Bool(!truthy(&value)?))
            }
            IrExprKind::Arith { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                arithmetic(*op, left, right)
            }
            IrExprKind::Concat(left, right) => {
                let mut text = self.eval(left, frame)?.render();
                text.push_str(&self.eval(right, frame)?.render());
                Ok(Scalar::Text(text))
            }
            IrExprKind::Compare { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                compare(*op, &left, &right).map(Scalar::Bool)
            }
            IrExprKind::And(left, right) => {
                if !truthy(&self.eval(left, frame)?)? {
                    return Ok(Scalar::Bool(false));
                }
                Ok(Scalar::Bool(truthy(&self.eval(right, frame)?)?))
            }
            IrExprKind::Or(left, right) => {
                if truthy(&self.eval(left, frame)?)? {
                    return Ok(Scalar::Bool(true));
                }
                Ok(Scalar::Bool(truthy(&self.eval(right, frame)?)?))
            }
            IrExprKind::Conditional {
                cond,
                then_value,
                else_value,
            } => {
                if truthy(&self.eval(cond, frame)?)? {
                    self.eval(then_value, frame)
                } else {
                    self.eval(else_value, frame)
                }
            }
            IrExprKind::Convert {
                conversion,
                operand,
            } => convert(*conversion, self.eval(operand, frame)?),
            IrExprKind::Builtin { func, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                apply_builtin(*func, expr.ty, &args)
            }
            IrExprKind::Call {
                class,
                procedure,
                args,
            } => {
                let callee = self
                    .unit
                    .classes
                    .get(*class)
                    .and_then(|c| c.procedures.get(*procedure))
                    .ok_or_else(|| RuntimeFault::new("Call to a procedure that does not exist"))?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, frame))
                    .collect::<Result<Vec<_>, _>>()?;
                let (returned, _) = self.invoke(callee, args)?;
                Ok(returned.unwrap_or_else(|| Scalar::default_for(expr.ty)))
            }
        }
    }
}

fn invalid_slot(slot: usize) -> RuntimeFault {
    RuntimeFault::new(format!("Access to unallocated frame slot {slot}"))
}

fn type_fault(op: &str, value: &Scalar) -> RuntimeFault {
    RuntimeFault::new(format!("Operator '{op}' cannot be applied to {value:?}"))
}

fn truthy(value: &Scalar) -> Result<bool, RuntimeFault> {
    match value {
        Scalar::Bool(b) => Ok(*b),
        other => Err(RuntimeFault::new(format!(
            "Expected a bool condition, found {other:?}"
        ))),
    }
}

fn divide_by_zero() -> RuntimeFault {
    RuntimeFault::new("Attempted to divide by zero.")
}

fn arithmetic(op: ArithOp, left: Scalar, right: Scalar) -> Result<Scalar, RuntimeFault> {
    match (left, right) {
        (Scalar::Double(l), Scalar::Double(r)) => Ok(Scalar::Double(match op {
            ArithOp::Add => l + r,
            ArithOp::Sub => l - r,
            ArithOp::Mul => l * r,
            ArithOp::Div => l / r,
            ArithOp::Rem => l % r,
        })),
        (Scalar::Int(l), Scalar::Int(r)) => match op {
            ArithOp::Add => Ok(Scalar::Int(l.wrapping_add(r))),
            ArithOp::Sub => Ok(Scalar::Int(l.wrapping_sub(r))),
            ArithOp::Mul => Ok(Scalar::Int(l.wrapping_mul(r))),
            ArithOp::Div if r == 0 => Err(divide_by_zero()),
            ArithOp::Div => Ok(Scalar::Int(l.wrapping_div(r))),
            ArithOp::Rem if r == 0 => Err(divide_by_zero()),
            ArithOp::Rem => Ok(Scalar::Int(l.wrapping_rem(r))),
        },
        (l, r) => Err(RuntimeFault::new(format!(
            "Arithmetic operands do not match: {l:?} and {r:?}"
        ))),
    }
}

fn compare(op: CompareOp, left: &Scalar, right: &Scalar) -> Result<bool, RuntimeFault> {
    use std::cmp::Ordering;

    let ordering = match (left, right) {
        (Scalar::Double(l), Scalar::Double(r)) => l.partial_cmp(r),
        (Scalar::Int(l), Scalar::Int(r)) => Some(l.cmp(r)),
        (Scalar::Text(l), Scalar::Text(r)) => Some(l.cmp(r)),
        (Scalar::Bool(l), Scalar::Bool(r)) => Some(l.cmp(r)),
        (l, r) => {
            return Err(RuntimeFault::new(format!(
                "Comparison operands do not match: {l:?} and {r:?}"
            )));
        }
    };
    // NaN compares unequal to everything, including itself.
    Ok(match (op, ordering) {
        (CompareOp::Ne, None) => true,
        (_, None) => false,
        (CompareOp::Eq, Some(o)) => o == Ordering::Equal,
        (CompareOp::Ne, Some(o)) => o != Ordering::Equal,
        (CompareOp::Lt, Some(o)) => o == Ordering::Less,
        (CompareOp::Le, Some(o)) => o != Ordering::Greater,
        (CompareOp::Gt, Some(o)) => o == Ordering::Greater,
        (CompareOp::Ge, Some(o)) => o != Ordering::Less,
    })
}

fn convert(conversion: Conversion, value: Scalar) -> Result<Scalar, RuntimeFault> {
    match (conversion, value) {
        (Conversion::IntToDouble, Scalar::Int(v)) => Ok(Scalar::Double(v as f64)),
        // `as` saturates out-of-range values and maps NaN to zero.
        (Conversion::DoubleToInt, Scalar::Double(v)) => Ok(Scalar::Int(v as i64)),
        (Conversion::ToText, value) => Ok(Scalar::Text(value.render())),
        (_, value @ (Scalar::Double(_) | Scalar::Int(_))) => Ok(value),
        (_, other) => Err(type_fault("conversion", &other)),
    }
}

fn as_f64(value: &Scalar) -> Result<f64, RuntimeFault> {
    match value {
        Scalar::Double(v) => Ok(*v),
        Scalar::Int(v) => Ok(*v as f64),
        other => Err(type_fault("Math", other)),
    }
}

fn as_i64(value: &Scalar) -> Result<i64, RuntimeFault> {
    match value {
        Scalar::Int(v) => Ok(*v),
        other => Err(type_fault("Math", other)),
    }
}

fn arg(args: &[Scalar], index: usize) -> Result<&Scalar, RuntimeFault> {
    args.get(index)
        .ok_or_else(|| RuntimeFault::new("Math function called with too few arguments"))
}

/// Evaluates a `Math.*` call. An `int` result type with `int` arguments
/// selects the integer overloads of `Abs`, `Min`, `Max` and `Sign`.
fn apply_builtin(func: Builtin, ty: DataType, args: &[Scalar]) -> Result<Scalar, RuntimeFault> {
    if ty == DataType::Int && args.iter().all(|a| matches!(a, Scalar::Int(_))) {
        return apply_int_builtin(func, args);
    }

    let x = as_f64(arg(args, 0)?)?;
    let y = || -> Result<f64, RuntimeFault> { as_f64(arg(args, 1)?) };
    let value = match func {
        Builtin::Pow => x.powf(y()?),
        Builtin::Sqrt => x.sqrt(),
        Builtin::Cbrt => x.cbrt(),
        Builtin::Abs => x.abs(),
        Builtin::Min => {
            let y = y()?;
            if x.is_nan() || y.is_nan() { f64::NAN } else { x.min(y) }
        }
        Builtin::Max => {
            let y = y()?;
            if x.is_nan() || y.is_nan() { f64::NAN } else { x.max(y) }
        }
        Builtin::Sin => x.sin(),
        Builtin::Cos => x.cos(),
        Builtin::Tan => x.tan(),
        Builtin::Asin => x.asin(),
        Builtin::Acos => x.acos(),
        Builtin::Atan => x.atan(),
        Builtin::Atan2 => x.atan2(y()?),
        Builtin::Sinh => x.sinh(),
        Builtin::Cosh => x.cosh(),
        Builtin::Tanh => x.tanh(),
        Builtin::Exp => x.exp(),
        Builtin::Log => x.ln(),
        Builtin::LogBase => x.ln() / y()?.ln(),
        Builtin::Log10 => x.log10(),
        Builtin::Floor => x.floor(),
        Builtin::Ceiling => x.ceil(),
        // Midpoints round to even.
        Builtin::Round => x.round_ties_even(),
        Builtin::RoundDigits => {
            let digits = as_i64(arg(args, 1)?)?;
            if !(0..=15).contains(&digits) {
                return Err(RuntimeFault::new(
                    "Rounding digits must be between 0 and 15, inclusive.",
                ));
            }
            let scale = 10f64.powi(digits as i32);
            (x * scale).round_ties_even() / scale
        }
        Builtin::Truncate => x.trunc(),
        Builtin::Sign => {
            if x.is_nan() {
                return Err(RuntimeFault::new(
                    "Function does not accept floating point Not-a-Number values.",
                ));
            }
            return Ok(Scalar::Int(if x > 0.0 {
                1
            } else if x < 0.0 {
                -1
            } else {
                0
            }));
        }
    };
    Ok(Scalar::Double(value))
}

fn apply_int_builtin(func: Builtin, args: &[Scalar]) -> Result<Scalar, RuntimeFault> {
    let x = as_i64(arg(args, 0)?)?;
    match func {
        Builtin::Abs => x.checked_abs().map(Scalar::Int).ok_or_else(|| {
            RuntimeFault::new("Negating the minimum value of a twos complement number is invalid.")
        }),
        Builtin::Min => Ok(Scalar::Int(x.min(as_i64(arg(args, 1)?)?))),
        Builtin::Max => Ok(Scalar::Int(x.max(as_i64(arg(args, 1)?)?))),
        Builtin::Sign => Ok(Scalar::Int(x.signum())),
        other => Err(RuntimeFault::new(format!(
            "Math.{other:?} has no integer overload"
        ))),
    }
}
