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

//! Slot-based typed IR produced by the compiler and walked by the interpreter.

use super::DataType;
use crate::value::Value;

/// Runtime value held in a frame slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Scalar {
    Double(f64),
    Int(i64),
    Text(String),
    Bool(bool),
}

impl Scalar {
    /// Default value of a type (`0`, `0.0`, `""`, `false`).
    pub(crate) fn default_for(ty: DataType) -> Self {
        match ty {
            DataType::Double => Scalar::Double(0.0),
            DataType::Int => Scalar::Int(0),
            DataType::Text => Scalar::Text(String::new()),
            DataType::Bool => Scalar::Bool(false),
        }
    }

    /// Converts to the value type exchanged with callers.
    pub(crate) fn to_value(&self) -> Value {
        match self {
            Scalar::Double(v) => Value::Number(*v),
            Scalar::Int(v) => Value::Number(*v as f64),
            Scalar::Text(s) => Value::Text(s.clone()),
            Scalar::Bool(_) => Value::Text(self.render()),
        }
    }

    /// Text rendering used by string concatenation.
    pub(crate) fn render(&self) -> String {
        match self {
            Scalar::Double(v) => v.to_string(),
            Scalar::Int(v) => v.to_string(),
            Scalar::Text(s) => s.clone(),
            Scalar::Bool(true) => "True".to_string(),
            Scalar::Bool(false) => "False".to_string(),
        }
    }
}

/// Arithmetic operators; operand type equals the expression type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Value conversions inserted by the type checker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Conversion {
    /// Implicit widening.
    IntToDouble,
    /// Explicit `(int)` cast; truncates toward zero.
    DoubleToInt,
    /// String concatenation operand.
    ToText,
}

/// `Math.*` functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Builtin {
    Pow,
    Sqrt,
    Cbrt,
    Abs,
    Min,
    Max,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Atan2,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Log,
    LogBase,
    Log10,
    Floor,
    Ceiling,
    Round,
    RoundDigits,
    Truncate,
    Sign,
}

/// Typed expression node.
#[derive(Debug, Clone)]
pub(crate) struct IrExpr {
    pub(crate) kind: IrExprKind,
    pub(crate) ty: DataType,
}

#[derive(Debug, Clone)]
pub(crate) enum IrExprKind {
    Const(Scalar),
    Load(usize),
    Neg(Box<IrExpr>),
    Not(Box<IrExpr>),
    Arith {
        op: ArithOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    Concat(Box<IrExpr>, Box<IrExpr>),
    Compare {
        op: CompareOp,
        left: Box<IrExpr>,
        right: Box<IrExpr>,
    },
    And(Box<IrExpr>, Box<IrExpr>),
    Or(Box<IrExpr>, Box<IrExpr>),
    Conditional {
        cond: Box<IrExpr>,
        then_value: Box<IrExpr>,
        else_value: Box<IrExpr>,
    },
    Convert {
        conversion: Conversion,
        operand: Box<IrExpr>,
    },
    Builtin {
        func: Builtin,
        args: Vec<IrExpr>,
    },
    Call {
        class: usize,
        procedure: usize,
        args: Vec<IrExpr>,
    },
}

impl IrExpr {
    pub(crate) fn new(kind: IrExprKind, ty: DataType) -> Self {
        Self { kind, ty }
    }

    /// Wraps the expression in a conversion node.
    pub(crate) fn convert(self, conversion: Conversion, ty: DataType) -> Self {
        IrExpr::new(
            IrExprKind::Convert {
                conversion,
                operand: Box::new(self),
            },
            ty,
        )
    }
}

/// Statement node; `site` indexes the owning procedure's fault locations.
#[derive(Debug, Clone)]
pub(crate) struct IrStmt {
    pub(crate) kind: IrStmtKind,
    pub(crate) site: usize,
}

#[derive(Debug, Clone)]
pub(crate) enum IrStmtKind {
    Store {
        slot: usize,
        value: IrExpr,
    },
    If {
        cond: IrExpr,
        then_body: Vec<IrStmt>,
        else_body: Vec<IrStmt>,
    },
    Block(Vec<IrStmt>),
    Return(Option<IrExpr>),
    Throw {
        exception: String,
        message: Option<IrExpr>,
    },
    Eval(IrExpr),
}
