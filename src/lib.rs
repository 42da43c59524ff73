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

//! Card formula engine for engineering calculations.
//!
//! A card carries a short user-authored formula, a typed input/output
//! variable schema and the names of the variables compared in its design
//! check. This crate provides:
//! - A parser for the C#-style formula language (classes, methods or bare
//!   statements).
//! - A compiler that type-checks formulas into an immutable
//!   [`ExecutableUnit`] with a typed entry [`Signature`].
//! - An interpreter that runs the `Calculate` entry procedure once per call,
//!   capturing every fault as a value.
//! - Input resolution from local values, job constants and library defaults.
//! - Pass/Fail/Warning design check verdicts.
//! - Rich compile diagnostics with line/column/caret output.
//!
//! # Pipeline
//!
//! 1. Resolve the instance's inputs against the [`ConstantStore`].
//! 2. Parse and lower the card's formula (cached by source digest).
//! 3. Execute the entry procedure with the resolved inputs.
//! 4. Compare the capacity output with the design load input.
//!
//! [`Calculator`] runs these steps; each is also usable on its own.
//!
//! # Source forms
//!
//! A formula may define classes, bare methods (wrapped in
//! `CalculationClass`) or bare statements (wrapped in an inferred
//! `Calculate` method whose inputs are the names read before assignment and
//! whose outputs are the names assigned without declaration):
//!
//! ```
//! use engcalc::{ResolvedInputs, compile_formula};
//!
//! let unit = compile_formula("area = width * depth;").unwrap();
//! let inputs = ResolvedInputs::new().number("width", 3.0).number("depth", 4.0);
//! let result = unit.execute(&inputs).unwrap();
//! assert_eq!(result.number("area"), Some(12.0));
//! ```

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

mod ast;
mod cache;
mod card;
mod check;
mod compiler;
mod config;
mod constants;
mod diagnostics;
mod error;
mod parser;
mod pipeline;
mod resolver;
mod unit;
mod value;

pub use ast::{
    AssignOp, BinOp, ClassDef, Decl, Expr, ExprKind, Method, Param, ParamMode, Program,
    SourceSpan, Stmt, StmtKind, TypeName, UnaryOp,
};
pub use cache::UnitCache;
pub use card::{
    BindingError, CalculationFailure, CalculationRecord, Card, CardId, CardInstance,
    CardInstanceId, InputBinding, RevisionId, SchemaError, VariableSpec,
};
pub use check::{Verdict, evaluate};
pub use config::{ConfigError, EngineConfig};
pub use constants::{
    AppConstant, AppConstantId, AppConstantLibrary, ConstantError, ConstantStore, GlobalConstant,
    GlobalConstantId, JobConstants, JobId,
};
pub use diagnostics::{CompileError, Diagnostic};
pub use error::{CalcError, CalcResult};
pub use pipeline::{CalculationOutcome, CalculationRequest, Calculator};
pub use resolver::{
    DanglingRef, InputSnapshot, Provenance, Resolution, ResolutionError, SnapshotEntry, resolve,
};
pub use unit::{
    ClassUnit, DataType, ENTRY_POINT, ExecutableUnit, ExecutionError, ExecutionResult,
    FaultLocation, IMPLICIT_CLASS, ParamKind, Parameter, Procedure, RETURN_VALUE_KEY,
    ResolvedInputs, RuntimeFault, Signature, SourceForm, TraceFrame, UnitId, source_digest,
};
pub use value::{Value, ValueType};

use tracing::debug;

/// Label used in diagnostics when no other is given.
pub const DEFAULT_SOURCE_LABEL: &str = "<formula>";

/// Parses formula source text into an AST [`Program`] without type checking.
pub fn parse_formula(source: &str) -> Result<Program, CompileError> {
    parser::parse_program(source)
}

/// Compiles formula source text into an executable unit.
///
/// Every diagnostic found is returned in one [`CompileError`].
pub fn compile_formula(source: &str) -> Result<ExecutableUnit, CompileError> {
    compile_formula_named(source, DEFAULT_SOURCE_LABEL)
}

/// Compiles formula source text, tagging diagnostics with `label`.
pub fn compile_formula_named(source: &str, label: &str) -> Result<ExecutableUnit, CompileError> {
    debug!(label, bytes = source.len(), "compiling formula");
    let program = parser::parse_program_in_source(source, label)?;
    compiler::lower_program(label, source, &program)
}

#[cfg(test)]
mod tests;
