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

//! Compiled executable units and their runtime.

mod errors;
mod exec;
mod inputs;
pub(crate) mod ir;
mod result;
mod trace;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

pub use errors::{ExecutionError, RuntimeFault};
pub use inputs::ResolvedInputs;
pub use result::{ExecutionResult, RETURN_VALUE_KEY};
pub use trace::{FaultLocation, TraceFrame};

use self::ir::IrStmt;

/// Name of the procedure invoked on every card.
pub const ENTRY_POINT: &str = "Calculate";

/// Name of the class that wraps method-only sources.
pub const IMPLICIT_CLASS: &str = "CalculationClass";

/// Identity of one compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub Uuid);

impl UnitId {
    /// Returns a fresh random id.
    pub fn new() -> Self {
        UnitId(Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of the source text before wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceForm {
    /// The source defines its own classes.
    Classes,
    /// Method definitions only, wrapped in [`IMPLICIT_CLASS`].
    Methods,
    /// Bare statements, wrapped in an inferred [`ENTRY_POINT`] method.
    Body,
}

/// Static type of a parameter, local or expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// `double`.
    Double,
    /// `int`.
    Int,
    /// `string`.
    Text,
    /// `bool`.
    Bool,
}

impl DataType {
    /// Source keyword used in diagnostics.
    pub fn keyword(self) -> &'static str {
        match self {
            DataType::Double => "double",
            DataType::Int => "int",
            DataType::Text => "string",
            DataType::Bool => "bool",
        }
    }

    /// Returns whether the type is `double` or `int`.
    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Double | DataType::Int)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Passing direction of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamKind {
    /// Bound from resolved inputs by name.
    Input,
    /// Default-initialised, read back after the call.
    Output,
}

/// One entry of a procedure signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared type.
    pub ty: DataType,
    /// Input or output.
    pub kind: ParamKind,
}

/// Typed contract of a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Signature {
    /// Parameters in declaration order.
    pub params: Vec<Parameter>,
    /// Return type; `None` for `void`.
    pub return_type: Option<DataType>,
}

impl Signature {
    /// Input parameters in declaration order.
    pub fn inputs(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.kind == ParamKind::Input)
    }

    /// Output parameters in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.kind == ParamKind::Output)
    }
}

/// One compiled method.
#[derive(Debug, Clone)]
pub struct Procedure {
    pub(crate) name: String,
    pub(crate) signature: Signature,
    // Types of all frame slots; parameters occupy the leading slots.
    pub(crate) slots: Vec<DataType>,
    pub(crate) body: Vec<IrStmt>,
    // Source locations referenced by `IrStmt::site`.
    pub(crate) sites: Vec<FaultLocation>,
}

impl Procedure {
    /// Method name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed signature.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }
}

/// One compiled class.
#[derive(Debug, Clone)]
pub struct ClassUnit {
    pub(crate) name: String,
    pub(crate) is_abstract: bool,
    pub(crate) procedures: Vec<Procedure>,
}

impl ClassUnit {
    /// Class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the class was declared `abstract`.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Compiled methods in source order.
    pub fn procedures(&self) -> &[Procedure] {
        &self.procedures
    }

    /// Finds a method by name.
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}

/// A compiled card formula, ready to be executed any number of times.
///
/// The unit is immutable; every invocation runs on its own frame, so one unit
/// can be shared across threads.
#[derive(Debug, Clone)]
pub struct ExecutableUnit {
    pub(crate) id: UnitId,
    pub(crate) assembly_name: String,
    pub(crate) source_digest: String,
    pub(crate) form: SourceForm,
    pub(crate) classes: Vec<ClassUnit>,
}

impl ExecutableUnit {
    pub(crate) fn new(source: &str, form: SourceForm, classes: Vec<ClassUnit>) -> Self {
        let id = UnitId::new();
        Self {
            id,
            assembly_name: format!("DynamicCalculation_{}", id.0.simple()),
            source_digest: source_digest(source),
            form,
            classes,
        }
    }

    /// Fresh id assigned at compilation.
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Diagnostic name of this compilation (`DynamicCalculation_<id>`).
    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    /// Hex SHA-256 digest of the compiled source text.
    pub fn source_digest(&self) -> &str {
        &self.source_digest
    }

    /// How the source was wrapped.
    pub fn form(&self) -> SourceForm {
        self.form
    }

    /// Compiled classes in source order.
    pub fn classes(&self) -> &[ClassUnit] {
        &self.classes
    }

    /// Locates the entry procedure: [`ENTRY_POINT`] on the first non-abstract
    /// class. Later classes are never searched.
    pub fn entry_point(&self) -> Result<(&ClassUnit, &Procedure), ExecutionError> {
        let class = self
            .classes
            .iter()
            .find(|c| !c.is_abstract)
            .ok_or(ExecutionError::NoExecutableClass)?;
        let procedure = class
            .procedure(ENTRY_POINT)
            .ok_or_else(|| ExecutionError::EntryPointNotFound {
                class: class.name.clone(),
            })?;
        Ok((class, procedure))
    }

    /// Typed signature of the entry procedure.
    pub fn signature(&self) -> Result<&Signature, ExecutionError> {
        self.entry_point().map(|(_, p)| &p.signature)
    }
}

/// Hex SHA-256 digest of a source text.
pub fn source_digest(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}
