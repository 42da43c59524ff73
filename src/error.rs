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

//! Calculation error taxonomy.

use thiserror::Error;

use crate::diagnostics::CompileError;
use crate::resolver::{DanglingRef, ResolutionError};
use crate::unit::{ExecutionError, RuntimeFault};
use crate::value::ValueType;

/// Result type alias for calculation operations.
pub type CalcResult<T> = Result<T, CalcError>;

/// Why a calculation produced no record.
///
/// Card-level errors ([`CalcError::Compile`], [`CalcError::EntryPointNotFound`])
/// mean the card definition is broken and every instance of it fails the same
/// way. The rest are specific to one instance's inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    /// No binding and no schema default for an input.
    #[error("required input '{variable}' has no value")]
    MissingRequiredInput { variable: String },

    /// A binding or default names a constant that no longer exists.
    #[error("input '{variable}' refers to {reference}, which no longer exists")]
    DanglingBinding {
        variable: String,
        reference: DanglingRef,
    },

    /// A resolved value does not convert to the declared type.
    #[error("input '{variable}' expects {expected} but got {actual} value '{value}'")]
    TypeMismatch {
        variable: String,
        expected: ValueType,
        actual: String,
        value: String,
    },

    #[error("{0}")]
    Compile(#[from] CompileError),

    /// The compiled unit has no executable entry procedure.
    #[error("{0}")]
    EntryPointNotFound(ExecutionError),

    /// The formula faulted while running.
    #[error("Execution error: {0}")]
    Execution(RuntimeFault),
}

impl CalcError {
    /// Whether the error comes from the card definition rather than the
    /// instance.
    pub fn is_card_level(&self) -> bool {
        matches!(
            self,
            CalcError::Compile(_) | CalcError::EntryPointNotFound(_)
        )
    }
}

impl From<ResolutionError> for CalcError {
    fn from(err: ResolutionError) -> Self {
        match err {
            ResolutionError::MissingRequiredInput { variable } => {
                CalcError::MissingRequiredInput { variable }
            }
            ResolutionError::DanglingBinding {
                variable,
                reference,
            } => CalcError::DanglingBinding {
                variable,
                reference,
            },
            ResolutionError::TypeMismatch {
                variable,
                expected,
                actual,
                value,
            } => CalcError::TypeMismatch {
                variable,
                expected,
                actual,
                value,
            },
        }
    }
}

impl From<ExecutionError> for CalcError {
    fn from(err: ExecutionError) -> Self {
        match err {
            ExecutionError::Fault(fault) => CalcError::Execution(fault),
            other => CalcError::EntryPointNotFound(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GlobalConstantId;

    #[test]
    fn card_level_classification() {
        let compile = CalcError::Compile(CompileError::from_diagnostics("<formula>", Vec::new()));
        assert!(compile.is_card_level());

        let entry = CalcError::from(ExecutionError::NoExecutableClass);
        assert!(entry.is_card_level());

        let fault = CalcError::from(ExecutionError::Fault(RuntimeFault::new("boom")));
        assert!(!fault.is_card_level());
        assert_eq!(fault.to_string(), "Execution error: boom");

        let dangling = CalcError::from(ResolutionError::DanglingBinding {
            variable: "fy".to_string(),
            reference: DanglingRef::GlobalConstant(GlobalConstantId(4)),
        });
        assert!(!dangling.is_card_level());
        assert_eq!(
            dangling.to_string(),
            "input 'fy' refers to global constant 4, which no longer exists"
        );
    }
}
