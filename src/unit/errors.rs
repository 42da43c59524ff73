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

//! Errors surfaced by executing a compiled unit.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{FaultLocation, TraceFrame};

/// Failure to invoke a compiled unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// The unit has no non-abstract class.
    #[error("No executable class found in compiled code")]
    NoExecutableClass,
    /// The first non-abstract class has no entry method.
    #[error("Calculate method not found in class '{class}'")]
    EntryPointNotFound {
        /// Class that was searched.
        class: String,
    },
    /// The formula body faulted at runtime.
    #[error("Execution error: {0}")]
    Fault(RuntimeFault),
}

impl ExecutionError {
    /// Returns whether the unit itself is unusable, as opposed to one run.
    pub fn is_entry_point_error(&self) -> bool {
        matches!(
            self,
            ExecutionError::NoExecutableClass | ExecutionError::EntryPointNotFound { .. }
        )
    }

    /// Returns the runtime fault, if this is one.
    pub fn fault(&self) -> Option<&RuntimeFault> {
        match self {
            ExecutionError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// A runtime fault raised inside the formula body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeFault {
    /// Human-readable message (`throw` message, division by zero, ...).
    pub message: String,
    /// Faulting statement, when known.
    pub location: Option<FaultLocation>,
    /// Helper call chain leading to the fault, innermost first.
    pub traceback: Vec<TraceFrame>,
}

impl RuntimeFault {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            traceback: Vec::new(),
        }
    }

    /// Attaches the statement location, or records a call frame when the
    /// fault already carries the location of an inner statement.
    pub(crate) fn at(mut self, site: &FaultLocation) -> Self {
        if self.location.is_none() {
            self.location = Some(site.clone());
        } else {
            self.traceback.push(TraceFrame::from(site));
        }
        self
    }
}

impl fmt::Display for RuntimeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(location) = &self.location {
            write!(f, "\n{location}")?;
        }
        for frame in &self.traceback {
            write!(
                f,
                "\n  called from {} at line {}, column {}",
                frame.procedure, frame.line, frame.column
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeFault {}
