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

//! Typed view over one invocation's outputs.

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Key under which the return value appears in [`ExecutionResult::to_map`].
pub const RETURN_VALUE_KEY: &str = "returnValue";

/// Outputs captured from one invocation of an entry procedure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Value returned by the entry procedure; `None` for `void`.
    pub return_value: Option<Value>,
    /// Final values of the `out` parameters, in declaration order.
    pub outputs: IndexMap<String, Value>,
}

impl ExecutionResult {
    /// Looks up an output by name, falling back to the return value for
    /// [`RETURN_VALUE_KEY`].
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name).or_else(|| {
            if name == RETURN_VALUE_KEY {
                self.return_value.as_ref()
            } else {
                None
            }
        })
    }

    /// Numeric output by name.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_number)
    }

    /// Flattens outputs and the return value into one map.
    pub fn to_map(&self) -> IndexMap<String, Value> {
        let mut map = self.outputs.clone();
        if let Some(value) = &self.return_value {
            map.entry(RETURN_VALUE_KEY.to_string())
                .or_insert_with(|| value.clone());
        }
        map
    }
}
