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

//! Design check verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of comparing a capacity against a design load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    /// Capacity meets or exceeds the design load.
    Pass,
    /// Capacity is below the design load.
    Fail,
    /// A quantity is missing or not finite; no judgement possible.
    Warning,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Pass => "Pass",
            Verdict::Fail => "Fail",
            Verdict::Warning => "Warning",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares `capacity` against `design_load` exactly; ties pass.
pub fn evaluate(design_load: Option<f64>, capacity: Option<f64>) -> Verdict {
    match (design_load, capacity) {
        (Some(load), Some(capacity)) if load.is_finite() && capacity.is_finite() => {
            if capacity >= load {
                Verdict::Pass
            } else {
                Verdict::Fail
            }
        }
        _ => Verdict::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn boundary_cases() {
        assert_eq!(evaluate(Some(100.0), Some(100.0)), Verdict::Pass);
        assert_eq!(evaluate(Some(100.0), Some(99.999)), Verdict::Fail);
        assert_eq!(evaluate(None, Some(50.0)), Verdict::Warning);
        assert_eq!(evaluate(Some(50.0), Some(50.0)), Verdict::Pass);
        assert_eq!(evaluate(Some(50.0), Some(49.999_999)), Verdict::Fail);
        assert_eq!(evaluate(None, Some(1.0)), Verdict::Warning);
        assert_eq!(evaluate(Some(1.0), None), Verdict::Warning);
        assert_eq!(evaluate(None, None), Verdict::Warning);
        assert_eq!(evaluate(Some(f64::NAN), Some(1.0)), Verdict::Warning);
        assert_eq!(evaluate(Some(1.0), Some(f64::INFINITY)), Verdict::Warning);
    }

    #[test]
    fn serialises_as_check_result_strings() {
        assert_eq!(serde_json::to_string(&Verdict::Pass).unwrap(), "\"Pass\"");
        assert_eq!(
            serde_json::from_str::<Verdict>("\"Warning\"").unwrap(),
            Verdict::Warning
        );
        assert_eq!(Verdict::Fail.to_string(), "Fail");
    }

    proptest! {
        #[test]
        fn verdict_follows_ordering(load in -1e9f64..1e9, capacity in -1e9f64..1e9) {
            let expected = if capacity >= load { Verdict::Pass } else { Verdict::Fail };
            prop_assert_eq!(evaluate(Some(load), Some(capacity)), expected);
        }
    }
}
