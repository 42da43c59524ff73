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

//! Compiled unit cache keyed by source digest.
//!
//! Compilation is pure, so failures are cached alongside successes. The cache
//! is an optimisation only; a cleared cache recompiles on the next request.
//! Entries are never evicted, so the map grows until [`UnitCache::clear`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::diagnostics::CompileError;
use crate::unit::{ExecutableUnit, source_digest};

type Compiled = Result<Arc<ExecutableUnit>, CompileError>;

/// Thread-safe map from source text digest to compilation outcome.
#[derive(Debug, Default)]
pub struct UnitCache {
    units: RwLock<HashMap<String, Compiled>>,
}

impl UnitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached outcome for `source`, compiling it with `compile`
    /// on a miss.
    pub fn get_or_compile<F>(&self, source: &str, compile: F) -> Compiled
    where
        F: FnOnce(&str) -> Result<ExecutableUnit, CompileError>,
    {
        let key = source_digest(source);
        {
            let units = self.units.read().unwrap_or_else(|e| e.into_inner());
            if let Some(hit) = units.get(&key) {
                debug!(cached = hit.is_ok(), "unit cache hit");
                return hit.clone();
            }
        }

        // Compile outside the lock; a racing thread may compile the same
        // source, and the first insert wins.
        let outcome = compile(source).map(Arc::new);
        let mut units = self.units.write().unwrap_or_else(|e| e.into_inner());
        units.entry(key).or_insert(outcome).clone()
    }

    pub fn len(&self) -> usize {
        self.units.read().map_or(0, |units| units.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.units
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile_formula;

    #[test]
    fn identical_source_reuses_unit() {
        let cache = UnitCache::new();
        let source = "result = a * 2;";
        let first = cache.get_or_compile(source, compile_formula).unwrap();
        let second = cache.get_or_compile(source, compile_formula).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
        assert_eq!(first.source_digest(), source_digest(source));
    }

    #[test]
    fn failures_are_cached() {
        let cache = UnitCache::new();
        let mut calls = 0;
        for _ in 0..2 {
            let outcome = cache.get_or_compile("x = ;", |s| {
                calls += 1;
                compile_formula(s)
            });
            assert!(outcome.is_err());
        }
        assert_eq!(calls, 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
