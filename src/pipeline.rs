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

//! End-to-end calculation of card instances.

use chrono::Utc;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::UnitCache;
use crate::card::{CalculationFailure, CalculationRecord, Card, CardInstance};
use crate::check::evaluate;
use crate::config::EngineConfig;
use crate::constants::ConstantStore;
use crate::diagnostics::CompileError;
use crate::error::CalcError;
use crate::resolver::resolve;
use crate::unit::ExecutableUnit;

/// One instance to calculate together with its card.
#[derive(Debug, Clone, Copy)]
pub struct CalculationRequest<'a> {
    pub card: &'a Card,
    pub instance: &'a CardInstance,
}

/// Outcome of one calculation.
pub type CalculationOutcome = Result<CalculationRecord, CalculationFailure>;

/// Runs resolve, compile, execute and check for card instances.
pub struct Calculator {
    config: EngineConfig,
    cache: UnitCache,
    pool: Option<ThreadPool>,
}

impl Calculator {
    pub fn new(config: EngineConfig) -> Self {
        let pool = config.max_threads.and_then(|threads| {
            ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|err| warn!(threads, %err, "batch pool unavailable, using global pool"))
                .ok()
        });
        Self {
            config,
            cache: UnitCache::new(),
            pool,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &UnitCache {
        &self.cache
    }

    /// Compiles a card's formula, through the unit cache when enabled.
    pub fn compile(&self, card: &Card) -> Result<Arc<ExecutableUnit>, CompileError> {
        let label = self.config.source_label.as_str();
        let compile = |source: &str| crate::compile_formula_named(source, label);
        if self.config.cache_compiled_units {
            self.cache.get_or_compile(&card.source, compile)
        } else {
            compile(&card.source).map(Arc::new)
        }
    }

    /// Calculates one instance. The instance is not modified; pass the
    /// outcome to [`CardInstance::apply`] to store it.
    pub fn calculate(
        &self,
        card: &Card,
        instance: &CardInstance,
        store: &ConstantStore,
    ) -> CalculationOutcome {
        let fail = |error: CalcError| {
            warn!(
                card = %card.id,
                instance = %instance.id,
                card_level = error.is_card_level(),
                %error,
                "calculation failed"
            );
            CalculationFailure::new(card.id, instance.id, error)
        };

        let resolution = resolve(card, instance, store).map_err(|e| fail(e.into()))?;
        let unit = self.compile(card).map_err(|e| fail(e.into()))?;
        let result = unit
            .execute(&resolution.inputs)
            .map_err(|e| fail(e.into()))?;

        // The design load is normally an input; some cards compute it.
        let design_load = card.design_load_variable.as_deref().and_then(|name| {
            resolution
                .inputs
                .get_number(name)
                .or_else(|| result.number(name))
        });
        let capacity = card
            .capacity_variable
            .as_deref()
            .and_then(|name| result.number(name));
        let verdict = evaluate(design_load, capacity);

        info!(
            card = %card.id,
            instance = %instance.id,
            unit = %unit.id(),
            ?design_load,
            ?capacity,
            %verdict,
            "calculation complete"
        );
        Ok(CalculationRecord {
            inputs: resolution.snapshot,
            outputs: result.to_map(),
            design_load,
            capacity,
            verdict,
            calculated_at: Utc::now(),
        })
    }

    /// Calculates independent instances, in parallel when configured.
    /// Outcomes are returned in request order.
    pub fn calculate_batch(
        &self,
        requests: &[CalculationRequest<'_>],
        store: &ConstantStore,
    ) -> Vec<CalculationOutcome> {
        debug!(
            requests = requests.len(),
            parallel = self.config.parallel_batches,
            "calculating batch"
        );
        let run = |req: &CalculationRequest<'_>| self.calculate(req.card, req.instance, store);
        if !self.config.parallel_batches {
            return requests.iter().map(run).collect();
        }
        match &self.pool {
            Some(pool) => pool.install(|| requests.par_iter().map(run).collect()),
            None => requests.par_iter().map(run).collect(),
        }
    }
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
