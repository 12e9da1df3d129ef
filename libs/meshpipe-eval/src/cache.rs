//! # Evaluation Cache
//!
//! Per-object memoization of the last evaluation. Each lane (final and
//! edit-cage; the deform lane rides along with final) remembers the
//! `DataRequirement` it was built under; a new request re-evaluates
//! only when it isn't covered, and then under the *merged* requirement
//! so repeated narrower requests don't thrash.
//!
//! One cache per object: there is no cross-object sharing.

use crate::error::EvalError;
use crate::masks::DataRequirement;
use crate::modifier::{ErrorReporter, EvalMode};
use crate::object::MeshObject;
use crate::stack::{calc_modifiers, EvalOptions};
use meshpipe_core::MeshSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Returns true when a cached evaluation no longer covers a request:
/// the requested mask is not a subset of the cached one, or mapping is
/// newly required.
pub fn should_reevaluate(cached: &DataRequirement, requested: &DataRequirement) -> bool {
    !cached.satisfies(requested)
}

/// Cache statistics for monitoring.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that forced an evaluation.
    pub misses: u64,
    /// Stack evaluations actually run.
    pub evaluations: u64,
}

impl CacheStats {
    /// Computes the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

#[derive(Debug)]
struct CachedEval {
    requirement: DataRequirement,
    stop_at: Option<usize>,
    final_mesh: Arc<MeshSnapshot>,
    deform: Option<Arc<MeshSnapshot>>,
}

/// Per-object evaluation memo.
#[derive(Debug, Default)]
pub struct EvalCache {
    final_eval: Option<CachedEval>,
    cage_eval: Option<CachedEval>,
    stats: CacheStats,
}

impl EvalCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fully evaluated mesh, re-running the stack only when the
    /// cached requirement doesn't cover `requested`.
    pub fn eval_final(
        &mut self,
        object: &MeshObject,
        requested: &DataRequirement,
        mode: EvalMode,
        reporter: &dyn ErrorReporter,
    ) -> Result<Arc<MeshSnapshot>, EvalError> {
        self.ensure_final(object, requested, mode, reporter)?;
        Ok(Arc::clone(
            &self.final_eval.as_ref().expect("ensured above").final_mesh,
        ))
    }

    /// The deform-only lane belonging to the cached final evaluation.
    pub fn eval_deform(
        &mut self,
        object: &MeshObject,
        requested: &DataRequirement,
        mode: EvalMode,
        reporter: &dyn ErrorReporter,
    ) -> Result<Arc<MeshSnapshot>, EvalError> {
        self.ensure_final(object, requested, mode, reporter)?;
        let cached = self.final_eval.as_ref().expect("ensured above");
        Ok(Arc::clone(
            cached.deform.as_ref().expect("deform lane built with final"),
        ))
    }

    /// Evaluation truncated after the modifier at `stop_at` of the
    /// effective list (edit-cage / preview lane). Memoized separately
    /// from the final lane and keyed on the stop position too.
    pub fn eval_cage(
        &mut self,
        object: &MeshObject,
        stop_at: usize,
        requested: &DataRequirement,
        mode: EvalMode,
        reporter: &dyn ErrorReporter,
    ) -> Result<Arc<MeshSnapshot>, EvalError> {
        let covered = match &self.cage_eval {
            Some(cached) => {
                cached.stop_at == Some(stop_at) && !should_reevaluate(&cached.requirement, requested)
            }
            None => false,
        };
        if covered {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
            let merged = match &self.cage_eval {
                Some(cached) if cached.stop_at == Some(stop_at) => {
                    cached.requirement.merge(requested)
                }
                _ => *requested,
            };
            log::debug!("cage evaluation at modifier {stop_at}");
            let opts = EvalOptions {
                mode,
                stop_at: Some(stop_at),
                ..EvalOptions::default()
            };
            let result = calc_modifiers(object, &merged, None, &opts, reporter)?;
            self.stats.evaluations += 1;
            self.cage_eval = Some(CachedEval {
                requirement: merged,
                stop_at: Some(stop_at),
                final_mesh: Arc::new(result.final_mesh),
                deform: None,
            });
        }
        Ok(Arc::clone(
            &self.cage_eval.as_ref().expect("ensured above").final_mesh,
        ))
    }

    fn ensure_final(
        &mut self,
        object: &MeshObject,
        requested: &DataRequirement,
        mode: EvalMode,
        reporter: &dyn ErrorReporter,
    ) -> Result<(), EvalError> {
        let covered = match &self.final_eval {
            Some(cached) => !should_reevaluate(&cached.requirement, requested),
            None => false,
        };
        if covered {
            self.stats.hits += 1;
            return Ok(());
        }

        self.stats.misses += 1;
        let merged = match &self.final_eval {
            Some(cached) => cached.requirement.merge(requested),
            None => *requested,
        };
        log::debug!(
            "evaluating modifier stack (mapping: {})",
            merged.need_mapping
        );
        let opts = EvalOptions {
            mode,
            want_deform_lane: true,
            ..EvalOptions::default()
        };
        let result = calc_modifiers(object, &merged, None, &opts, reporter)?;
        self.stats.evaluations += 1;
        self.final_eval = Some(CachedEval {
            requirement: merged,
            stop_at: None,
            final_mesh: Arc::new(result.final_mesh),
            deform: result.deform.map(Arc::new),
        });
        Ok(())
    }

    /// The requirement the cached final evaluation was built under.
    pub fn cached_requirement(&self) -> Option<DataRequirement> {
        self.final_eval.as_ref().map(|cached| cached.requirement)
    }

    /// Drops every cached lane (topology or stack changed upstream).
    pub fn invalidate(&mut self) {
        self.final_eval = None;
        self.cage_eval = None;
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
