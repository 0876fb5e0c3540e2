//! Semi-sparse fixpoint driver
//!
//! # Usage
//! ```text
//! use fscs_pta::{AnalysisConfig, PointsToQueries, SemiSparsePointerAnalysis};
//!
//! let config = AnalysisConfig::default().uniform_k(2);
//! let result = SemiSparsePointerAnalysis::new(config).run(&program)?;
//! let pts = result.points_to(None, q);
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::result::{AnalysisStats, PointsToResult};
use crate::config::{AnalysisConfig, Validatable};
use crate::errors::Result;
use crate::features::annotation::ExternalPointerTable;
use crate::features::context::ContextSensitivity;
use crate::features::points_to::domain::Memo;
use crate::features::points_to::infrastructure::{
    GlobalPointerAnalysis, GlobalState, Initializer, Propagator, TransferFunction, Worklist,
};
use crate::shared::models::Program;

/// Why the worklist loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Worklist drained: the result is the fixpoint
    Converged,
    /// `max_iterations` reached
    IterationBudget,
    /// `time_budget_ms` elapsed
    TimeBudget,
    /// The cancellation flag was raised
    Cancelled,
}

/// Flow-, context- and field-sensitive pointer analysis driver
///
/// Interrupted runs still return a result. Every update is monotone, so a
/// partial result under-approximates the fixpoint only in the points that
/// were never reached.
#[derive(Debug, Clone, Default)]
pub struct SemiSparsePointerAnalysis {
    config: AnalysisConfig,
    externals: Option<ExternalPointerTable>,
    policy: Option<ContextSensitivity>,
    cancel: Option<Arc<AtomicBool>>,
}

impl SemiSparsePointerAnalysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            externals: None,
            policy: None,
            cancel: None,
        }
    }

    /// Use `table` instead of the built-in and configured effect tables
    pub fn with_external_table(mut self, table: ExternalPointerTable) -> Self {
        self.externals = Some(table);
        self
    }

    /// Use an already-resolved policy instead of `config.context_policy`
    pub fn with_policy(mut self, policy: ContextSensitivity) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Stop between iterations once `flag` is set
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn run<'p>(&self, program: &'p Program) -> Result<PointsToResult<'p>> {
        self.config.validate()?;
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => ContextSensitivity::from_config(&self.config.context_policy, program)?,
        };
        let externals = self.load_externals()?;
        let normalize_globals = !self.config.preserve_global_contexts || policy.is_insensitive();

        info!(
            policy = policy.name(),
            entry = %self.config.entry_function,
            functions = program.functions().count(),
            externals = externals.len(),
            "starting pointer analysis"
        );
        let started = Instant::now();

        let mut state = GlobalState::new(program, policy, externals, normalize_globals);
        let store = GlobalPointerAnalysis::new(&mut state).run();

        let mut memo = Memo::new();
        let mut worklist = Worklist::new();
        {
            let mut propagator = Propagator::new(program, &mut memo, &mut worklist);
            Initializer::new(&mut state).seed(&self.config.entry_function, store, &mut propagator)?;
        }

        let (termination, iterations) = self.solve(&mut state, &mut memo, &mut worklist, started);
        let stats = AnalysisStats::collect(&state, &memo, iterations, started.elapsed(), termination);
        info!(
            termination = ?stats.termination,
            iterations = stats.iterations,
            contexts = stats.contexts,
            pointers = stats.pointers,
            objects = stats.memory_objects,
            call_edges = stats.call_graph_edges,
            diagnostics = stats.diagnostics,
            elapsed_ms = stats.elapsed_ms,
            "pointer analysis finished"
        );
        Ok(PointsToResult::new(state, memo, stats))
    }

    fn load_externals(&self) -> Result<ExternalPointerTable> {
        if let Some(table) = &self.externals {
            return Ok(table.clone());
        }
        let table = match &self.config.external_table {
            Some(path) => {
                debug!(path = %path.display(), "loading external effect table");
                ExternalPointerTable::builtin_with(path)?
            }
            None => ExternalPointerTable::builtin(),
        };
        Ok(table)
    }

    fn solve(
        &self,
        state: &mut GlobalState<'_>,
        memo: &mut Memo,
        worklist: &mut Worklist,
        started: Instant,
    ) -> (Termination, usize) {
        let program = state.program;
        let mut iterations = 0usize;
        while let Some(fc) = worklist.dequeue_function() {
            while let Some(point) = worklist.dequeue_local(fc) {
                if let Some(reason) = self.exhausted(iterations, started) {
                    warn!(?reason, iterations, pending = worklist.len() + 1, "analysis stopped before the fixpoint");
                    return (reason, iterations);
                }

                let local = memo.lookup(&point).cloned();
                let result = TransferFunction::new(state, local.as_ref()).eval(point);
                Propagator::new(program, memo, worklist).propagate(&result, local.as_ref());
                iterations += 1;
            }
        }
        (Termination::Converged, iterations)
    }

    fn exhausted(&self, iterations: usize, started: Instant) -> Option<Termination> {
        if self.cancel.as_ref().is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Some(Termination::Cancelled);
        }
        if self.config.max_iterations > 0 && iterations >= self.config.max_iterations {
            return Some(Termination::IterationBudget);
        }
        if self.config.time_budget_ms > 0 && started.elapsed().as_millis() >= u128::from(self.config.time_budget_ms) {
            return Some(Termination::TimeBudget);
        }
        None
    }
}
