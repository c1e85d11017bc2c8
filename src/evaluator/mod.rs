use crate::condition::{ConditionTree, EvaluationTrace, format_path};
use crate::config::CustomCodeConfig;
use crate::data::EvaluationContext;
use crate::trace::TraceFormatter;
use std::fmt;
use std::sync::Arc;

mod engine;
pub mod runner;

use engine::TreeEngine;
pub use runner::{CancelToken, CodeRequest, CodeRunner, DisabledRunner, SandboxRunner, ScriptHandler};

/// The result of evaluating one condition tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub outcome: bool,
    /// Full record of which leaves ran and what they saw.
    pub trace: EvaluationTrace,
    /// Non-fatal problems, e.g. type mismatches or custom-code timeouts.
    pub diagnostics: Vec<EvaluationDiagnostic>,
}

impl Evaluation {
    /// A human-readable explanation of the outcome.
    pub fn reason(&self) -> String {
        TraceFormatter::format_trace(&self.trace)
    }
}

/// A problem found while evaluating a single node of a condition tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationDiagnostic {
    /// Child indices from the root to the offending node. Empty for the root.
    pub path: Vec<usize>,
    pub message: String,
}

impl EvaluationDiagnostic {
    pub fn path_string(&self) -> String {
        format_path(&self.path)
    }
}

impl fmt::Display for EvaluationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {}: {}", self.path_string(), self.message)
    }
}

/// Evaluates condition trees against runtime contexts.
///
/// An `Evaluator` holds no per-call state. It can be shared across threads and
/// used concurrently for any number of sessions; only `CUSTOM_CODE` leaves
/// reach outside the process, through the configured [`CodeRunner`].
#[derive(Clone)]
pub struct Evaluator {
    runner: Arc<dyn CodeRunner>,
    custom_code: CustomCodeConfig,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::disabled()
    }
}

impl fmt::Debug for Evaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Evaluator")
            .field("custom_code", &self.custom_code)
            .finish_non_exhaustive()
    }
}

impl Evaluator {
    /// Creates an evaluator that runs custom code through `runner` with default limits.
    pub fn new(runner: Arc<dyn CodeRunner>) -> Self {
        Self {
            runner,
            custom_code: CustomCodeConfig::default(),
        }
    }

    /// Creates an evaluator whose custom-code leaves always evaluate to `false`.
    pub fn disabled() -> Self {
        Self {
            runner: Arc::new(DisabledRunner),
            custom_code: CustomCodeConfig {
                enabled: false,
                ..CustomCodeConfig::default()
            },
        }
    }

    pub fn with_config(mut self, config: CustomCodeConfig) -> Self {
        self.custom_code = config;
        self
    }

    pub fn custom_code_config(&self) -> &CustomCodeConfig {
        &self.custom_code
    }

    /// Evaluates `tree` against `context`. Total: malformed or unevaluable
    /// leaves count as `false`, they never abort the evaluation.
    pub fn evaluate(&self, tree: &ConditionTree, context: &EvaluationContext) -> bool {
        self.evaluate_detailed(tree, context).outcome
    }

    /// Like [`Evaluator::evaluate`], but also returns the trace and diagnostics.
    pub fn evaluate_detailed(&self, tree: &ConditionTree, context: &EvaluationContext) -> Evaluation {
        let (trace, diagnostics) = TreeEngine::new(self, context).evaluate(tree);
        Evaluation {
            outcome: trace.get_outcome(),
            trace,
            diagnostics,
        }
    }
}
