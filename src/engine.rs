use crate::condition::ConditionTree;
use crate::config::EngineConfig;
use crate::data::EvaluationContext;
use crate::error::{NavigationError, ResolveError};
use crate::evaluator::{CodeRunner, DisabledRunner, Evaluation, Evaluator};
use crate::flow::{Decision, FlowConfig, ValidationReport};
use crate::scope::{ConfigRecord, ConfigScope, ResolvedConfig};
use std::sync::Arc;
use tracing::info;

/// Entry point bundling configuration and the custom-code capability.
///
/// Every method is a pure function of its arguments; one `Engine` can serve
/// any number of concurrent sessions.
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    evaluator: Evaluator,
}

impl Default for Engine {
    fn default() -> Self {
        Self::from_config(EngineConfig::default(), Arc::new(DisabledRunner))
    }
}

impl Engine {
    /// Wires `runner` in when custom code is enabled by `config`, otherwise
    /// every custom-code leaf evaluates to `false`.
    pub fn from_config(config: EngineConfig, runner: Arc<dyn CodeRunner>) -> Self {
        let evaluator = if config.custom_code.enabled {
            Evaluator::new(runner).with_config(config.custom_code.clone())
        } else {
            info!("Custom code is disabled by configuration");
            Evaluator::disabled()
        };
        Self { config, evaluator }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn resolve(
        &self,
        entity_id: &str,
        scope: &ConfigScope,
        candidates: &[ConfigRecord],
    ) -> Result<ResolvedConfig, ResolveError> {
        crate::scope::resolve(entity_id, scope, candidates)
    }

    pub fn validate_flow(&self, flow: &FlowConfig) -> ValidationReport {
        crate::flow::validate_flow(flow)
    }

    pub fn decide(
        &self,
        flow: &FlowConfig,
        current_screen_id: &str,
        context: &EvaluationContext,
    ) -> Result<Decision, NavigationError> {
        crate::flow::decide(flow, current_screen_id, context, &self.evaluator)
    }

    pub fn evaluate(&self, tree: &ConditionTree, context: &EvaluationContext) -> Evaluation {
        self.evaluator.evaluate_detailed(tree, context)
    }
}
