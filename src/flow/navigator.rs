use super::definition::{ActionType, FlowConfig, FlowScreenConfig, is_flow_end};
use crate::data::EvaluationContext;
use crate::error::NavigationError;
use crate::evaluator::{EvaluationDiagnostic, Evaluator};
use itertools::Itertools;
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;
use tracing::debug;

/// The navigation decision for one screen transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub action: ActionType,
    pub target_screen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Id of the rule that fired, `None` when `defaultNext` was followed.
    pub matched_condition: Option<String>,
    pub reason: String,
    /// Journey rules of the current screen, enforced by the caller.
    pub policy: ScreenPolicy,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<NavigationDiagnostic>,
}

/// Back/skip/retry rules of a screen. The engine reports them as authored;
/// enforcing them against journey history is the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenPolicy {
    pub allow_back: Option<bool>,
    pub allow_skip: Option<bool>,
    pub max_retries: Option<u32>,
}

impl From<&FlowScreenConfig> for ScreenPolicy {
    fn from(screen: &FlowScreenConfig) -> Self {
        Self {
            allow_back: screen.allow_back,
            allow_skip: screen.allow_skip,
            max_retries: screen.max_retries,
        }
    }
}

/// A non-fatal problem met while deciding, located precisely enough to fix
/// the offending rule without a stack trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationDiagnostic {
    pub screen_id: String,
    /// `None` for screen-level problems such as a missing `defaultNext`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<String>,
    /// Position of the rule in authoring order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_index: Option<usize>,
    /// Path inside the condition tree, `None` for rule-level problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_path: Option<String>,
    pub message: String,
}

impl fmt::Display for NavigationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "screen '{}'", self.screen_id)?;
        if let (Some(condition), Some(index)) = (&self.condition_id, self.rule_index) {
            write!(f, ", condition '{}' (rule {})", condition, index)?;
        }
        if let Some(path) = &self.tree_path {
            write!(f, " at {}", path)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Decides the next action for `current_screen_id`.
///
/// Enabled rules are tried in descending priority; rules with equal priority
/// keep their authoring order. The first rule whose condition evaluates to
/// `true` supplies the action. When none match, `defaultNext` is followed:
/// `FLOW_END` yields `END_FLOW`, anything else `NAVIGATE`. An empty
/// `defaultNext` yields `NAVIGATE` with no target and a screen-level diagnostic.
///
/// Pure: the same flow, screen and context always produce the same decision.
pub fn decide(
    flow: &FlowConfig,
    current_screen_id: &str,
    context: &EvaluationContext,
    evaluator: &Evaluator,
) -> Result<Decision, NavigationError> {
    let screen = flow
        .screen(current_screen_id)
        .ok_or_else(|| NavigationError::UnknownScreen {
            flow_id: flow.flow_id.clone(),
            screen_id: current_screen_id.to_string(),
        })?;

    let policy = ScreenPolicy::from(screen);
    let mut diagnostics = Vec::new();

    let ranked = screen
        .conditions
        .iter()
        .enumerate()
        .filter(|(_, rule)| rule.enabled)
        .sorted_by_key(|(_, rule)| Reverse(rule.priority));

    for (rule_index, rule) in ranked {
        let rule_note = |message: &str| NavigationDiagnostic {
            screen_id: screen.screen_id.clone(),
            condition_id: Some(rule.id.clone()),
            rule_index: Some(rule_index),
            tree_path: None,
            message: message.to_string(),
        };
        let Some(tree) = &rule.condition else {
            diagnostics.push(rule_note("rule has no condition, skipped"));
            continue;
        };
        let Some(action) = &rule.action else {
            diagnostics.push(rule_note("rule has no action, skipped"));
            continue;
        };

        let evaluation = evaluator.evaluate_detailed(tree, context);
        diagnostics.extend(
            evaluation
                .diagnostics
                .iter()
                .map(|d| locate(d, &screen.screen_id, &rule.id, rule_index)),
        );
        debug!(
            screen = %screen.screen_id,
            condition = %rule.id,
            priority = rule.priority,
            outcome = evaluation.outcome,
            "Evaluated navigation rule"
        );

        if evaluation.outcome {
            return Ok(Decision {
                action: action.action_type,
                target_screen: action.target_screen.clone(),
                metadata: action.metadata.clone(),
                matched_condition: Some(rule.id.clone()),
                reason: format!(
                    "condition '{}' (priority {}) matched: {}",
                    rule.id,
                    rule.priority,
                    evaluation.reason()
                ),
                policy,
                diagnostics,
            });
        }
    }

    let default_next = screen.default_next.trim();
    let (action, target_screen) = if is_flow_end(default_next) {
        (ActionType::EndFlow, None)
    } else if default_next.is_empty() {
        diagnostics.push(NavigationDiagnostic {
            screen_id: screen.screen_id.clone(),
            condition_id: None,
            rule_index: None,
            tree_path: None,
            message: "no condition matched and the screen has no defaultNext, no target screen"
                .to_string(),
        });
        (ActionType::Navigate, None)
    } else {
        (ActionType::Navigate, Some(default_next.to_string()))
    };
    debug!(
        screen = %screen.screen_id,
        action = %action,
        "No navigation rule matched, following defaultNext"
    );

    Ok(Decision {
        action,
        target_screen,
        metadata: None,
        matched_condition: None,
        reason: format!("no condition matched, defaultNext is '{}'", screen.default_next),
        policy,
        diagnostics,
    })
}

fn locate(
    diagnostic: &EvaluationDiagnostic,
    screen_id: &str,
    condition_id: &str,
    rule_index: usize,
) -> NavigationDiagnostic {
    NavigationDiagnostic {
        screen_id: screen_id.to_string(),
        condition_id: Some(condition_id.to_string()),
        rule_index: Some(rule_index),
        tree_path: Some(diagnostic.path_string()),
        message: diagnostic.message.clone(),
    }
}
