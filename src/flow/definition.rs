use super::service::ServiceConfig;
use crate::condition::ConditionTree;
use crate::error::FlowParseError;
use crate::scope::ConfigScope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;

/// Reserved `targetScreen` / `defaultNext` value marking the end of a journey.
/// No screen record ever carries this id.
pub const FLOW_END: &str = "__FLOW_END__";

/// Returns true when `target` is the journey-termination sentinel.
pub fn is_flow_end(target: &str) -> bool {
    target == FLOW_END
}

/// A directed graph of screens connected by a default edge plus ranked conditional edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowConfig {
    #[serde(default)]
    pub flow_id: String,
    #[serde(default)]
    pub scope: ConfigScope,
    #[serde(default)]
    pub start_screen: String,
    #[serde(default)]
    pub screens: Vec<FlowScreenConfig>,
}

/// A node of the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowScreenConfig {
    pub screen_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_next: String,
    #[serde(default)]
    pub conditions: Vec<NavigationCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_back: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_skip: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceConfig>,
}

/// A prioritized rule pairing a condition tree with a transition action.
///
/// `condition` and `action` are optional because partially authored rules are
/// a normal draft state; the validator warns about them and the navigator
/// skips them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationCondition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionTree>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_screen: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    /// Move directly to `targetScreen`.
    Navigate,
    /// Invoke a service, then move to `targetScreen`.
    CallService,
    /// Advance without user interaction.
    Skip,
    /// Terminate the journey.
    EndFlow,
    /// Return to a previously visited screen.
    LoopBack,
}

impl ActionType {
    /// Actions that are meaningless without a `targetScreen`.
    pub fn requires_target(&self) -> bool {
        matches!(
            self,
            ActionType::Navigate | ActionType::CallService | ActionType::LoopBack
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionType::Navigate => "NAVIGATE",
            ActionType::CallService => "CALL_SERVICE",
            ActionType::Skip => "SKIP",
            ActionType::EndFlow => "END_FLOW",
            ActionType::LoopBack => "LOOP_BACK",
        })
    }
}

impl Action {
    pub fn new(action_type: ActionType, target_screen: Option<&str>) -> Self {
        Self {
            action_type,
            target_screen: target_screen.map(str::to_string),
            metadata: None,
        }
    }

    pub fn navigate(target: &str) -> Self {
        Self::new(ActionType::Navigate, Some(target))
    }

    pub fn call_service(target: &str) -> Self {
        Self::new(ActionType::CallService, Some(target))
    }

    pub fn end_flow() -> Self {
        Self::new(ActionType::EndFlow, None)
    }
}

impl NavigationCondition {
    pub fn new(id: &str, priority: i32, condition: ConditionTree, action: Action) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            priority,
            enabled: true,
            condition: Some(condition),
            action: Some(action),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl FlowScreenConfig {
    pub fn new(screen_id: &str, default_next: &str) -> Self {
        Self {
            screen_id: screen_id.to_string(),
            display_name: Some(screen_id.to_string()),
            default_next: default_next.to_string(),
            conditions: Vec::new(),
            allow_back: None,
            allow_skip: None,
            max_retries: None,
            services: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: NavigationCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.services.push(service);
        self
    }

    pub fn service(&self, service_id: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.service_id == service_id)
    }
}

impl FlowConfig {
    /// Parses a flow document. Unparseable JSON is a fatal error; malformed
    /// conditions and missing identity fields are left to the validator.
    pub fn from_json_str(json: &str) -> Result<Self, FlowParseError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &str) -> Result<Self, FlowParseError> {
        let content = fs::read_to_string(path).map_err(|source| FlowParseError::Io {
            path: path.to_string(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Looks up a screen by id. With duplicate ids the first declaration wins.
    pub fn screen(&self, screen_id: &str) -> Option<&FlowScreenConfig> {
        self.screens.iter().find(|s| s.screen_id == screen_id)
    }

    pub fn has_screen(&self, screen_id: &str) -> bool {
        self.screen(screen_id).is_some()
    }

    /// Total number of conditional routes across all screens.
    pub fn conditional_routes(&self) -> usize {
        self.screens.iter().map(|s| s.conditions.len()).sum()
    }
}

/// Parses a flow document from JSON.
pub fn parse_flow(json: &str) -> Result<FlowConfig, FlowParseError> {
    FlowConfig::from_json_str(json)
}
