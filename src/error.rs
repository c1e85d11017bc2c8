use crate::scope::ScopeType;
use thiserror::Error;

/// Errors that can occur while resolving a configuration record for a scope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error(
        "Entity '{entity_id}' has no active PRODUCT-level configuration for product '{product_code}'"
    )]
    NotFound {
        entity_id: String,
        product_code: String,
        chain: Vec<String>,
    },

    #[error("Requested scope is invalid: {0}")]
    InvalidScope(#[from] ScopeError),
}

/// Violations of the `ConfigScope` shape invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScopeError {
    #[error("productCode must not be empty")]
    MissingProductCode,

    #[error("partnerCode is required for a {0} scope")]
    MissingPartnerCode(ScopeType),

    #[error("branchCode is required for a BRANCH scope")]
    MissingBranchCode,

    #[error("{field} must not be set on a {scope_type} scope")]
    UnexpectedCode {
        field: &'static str,
        scope_type: ScopeType,
    },
}

/// Fatal routing errors raised by the navigation engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Screen '{screen_id}' is not part of flow '{flow_id}'")]
    UnknownScreen { flow_id: String, screen_id: String },
}

/// Errors raised when a flow document cannot be read at all.
#[derive(Error, Debug)]
pub enum FlowParseError {
    #[error("Failed to parse flow JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Could not read flow file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading runtime context documents.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Failed to parse context JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Context document must be a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Could not read context file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while loading the engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Could not read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Failures of a custom-code execution. These never abort a decision; the
/// evaluator downgrades them to a `false` outcome plus a diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    #[error("Custom code execution is disabled")]
    Disabled,

    #[error("No handler registered for language '{0}'")]
    UnsupportedLanguage(String),

    #[error("Custom code timed out after {0}ms")]
    Timeout(u64),

    #[error("Custom code failed: {0}")]
    Failed(String),
}
