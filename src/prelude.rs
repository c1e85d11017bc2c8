//! Prelude module for convenient imports
//!
//! This module re-exports the most commonly used types and functions from the
//! scopeflow crate. Import this module to get access to the core functionality
//! without having to import each type individually.
//!
//! # Example
//!
//! ```rust,no_run
//! use scopeflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let flow = FlowConfig::from_file("path/to/flow.json")?;
//! let report = validate_flow(&flow);
//! assert!(report.is_valid);
//!
//! let context = EvaluationContext::from_file("path/to/context.json")?;
//! let decision = decide(&flow, &flow.start_screen, &context, &Evaluator::disabled())?;
//! println!("{} -> {:?}", decision.action, decision.target_screen);
//! # Ok(())
//! # }
//! ```

// Engine facade and evaluation
pub use crate::engine::Engine;
pub use crate::evaluator::{
    CancelToken, CodeRunner, DisabledRunner, Evaluation, Evaluator, SandboxRunner,
};

// Condition model
pub use crate::condition::{
    ConditionTree, EvaluationTrace, FieldSource, LogicalOperator, Operator, Value,
};
pub use crate::data::EvaluationContext;

// Scope resolution
pub use crate::scope::{
    ConfigRecord, ConfigScope, RecordStatus, ResolvedConfig, ScopeType, resolve,
};

// Flows
pub use crate::flow::{
    Action, ActionType, Decision, FLOW_END, FlowConfig, FlowScreenConfig, NavigationCondition,
    ValidationReport, decide, validate_flow,
};

// Configuration and errors
pub use crate::config::EngineConfig;
pub use crate::error::{NavigationError, ResolveError, RunnerError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
