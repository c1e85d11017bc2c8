pub mod definition;
pub mod navigator;
pub mod service;
pub mod validator;

pub use definition::*;
pub use navigator::{Decision, NavigationDiagnostic, ScreenPolicy, decide};
pub use service::{CacheConfig, FailureRoute, OnErrorPolicy, RetryPolicy, ServiceConfig};
pub use validator::{ValidationReport, ValidationSummary, validate_flow, validate_flow_json};
