//! # Scopeflow - Scope Resolution and Conditional Flow Navigation
//!
//! **Scopeflow** is the decision engine behind screen and flow configurations of a
//! loan-origination journey. It answers two questions, both as pure functions:
//!
//! * Which of several overlapping configuration records applies to a customer?
//!   Records are scoped at PRODUCT, PARTNER or BRANCH level, and the most specific
//!   ACTIVE one wins.
//! * Which screen comes next? Each screen carries prioritized navigation rules
//!   whose AND/OR condition trees are evaluated against the submitted form data,
//!   service results, journey state and user profile.
//!
//! ## Core Workflow
//!
//! 1.  **Resolve**: pick the active record for a scope with [`scope::resolve`].
//! 2.  **Validate**: check a flow with [`flow::validate_flow`] before activating it.
//!     Errors block activation, warnings never do.
//! 3.  **Decide**: on every transition call [`flow::decide`] with the current screen
//!     and an [`data::EvaluationContext`].
//!
//! ## Quick Start
//!
//! ```rust
//! use scopeflow::prelude::*;
//!
//! fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let flow = FlowConfig {
//!         flow_id: "personal-loan".to_string(),
//!         scope: ConfigScope::product("PL"),
//!         start_screen: "income".to_string(),
//!         screens: vec![
//!             FlowScreenConfig::new("income", "review").with_condition(NavigationCondition::new(
//!                 "high-income",
//!                 10,
//!                 ConditionTree::field(FieldSource::FormData, "income", Operator::Gte, 100_000.0),
//!                 Action::navigate("fast-track"),
//!             )),
//!             FlowScreenConfig::new("fast-track", FLOW_END),
//!             FlowScreenConfig::new("review", FLOW_END),
//!         ],
//!     };
//!
//!     let report = validate_flow(&flow);
//!     assert!(report.is_valid, "{:?}", report.errors);
//!
//!     let context = EvaluationContext::new().with_form("income", 150_000.0);
//!     let decision = decide(&flow, "income", &context, &Evaluator::disabled())?;
//!
//!     assert_eq!(decision.action, ActionType::Navigate);
//!     assert_eq!(decision.target_screen.as_deref(), Some("fast-track"));
//!     println!("-> Reason: {}", decision.reason);
//!     Ok(())
//! }
//! ```

pub mod condition;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod flow;
pub mod prelude;
pub mod scope;
pub mod trace;
