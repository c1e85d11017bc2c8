//! Common test utilities for building flows, records and contexts.
use scopeflow::flow::ServiceConfig;
use scopeflow::prelude::*;

/// Creates a small, valid personal-loan flow.
///
/// Screens:
/// * `applicant` → defaultNext `employment`; rule `minor` (priority 20):
///   `$user.age LT 18` → END_FLOW; rule `returning` (priority 5):
///   `$state.existingCustomer EQUALS true` → NAVIGATE `offer`
/// * `employment` → defaultNext `bureau`; rule `salaried-high` (priority 10):
///   `$form.employmentType EQUALS "SALARIED" AND $form.monthlyIncome GTE 50000`
///   → CALL_SERVICE `offer`
/// * `bureau` → defaultNext `manual-review`; rule `good-score` (priority 1):
///   `$service.bureau.score GTE 750` → NAVIGATE `offer`
/// * `offer`, `manual-review` → FLOW_END
#[allow(dead_code)]
pub fn create_loan_flow() -> FlowConfig {
    FlowConfig {
        flow_id: "pl-journey".to_string(),
        scope: ConfigScope::product("PL"),
        start_screen: "applicant".to_string(),
        screens: vec![
            FlowScreenConfig::new("applicant", "employment")
                .with_condition(NavigationCondition::new(
                    "minor",
                    20,
                    ConditionTree::field(FieldSource::UserProfile, "age", Operator::Lt, 18.0),
                    Action::end_flow(),
                ))
                .with_condition(NavigationCondition::new(
                    "returning",
                    5,
                    ConditionTree::field(
                        FieldSource::ApplicationState,
                        "existingCustomer",
                        Operator::Equals,
                        true,
                    ),
                    Action::navigate("offer"),
                )),
            FlowScreenConfig::new("employment", "bureau")
                .with_condition(NavigationCondition::new(
                    "salaried-high",
                    10,
                    ConditionTree::and(vec![
                        ConditionTree::field(
                            FieldSource::FormData,
                            "employmentType",
                            Operator::Equals,
                            "SALARIED",
                        ),
                        ConditionTree::field(
                            FieldSource::FormData,
                            "monthlyIncome",
                            Operator::Gte,
                            50_000.0,
                        ),
                    ]),
                    Action::call_service("offer"),
                ))
                .with_service(ServiceConfig::new("bureau")),
            FlowScreenConfig::new("bureau", "manual-review").with_condition(
                NavigationCondition::new(
                    "good-score",
                    1,
                    ConditionTree::field(
                        FieldSource::ServiceResponse,
                        "bureau.score",
                        Operator::Gte,
                        750.0,
                    ),
                    Action::navigate("offer"),
                ),
            ),
            FlowScreenConfig::new("offer", FLOW_END),
            FlowScreenConfig::new("manual-review", FLOW_END),
        ],
    }
}

/// A flow with a single screen that matches nothing and falls back to `default_next`.
#[allow(dead_code)]
pub fn create_single_screen_flow(default_next: &str) -> FlowConfig {
    FlowConfig {
        flow_id: "single".to_string(),
        scope: ConfigScope::product("PL"),
        start_screen: "a".to_string(),
        screens: vec![FlowScreenConfig::new("a", default_next)],
    }
}

/// Builds a configuration record for `screen` at `scope`.
#[allow(dead_code)]
pub fn create_record(
    id: &str,
    screen: &str,
    scope: ConfigScope,
    status: RecordStatus,
    version: i64,
) -> ConfigRecord {
    ConfigRecord {
        id: id.to_string(),
        entity_id: screen.to_string(),
        scope,
        status,
        version,
        updated_at: None,
        payload: serde_json::json!({ "title": id }),
    }
}

/// ACTIVE records for screen `kyc` at all three levels of PL / P1 / B7.
#[allow(dead_code)]
pub fn create_scoped_records() -> Vec<ConfigRecord> {
    vec![
        create_record(
            "kyc-product",
            "kyc",
            ConfigScope::product("PL"),
            RecordStatus::Active,
            1,
        ),
        create_record(
            "kyc-partner",
            "kyc",
            ConfigScope::partner("PL", "P1"),
            RecordStatus::Active,
            2,
        ),
        create_record(
            "kyc-branch",
            "kyc",
            ConfigScope::branch("PL", "P1", "B7"),
            RecordStatus::Active,
            3,
        ),
    ]
}

/// Simple boolean leaves for truth-table tests: `$form.<name> EQUALS true`.
#[allow(dead_code)]
pub fn flag(name: &str) -> ConditionTree {
    ConditionTree::field(FieldSource::FormData, name, Operator::Equals, true)
}

/// A context setting each named form flag to the given boolean.
#[allow(dead_code)]
pub fn create_flag_context(flags: &[(&str, bool)]) -> EvaluationContext {
    flags
        .iter()
        .fold(EvaluationContext::new(), |ctx, (name, value)| {
            ctx.with_form(*name, *value)
        })
}
