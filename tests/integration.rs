//! Integration tests for Scopeflow
//!
//! End-to-end tests that drive resolution, validation and navigation together
//! from JSON and TOML documents.
//!
mod common;
use common::*;
use scopeflow::condition::Value;
use scopeflow::error::{ConfigError, FlowParseError};
use scopeflow::flow::{FailureRoute, OnErrorPolicy, ServiceConfig};
use scopeflow::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

const JOURNEY_FLOW_JSON: &str = r#"{
    "flowId": "pl-partner-journey",
    "scope": { "type": "PARTNER", "productCode": "PL", "partnerCode": "P1" },
    "startScreen": "income",
    "screens": [
        {
            "screenId": "income",
            "displayName": "Income details",
            "defaultNext": "documents",
            "allowBack": false,
            "conditions": [
                {
                    "id": "premium",
                    "name": "Premium salaried",
                    "priority": 10,
                    "enabled": true,
                    "condition": {
                        "operator": "AND",
                        "conditions": [
                            { "source": "FORM_DATA", "field": "employment.type", "operator": "IN", "value": ["SALARIED", "GOVT"] },
                            {
                                "operator": "OR",
                                "conditions": [
                                    { "source": "FORM_DATA", "field": "income", "operator": "GTE", "value": "100000" },
                                    { "source": "USER_PROFILE", "field": "segment", "operator": "EQUALS", "value": "HNI" }
                                ]
                            }
                        ]
                    },
                    "action": { "type": "CALL_SERVICE", "targetScreen": "offer", "metadata": { "serviceId": "bureau" } }
                }
            ],
            "services": [
                {
                    "serviceId": "bureau",
                    "endpoint": "https://bureau.internal/score",
                    "timeoutMs": 5000,
                    "retryPolicy": { "maxRetries": 2, "delayMs": 250 },
                    "onError": "ROUTE_TO_SCREEN",
                    "errorScreen": "documents",
                    "cache": { "ttlSeconds": 600, "keyTemplate": "bureau:{{formData.pan}}:{{applicationState.applicationId}}" }
                }
            ]
        },
        {
            "screenId": "documents",
            "displayName": "Upload documents",
            "defaultNext": "__FLOW_END__",
            "conditions": [
                {
                    "id": "kyc-pending",
                    "name": "KYC pending",
                    "priority": 1,
                    "condition": { "source": "SERVICE_RESPONSE", "field": "kyc.status", "operator": "NOT_EQUALS", "value": "VERIFIED" },
                    "action": { "type": "LOOP_BACK", "targetScreen": "income" }
                }
            ]
        },
        { "screenId": "offer", "displayName": "Offer", "defaultNext": "__FLOW_END__" }
    ]
}"#;

const CONTEXT_JSON: &str = r#"{
    "formData": { "income": 120000, "pan": "ABCDE1234F", "employment": { "type": "SALARIED" } },
    "services": { "kyc": { "status": "VERIFIED" } },
    "applicationState": { "applicationId": "APP-42" },
    "userProfile": { "segment": "MASS" }
}"#;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("scopeflow-{}-{}", std::process::id(), name))
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn test_journey_from_json() {
        let engine = Engine::default();
        let flow = FlowConfig::from_json_str(JOURNEY_FLOW_JSON).expect("Failed to parse flow");
        let context = EvaluationContext::from_json_str(CONTEXT_JSON).expect("Failed to parse context");

        let report = engine.validate_flow(&flow);
        assert!(report.is_valid, "{:?}", report.errors);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);
        assert_eq!(report.summary.screens, 3);
        assert_eq!(report.summary.conditional_routes, 2);

        let decision = engine.decide(&flow, &flow.start_screen, &context).unwrap();
        assert_eq!(decision.action, ActionType::CallService);
        assert_eq!(decision.target_screen.as_deref(), Some("offer"));
        assert_eq!(decision.metadata.as_ref().unwrap()["serviceId"], "bureau");
        assert_eq!(decision.policy.allow_back, Some(false));

        let decision = engine.decide(&flow, "documents", &context).unwrap();
        assert_eq!(decision.action, ActionType::EndFlow);

        let pending = EvaluationContext::from_json_str(r#"{ "services": { "kyc": { "status": "PENDING" } } }"#).unwrap();
        let decision = engine.decide(&flow, "documents", &pending).unwrap();
        assert_eq!(decision.action, ActionType::LoopBack);
        assert_eq!(decision.target_screen.as_deref(), Some("income"));
    }

    #[test]
    fn test_authored_income_is_numeric() {
        let engine = Engine::default();
        let flow = FlowConfig::from_json_str(JOURNEY_FLOW_JSON).unwrap();

        let modest = EvaluationContext::new()
            .with_form("employment.type", "GOVT")
            .with_form("income", 90_000.0);
        let decision = engine.decide(&flow, "income", &modest).unwrap();
        assert_eq!(decision.target_screen.as_deref(), Some("documents"));

        let hni = modest.clone().with_user("segment", "HNI");
        let decision = engine.decide(&flow, "income", &hni).unwrap();
        assert_eq!(decision.target_screen.as_deref(), Some("offer"));
        assert!(decision.reason.contains("$user.segment (was \"HNI\") EQUALS \"HNI\""));
    }

    #[test]
    fn test_flow_round_trips_through_serde() {
        let flow = FlowConfig::from_json_str(JOURNEY_FLOW_JSON).unwrap();
        let json = serde_json::to_string(&flow).unwrap();
        let reparsed = FlowConfig::from_json_str(&json).unwrap();
        assert_eq!(flow, reparsed);

        let flow = create_loan_flow();
        let reparsed = FlowConfig::from_json_str(&serde_json::to_string(&flow).unwrap()).unwrap();
        assert_eq!(flow, reparsed);
    }

    #[test]
    fn test_flow_and_context_files() {
        let flow_path = temp_path("flow.json");
        let context_path = temp_path("context.json");
        fs::write(&flow_path, JOURNEY_FLOW_JSON).unwrap();
        fs::write(&context_path, CONTEXT_JSON).unwrap();

        let flow = FlowConfig::from_file(flow_path.to_str().unwrap()).unwrap();
        let context = EvaluationContext::from_file(context_path.to_str().unwrap()).unwrap();
        let decision = decide(&flow, "income", &context, &Evaluator::disabled()).unwrap();
        assert_eq!(decision.target_screen.as_deref(), Some("offer"));

        fs::remove_file(&flow_path).ok();
        fs::remove_file(&context_path).ok();

        let missing = FlowConfig::from_file("/nonexistent/scopeflow/flow.json");
        assert!(matches!(missing, Err(FlowParseError::Io { .. })));
    }

    #[test]
    fn test_service_policy_helpers() {
        let flow = FlowConfig::from_json_str(JOURNEY_FLOW_JSON).unwrap();
        let bureau = flow.screen("income").and_then(|s| s.service("bureau")).unwrap();

        assert_eq!(bureau.timeout(), Duration::from_millis(5000));
        assert_eq!(bureau.retry_policy.max_attempts(), 3);
        assert_eq!(
            bureau.retry_policy.delays().collect::<Vec<_>>(),
            vec![Duration::from_millis(250); 2]
        );
        assert_eq!(
            bureau.on_failure(Some("offer")),
            FailureRoute::RouteTo("documents".to_string())
        );

        let cache = bureau.cache.as_ref().unwrap();
        assert_eq!(cache.ttl(), Duration::from_secs(600));
        let context = EvaluationContext::from_json_str(CONTEXT_JSON).unwrap();
        assert_eq!(cache.render_key(&context), "bureau:ABCDE1234F:APP-42");
        assert_eq!(cache.render_key(&EvaluationContext::new()), "bureau::");

        let mut plain = ServiceConfig::new("kyc");
        assert_eq!(plain.timeout(), Duration::from_secs(30));
        assert_eq!(plain.retry_policy.max_attempts(), 1);
        assert_eq!(plain.retry_policy.delays().count(), 0);
        assert_eq!(plain.on_failure(Some("offer")), FailureRoute::AbortFlow);

        plain.on_error = OnErrorPolicy::Continue;
        assert_eq!(
            plain.on_failure(Some("offer")),
            FailureRoute::Continue(Some("offer".to_string()))
        );

        plain.on_error = OnErrorPolicy::RouteToScreen;
        assert_eq!(plain.on_failure(None), FailureRoute::AbortFlow);
    }

    #[test]
    fn test_engine_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            [custom_code]
            enabled = true
            default_timeout_ms = 200
            max_timeout_ms = 800
            languages = ["javascript"]

            [log]
            level = "scopeflow=debug"
            "#,
        )
        .unwrap();

        assert!(config.custom_code.enabled);
        assert_eq!(config.custom_code.timeout_for(Some(10_000)), Duration::from_millis(800));
        assert!(config.custom_code.allows_language("JavaScript"));
        assert!(!config.custom_code.allows_language("python"));
        assert_eq!(config.log.level, "scopeflow=debug");

        let defaults = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(defaults, EngineConfig::default());
        assert_eq!(defaults.custom_code.default_timeout_ms, 1000);
        assert_eq!(defaults.log.level, "info");
    }

    #[test]
    fn test_engine_config_rejects_bad_values() {
        let err = EngineConfig::from_toml_str("[custom_code]\ndefault_timeout_ms = 9000\nmax_timeout_ms = 100\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("[custom_code]\nenabled = \"yes\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = EngineConfig::load(std::path::Path::new("/nonexistent/scopeflow.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_engine_config_file() {
        let path = temp_path("engine.toml");
        fs::write(&path, "[custom_code]\nenabled = false\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert!(!config.custom_code.enabled);
    }

    #[test]
    fn test_engine_wires_runner_from_config() {
        let runner = SandboxRunner::new().with_handler(
            "javascript",
            |_: &str, ctx: &EvaluationContext, _: &CancelToken| -> std::result::Result<Value, String> {
                Ok(Value::Bool(ctx.resolve(FieldSource::FormData, "income") != Value::Absent))
            },
        );
        let runner: Arc<dyn CodeRunner> = Arc::new(runner);
        let tree = ConditionTree::custom("javascript", "return !!form.income", None);
        let ctx = EvaluationContext::new().with_form("income", 1.0);

        let enabled = Engine::from_config(EngineConfig::default(), Arc::clone(&runner));
        assert!(enabled.evaluate(&tree, &ctx).outcome);

        let mut config = EngineConfig::default();
        config.custom_code.enabled = false;
        let disabled = Engine::from_config(config, runner);
        let evaluation = disabled.evaluate(&tree, &ctx);
        assert!(!evaluation.outcome);
        assert!(!disabled.evaluator().custom_code_config().enabled);
        assert!(!disabled.config().custom_code.enabled);
    }

    #[test]
    fn test_resolve_then_decide() {
        let engine = Engine::default();
        let flow = FlowConfig::from_json_str(JOURNEY_FLOW_JSON).unwrap();

        let mut partner_flow = create_record(
            "flow-p1",
            "pl-partner-journey",
            flow.scope.clone(),
            RecordStatus::Active,
            2,
        );
        partner_flow.payload = serde_json::to_value(&flow).unwrap();
        let mut product_flow = create_record(
            "flow-pl",
            "pl-partner-journey",
            ConfigScope::product("PL"),
            RecordStatus::Active,
            1,
        );
        product_flow.payload = serde_json::to_value(create_loan_flow()).unwrap();
        let records = vec![product_flow, partner_flow];

        let resolved = engine
            .resolve("pl-partner-journey", &ConfigScope::branch("PL", "P1", "B3"), &records)
            .unwrap();
        assert_eq!(resolved.resolved_from, ScopeType::Partner);

        let active: FlowConfig = serde_json::from_value(resolved.config.payload).unwrap();
        assert!(engine.validate_flow(&active).is_valid);

        let context = EvaluationContext::from_json_str(CONTEXT_JSON).unwrap();
        let decision = engine.decide(&active, &active.start_screen, &context).unwrap();
        assert_eq!(decision.target_screen.as_deref(), Some("offer"));
    }
}
