use super::definition::{FLOW_END, FlowConfig, FlowScreenConfig, is_flow_end};
use super::service::OnErrorPolicy;
use crate::error::FlowParseError;
use crate::scope::ScopeType;
use ahash::AHashSet;
use serde::Serialize;
use tracing::debug;

/// Outcome of validating a flow. Errors block activation, warnings never do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: ValidationSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    pub screens: usize,
    pub conditional_routes: usize,
    pub warnings: usize,
}

/// Checks a flow for structural soundness before activation.
///
/// Mandatory invariants produce errors. Dangling references, missing labels and
/// half-authored rules only produce warnings, since partially authored flows are
/// a normal draft state. Reachability from the start screen is not analysed.
pub fn validate_flow(flow: &FlowConfig) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_identity(flow, &mut errors);
    check_start_screen(flow, &mut errors);

    if !flow.screens.iter().any(|s| is_flow_end(&s.default_next)) {
        errors.push(format!(
            "Flow must have at least one screen that routes to Flow End ({})",
            FLOW_END
        ));
    }

    if let Err(e) = serde_json::to_string(flow) {
        errors.push(format!("Flow is not JSON-serializable: {}", e));
    }

    let known: AHashSet<&str> = flow.screens.iter().map(|s| s.screen_id.as_str()).collect();
    let mut seen = AHashSet::new();
    for screen in &flow.screens {
        if !seen.insert(screen.screen_id.as_str()) {
            warnings.push(format!(
                "Duplicate screen id '{}', only the first declaration is used",
                screen.screen_id
            ));
        }
        check_screen(screen, &known, &mut warnings);
    }

    let summary = ValidationSummary {
        screens: flow.screens.len(),
        conditional_routes: flow.conditional_routes(),
        warnings: warnings.len(),
    };
    debug!(
        flow = %flow.flow_id,
        errors = errors.len(),
        warnings = warnings.len(),
        "Validated flow"
    );

    ValidationReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        summary,
    }
}

/// Parses and validates a flow document. Only unparseable JSON is an error;
/// every structural problem is reported inside the returned report.
pub fn validate_flow_json(json: &str) -> Result<ValidationReport, FlowParseError> {
    let flow = FlowConfig::from_json_str(json)?;
    Ok(validate_flow(&flow))
}

fn check_identity(flow: &FlowConfig, errors: &mut Vec<String>) {
    if flow.flow_id.trim().is_empty() {
        errors.push("Flow ID is required".to_string());
    }
    let scope = &flow.scope;
    if scope.product_code.trim().is_empty() {
        errors.push("Product code is required".to_string());
    }
    match scope.scope_type {
        ScopeType::Product => {}
        ScopeType::Partner => {
            if scope.partner_key().is_none() {
                errors.push("Partner code is required for PARTNER scope".to_string());
            }
        }
        ScopeType::Branch => {
            errors.push("Flow scope must be PRODUCT or PARTNER, found BRANCH".to_string());
        }
    }
}

fn check_start_screen(flow: &FlowConfig, errors: &mut Vec<String>) {
    if flow.start_screen.trim().is_empty() {
        errors.push("Start screen is required".to_string());
    } else if !flow.has_screen(&flow.start_screen) {
        errors.push(format!(
            "Start screen '{}' is not defined in screens",
            flow.start_screen
        ));
    }
}

fn check_screen(screen: &FlowScreenConfig, known: &AHashSet<&str>, warnings: &mut Vec<String>) {
    let id = &screen.screen_id;

    if screen
        .display_name
        .as_deref()
        .is_none_or(|name| name.trim().is_empty())
    {
        warnings.push(format!("Screen '{}' has no display name", id));
    }

    if screen.default_next.trim().is_empty() {
        warnings.push(format!("Screen '{}' has no defaultNext", id));
    } else if !is_known_target(&screen.default_next, known) {
        warnings.push(format!(
            "Screen '{}' defaultNext references unknown screen '{}'",
            id, screen.default_next
        ));
    }

    for (index, rule) in screen.conditions.iter().enumerate() {
        let label = format!("Screen '{}' condition '{}' (rule {})", id, rule.id, index);
        match &rule.condition {
            None => warnings.push(format!("{} has no condition", label)),
            Some(tree) => {
                for (path, invalid) in tree.invalid_nodes() {
                    warnings.push(format!(
                        "{} has a malformed condition at {}: {}",
                        label, path, invalid.error
                    ));
                }
            }
        }
        let Some(action) = &rule.action else {
            warnings.push(format!("{} has no action", label));
            continue;
        };
        match action.target_screen.as_deref().filter(|t| !t.is_empty()) {
            Some(target) if rule.enabled && !is_known_target(target, known) => {
                warnings.push(format!(
                    "{} targets unknown screen '{}'",
                    label, target
                ));
            }
            None if action.action_type.requires_target() => {
                warnings.push(format!(
                    "{} has a {} action without a targetScreen",
                    label, action.action_type
                ));
            }
            _ => {}
        }
    }

    for service in &screen.services {
        if service.on_error != OnErrorPolicy::RouteToScreen {
            continue;
        }
        match service.error_screen.as_deref().filter(|s| !s.is_empty()) {
            None => warnings.push(format!(
                "Screen '{}' service '{}' routes errors to a screen but has no errorScreen",
                id, service.service_id
            )),
            Some(target) if !is_known_target(target, known) => warnings.push(format!(
                "Screen '{}' service '{}' errorScreen references unknown screen '{}'",
                id, service.service_id, target
            )),
            Some(_) => {}
        }
    }
}

fn is_known_target(target: &str, known: &AHashSet<&str>) -> bool {
    is_flow_end(target) || known.contains(target)
}
