use super::{Evaluator, EvaluationDiagnostic};
use crate::condition::{
    Condition, ConditionGroup, ConditionTree, CustomCodeCondition, EvaluationTrace,
    FieldCondition, InvalidCondition, LogicalOperator, Value,
};
use crate::data::EvaluationContext;
use crate::evaluator::runner::CodeRequest;
use std::cell::OnceCell;
use std::sync::Arc;
use tracing::{debug, warn};

/// The core recursive engine for evaluating one condition tree against one context.
pub(super) struct TreeEngine<'a> {
    evaluator: &'a Evaluator,
    context: &'a EvaluationContext,
    // Built on the first custom-code leaf and shared by the rest.
    snapshot: OnceCell<Arc<EvaluationContext>>,
    path: Vec<usize>,
    diagnostics: Vec<EvaluationDiagnostic>,
}

impl<'a> TreeEngine<'a> {
    pub(super) fn new(evaluator: &'a Evaluator, context: &'a EvaluationContext) -> Self {
        Self {
            evaluator,
            context,
            snapshot: OnceCell::new(),
            path: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Evaluates the tree and returns a trace of the execution plus every
    /// diagnostic collected along the way.
    pub(super) fn evaluate(
        mut self,
        tree: &ConditionTree,
    ) -> (EvaluationTrace, Vec<EvaluationDiagnostic>) {
        let trace = self.evaluate_recursive(tree);
        (trace, self.diagnostics)
    }

    fn evaluate_recursive(&mut self, tree: &ConditionTree) -> EvaluationTrace {
        match tree {
            ConditionTree::Group(group) => self.evaluate_group(group),
            ConditionTree::Leaf(Condition::Field(leaf)) => self.evaluate_field(leaf),
            ConditionTree::Leaf(Condition::Custom(leaf)) => self.evaluate_custom(leaf),
            ConditionTree::Invalid(invalid) => self.evaluate_invalid(invalid),
        }
    }

    fn evaluate_invalid(&mut self, invalid: &InvalidCondition) -> EvaluationTrace {
        debug!(error = %invalid.error, "Malformed condition evaluated as false");
        self.note(format!("malformed condition treated as false: {}", invalid.error));
        EvaluationTrace::Invalid {
            error: invalid.error.clone(),
        }
    }

    fn evaluate_group(&mut self, group: &ConditionGroup) -> EvaluationTrace {
        if group.conditions.is_empty() {
            self.note(format!(
                "empty {} group evaluates to its identity",
                group.operator.symbol()
            ));
        }

        let mut children = Vec::with_capacity(group.conditions.len());
        let mut decided = None;
        for (index, child) in group.conditions.iter().enumerate() {
            if decided.is_some() {
                children.push(EvaluationTrace::NotEvaluated);
                continue;
            }
            self.path.push(index);
            let trace = self.evaluate_recursive(child);
            self.path.pop();

            match (group.operator, trace.get_outcome()) {
                (LogicalOperator::And, false) => decided = Some(false),
                (LogicalOperator::Or, true) => decided = Some(true),
                _ => {}
            }
            children.push(trace);
        }

        let outcome = decided.unwrap_or(match group.operator {
            LogicalOperator::And => true,
            LogicalOperator::Or => false,
        });
        EvaluationTrace::Group {
            operator: group.operator,
            children,
            outcome,
        }
    }

    fn evaluate_field(&mut self, leaf: &FieldCondition) -> EvaluationTrace {
        let (source, actual) = match leaf.field.as_deref() {
            Some(field) if !field.is_empty() => (
                format!("${}.{}", leaf.source.prefix(), field),
                self.context.resolve(leaf.source, field),
            ),
            _ => {
                self.note(format!(
                    "{} condition has no field, resolved as absent",
                    leaf.operator
                ));
                (format!("${}.?", leaf.source.prefix()), Value::Absent)
            }
        };

        let comparison = leaf.operator.apply(&actual, &leaf.value);
        if let Some(issue) = comparison.issue {
            self.note(format!("{}: {}", source, issue));
        }
        debug!(
            field = %source,
            operator = %leaf.operator,
            actual = %actual,
            outcome = comparison.outcome,
            "Evaluated condition leaf"
        );

        EvaluationTrace::Leaf {
            source,
            operator: leaf.operator,
            actual,
            expected: leaf.value.clone(),
            outcome: comparison.outcome,
        }
    }

    fn evaluate_custom(&mut self, leaf: &CustomCodeCondition) -> EvaluationTrace {
        let custom = &leaf.custom_code;
        let evaluator = self.evaluator;
        let config = &evaluator.custom_code;
        let language = custom.language.clone();

        if !config.enabled {
            self.note(format!("custom code ({}) is disabled", language));
            return EvaluationTrace::Custom {
                language,
                outcome: false,
            };
        }
        if !config.allows_language(&language) {
            self.note(format!("custom code language '{}' is not allowed", language));
            return EvaluationTrace::Custom {
                language,
                outcome: false,
            };
        }

        let request = CodeRequest {
            language: &custom.language,
            code: &custom.code,
            timeout: config.timeout_for(custom.timeout_ms),
        };
        let context = self.context;
        let snapshot = Arc::clone(self.snapshot.get_or_init(|| Arc::new(context.clone())));

        let outcome = match evaluator.runner.run(&request, snapshot) {
            Ok(Value::Bool(b)) => b,
            Ok(other) => {
                self.note(format!(
                    "custom code ({}) returned {} instead of a boolean",
                    language,
                    other.type_name()
                ));
                false
            }
            Err(e) => {
                warn!(language = %language, error = %e, "Custom code leaf treated as false");
                self.note(format!("custom code ({}): {}", language, e));
                false
            }
        };

        EvaluationTrace::Custom { language, outcome }
    }

    fn note(&mut self, message: String) {
        self.diagnostics.push(EvaluationDiagnostic {
            path: self.path.clone(),
            message,
        });
    }
}
