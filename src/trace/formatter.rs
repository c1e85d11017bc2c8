use crate::condition::{EvaluationTrace, Value};
use itertools::Itertools;

/// Formats evaluation traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// Format an evaluation trace into a human-readable explanation.
    pub fn format_trace(trace: &EvaluationTrace) -> String {
        // Start the recursive formatting with the lowest possible parent precedence.
        Self::format_recursive(trace, 0)
    }

    /// Recursively formats the trace, adding parentheses only when necessary.
    fn format_recursive(trace: &EvaluationTrace, parent_precedence: u8) -> String {
        let current_precedence = trace.precedence();

        match trace {
            EvaluationTrace::Group {
                operator, children, ..
            } => {
                // Short-circuited children are dropped; only the decisive part is shown.
                let parts: Vec<String> = children
                    .iter()
                    .filter(|c| !matches!(c, EvaluationTrace::NotEvaluated))
                    .map(|c| Self::format_recursive(c, current_precedence))
                    .collect();
                if parts.is_empty() {
                    return format!("empty {}", operator.symbol());
                }
                let needs_parens = parts.len() > 1 && current_precedence < parent_precedence;
                let body = parts.join(&format!(" {} ", operator.symbol()));
                if needs_parens {
                    format!("({})", body)
                } else {
                    body
                }
            }
            EvaluationTrace::Leaf {
                source,
                operator,
                actual,
                expected,
                ..
            } => {
                if operator.is_unary() {
                    format!("{} (was {}) {}", source, Self::format_value(actual), operator)
                } else {
                    format!(
                        "{} (was {}) {} {}",
                        source,
                        Self::format_value(actual),
                        operator,
                        Self::format_value(expected)
                    )
                }
            }
            EvaluationTrace::Custom { language, outcome } => {
                format!("CUSTOM_CODE[{}] returned {}", language, outcome)
            }
            EvaluationTrace::Invalid { error } => format!("invalid condition ({})", error),
            EvaluationTrace::NotEvaluated => String::new(),
        }
    }

    /// Format a value for display.
    fn format_value(value: &Value) -> String {
        match value {
            Value::Array(items) => format!("[{}]", items.iter().map(Self::format_value).join(", ")),
            other => other.to_string(),
        }
    }
}
