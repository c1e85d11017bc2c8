use super::Value;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Comparison operators available to a field condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    Equals,
    NotEquals,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    Exists,
    NotExists,
}

/// Outcome of applying an operator. `issue` is set when the operands could
/// not be compared as written; the outcome is then the lenient default.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub outcome: bool,
    pub issue: Option<String>,
}

impl Comparison {
    fn clean(outcome: bool) -> Self {
        Self {
            outcome,
            issue: None,
        }
    }

    fn failed(issue: String) -> Self {
        Self {
            outcome: false,
            issue: Some(issue),
        }
    }
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Equals => "EQUALS",
            Operator::NotEquals => "NOT_EQUALS",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::Contains => "CONTAINS",
            Operator::Exists => "EXISTS",
            Operator::NotExists => "NOT_EXISTS",
        }
    }

    /// Whether the operator ignores its right-hand operand.
    pub fn is_unary(&self) -> bool {
        matches!(self, Operator::Exists | Operator::NotExists)
    }

    /// Applies the operator to a resolved field value and the authored operand.
    /// Total: every combination of inputs yields an outcome.
    pub fn apply(&self, actual: &Value, expected: &Value) -> Comparison {
        match self {
            Operator::Exists => Comparison::clean(actual.is_present()),
            Operator::NotExists => Comparison::clean(!actual.is_present()),
            Operator::Equals => equality(actual, expected, false),
            Operator::NotEquals => equality(actual, expected, true),
            Operator::In => membership(actual, expected, false),
            Operator::NotIn => membership(actual, expected, true),
            Operator::Contains => contains(actual, expected),
            Operator::Gt => ordering(actual, expected, self, |o| o == Ordering::Greater),
            Operator::Gte => ordering(actual, expected, self, |o| o != Ordering::Less),
            Operator::Lt => ordering(actual, expected, self, |o| o == Ordering::Less),
            Operator::Lte => ordering(actual, expected, self, |o| o != Ordering::Greater),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

fn equality(actual: &Value, expected: &Value, negate: bool) -> Comparison {
    let issue = (!actual.is_absent()
        && !expected.is_absent()
        && actual.type_name() != expected.type_name())
    .then(|| {
        format!(
            "type mismatch ({} vs {}), treated as not equal",
            actual.type_name(),
            expected.type_name()
        )
    });
    Comparison {
        outcome: (actual == expected) != negate,
        issue,
    }
}

fn membership(actual: &Value, expected: &Value, negate: bool) -> Comparison {
    match expected {
        Value::Array(items) => Comparison::clean(items.contains(actual) != negate),
        other => Comparison::failed(format!(
            "{} requires an array operand, found {}",
            if negate { "NOT_IN" } else { "IN" },
            other.type_name()
        )),
    }
}

fn contains(actual: &Value, expected: &Value) -> Comparison {
    match (actual, expected) {
        (Value::String(haystack), Value::String(needle)) => {
            Comparison::clean(haystack.contains(needle.as_str()))
        }
        (Value::String(haystack), Value::Number(_)) => {
            Comparison::clean(haystack.contains(expected.to_string().as_str()))
        }
        // CONTAINS operands keep their authored spelling, so a numeric needle
        // written as "5" still finds the number 5 in an array.
        (Value::Array(items), needle @ Value::String(_)) => {
            let numeric = needle.clone().coerce_authored();
            Comparison::clean(items.iter().any(|item| item == needle || item == &numeric))
        }
        (Value::Array(items), needle) => Comparison::clean(items.contains(needle)),
        (a, b) => Comparison::failed(format!(
            "CONTAINS cannot search {} for {}",
            a.type_name(),
            b.type_name()
        )),
    }
}

fn ordering<F>(actual: &Value, expected: &Value, op: &Operator, accept: F) -> Comparison
where
    F: Fn(Ordering) -> bool,
{
    let ordered = match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::String(_), Value::String(_)) => {
            match (actual.as_instant(), expected.as_instant()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => {
                    return Comparison::failed(format!(
                        "{} on strings requires ISO-8601 dates, found {} and {}",
                        op, actual, expected
                    ));
                }
            }
        }
        (a, b) => {
            return Comparison::failed(format!(
                "{} cannot order {} against {}",
                op,
                a.type_name(),
                b.type_name()
            ));
        }
    };
    match ordered {
        Some(o) => Comparison::clean(accept(o)),
        None => Comparison::failed(format!("{} cannot order NaN", op)),
    }
}
