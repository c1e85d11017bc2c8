use super::{LogicalOperator, Operator, Value};

/// A record of how a condition tree was evaluated, including resolved values.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationTrace {
    Group {
        operator: LogicalOperator,
        children: Vec<EvaluationTrace>,
        outcome: bool,
    },
    Leaf {
        source: String,
        operator: Operator,
        actual: Value,
        expected: Value,
        outcome: bool,
    },
    Custom {
        language: String,
        outcome: bool,
    },
    /// A node that could not be read; always `false`.
    Invalid {
        error: String,
    },
    NotEvaluated,
}

impl EvaluationTrace {
    pub fn get_outcome(&self) -> bool {
        match self {
            EvaluationTrace::Group { outcome, .. }
            | EvaluationTrace::Leaf { outcome, .. }
            | EvaluationTrace::Custom { outcome, .. } => *outcome,
            EvaluationTrace::Invalid { .. } | EvaluationTrace::NotEvaluated => false,
        }
    }

    pub fn precedence(&self) -> u8 {
        match self {
            EvaluationTrace::Group { operator, .. } => match operator {
                LogicalOperator::Or => 1,
                LogicalOperator::And => 2,
            },
            EvaluationTrace::Leaf { .. }
            | EvaluationTrace::Custom { .. }
            | EvaluationTrace::Invalid { .. }
            | EvaluationTrace::NotEvaluated => 9,
        }
    }

    /// Number of leaves that were actually evaluated.
    pub fn evaluated_leaves(&self) -> usize {
        match self {
            EvaluationTrace::Group { children, .. } => {
                children.iter().map(Self::evaluated_leaves).sum()
            }
            EvaluationTrace::Leaf { .. }
            | EvaluationTrace::Custom { .. }
            | EvaluationTrace::Invalid { .. } => 1,
            EvaluationTrace::NotEvaluated => 0,
        }
    }
}
