use super::{Operator, Value};
use itertools::Itertools;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A recursive boolean expression over leaf comparisons and AND/OR groups.
///
/// On the wire a group is `{ "operator": "AND" | "OR", "conditions": [...] }` and
/// a leaf is a bare condition object. The variant is decided once, while
/// reading, and never re-inspected afterwards.
///
/// Reading never fails on a malformed node: it becomes [`ConditionTree::Invalid`]
/// in place, keeps its authored JSON and evaluates to `false`. The rest of the
/// tree, and the flow around it, stay usable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConditionTree {
    Group(ConditionGroup),
    Leaf(Condition),
    Invalid(InvalidCondition),
}

/// A node that could not be read as a group or a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCondition {
    /// The node exactly as authored. Written back unchanged on serialization.
    pub raw: serde_json::Value,
    pub error: String,
}

impl Serialize for InvalidCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub operator: LogicalOperator,
    pub conditions: Vec<ConditionTree>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    And,
    Or,
}

impl LogicalOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

/// A leaf of the condition tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Condition {
    Custom(CustomCodeCondition),
    Field(FieldCondition),
}

/// Compares one resolved context field against an authored operand.
///
/// Numeric-looking operands are read as numbers, except for `CONTAINS`, which
/// searches for the text exactly as authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "AuthoredFieldCondition")]
pub struct FieldCondition {
    pub source: FieldSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub operator: Operator,
    #[serde(skip_serializing_if = "Value::is_absent")]
    pub value: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthoredFieldCondition {
    source: FieldSource,
    #[serde(default)]
    field: Option<String>,
    operator: Operator,
    #[serde(default)]
    value: Value,
}

impl From<AuthoredFieldCondition> for FieldCondition {
    fn from(authored: AuthoredFieldCondition) -> Self {
        let value = match authored.operator {
            Operator::Contains => authored.value,
            _ => authored.value.coerce_authored(),
        };
        Self {
            source: authored.source,
            field: authored.field,
            operator: authored.operator,
            value,
        }
    }
}

/// The context maps a field condition can read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldSource {
    FormData,
    ServiceResponse,
    ApplicationState,
    UserProfile,
}

impl FieldSource {
    /// Short prefix used when rendering traces, e.g. `$form.income`.
    pub fn prefix(&self) -> &'static str {
        match self {
            FieldSource::FormData => "form",
            FieldSource::ServiceResponse => "service",
            FieldSource::ApplicationState => "state",
            FieldSource::UserProfile => "user",
        }
    }
}

/// A leaf whose outcome is computed by caller-supplied code.
///
/// Read from either `{ "source": "CUSTOM_CODE", "customCode": { ... } }` or the
/// flat `{ "source": "CUSTOM_CODE", "language": ..., "code": ... }`. Always
/// written in the nested form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCodeCondition {
    pub source: CustomCodeSource,
    pub custom_code: CustomCode,
}

/// Single-valued marker so a custom-code leaf is only read when
/// `source` is literally `CUSTOM_CODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomCodeSource {
    #[default]
    CustomCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomCode {
    pub language: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl<'de> Deserialize<'de> for ConditionTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(ConditionTree::from_json(raw))
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Condition::from_json(&raw).map_err(D::Error::custom)
    }
}

impl Condition {
    /// Reads one leaf. The `source` decides the shape, so errors name the
    /// offending field instead of a failed variant match.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self, serde_json::Error> {
        if raw.get("source").and_then(|s| s.as_str()) != Some("CUSTOM_CODE") {
            return FieldCondition::deserialize(raw).map(Condition::Field);
        }
        let custom_code = match raw.get("customCode") {
            Some(nested) => CustomCode::deserialize(nested)?,
            None => CustomCode::deserialize(raw)?,
        };
        Ok(Condition::Custom(CustomCodeCondition {
            source: CustomCodeSource::CustomCode,
            custom_code,
        }))
    }
}

impl ConditionTree {
    /// Reads an authored tree node by node. Nodes that fail to read become
    /// [`ConditionTree::Invalid`] and their siblings are still read.
    pub fn from_json(raw: serde_json::Value) -> Self {
        if !is_group(&raw) {
            return match Condition::from_json(&raw) {
                Ok(leaf) => ConditionTree::Leaf(leaf),
                Err(e) => ConditionTree::invalid(raw, e.to_string()),
            };
        }

        let operator = raw.get("operator").map(LogicalOperator::deserialize);
        let operator = match operator {
            Some(Ok(operator)) => operator,
            Some(Err(e)) => return ConditionTree::invalid(raw, format!("group operator: {}", e)),
            None => return ConditionTree::invalid(raw, "group has no operator".to_string()),
        };
        let children = raw.get("conditions").and_then(|c| c.as_array()).cloned();
        match children {
            Some(children) => ConditionTree::Group(ConditionGroup {
                operator,
                conditions: children.into_iter().map(ConditionTree::from_json).collect(),
            }),
            None => ConditionTree::invalid(raw, "group conditions must be an array".to_string()),
        }
    }

    fn invalid(raw: serde_json::Value, error: String) -> Self {
        ConditionTree::Invalid(InvalidCondition { raw, error })
    }

    pub fn and(conditions: Vec<ConditionTree>) -> Self {
        ConditionTree::Group(ConditionGroup {
            operator: LogicalOperator::And,
            conditions,
        })
    }

    pub fn or(conditions: Vec<ConditionTree>) -> Self {
        ConditionTree::Group(ConditionGroup {
            operator: LogicalOperator::Or,
            conditions,
        })
    }

    pub fn field(
        source: FieldSource,
        field: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        ConditionTree::Leaf(Condition::Field(FieldCondition {
            source,
            field: Some(field.into()),
            operator,
            value: value.into(),
        }))
    }

    /// A leaf with no operand, for `EXISTS` / `NOT_EXISTS`.
    pub fn check(source: FieldSource, field: impl Into<String>, operator: Operator) -> Self {
        ConditionTree::Leaf(Condition::Field(FieldCondition {
            source,
            field: Some(field.into()),
            operator,
            value: Value::Absent,
        }))
    }

    pub fn custom(language: impl Into<String>, code: impl Into<String>, timeout_ms: Option<u64>) -> Self {
        ConditionTree::Leaf(Condition::Custom(CustomCodeCondition {
            source: CustomCodeSource::CustomCode,
            custom_code: CustomCode {
                language: language.into(),
                code: code.into(),
                timeout_ms,
            },
        }))
    }

    /// Normalizes the tree so its root is always a group. A bare leaf becomes
    /// a one-element AND group, which evaluates identically.
    pub fn into_group(self) -> ConditionGroup {
        match self {
            ConditionTree::Group(group) => group,
            node => ConditionGroup {
                operator: LogicalOperator::And,
                conditions: vec![node],
            },
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            ConditionTree::Leaf(_) | ConditionTree::Invalid(_) => 1,
            ConditionTree::Group(group) => group.conditions.iter().map(Self::leaf_count).sum(),
        }
    }

    /// Whether any leaf runs custom code.
    pub fn has_custom_code(&self) -> bool {
        match self {
            ConditionTree::Leaf(Condition::Custom(_)) => true,
            ConditionTree::Leaf(Condition::Field(_)) | ConditionTree::Invalid(_) => false,
            ConditionTree::Group(group) => group.conditions.iter().any(Self::has_custom_code),
        }
    }

    /// Every malformed node with its tree path, in document order.
    pub fn invalid_nodes(&self) -> Vec<(String, &InvalidCondition)> {
        let mut found = Vec::new();
        self.collect_invalid(&mut Vec::new(), &mut found);
        found
    }

    fn collect_invalid<'a>(&'a self, path: &mut Vec<usize>, found: &mut Vec<(String, &'a InvalidCondition)>) {
        match self {
            ConditionTree::Invalid(invalid) => found.push((format_path(path), invalid)),
            ConditionTree::Leaf(_) => {}
            ConditionTree::Group(group) => {
                for (index, child) in group.conditions.iter().enumerate() {
                    path.push(index);
                    child.collect_invalid(path, found);
                    path.pop();
                }
            }
        }
    }
}

/// Renders child indices from the root as `"0.2.1"`, or `"root"` when empty.
pub fn format_path(path: &[usize]) -> String {
    if path.is_empty() {
        "root".to_string()
    } else {
        path.iter().join(".")
    }
}

fn is_group(raw: &serde_json::Value) -> bool {
    raw.get("conditions").is_some()
        || matches!(raw.get("operator").and_then(|o| o.as_str()), Some("AND" | "OR"))
}

impl fmt::Display for FieldCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field.as_deref().unwrap_or("?");
        write!(f, "${}.{} {}", self.source.prefix(), field, self.operator)?;
        if !self.operator.is_unary() {
            write!(f, " {}", self.value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionTree::Leaf(Condition::Field(leaf)) => write!(f, "{}", leaf),
            ConditionTree::Leaf(Condition::Custom(custom)) => {
                write!(f, "CUSTOM_CODE({})", custom.custom_code.language)
            }
            ConditionTree::Invalid(invalid) => write!(f, "INVALID({})", invalid.error),
            ConditionTree::Group(group) => {
                write!(f, "(")?;
                for (i, child) in group.conditions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", group.operator.symbol())?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}
