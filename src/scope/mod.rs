use crate::error::ScopeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

mod resolver;

pub use resolver::{BatchResolution, ResolvedConfig, resolve, resolve_all};

/// Override level of a configuration. BRANCH is the most specific, PRODUCT the fallback.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeType {
    #[default]
    Product,
    Partner,
    Branch,
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScopeType::Product => "PRODUCT",
            ScopeType::Partner => "PARTNER",
            ScopeType::Branch => "BRANCH",
        })
    }
}

/// The PRODUCT / PARTNER / BRANCH addressing tuple of a configuration.
///
/// Every field reads with a default so drafts with missing codes still load;
/// [`ConfigScope::validate`] and the flow validator report what is missing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigScope {
    #[serde(rename = "type", default)]
    pub scope_type: ScopeType,
    #[serde(default)]
    pub product_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_code: Option<String>,
}

impl ConfigScope {
    pub fn product(product_code: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Product,
            product_code: product_code.into(),
            partner_code: None,
            branch_code: None,
        }
    }

    pub fn partner(product_code: impl Into<String>, partner_code: impl Into<String>) -> Self {
        Self {
            scope_type: ScopeType::Partner,
            product_code: product_code.into(),
            partner_code: Some(partner_code.into()),
            branch_code: None,
        }
    }

    pub fn branch(
        product_code: impl Into<String>,
        partner_code: impl Into<String>,
        branch_code: impl Into<String>,
    ) -> Self {
        Self {
            scope_type: ScopeType::Branch,
            product_code: product_code.into(),
            partner_code: Some(partner_code.into()),
            branch_code: Some(branch_code.into()),
        }
    }

    /// Checks that exactly the codes required by `scope_type` are present.
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.product_code.trim().is_empty() {
            return Err(ScopeError::MissingProductCode);
        }
        let has_partner = non_empty(&self.partner_code);
        let has_branch = non_empty(&self.branch_code);
        match self.scope_type {
            ScopeType::Product => {
                if has_partner {
                    return Err(ScopeError::UnexpectedCode {
                        field: "partnerCode",
                        scope_type: self.scope_type,
                    });
                }
                if has_branch {
                    return Err(ScopeError::UnexpectedCode {
                        field: "branchCode",
                        scope_type: self.scope_type,
                    });
                }
            }
            ScopeType::Partner => {
                if !has_partner {
                    return Err(ScopeError::MissingPartnerCode(self.scope_type));
                }
                if has_branch {
                    return Err(ScopeError::UnexpectedCode {
                        field: "branchCode",
                        scope_type: self.scope_type,
                    });
                }
            }
            ScopeType::Branch => {
                if !has_partner {
                    return Err(ScopeError::MissingPartnerCode(self.scope_type));
                }
                if !has_branch {
                    return Err(ScopeError::MissingBranchCode);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn partner_key(&self) -> Option<&str> {
        self.partner_code.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub(crate) fn branch_key(&self) -> Option<&str> {
        self.branch_code.as_deref().filter(|c| !c.trim().is_empty())
    }
}

impl fmt::Display for ConfigScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.product_code)?;
        if let Some(partner) = &self.partner_code {
            write!(f, "/{}", partner)?;
        }
        if let Some(branch) = &self.branch_code {
            write!(f, "/{}", branch)?;
        }
        Ok(())
    }
}

fn non_empty(code: &Option<String>) -> bool {
    code.as_deref().is_some_and(|c| !c.trim().is_empty())
}

/// Lifecycle state of a configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Draft,
    Active,
    Deprecated,
}

impl RecordStatus {
    /// DRAFT → ACTIVE → DEPRECATED. DEPRECATED is terminal.
    pub fn can_transition_to(&self, next: RecordStatus) -> bool {
        matches!(
            (self, next),
            (RecordStatus::Draft, RecordStatus::Active)
                | (RecordStatus::Active, RecordStatus::Deprecated)
        )
    }
}

/// A stored screen or flow configuration at one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigRecord {
    pub id: String,
    /// The `screenId` or `flowId` this record configures.
    #[serde(rename = "screenId", alias = "flowId", alias = "entityId")]
    pub entity_id: String,
    pub scope: ConfigScope,
    pub status: RecordStatus,
    #[serde(default)]
    pub version: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl ConfigRecord {
    pub fn is_active(&self) -> bool {
        self.status == RecordStatus::Active
    }
}
