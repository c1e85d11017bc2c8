use super::{ConfigRecord, ConfigScope, ScopeType};
use crate::error::{ResolveError, ScopeError};
use itertools::Itertools;
use serde::Serialize;
use tracing::{debug, warn};

/// The single configuration record selected for a request, with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedConfig {
    pub config: ConfigRecord,
    /// The override level the record was found at.
    pub resolved_from: ScopeType,
    /// Ordered trace of every level attempted, most specific first.
    pub inheritance_chain: Vec<String>,
    /// Non-fatal problems, such as duplicate active records at one scope.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

/// Resolves the most specific ACTIVE record for `entity_id` at `scope`.
///
/// Levels are tried BRANCH (when a branch code is requested), then PARTNER
/// (when a partner code is requested), then PRODUCT. PRODUCT is the mandatory
/// fallback: when nothing matches there either, resolution fails with
/// [`ResolveError::NotFound`].
pub fn resolve(
    entity_id: &str,
    scope: &ConfigScope,
    candidates: &[ConfigRecord],
) -> Result<ResolvedConfig, ResolveError> {
    if scope.product_code.trim().is_empty() {
        return Err(ScopeError::MissingProductCode.into());
    }
    if scope.branch_key().is_some() && scope.partner_key().is_none() {
        return Err(ScopeError::MissingPartnerCode(ScopeType::Branch).into());
    }

    let mut chain = Vec::new();
    for level in requested_levels(scope) {
        let label = level_label(level, scope);
        let matching: Vec<&ConfigRecord> = candidates
            .iter()
            .filter(|c| c.is_active() && c.entity_id == entity_id && matches_level(c, level, scope))
            .collect();

        let Some(chosen) = pick_most_recent(&matching) else {
            debug!(entity = %entity_id, level = %level, scope = %label, "No active record at level");
            chain.push(format!("{}({}): no active record", level, label));
            continue;
        };

        let mut diagnostics = Vec::new();
        if matching.len() > 1 {
            let ignored = matching
                .iter()
                .filter(|c| c.id != chosen.id)
                .map(|c| c.id.as_str())
                .join(", ");
            warn!(
                entity = %entity_id,
                scope = %label,
                chosen = %chosen.id,
                ignored = %ignored,
                "Multiple active records share one scope"
            );
            diagnostics.push(format!(
                "{} active records for '{}' at {}({}): picked '{}' as most recently updated, ignored [{}]",
                matching.len(),
                entity_id,
                level,
                label,
                chosen.id,
                ignored
            ));
        }

        chain.push(format!(
            "{}({}): matched '{}' v{}",
            level, label, chosen.id, chosen.version
        ));
        debug!(entity = %entity_id, level = %level, record = %chosen.id, "Resolved configuration");
        return Ok(ResolvedConfig {
            config: chosen.clone(),
            resolved_from: level,
            inheritance_chain: chain,
            diagnostics,
        });
    }

    Err(ResolveError::NotFound {
        entity_id: entity_id.to_string(),
        product_code: scope.product_code.clone(),
        chain,
    })
}

/// Outcome of resolving every entity known for one scope.
#[derive(Debug, Clone, Default)]
pub struct BatchResolution {
    /// Successfully resolved entities, ordered by entity id.
    pub resolved: Vec<ResolvedConfig>,
    /// Entities with no usable record at any level.
    pub failures: Vec<(String, ResolveError)>,
}

/// Resolves every distinct entity id among `candidates` that belongs to the
/// requested product, e.g. to assemble the full screen set of a journey.
pub fn resolve_all(scope: &ConfigScope, candidates: &[ConfigRecord]) -> BatchResolution {
    let entity_ids = candidates
        .iter()
        .filter(|c| c.scope.product_code == scope.product_code)
        .map(|c| c.entity_id.as_str())
        .sorted()
        .dedup();

    let mut batch = BatchResolution::default();
    for entity_id in entity_ids {
        match resolve(entity_id, scope, candidates) {
            Ok(resolved) => batch.resolved.push(resolved),
            Err(e) => batch.failures.push((entity_id.to_string(), e)),
        }
    }
    batch
}

fn requested_levels(scope: &ConfigScope) -> Vec<ScopeType> {
    let mut levels = Vec::with_capacity(3);
    if scope.branch_key().is_some() {
        levels.push(ScopeType::Branch);
    }
    if scope.partner_key().is_some() {
        levels.push(ScopeType::Partner);
    }
    levels.push(ScopeType::Product);
    levels
}

fn matches_level(candidate: &ConfigRecord, level: ScopeType, scope: &ConfigScope) -> bool {
    let c = &candidate.scope;
    if c.scope_type != level || c.product_code != scope.product_code {
        return false;
    }
    match level {
        ScopeType::Product => true,
        ScopeType::Partner => c.partner_key() == scope.partner_key(),
        ScopeType::Branch => {
            c.partner_key() == scope.partner_key() && c.branch_key() == scope.branch_key()
        }
    }
}

/// Deterministic tie-break between duplicates: latest `updatedAt`, then the
/// highest `version`, then the greatest `id`.
fn pick_most_recent<'a>(matching: &[&'a ConfigRecord]) -> Option<&'a ConfigRecord> {
    matching
        .iter()
        .copied()
        .max_by(|a, b| {
            (a.updated_at, a.version, a.id.as_str()).cmp(&(b.updated_at, b.version, b.id.as_str()))
        })
}

fn level_label(level: ScopeType, scope: &ConfigScope) -> String {
    let product = scope.product_code.as_str();
    let partner = scope.partner_key().unwrap_or("-");
    let branch = scope.branch_key().unwrap_or("-");
    match level {
        ScopeType::Product => product.to_string(),
        ScopeType::Partner => format!("{}/{}", product, partner),
        ScopeType::Branch => format!("{}/{}/{}", product, partner, branch),
    }
}
