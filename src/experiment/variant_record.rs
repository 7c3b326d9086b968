//! Variant - weighted arm of an experiment, plus the save-time set rules

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::apportion::TOTAL_WEIGHT;
use crate::{Error, Result};

/// Maximum variant key length (after trimming).
pub const MAX_KEY_LEN: usize = 32;

/// Minimum number of variants in a saved set.
pub const MIN_VARIANTS: usize = 2;

/// A persisted variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Variant {
    id: String,
    experiment_id: String,
    key: String,
    weight: u32,
    created_at: DateTime<Utc>,
}

impl Variant {
    /// Create a variant with a fresh id and the current timestamp.
    ///
    /// The key is normalized to uppercase.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, key: &str, weight: u32) -> Self {
        VariantBuilder::new(experiment_id, key, weight).build()
    }

    /// Create a builder for constructing a variant with optional fields.
    #[must_use]
    pub fn builder(experiment_id: impl Into<String>, key: &str, weight: u32) -> VariantBuilder {
        VariantBuilder::new(experiment_id, key, weight)
    }

    /// Get the variant ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the parent experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the (uppercase) key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get the weight in `[0, 100]`.
    #[must_use]
    pub const fn weight(&self) -> u32 {
        self.weight
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Apply an update draft in place, keeping id and creation time.
    pub(crate) fn apply(&mut self, draft: &VariantDraft) {
        self.key = normalize_key(&draft.key);
        self.weight = draft.weight;
    }

    /// Editable copy of this variant.
    #[must_use]
    pub fn to_draft(&self) -> VariantDraft {
        VariantDraft::existing(self.id.clone(), &self.key, self.weight)
    }
}

/// Builder for `Variant`.
#[derive(Debug)]
pub struct VariantBuilder {
    id: Option<String>,
    experiment_id: String,
    key: String,
    weight: u32,
    created_at: DateTime<Utc>,
}

impl VariantBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(experiment_id: impl Into<String>, key: &str, weight: u32) -> Self {
        Self {
            id: None,
            experiment_id: experiment_id.into(),
            key: normalize_key(key),
            weight,
            created_at: Utc::now(),
        }
    }

    /// Use an existing identity instead of generating one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `Variant`.
    #[must_use]
    pub fn build(self) -> Variant {
        Variant {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            experiment_id: self.experiment_id,
            key: self.key,
            weight: self.weight,
            created_at: self.created_at,
        }
    }
}

/// One entry of a desired variant set.
///
/// `id` present means update that variant, absent means create one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VariantDraft {
    /// Existing variant identity, if any.
    pub id: Option<String>,
    /// Key (normalized to uppercase by [`validate_variant_set`]).
    pub key: String,
    /// Weight in `[0, 100]`.
    pub weight: u32,
}

impl VariantDraft {
    /// Draft for a variant that does not exist yet.
    #[must_use]
    pub fn new(key: &str, weight: u32) -> Self {
        Self {
            id: None,
            key: key.to_string(),
            weight,
        }
    }

    /// Draft updating an existing variant.
    #[must_use]
    pub fn existing(id: impl Into<String>, key: &str, weight: u32) -> Self {
        Self {
            id: Some(id.into()),
            key: key.to_string(),
            weight,
        }
    }
}

/// Trim and uppercase a variant key.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_uppercase()
}

/// Validate a full desired variant set and return it normalized.
///
/// Rules: at least two variants; keys non-empty, at most 32 characters and
/// unique after uppercase normalization; weights in `[0, 100]`; weights sum
/// to exactly 100.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the first rule broken.
pub fn validate_variant_set(drafts: &[VariantDraft]) -> Result<Vec<VariantDraft>> {
    if drafts.len() < MIN_VARIANTS {
        return Err(Error::validation("Provide at least two variants."));
    }

    let mut seen = HashSet::with_capacity(drafts.len());
    let mut normalized = Vec::with_capacity(drafts.len());
    let mut total = 0u32;

    for draft in drafts {
        let key = normalize_key(&draft.key);
        if key.is_empty() {
            return Err(Error::validation("Variant keys cannot be empty."));
        }
        if key.chars().count() > MAX_KEY_LEN {
            return Err(Error::validation(format!(
                "Variant key \"{key}\" exceeds {MAX_KEY_LEN} characters."
            )));
        }
        if draft.weight > TOTAL_WEIGHT {
            return Err(Error::validation(
                "Weights must be integers between 0 and 100.",
            ));
        }
        if !seen.insert(key.clone()) {
            return Err(Error::validation(format!("Duplicate key \"{key}\".")));
        }

        total += draft.weight;
        normalized.push(VariantDraft {
            id: draft.id.clone(),
            key,
            weight: draft.weight,
        });
    }

    if total != TOTAL_WEIGHT {
        return Err(Error::validation(format!(
            "Variant weights must add up to 100% (got {total})."
        )));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<Vec<VariantDraft>>) -> String {
        match result {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_variant_key_normalized() {
        let variant = Variant::new("exp-1", "  control ", 50);
        assert_eq!(variant.key(), "CONTROL");
        assert_eq!(variant.weight(), 50);
        assert_eq!(variant.experiment_id(), "exp-1");
    }

    #[test]
    fn test_valid_set_is_normalized() {
        let drafts = vec![VariantDraft::new(" a", 60), VariantDraft::new("b ", 40)];
        let normalized = validate_variant_set(&drafts).unwrap();
        assert_eq!(normalized[0].key, "A");
        assert_eq!(normalized[1].key, "B");
    }

    #[test]
    fn test_too_few_variants() {
        let msg = message(validate_variant_set(&[VariantDraft::new("A", 100)]));
        assert!(msg.contains("at least two"));
    }

    #[test]
    fn test_empty_key() {
        let drafts = vec![VariantDraft::new("  ", 50), VariantDraft::new("B", 50)];
        assert!(message(validate_variant_set(&drafts)).contains("cannot be empty"));
    }

    #[test]
    fn test_duplicate_key_case_insensitive() {
        let drafts = vec![VariantDraft::new("a", 50), VariantDraft::new("A", 50)];
        assert!(message(validate_variant_set(&drafts)).contains("Duplicate key"));
    }

    #[test]
    fn test_long_key() {
        let drafts = vec![
            VariantDraft::new(&"K".repeat(33), 50),
            VariantDraft::new("B", 50),
        ];
        assert!(message(validate_variant_set(&drafts)).contains("exceeds"));
    }

    #[test]
    fn test_weight_out_of_range() {
        let drafts = vec![VariantDraft::new("A", 101), VariantDraft::new("B", 0)];
        assert!(message(validate_variant_set(&drafts)).contains("between 0 and 100"));
    }

    #[test]
    fn test_sum_must_be_100() {
        let drafts = vec![VariantDraft::new("A", 50), VariantDraft::new("B", 49)];
        assert!(message(validate_variant_set(&drafts)).contains("add up to 100"));
    }
}
