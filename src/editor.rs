//! Variant editing session
//!
//! Models the operator's weight editor: every weight edit goes through
//! [`rebalance_locked`], every add/remove/reset through [`rebalance_even`], so
//! the rows always sum to 100 once two or more exist. [`VariantEditor::validate`]
//! is the save guard run before handing drafts to
//! [`VariantSetService::save`](crate::variants::VariantSetService::save).

use serde::{Deserialize, Serialize};

use crate::apportion::{clamp_weight, rebalance_even, rebalance_locked, TOTAL_WEIGHT};
use crate::experiment::{validate_variant_set, Variant, VariantDraft, MIN_VARIANTS};
use crate::Result;

/// One editable row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditableVariant {
    /// Identity of the saved variant, `None` for rows added in this session.
    pub id: Option<String>,
    /// Key as typed (uppercased).
    pub key: String,
    /// Current weight.
    pub weight: u32,
}

impl From<&Variant> for EditableVariant {
    fn from(variant: &Variant) -> Self {
        Self {
            id: Some(variant.id().to_string()),
            key: variant.key().to_string(),
            weight: variant.weight(),
        }
    }
}

/// Editing session over one experiment's variant set.
#[derive(Debug, Clone)]
pub struct VariantEditor {
    saved: Vec<Variant>,
    rows: Vec<EditableVariant>,
}

fn weights_of(rows: &[EditableVariant]) -> Vec<f64> {
    rows.iter().map(|row| f64::from(row.weight)).collect()
}

fn with_weights(mut rows: Vec<EditableVariant>, weights: &[u32]) -> Vec<EditableVariant> {
    for (row, weight) in rows.iter_mut().zip(weights) {
        row.weight = *weight;
    }
    rows
}

fn load(saved: &[Variant]) -> Vec<EditableVariant> {
    let rows: Vec<EditableVariant> = saved.iter().map(EditableVariant::from).collect();
    let weights = rebalance_even(&weights_of(&rows));
    with_weights(rows, &weights)
}

fn next_variant_key(rows: &[EditableVariant]) -> String {
    ('A'..='Z')
        .map(String::from)
        .find(|letter| rows.iter().all(|row| &row.key != letter))
        .unwrap_or_else(|| format!("VAR_{}", rows.len() + 1))
}

impl VariantEditor {
    /// Start a session from the saved set, rebalanced to sum to 100.
    #[must_use]
    pub fn new(saved: Vec<Variant>) -> Self {
        let rows = load(&saved);
        Self { saved, rows }
    }

    /// Current rows.
    #[must_use]
    pub fn rows(&self) -> &[EditableVariant] {
        &self.rows
    }

    /// Sum of the current weights.
    #[must_use]
    pub fn total_weight(&self) -> u32 {
        self.rows.iter().map(|row| row.weight).sum()
    }

    /// Set one row's weight and rebalance the others around it.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn set_weight(&mut self, index: usize, value: f64) -> bool {
        if index >= self.rows.len() {
            return false;
        }
        let weights = rebalance_locked(&weights_of(&self.rows), index, value);
        self.rows = with_weights(std::mem::take(&mut self.rows), &weights);
        true
    }

    /// [`set_weight`](Self::set_weight) from free text; unparsable input
    /// counts as zero.
    pub fn set_weight_input(&mut self, index: usize, raw: &str) -> bool {
        self.set_weight(index, raw.trim().parse::<f64>().unwrap_or(0.0))
    }

    /// Rename a row; the key is stored uppercased.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn set_key(&mut self, index: usize, raw: &str) -> bool {
        match self.rows.get_mut(index) {
            Some(row) => {
                row.key = raw.to_uppercase();
                true
            }
            None => false,
        }
    }

    /// Append a row with the next free key and rebalance the set.
    pub fn add_variant(&mut self) {
        let key = next_variant_key(&self.rows);
        let seed = f64::from(TOTAL_WEIGHT) / (self.rows.len() + 1) as f64;
        let mut rows = std::mem::take(&mut self.rows);
        rows.push(EditableVariant {
            id: None,
            key,
            weight: clamp_weight(seed),
        });
        let weights = rebalance_even(&weights_of(&rows));
        self.rows = with_weights(rows, &weights);
    }

    /// Whether a row may be removed without dropping below two variants.
    #[must_use]
    pub fn can_remove(&self) -> bool {
        self.rows.len() > MIN_VARIANTS
    }

    /// Remove a row and rebalance the rest.
    ///
    /// Refused (returns `false`) when out of range or when only two rows remain.
    pub fn remove_variant(&mut self, index: usize) -> bool {
        if index >= self.rows.len() || !self.can_remove() {
            return false;
        }
        let mut rows = std::mem::take(&mut self.rows);
        rows.remove(index);
        let weights = rebalance_even(&weights_of(&rows));
        self.rows = with_weights(rows, &weights);
        true
    }

    /// Discard local edits.
    pub fn reset(&mut self) {
        self.rows = load(&self.saved);
    }

    /// Whether the rows differ from the saved set.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.rows.len() != self.saved.len()
            || self
                .rows
                .iter()
                .zip(&self.saved)
                .any(|(row, saved)| EditableVariant::from(saved) != *row)
    }

    /// Whether the save action should be enabled.
    #[must_use]
    pub fn can_save(&self) -> bool {
        self.has_changes() && self.rows.len() >= MIN_VARIANTS
    }

    /// Rows as save drafts, without validation.
    #[must_use]
    pub fn drafts(&self) -> Vec<VariantDraft> {
        self.rows
            .iter()
            .map(|row| VariantDraft {
                id: row.id.clone(),
                key: row.key.clone(),
                weight: row.weight,
            })
            .collect()
    }

    /// Run the save guard and return normalized drafts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) when fewer than
    /// two rows exist, a key is empty or duplicated, or the sum is not 100.
    pub fn validate(&self) -> Result<Vec<VariantDraft>> {
        validate_variant_set(&self.drafts())
    }

    /// Adopt a freshly saved set as the new baseline.
    pub fn mark_saved(&mut self, saved: Vec<Variant>) {
        self.saved = saved;
        self.rows = load(&self.saved);
    }
}
