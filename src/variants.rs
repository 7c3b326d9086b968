//! Variant-set save path
//!
//! Every save replaces an experiment's whole variant set. The set is
//! validated here (two or more variants, unique keys, weights summing to 100)
//! and then written by the store in one transaction.

use std::sync::Arc;

use tracing::info;

use crate::experiment::{validate_variant_set, Variant, VariantDraft};
use crate::store::AssignmentStore;
use crate::{Error, Result};

/// Loads and saves experiment variant sets.
pub struct VariantSetService<S> {
    store: Arc<S>,
}

impl<S: AssignmentStore> VariantSetService<S> {
    /// Create a service over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Variants of an experiment in creation order.
    ///
    /// # Errors
    ///
    /// Returns the store's error.
    pub async fn list(&self, experiment_id: &str) -> Result<Vec<Variant>> {
        self.store.find_variants(experiment_id.trim()).await
    }

    /// Validate `drafts` and replace the experiment's variant set with them.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] if the set breaks a save rule or names a
    ///   variant of another experiment
    /// - [`Error::Persistence`] if the store fails or a removed variant is
    ///   still referenced by assignments; nothing is written in either case
    pub async fn save(&self, experiment_id: &str, drafts: &[VariantDraft]) -> Result<Vec<Variant>> {
        let experiment_id = experiment_id.trim();
        if experiment_id.is_empty() {
            return Err(Error::validation("Experiment ID is required."));
        }

        let normalized = validate_variant_set(drafts)?;
        let saved = self
            .store
            .replace_variant_set(experiment_id, normalized)
            .await?;

        info!(experiment_id, variants = saved.len(), "saved variant set");
        Ok(saved)
    }
}
