//! In-memory store implementation using `DashMap`.
//!
//! Data is lost on process restart. For persistence, use `SqliteStore`.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::AssignmentStore;
use crate::experiment::{Assignment, Variant, VariantDraft};
use crate::{Error, Result};

type PairKey = (String, String);

fn pair_key(experiment_id: &str, user_id: &str) -> PairKey {
    (experiment_id.to_string(), user_id.to_string())
}

/// In-memory store using lock-free concurrent hashmaps.
///
/// Uniqueness of `(experiment_id, user_id)` comes from the `DashMap` entry
/// API: only callers hashing to the same shard contend. A variant set is
/// swapped while holding its experiment's entry, so readers see either the
/// old set or the new one.
///
/// # Example
///
/// ```rust
/// use trueno_ab::store::{AssignmentStore, MemoryStore};
///
/// # async fn example() -> trueno_ab::Result<()> {
/// let store = MemoryStore::new();
/// assert!(store.find_assignment("exp-1", "user-1").await?.is_none());
/// assert!(store.find_variants("exp-1").await?.is_empty());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    variants: DashMap<String, Vec<Variant>>,
    assignments: DashMap<PairKey, (u64, Assignment)>,
    sequence: AtomicU64,
}

impl MemoryStore {
    /// Create a new in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variants: DashMap::new(),
            assignments: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Create with pre-allocated assignment capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            variants: DashMap::new(),
            assignments: DashMap::with_capacity(capacity),
            sequence: AtomicU64::new(0),
        }
    }

    /// Number of assignments across all experiments.
    #[must_use]
    pub fn assignment_count(&self) -> usize {
        self.assignments.len()
    }

    /// Number of experiments holding a variant set.
    #[must_use]
    pub fn experiment_count(&self) -> usize {
        self.variants.len()
    }

    /// Check if the store holds no assignments and no variants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty() && self.variants.iter().all(|set| set.is_empty())
    }

    fn referenced_variants(&self, experiment_id: &str) -> HashSet<String> {
        self.assignments
            .iter()
            .filter(|entry| entry.value().1.experiment_id() == experiment_id)
            .map(|entry| entry.value().1.variant_id().to_string())
            .collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentStore for MemoryStore {
    async fn find_assignment(&self, experiment_id: &str, user_id: &str) -> Result<Option<Assignment>> {
        Ok(self
            .assignments
            .get(&pair_key(experiment_id, user_id))
            .map(|entry| entry.value().1.clone()))
    }

    async fn create_assignment(
        &self,
        experiment_id: &str,
        user_id: &str,
        variant_id: &str,
    ) -> Result<Assignment> {
        // Held until the insert so a concurrent replace cannot delete the variant.
        let set = self.variants.get(experiment_id);
        let variant = set
            .as_ref()
            .and_then(|set| set.iter().find(|v| v.id() == variant_id))
            .ok_or_else(|| {
                Error::persistence(format!(
                    "variant {variant_id} not found in experiment {experiment_id}"
                ))
            })?;

        match self.assignments.entry(pair_key(experiment_id, user_id)) {
            Entry::Occupied(_) => Err(Error::Conflict {
                experiment_id: experiment_id.to_string(),
                user_id: user_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let assignment = Assignment::new(user_id, &variant);
                let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
                slot.insert((seq, assignment.clone()));
                Ok(assignment)
            }
        }
    }

    async fn list_assignments(&self, experiment_id: &str) -> Result<Vec<Assignment>> {
        let mut rows: Vec<(u64, Assignment)> = self
            .assignments
            .iter()
            .filter(|entry| entry.value().1.experiment_id() == experiment_id)
            .map(|entry| entry.value().clone())
            .collect();

        // Most recent first
        rows.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(rows.into_iter().map(|(_, assignment)| assignment).collect())
    }

    async fn find_variants(&self, experiment_id: &str) -> Result<Vec<Variant>> {
        Ok(self
            .variants
            .get(experiment_id)
            .map(|set| set.value().clone())
            .unwrap_or_default())
    }

    async fn replace_variant_set(
        &self,
        experiment_id: &str,
        desired: Vec<VariantDraft>,
    ) -> Result<Vec<Variant>> {
        let mut entry = match self.variants.entry(experiment_id.to_string()) {
            Entry::Occupied(existing) => existing.into_ref(),
            Entry::Vacant(slot) => {
                // Nothing can be referenced yet; only draft ids can be wrong.
                if let Some(id) = desired.iter().find_map(|draft| draft.id.as_deref()) {
                    return Err(Error::validation(format!(
                        "variant {id} does not belong to experiment {experiment_id}"
                    )));
                }
                slot.insert(Vec::new())
            }
        };

        let mut incoming = HashSet::new();
        for id in desired.iter().filter_map(|draft| draft.id.as_deref()) {
            if !entry.iter().any(|v| v.id() == id) {
                return Err(Error::validation(format!(
                    "variant {id} does not belong to experiment {experiment_id}"
                )));
            }
            if !incoming.insert(id) {
                return Err(Error::validation(format!("variant {id} listed twice")));
            }
        }

        let referenced = self.referenced_variants(experiment_id);
        if let Some(blocked) = entry
            .iter()
            .find(|v| !incoming.contains(v.id()) && referenced.contains(v.id()))
        {
            return Err(Error::persistence(format!(
                "variant {} is still referenced by assignments",
                blocked.id()
            )));
        }

        // Kept variants retain their position; new ones are appended.
        let mut next: Vec<Variant> = entry
            .iter()
            .filter(|v| incoming.contains(v.id()))
            .cloned()
            .collect();
        for draft in &desired {
            match draft.id.as_deref() {
                Some(id) => {
                    if let Some(variant) = next.iter_mut().find(|v| v.id() == id) {
                        variant.apply(draft);
                    }
                }
                None => next.push(Variant::new(experiment_id, &draft.key, draft.weight)),
            }
        }

        debug!(
            experiment_id,
            kept = incoming.len(),
            deleted = entry.len() - incoming.len(),
            created = next.len() - incoming.len(),
            "replaced variant set"
        );

        *entry = next;
        Ok(entry.clone())
    }
}
