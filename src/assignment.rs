//! Sticky variant assignment
//!
//! Per `(experiment_id, user_id)` pair the only transition is
//! Unbound -> Bound. Creation races are resolved by the store's uniqueness
//! guarantee: the loser gets [`Error::Conflict`], re-reads once and adopts
//! the winner's binding.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_ab::assignment::AssignmentService;
//! use trueno_ab::experiment::VariantDraft;
//! use trueno_ab::store::{AssignmentStore, MemoryStore};
//!
//! # async fn example() -> trueno_ab::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! store
//!     .replace_variant_set("exp-1", vec![VariantDraft::new("A", 70), VariantDraft::new("B", 30)])
//!     .await?;
//!
//! let service = AssignmentService::new(Arc::clone(&store));
//! let first = service.assign("exp-1", "user-42").await?;
//! let again = service.assign("exp-1", "user-42").await?;
//! assert!(first.is_new && !again.is_new);
//! assert_eq!(first.assignment, again.assignment);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AssignmentStrategy, Config};
use crate::experiment::{Assignment, Variant, MIN_VARIANTS};
use crate::selector::{select, select_stable};
use crate::store::AssignmentStore;
use crate::{Error, Result};

/// Result of [`AssignmentService::assign`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignOutcome {
    /// The binding now on record.
    pub assignment: Assignment,
    /// True only for the call that created the binding.
    pub is_new: bool,
}

/// Idempotent, race-safe user to variant binding.
pub struct AssignmentService<S> {
    store: Arc<S>,
    config: Config,
}

impl<S: AssignmentStore> AssignmentService<S> {
    /// Create a service with the default config.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, Config::default())
    }

    /// Create a service with an explicit config.
    #[must_use]
    pub const fn with_config(store: Arc<S>, config: Config) -> Self {
        Self { store, config }
    }

    /// Get the active config.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Return the user's binding, creating it on first call.
    ///
    /// Existing bindings are returned unchanged without drawing randomness.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] for an empty experiment id or a user id
    ///   outside the configured length range
    /// - [`Error::Precondition`] if the experiment has too few variants
    /// - [`Error::Persistence`] if the store fails, or a conflict cannot be
    ///   resolved by one re-read
    pub async fn assign(&self, experiment_id: &str, user_id: &str) -> Result<AssignOutcome> {
        let experiment_id = Self::normalize_experiment_id(experiment_id)?;
        let user_id = self.normalize_user_id(user_id)?;

        if let Some(assignment) = self.store.find_assignment(experiment_id, user_id).await? {
            debug!(experiment_id, user_id, variant_id = assignment.variant_id(), "existing assignment");
            return Ok(AssignOutcome {
                assignment,
                is_new: false,
            });
        }

        let variants = self.store.find_variants(experiment_id).await?;
        // Hand-built configs can go below the two-variant floor.
        let min_variants = self.config.min_variants.max(MIN_VARIANTS);
        if variants.len() < min_variants {
            return Err(Error::Precondition(format!(
                "An experiment must have at least {min_variants} variants (experiment {experiment_id} has {}).",
                variants.len()
            )));
        }

        let variant_id = self
            .choose(&variants, experiment_id, user_id)
            .map(|variant| variant.id().to_string())
            .ok_or_else(|| Error::persistence("variant selection returned nothing"))?;

        match self
            .store
            .create_assignment(experiment_id, user_id, &variant_id)
            .await
        {
            Ok(assignment) => {
                info!(experiment_id, user_id, variant_id = %variant_id, "created assignment");
                Ok(AssignOutcome {
                    assignment,
                    is_new: true,
                })
            }
            Err(e) if e.is_conflict() => {
                warn!(experiment_id, user_id, "assignment race lost, adopting existing binding");
                self.adopt_winner(experiment_id, user_id).await
            }
            Err(e) => Err(e),
        }
    }

    /// Look up a binding without creating one.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for malformed ids, or the store's error.
    pub async fn get(&self, experiment_id: &str, user_id: &str) -> Result<Option<Assignment>> {
        let experiment_id = Self::normalize_experiment_id(experiment_id)?;
        let user_id = self.normalize_user_id(user_id)?;
        self.store.find_assignment(experiment_id, user_id).await
    }

    /// All bindings of an experiment, most recent first.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for an empty experiment id, or the store's error.
    pub async fn list(&self, experiment_id: &str) -> Result<Vec<Assignment>> {
        let experiment_id = Self::normalize_experiment_id(experiment_id)?;
        self.store.list_assignments(experiment_id).await
    }

    fn choose<'a>(
        &self,
        variants: &'a [Variant],
        experiment_id: &str,
        user_id: &str,
    ) -> Option<&'a Variant> {
        match self.config.strategy {
            AssignmentStrategy::Random => select(variants, &mut rand::thread_rng()),
            AssignmentStrategy::StableHash => select_stable(variants, experiment_id, user_id),
        }
    }

    /// Second step of the create protocol: exactly one re-read.
    async fn adopt_winner(&self, experiment_id: &str, user_id: &str) -> Result<AssignOutcome> {
        match self.store.find_assignment(experiment_id, user_id).await? {
            Some(assignment) => Ok(AssignOutcome {
                assignment,
                is_new: false,
            }),
            None => Err(Error::persistence(format!(
                "assignment for experiment {experiment_id} and user {user_id} conflicted but could not be read back"
            ))),
        }
    }

    fn normalize_experiment_id(experiment_id: &str) -> Result<&str> {
        let experiment_id = experiment_id.trim();
        if experiment_id.is_empty() {
            return Err(Error::validation("Experiment ID is required."));
        }
        Ok(experiment_id)
    }

    fn normalize_user_id<'a>(&self, user_id: &'a str) -> Result<&'a str> {
        let user_id = user_id.trim();
        let len = user_id.chars().count();
        if len < self.config.min_user_id_len {
            return Err(Error::validation(format!(
                "User ID must be at least {} characters.",
                self.config.min_user_id_len
            )));
        }
        if len > self.config.max_user_id_len {
            return Err(Error::validation(format!(
                "User ID must be {} characters or fewer.",
                self.config.max_user_id_len
            )));
        }
        Ok(user_id)
    }
}
