//! Persistence collaborator for variants and assignments
//!
//! Stores provide two guarantees the services rely on:
//! - `create_assignment` refuses a second binding for the same
//!   `(experiment_id, user_id)` with [`Error::Conflict`](crate::Error::Conflict)
//! - `replace_variant_set` applies all creates, updates and deletes for one
//!   experiment together, or none of them
//!
//! # Example
//!
//! ```rust
//! use trueno_ab::experiment::VariantDraft;
//! use trueno_ab::store::{AssignmentStore, MemoryStore};
//!
//! # async fn example() -> trueno_ab::Result<()> {
//! let store = MemoryStore::new();
//!
//! let saved = store
//!     .replace_variant_set("exp-1", vec![VariantDraft::new("A", 50), VariantDraft::new("B", 50)])
//!     .await?;
//!
//! let assignment = store.create_assignment("exp-1", "user-1", saved[0].id()).await?;
//! assert_eq!(assignment.variant_key(), "A");
//! assert!(store.create_assignment("exp-1", "user-1", saved[1].id()).await.is_err());
//! # Ok(())
//! # }
//! ```

mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use crate::experiment::{Assignment, Variant, VariantDraft};
use crate::Result;
use std::future::Future;

/// Storage interface consumed by the assignment and variant-set services.
pub trait AssignmentStore: Send + Sync {
    /// Get the binding for a pair, if one exists.
    fn find_assignment(
        &self,
        experiment_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<Option<Assignment>>> + Send;

    /// Bind a pair to a variant of that experiment.
    ///
    /// Fails with `Error::Conflict` if the pair is already bound, and with
    /// `Error::Persistence` if the variant does not belong to the experiment.
    fn create_assignment(
        &self,
        experiment_id: &str,
        user_id: &str,
        variant_id: &str,
    ) -> impl Future<Output = Result<Assignment>> + Send;

    /// All bindings of an experiment, most recent first.
    fn list_assignments(
        &self,
        experiment_id: &str,
    ) -> impl Future<Output = Result<Vec<Assignment>>> + Send;

    /// Variants of an experiment in creation order.
    fn find_variants(
        &self,
        experiment_id: &str,
    ) -> impl Future<Output = Result<Vec<Variant>>> + Send;

    /// Replace an experiment's variant set in one transaction.
    ///
    /// Drafts with an id update that variant, drafts without one create a
    /// variant, and existing variants missing from `desired` are deleted.
    /// Returns the saved set in creation order.
    fn replace_variant_set(
        &self,
        experiment_id: &str,
        desired: Vec<VariantDraft>,
    ) -> impl Future<Output = Result<Vec<Variant>>> + Send;
}
