//! Assignment - the sticky (experiment, user) -> variant binding

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Variant;

/// A user's binding to one variant of one experiment.
///
/// Created once per `(experiment_id, user_id)` and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Assignment {
    id: String,
    experiment_id: String,
    user_id: String,
    variant_id: String,
    variant_key: String,
    created_at: DateTime<Utc>,
}

impl Assignment {
    /// Bind `user_id` to `variant`, stamped now.
    #[must_use]
    pub fn new(user_id: impl Into<String>, variant: &Variant) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            experiment_id: variant.experiment_id().to_string(),
            user_id: user_id.into(),
            variant_id: variant.id().to_string(),
            variant_key: variant.key().to_string(),
            created_at: Utc::now(),
        }
    }

    /// Rebuild a stored assignment from its columns.
    #[must_use]
    pub const fn from_parts(
        id: String,
        experiment_id: String,
        user_id: String,
        variant_id: String,
        variant_key: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            experiment_id,
            user_id,
            variant_id,
            variant_key,
            created_at,
        }
    }

    /// Get the assignment ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn experiment_id(&self) -> &str {
        &self.experiment_id
    }

    /// Get the (trimmed) user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Get the bound variant ID.
    #[must_use]
    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    /// Get the bound variant key.
    #[must_use]
    pub fn variant_key(&self) -> &str {
        &self.variant_key
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
