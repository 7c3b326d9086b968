//! Experiment - parent entity for variants and assignments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Minimum experiment name length.
pub const MIN_NAME_LEN: usize = 3;
/// Maximum experiment name length.
pub const MAX_NAME_LEN: usize = 64;

/// Lifecycle status of an experiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    /// Being configured; not yet serving.
    #[default]
    Draft,
    /// Serving assignments.
    Active,
    /// Temporarily stopped.
    Paused,
    /// Finished.
    Completed,
}

/// An A/B experiment.
///
/// Experiments own their variants and are referenced by assignments. CRUD
/// lives outside this crate; the record exists so callers can validate input
/// and key variants and assignments by [`Experiment::id`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Experiment {
    id: String,
    name: String,
    status: ExperimentStatus,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl Experiment {
    /// Create a draft experiment with a fresh id and no schedule.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ExperimentBuilder::new(name).build()
    }

    /// Create a builder for constructing an experiment with optional fields.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ExperimentBuilder {
        ExperimentBuilder::new(name)
    }

    /// Get the experiment ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the experiment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ExperimentStatus {
        self.status
    }

    /// Get the scheduled start, if any.
    #[must_use]
    pub const fn start_at(&self) -> Option<DateTime<Utc>> {
        self.start_at
    }

    /// Get the scheduled end, if any.
    #[must_use]
    pub const fn end_at(&self) -> Option<DateTime<Utc>> {
        self.end_at
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Check the name pattern and the schedule ordering.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the name is not lowercase snake case
    /// of 3-64 characters, or if `end_at` precedes `start_at`.
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        if let (Some(start), Some(end)) = (self.start_at, self.end_at) {
            if end < start {
                return Err(Error::validation("endAt must be after startAt."));
            }
        }
        Ok(())
    }
}

/// Check an experiment name: 3-64 chars, `[a-z0-9]` tokens joined by single
/// underscores.
///
/// # Errors
///
/// Returns [`Error::Validation`] describing the first rule broken.
pub fn validate_name(name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < MIN_NAME_LEN {
        return Err(Error::validation(format!(
            "Name must be at least {MIN_NAME_LEN} characters."
        )));
    }
    if len > MAX_NAME_LEN {
        return Err(Error::validation(format!(
            "Name must be {MAX_NAME_LEN} characters or fewer."
        )));
    }

    let well_formed = name.split('_').all(|token| {
        !token.is_empty()
            && token
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
    });
    if !well_formed {
        return Err(Error::validation(
            "Only lowercase snake_case values are allowed.",
        ));
    }
    Ok(())
}

/// Builder for `Experiment`.
#[derive(Debug)]
pub struct ExperimentBuilder {
    id: Option<String>,
    name: String,
    status: ExperimentStatus,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl ExperimentBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            status: ExperimentStatus::Draft,
            start_at: None,
            end_at: None,
            created_at: Utc::now(),
        }
    }

    /// Use an existing identity instead of generating one.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the lifecycle status.
    #[must_use]
    pub const fn status(mut self, status: ExperimentStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the scheduled start.
    #[must_use]
    pub const fn start_at(mut self, start_at: DateTime<Utc>) -> Self {
        self.start_at = Some(start_at);
        self
    }

    /// Set the scheduled end.
    #[must_use]
    pub const fn end_at(mut self, end_at: DateTime<Utc>) -> Self {
        self.end_at = Some(end_at);
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `Experiment`.
    #[must_use]
    pub fn build(self) -> Experiment {
        Experiment {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            name: self.name,
            status: self.status,
            start_at: self.start_at,
            end_at: self.end_at,
            created_at: self.created_at,
        }
    }
}
