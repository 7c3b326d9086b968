//! Service configuration
//!
//! Defaults match the production rules: user ids of 3-128 characters, at
//! least two variants per experiment, random draws.

use serde::{Deserialize, Serialize};

use crate::experiment::MIN_VARIANTS;
use crate::{Error, Result};

/// Draw source used for first-time assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    /// Uniform draw from `thread_rng` (a CSPRNG).
    #[default]
    Random,
    /// FNV-1a hash of `experiment_id:user_id`; reproducible without storage.
    StableHash,
}

/// Assignment service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Minimum trimmed user id length, in characters.
    pub min_user_id_len: usize,
    /// Maximum trimmed user id length, in characters.
    pub max_user_id_len: usize,
    /// Variants an experiment needs before users can be assigned.
    pub min_variants: usize,
    /// Draw source for new bindings.
    pub strategy: AssignmentStrategy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_user_id_len: 3,
            max_user_id_len: 128,
            min_variants: MIN_VARIANTS,
            strategy: AssignmentStrategy::Random,
        }
    }
}

impl Config {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] for malformed JSON and
    /// [`Error::Validation`] for inconsistent bounds.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the bounds are usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the user id bounds are empty or
    /// inverted, or if fewer than two variants would be allowed.
    pub fn validate(&self) -> Result<()> {
        if self.min_user_id_len == 0 || self.min_user_id_len > self.max_user_id_len {
            return Err(Error::validation(format!(
                "user id bounds {}..={} are invalid",
                self.min_user_id_len, self.max_user_id_len
            )));
        }
        if self.min_variants < MIN_VARIANTS {
            return Err(Error::validation(format!(
                "min_variants must be at least {MIN_VARIANTS}"
            )));
        }
        Ok(())
    }
}

/// Config builder
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the accepted user id length range
    #[must_use]
    pub const fn user_id_len(mut self, min: usize, max: usize) -> Self {
        self.config.min_user_id_len = min;
        self.config.max_user_id_len = max;
        self
    }

    /// Set the minimum variant count for assignment
    #[must_use]
    pub const fn min_variants(mut self, min_variants: usize) -> Self {
        self.config.min_variants = min_variants;
        self
    }

    /// Set the draw strategy
    #[must_use]
    pub const fn strategy(mut self, strategy: AssignmentStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    /// Build the config
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the bounds are inconsistent
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
