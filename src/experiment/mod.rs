//! Experiment data model
//!
//! ## Schema Overview
//!
//! ```text
//! Experiment (1) ──< Variant (N, weights sum to 100)
//!      │                 │
//!      └──< Assignment >─┘  (at most one per experiment + user)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use trueno_ab::experiment::{validate_variant_set, Experiment, VariantDraft};
//!
//! let experiment = Experiment::new("checkout_button");
//! experiment.validate()?;
//!
//! let drafts = vec![VariantDraft::new("control", 50), VariantDraft::new("b", 50)];
//! let normalized = validate_variant_set(&drafts)?;
//! assert_eq!(normalized[0].key, "CONTROL");
//! # Ok::<(), trueno_ab::Error>(())
//! ```

mod assignment_record;
mod experiment_record;
mod variant_record;

pub use assignment_record::Assignment;
pub use experiment_record::{
    validate_name, Experiment, ExperimentBuilder, ExperimentStatus, MAX_NAME_LEN, MIN_NAME_LEN,
};
pub use variant_record::{
    normalize_key, validate_variant_set, Variant, VariantBuilder, VariantDraft, MAX_KEY_LEN,
    MIN_VARIANTS,
};
