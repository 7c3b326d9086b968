//! # Trueno-AB: A/B-Testing Control Plane
//!
//! **Version**: 0.1.0
//!
//! Experiments own named variants with integer percentage weights, and users
//! are bound to exactly one variant per experiment, forever.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke**: the apportioner makes a weight set that does not sum to
//!   100 unreachable from the editor; saves re-check it anyway
//! - **Jidoka**: uniqueness of `(experiment, user)` lives in the store, so a
//!   lost creation race is detected and resolved instead of double-binding
//! - **Genchi Genbutsu**: property tests and 100k-draw frequency tests check
//!   the math, not just examples
//!
//! ## Modules
//!
//! - [`apportion`]: largest-remainder weight rebalancing (pure)
//! - [`selector`]: weighted variant draws (pure)
//! - [`assignment`]: sticky, race-safe binding service
//! - [`variants`]: validated, transactional variant-set saves
//! - [`editor`]: operator editing session over a variant set
//! - [`store`]: persistence trait with `DashMap` and `SQLite` backends
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use trueno_ab::assignment::AssignmentService;
//! use trueno_ab::experiment::VariantDraft;
//! use trueno_ab::store::MemoryStore;
//! use trueno_ab::variants::VariantSetService;
//!
//! # async fn example() -> trueno_ab::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! VariantSetService::new(Arc::clone(&store))
//!     .save("exp-1", &[VariantDraft::new("A", 70), VariantDraft::new("B", 30)])
//!     .await?;
//!
//! let outcome = AssignmentService::new(store).assign("exp-1", "user-42").await?;
//! println!("user-42 -> {}", outcome.assignment.variant_key());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod apportion;
pub mod assignment;
pub mod config;
pub mod editor;
pub mod error;
pub mod experiment;
pub mod selector;
pub mod store;
pub mod variants;

pub use config::{AssignmentStrategy, Config, ConfigBuilder};
pub use error::{Error, Result};
