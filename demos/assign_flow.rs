//! Assignment Flow Example
//!
//! Edits a variant set the way an operator would, saves it, and assigns a
//! handful of users. Repeat calls show stickiness.
//!
//! Run with: RUST_LOG=debug cargo run --example assign_flow

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use trueno_ab::assignment::AssignmentService;
use trueno_ab::editor::VariantEditor;
use trueno_ab::experiment::{Experiment, ExperimentStatus};
use trueno_ab::store::MemoryStore;
use trueno_ab::variants::VariantSetService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    println!("=== Trueno-AB Assignment Flow ===\n");

    // -------------------------------------------------------------------------
    // 1. Describe the experiment
    // -------------------------------------------------------------------------
    let experiment = Experiment::builder("checkout_button")
        .status(ExperimentStatus::Active)
        .build();
    experiment.validate().context("experiment metadata")?;
    println!("1. Experiment {} ({})", experiment.name(), experiment.id());

    // -------------------------------------------------------------------------
    // 2. Edit the variant set
    // -------------------------------------------------------------------------
    let store = Arc::new(MemoryStore::new());
    let variants = VariantSetService::new(Arc::clone(&store));

    let mut editor = VariantEditor::new(variants.list(experiment.id()).await?);
    editor.add_variant();
    editor.add_variant();
    editor.add_variant();
    editor.set_weight(0, 50.0);

    println!("\n2. Edited rows (total {}):", editor.total_weight());
    for row in editor.rows() {
        println!("   {:<8} {:>3}", row.key, row.weight);
    }

    let drafts = editor.validate().context("variant set")?;
    let saved = variants.save(experiment.id(), &drafts).await?;
    editor.mark_saved(saved);
    println!("   Saved; pending changes: {}", editor.has_changes());

    // -------------------------------------------------------------------------
    // 3. Assign users
    // -------------------------------------------------------------------------
    println!("\n3. Assigning users...");
    let service = AssignmentService::new(Arc::clone(&store));

    for user in ["alice", "bob", "carol", "dave", "alice"] {
        let outcome = service.assign(experiment.id(), user).await?;
        println!(
            "   {:<6} -> {:<3} (new: {})",
            user,
            outcome.assignment.variant_key(),
            outcome.is_new
        );
    }

    // -------------------------------------------------------------------------
    // 4. Read back
    // -------------------------------------------------------------------------
    let bob = service
        .get(experiment.id(), "bob")
        .await?
        .context("bob was assigned above")?;
    println!("\n4. bob is in {}", bob.variant_key());

    let all = service.list(experiment.id()).await?;
    println!("   {} assignments, newest first:", all.len());
    for assignment in &all {
        println!("   {} {}", assignment.user_id(), assignment.variant_key());
    }

    println!("\n{}", serde_json::to_string_pretty(&all[0])?);
    Ok(())
}
