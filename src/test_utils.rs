//! Shared test utilities for `bill_splitter`.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test sheets and items with sensible defaults.

use crate::{
    core::{
        contributor::get_contributors,
        item::{ItemDraft, save_item},
        sheet::create_sheet,
    },
    entities,
    errors::Result,
};
use sea_orm::DatabaseConnection;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a sheet with the given contributors.
/// Returns the sheet and its contributors in the order given.
pub async fn create_test_sheet(
    db: &DatabaseConnection,
    name: &str,
    contributor_names: &[&str],
) -> Result<(entities::sheet::Model, Vec<entities::contributor::Model>)> {
    let sheet = create_sheet(db, name, None, contributor_names).await?;
    let contributors = get_contributors(db, sheet.id).await?;
    Ok((sheet, contributors))
}

/// Creates an item split equally between `consumer_ids`.
///
/// # Defaults
/// * weight: 1.0 per consumer
/// * notes: None
pub async fn create_test_item(
    db: &DatabaseConnection,
    sheet_id: i64,
    name: &str,
    amount: f64,
    payer_id: i64,
    consumer_ids: &[i64],
) -> Result<entities::item::Model> {
    let draft = ItemDraft {
        name: name.to_string(),
        amount,
        payer_id,
        notes: None,
        consumer_weights: consumer_ids.iter().map(|&id| (id, 1.0)).collect(),
    };
    save_item(db, sheet_id, None, draft).await
}

/// Sets up a complete test environment with a sheet named "Test Sheet".
/// Returns (db, sheet, contributors) for common test scenarios.
pub async fn setup_with_sheet(
    contributor_names: &[&str],
) -> Result<(
    DatabaseConnection,
    entities::sheet::Model,
    Vec<entities::contributor::Model>,
)> {
    let db = setup_test_db().await?;
    let (sheet, contributors) = create_test_sheet(&db, "Test Sheet", contributor_names).await?;
    Ok((db, sheet, contributors))
}
