//! Contributor business logic - participants of a sheet.
//!
//! Names are trimmed and must be unique within their sheet, ignoring case. A contributor
//! can only be deleted while no item uses them as payer or consumer.

use crate::{
    core::{balance::is_unknown_contributor_label, sheet::touch_sheet},
    entities::{Contributor, Item, ItemConsumer, Sheet, contributor, item, item_consumer},
    errors::{Error, Result},
};
use sea_orm::{PaginatorTrait, QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Trims a contributor name and rejects empty ones.
///
/// Names shaped like `unknown-{id}` are rejected too: balances are keyed by name and
/// would merge with the label of an unresolved contributor id.
pub fn normalize_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyName {
            entity: "Contributor",
        });
    }
    if is_unknown_contributor_label(trimmed) {
        return Err(Error::ReservedContributorName {
            name: trimmed.to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Rejects `name` when another contributor of the sheet (other than `except`) already has it.
pub fn ensure_unique_name(
    existing: &[contributor::Model],
    name: &str,
    except: Option<i64>,
) -> Result<()> {
    let lowered = name.to_lowercase();
    if existing
        .iter()
        .any(|c| Some(c.id) != except && c.name.to_lowercase() == lowered)
    {
        return Err(Error::DuplicateContributorName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Retrieves all contributors of a sheet in creation order.
pub async fn get_contributors<C>(db: &C, sheet_id: i64) -> Result<Vec<contributor::Model>>
where
    C: ConnectionTrait,
{
    Contributor::find()
        .filter(contributor::Column::SheetId.eq(sheet_id))
        .order_by_asc(contributor::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a contributor by its unique ID.
pub async fn get_contributor<C>(db: &C, contributor_id: i64) -> Result<Option<contributor::Model>>
where
    C: ConnectionTrait,
{
    Contributor::find_by_id(contributor_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Adds a contributor to a sheet.
pub async fn add_contributor<C>(db: &C, sheet_id: i64, name: &str) -> Result<contributor::Model>
where
    C: ConnectionTrait,
{
    let name = normalize_name(name)?;

    Sheet::find_by_id(sheet_id)
        .one(db)
        .await?
        .ok_or(Error::SheetNotFound { id: sheet_id })?;
    let existing = get_contributors(db, sheet_id).await?;
    ensure_unique_name(&existing, &name, None)?;

    let created = contributor::ActiveModel {
        name: Set(name),
        sheet_id: Set(sheet_id),
        ..Default::default()
    }
    .insert(db)
    .await?;
    touch_sheet(db, sheet_id).await?;
    Ok(created)
}

/// Renames a contributor. Balances are keyed by name, so a rename shows up everywhere.
pub async fn rename_contributor<C>(db: &C, contributor_id: i64, name: &str) -> Result<contributor::Model>
where
    C: ConnectionTrait,
{
    let name = normalize_name(name)?;

    let current = get_contributor(db, contributor_id)
        .await?
        .ok_or(Error::ContributorNotFound { id: contributor_id })?;
    let sheet_id = current.sheet_id;
    if current.name == name {
        return Ok(current);
    }

    let existing = get_contributors(db, sheet_id).await?;
    ensure_unique_name(&existing, &name, Some(contributor_id))?;

    let mut active: contributor::ActiveModel = current.into();
    active.name = Set(name);
    let renamed = active.update(db).await?;
    touch_sheet(db, sheet_id).await?;
    Ok(renamed)
}

/// Number of items paid by this contributor.
pub async fn payer_usage_count<C>(db: &C, contributor_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    Item::find()
        .filter(item::Column::PayerId.eq(contributor_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Number of consumer-weight rows referencing this contributor.
pub async fn consumer_usage_count<C>(db: &C, contributor_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    ItemConsumer::find()
        .filter(item_consumer::Column::ContributorId.eq(contributor_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Deletes a contributor that no item references.
///
/// # Errors
/// Returns `ContributorInUse` when the contributor pays for or consumes any item.
pub async fn delete_contributor(db: &DatabaseConnection, contributor_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let current = get_contributor(&txn, contributor_id)
        .await?
        .ok_or(Error::ContributorNotFound { id: contributor_id })?;

    let payer_count = payer_usage_count(&txn, contributor_id).await?;
    let consumer_count = consumer_usage_count(&txn, contributor_id).await?;
    if payer_count > 0 || consumer_count > 0 {
        return Err(Error::ContributorInUse {
            name: current.name,
            payer_count,
            consumer_count,
        });
    }

    let sheet_id = current.sheet_id;
    let name = current.name.clone();
    current.delete(&txn).await?;
    touch_sheet(&txn, sheet_id).await?;

    txn.commit().await?;
    info!("Deleted contributor '{name}' from sheet {sheet_id}");
    Ok(())
}
