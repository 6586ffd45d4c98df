//! Item business logic - storing expenses and their consumer weights.
//!
//! An item and its consumer-weight rows are always written together: `save_item` and
//! `delete_item` run in one database transaction that also bumps the sheet's
//! modification time, so a balance snapshot never sees a payer without consumers.

use crate::{
    core::{balance::ItemSnapshot, contributor::get_contributors, sheet::touch_sheet},
    entities::{Contributor, Item, ItemConsumer, Sheet, contributor, item, item_consumer, sheet},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info};

/// A validated item ready to be stored, produced by the reconciler's commit.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    /// Trimmed, non-empty name
    pub name: String,
    /// Positive total
    pub amount: f64,
    /// Contributor who paid
    pub payer_id: i64,
    /// Optional notes
    pub notes: Option<String>,
    /// `(contributor_id, weight)` per consumer
    pub consumer_weights: Vec<(i64, f64)>,
}

/// Field item lists are sorted by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Item name, case-insensitive
    Name,
    /// Item amount
    Amount,
    /// Creation time
    DateCreated,
    /// Last modification time
    #[default]
    DateModified,
}

/// Sort direction for item lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    #[default]
    Descending,
}

/// Ordering applied to item lists; defaults to most recently modified first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemOrder {
    /// Field to sort by
    pub key: SortKey,
    /// Direction
    pub direction: SortDirection,
}

/// Everything the balance engine needs for one sheet, read at a single point in time.
#[derive(Debug, Clone)]
pub struct SheetSnapshot {
    /// The sheet
    pub sheet: sheet::Model,
    /// Its contributors
    pub contributors: Vec<contributor::Model>,
    /// Its items with their consumer weights
    pub items: Vec<ItemSnapshot>,
}

/// Sorts items in place.
pub fn sort_items(items: &mut [item::Model], order: ItemOrder) {
    items.sort_by(|a, b| {
        let ordering = match order.key {
            SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortKey::Amount => a.amount.total_cmp(&b.amount),
            SortKey::DateCreated => a.created_at.cmp(&b.created_at),
            SortKey::DateModified => a.modified_at.cmp(&b.modified_at),
        };
        match order.direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
        .then_with(|| a.id.cmp(&b.id))
    });
}

/// Retrieves all items of a sheet in the requested order.
pub async fn get_items<C>(db: &C, sheet_id: i64, order: ItemOrder) -> Result<Vec<item::Model>>
where
    C: ConnectionTrait,
{
    let mut items = Item::find()
        .filter(item::Column::SheetId.eq(sheet_id))
        .order_by_desc(item::Column::ModifiedAt)
        .all(db)
        .await?;
    sort_items(&mut items, order);
    Ok(items)
}

/// Retrieves a specific item by its unique ID.
pub async fn get_item(db: &DatabaseConnection, item_id: i64) -> Result<Option<item::Model>> {
    Item::find_by_id(item_id).one(db).await.map_err(Into::into)
}

/// Retrieves the consumer-weight rows of one item.
pub async fn get_consumer_weights<C>(db: &C, item_id: i64) -> Result<Vec<item_consumer::Model>>
where
    C: ConnectionTrait,
{
    ItemConsumer::find()
        .filter(item_consumer::Column::ItemId.eq(item_id))
        .order_by_asc(item_consumer::Column::ContributorId)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Deletes every consumer-weight row of an item and inserts `weights` in their place.
pub async fn replace_consumer_weights<C>(db: &C, item_id: i64, weights: &[(i64, f64)]) -> Result<()>
where
    C: ConnectionTrait,
{
    ItemConsumer::delete_many()
        .filter(item_consumer::Column::ItemId.eq(item_id))
        .exec(db)
        .await?;

    if weights.is_empty() {
        return Ok(());
    }

    let rows = weights
        .iter()
        .map(|&(contributor_id, weight)| item_consumer::ActiveModel {
            item_id: Set(item_id),
            contributor_id: Set(contributor_id),
            weight: Set(weight),
        });
    ItemConsumer::insert_many(rows)
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Creates (`item_id = None`) or updates an item together with its consumer weights.
///
/// The payer and every consumer must belong to the sheet. The item row, its consumer
/// rows and the sheet's modification time are written in one transaction.
///
/// # Errors
/// Returns an error if:
/// - The draft has an empty name, a non-positive amount or no consumers
/// - The sheet, the item, the payer or a consumer does not exist in this sheet
/// - A database operation fails
pub async fn save_item(
    db: &DatabaseConnection,
    sheet_id: i64,
    item_id: Option<i64>,
    draft: ItemDraft,
) -> Result<item::Model> {
    let name = draft.name.trim().to_string();
    if name.is_empty() {
        return Err(Error::EmptyName { entity: "Item" });
    }
    if !draft.amount.is_finite() || draft.amount <= 0.0 {
        return Err(Error::InvalidAmount {
            amount: draft.amount,
        });
    }
    if draft.consumer_weights.is_empty() {
        return Err(Error::NoConsumers);
    }

    let txn = db.begin().await?;

    Sheet::find_by_id(sheet_id)
        .one(&txn)
        .await?
        .ok_or(Error::SheetNotFound { id: sheet_id })?;

    let member_ids: Vec<i64> = Contributor::find()
        .filter(contributor::Column::SheetId.eq(sheet_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();
    let unknown = std::iter::once(draft.payer_id)
        .chain(draft.consumer_weights.iter().map(|(id, _)| *id))
        .find(|id| !member_ids.contains(id));
    if let Some(id) = unknown {
        return Err(Error::ContributorNotFound { id });
    }

    let now = chrono::Utc::now();
    let saved = match item_id {
        Some(id) => {
            let existing = Item::find_by_id(id)
                .one(&txn)
                .await?
                .filter(|i| i.sheet_id == sheet_id)
                .ok_or(Error::ItemNotFound { id })?;
            let mut active: item::ActiveModel = existing.into();
            active.name = Set(name);
            active.amount = Set(draft.amount);
            active.payer_id = Set(draft.payer_id);
            active.notes = Set(draft.notes);
            active.modified_at = Set(now);
            active.update(&txn).await?
        }
        None => {
            item::ActiveModel {
                sheet_id: Set(sheet_id),
                name: Set(name),
                amount: Set(draft.amount),
                payer_id: Set(draft.payer_id),
                created_at: Set(now),
                modified_at: Set(now),
                notes: Set(draft.notes),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };

    replace_consumer_weights(&txn, saved.id, &draft.consumer_weights).await?;
    touch_sheet(&txn, sheet_id).await?;

    txn.commit().await?;
    info!(
        "Saved item '{}' ({:.2}) in sheet {sheet_id} with {} consumer(s)",
        saved.name,
        saved.amount,
        draft.consumer_weights.len()
    );
    Ok(saved)
}

/// Deletes an item and its consumer weights, bumping the sheet's modification time.
pub async fn delete_item(db: &DatabaseConnection, item_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let existing = Item::find_by_id(item_id)
        .one(&txn)
        .await?
        .ok_or(Error::ItemNotFound { id: item_id })?;
    let sheet_id = existing.sheet_id;

    ItemConsumer::delete_many()
        .filter(item_consumer::Column::ItemId.eq(item_id))
        .exec(&txn)
        .await?;
    existing.delete(&txn).await?;
    touch_sheet(&txn, sheet_id).await?;

    txn.commit().await?;
    debug!("Deleted item {item_id} from sheet {sheet_id}");
    Ok(())
}

/// Reads a sheet's contributors, items and consumer weights inside one transaction.
pub async fn load_sheet_snapshot(db: &DatabaseConnection, sheet_id: i64) -> Result<SheetSnapshot> {
    let txn = db.begin().await?;

    let sheet = Sheet::find_by_id(sheet_id)
        .one(&txn)
        .await?
        .ok_or(Error::SheetNotFound { id: sheet_id })?;
    let contributors = get_contributors(&txn, sheet_id).await?;
    let items = get_items(&txn, sheet_id, ItemOrder::default()).await?;

    let item_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let mut weights_by_item: HashMap<i64, Vec<item_consumer::Model>> = HashMap::new();
    for weight in ItemConsumer::find()
        .filter(item_consumer::Column::ItemId.is_in(item_ids))
        .order_by_asc(item_consumer::Column::ContributorId)
        .all(&txn)
        .await?
    {
        weights_by_item.entry(weight.item_id).or_default().push(weight);
    }

    txn.commit().await?;

    let items = items
        .into_iter()
        .map(|item| {
            let weights = weights_by_item.remove(&item.id).unwrap_or_default();
            ItemSnapshot::new(item, weights)
        })
        .collect();

    Ok(SheetSnapshot {
        sheet,
        contributors,
        items,
    })
}
