//! Best-effort repair of consumer weights that fell out of sync with what a client knows.
//!
//! Each item is repaired on its own; a failure is logged and counted and the pass moves on.

use crate::{
    core::{
        contributor::get_contributors,
        item::{get_consumer_weights, replace_consumer_weights},
        numeric::FULL_PERCENTAGE,
        sheet::touch_sheet,
    },
    entities::Item,
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, EntityTrait, TransactionTrait};
use tracing::{error, info};

/// The consumers a client believes an item has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownConsumers {
    /// Item to check
    pub item_id: i64,
    /// Contributor ids the client shows as consumers
    pub contributor_ids: Vec<i64>,
}

/// Outcome counts of a repair pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Items whose weights were rewritten
    pub repaired: usize,
    /// Items already consistent
    pub skipped: usize,
    /// Items that could not be repaired
    pub failed: usize,
}

async fn repair_item(db: &DatabaseConnection, known: &KnownConsumers) -> Result<bool> {
    let mut ids = known.contributor_ids.clone();
    ids.sort_unstable();
    ids.dedup();

    let txn = db.begin().await?;

    let item = Item::find_by_id(known.item_id)
        .one(&txn)
        .await?
        .ok_or(Error::ItemNotFound { id: known.item_id })?;
    let stored = get_consumer_weights(&txn, item.id).await?;
    if ids.len() <= stored.len() {
        return Ok(false);
    }

    let members = get_contributors(&txn, item.sheet_id).await?;
    if let Some(&id) = ids.iter().find(|&&id| members.iter().all(|c| c.id != id)) {
        return Err(Error::ContributorNotFound { id });
    }

    #[allow(clippy::cast_precision_loss)]
    let weight = FULL_PERCENTAGE / ids.len() as f64;
    let weights: Vec<(i64, f64)> = ids.iter().map(|&id| (id, weight)).collect();
    replace_consumer_weights(&txn, item.id, &weights).await?;
    touch_sheet(&txn, item.sheet_id).await?;

    txn.commit().await?;
    info!(
        "Repaired item {}: {} stored consumer(s) replaced by {}",
        item.id,
        stored.len(),
        ids.len()
    );
    Ok(true)
}

/// Rewrites the weights of every item whose known consumer set is larger than the
/// stored one with an equal split over the known set.
///
/// Every known consumer must belong to the item's sheet; otherwise the item counts as failed.
pub async fn repair_consumer_mismatches(
    db: &DatabaseConnection,
    known_sets: &[KnownConsumers],
) -> RepairReport {
    let mut report = RepairReport::default();
    for known in known_sets {
        match repair_item(db, known).await {
            Ok(true) => report.repaired += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                error!("Failed to repair consumers of item {}: {e}", known.item_id);
                report.failed += 1;
            }
        }
    }
    report
}
