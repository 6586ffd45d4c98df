//! Sheet business logic - creating, editing and removing bill-splitting sheets.
//!
//! Sheets are listed most recently modified first. Any change to a sheet's
//! contributors or items bumps its `modified_at` through [`touch_sheet`].

use crate::{
    config::settings::SheetSeed,
    core::contributor::{
        consumer_usage_count, ensure_unique_name, get_contributors, normalize_name,
        payer_usage_count,
    },
    entities::{Contributor, Item, ItemConsumer, Sheet, contributor, item, item_consumer, sheet},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::{info, warn};

/// One entry of the contributor list submitted with a sheet edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributorEdit {
    /// Existing contributor to keep (and possibly rename); `None` adds a new one
    pub id: Option<i64>,
    /// Desired name
    pub name: String,
}

impl ContributorEdit {
    /// Keeps contributor `id` under `name`.
    #[must_use]
    pub fn existing(id: i64, name: &str) -> Self {
        Self {
            id: Some(id),
            name: name.to_string(),
        }
    }

    /// Adds a new contributor called `name`.
    #[must_use]
    pub fn new_contributor(name: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
        }
    }
}

/// What a sheet edit did to the contributor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetUpdateResult {
    /// Contributors inserted
    pub added: Vec<String>,
    /// Contributors whose name changed
    pub renamed: Vec<String>,
    /// Contributors removed
    pub deleted: Vec<String>,
    /// Contributors left out of the edit but kept because items still reference them
    pub kept_in_use: Vec<String>,
}

fn normalize_sheet_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyName { entity: "Sheet" });
    }
    Ok(trimmed.to_string())
}

fn normalize_notes(notes: Option<&str>) -> Option<String> {
    notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string)
}

/// Rejects empty names and case-insensitive duplicates within one list.
fn normalize_names<'a, I>(names: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: Vec<String> = Vec::new();
    let mut normalized = Vec::new();
    for name in names {
        let name = normalize_name(name)?;
        let lowered = name.to_lowercase();
        if seen.contains(&lowered) {
            return Err(Error::DuplicateContributorName { name });
        }
        seen.push(lowered);
        normalized.push(name);
    }
    Ok(normalized)
}

/// Bumps a sheet's modification time.
pub async fn touch_sheet<C>(db: &C, sheet_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    Sheet::update_many()
        .col_expr(sheet::Column::ModifiedAt, Expr::value(chrono::Utc::now()))
        .filter(sheet::Column::Id.eq(sheet_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Creates a sheet together with its initial contributors.
pub async fn create_sheet(
    db: &DatabaseConnection,
    name: &str,
    notes: Option<&str>,
    contributor_names: &[&str],
) -> Result<sheet::Model> {
    let name = normalize_sheet_name(name)?;
    let contributor_names = normalize_names(contributor_names.iter().copied())?;

    let txn = db.begin().await?;

    let now = chrono::Utc::now();
    let created = sheet::ActiveModel {
        name: Set(name),
        created_at: Set(now),
        modified_at: Set(now),
        notes: Set(normalize_notes(notes)),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    for contributor_name in contributor_names {
        contributor::ActiveModel {
            name: Set(contributor_name),
            sheet_id: Set(created.id),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    txn.commit().await?;
    info!("Created sheet '{}' ({})", created.name, created.id);
    Ok(created)
}

/// Retrieves all sheets, most recently modified first.
pub async fn get_sheets(db: &DatabaseConnection) -> Result<Vec<sheet::Model>> {
    Sheet::find()
        .order_by_desc(sheet::Column::ModifiedAt)
        .order_by_desc(sheet::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a sheet by its unique ID.
pub async fn get_sheet(db: &DatabaseConnection, sheet_id: i64) -> Result<Option<sheet::Model>> {
    Sheet::find_by_id(sheet_id).one(db).await.map_err(Into::into)
}

/// Finds a sheet by exact name.
pub async fn get_sheet_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<sheet::Model>> {
    Sheet::find()
        .filter(sheet::Column::Name.eq(name))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Updates a sheet's name and notes and synchronises its contributor list with `edits`.
///
/// Contributors missing from `edits` are deleted unless an item still references them,
/// in which case they are kept and reported. Entries without an id are added, entries
/// with an id are renamed.
pub async fn update_sheet(
    db: &DatabaseConnection,
    sheet_id: i64,
    name: &str,
    notes: Option<&str>,
    edits: &[ContributorEdit],
) -> Result<SheetUpdateResult> {
    let name = normalize_sheet_name(name)?;
    let names = normalize_names(edits.iter().map(|e| e.name.as_str()))?;

    let txn = db.begin().await?;

    let current = Sheet::find_by_id(sheet_id)
        .one(&txn)
        .await?
        .ok_or(Error::SheetNotFound { id: sheet_id })?;
    let existing = get_contributors(&txn, sheet_id).await?;

    for id in edits.iter().filter_map(|e| e.id) {
        if existing.iter().all(|c| c.id != id) {
            return Err(Error::ContributorNotFound { id });
        }
    }

    let mut result = SheetUpdateResult::default();
    let mut removable = Vec::new();
    for contributor in existing
        .iter()
        .filter(|c| edits.iter().all(|e| e.id != Some(c.id)))
    {
        let payer_count = payer_usage_count(&txn, contributor.id).await?;
        let consumer_count = consumer_usage_count(&txn, contributor.id).await?;
        if payer_count == 0 && consumer_count == 0 {
            removable.push(contributor.clone());
        } else {
            warn!(
                "Keeping contributor '{}': payer on {payer_count}, consumer on {consumer_count} item(s)",
                contributor.name
            );
            result.kept_in_use.push(contributor.name.clone());
        }
    }

    // Kept contributors still occupy their names.
    let kept: Vec<contributor::Model> = existing
        .iter()
        .filter(|c| result.kept_in_use.contains(&c.name))
        .cloned()
        .collect();
    for (edit, new_name) in edits.iter().zip(&names) {
        ensure_unique_name(&kept, new_name, edit.id)?;
    }

    for contributor in removable {
        result.deleted.push(contributor.name.clone());
        contributor.delete(&txn).await?;
    }

    for (edit, new_name) in edits.iter().zip(names) {
        match edit.id {
            Some(id) => {
                let Some(old) = existing.iter().find(|c| c.id == id) else {
                    continue;
                };
                if old.name != new_name {
                    let mut active: contributor::ActiveModel = old.clone().into();
                    active.name = Set(new_name.clone());
                    active.update(&txn).await?;
                    result.renamed.push(new_name);
                }
            }
            None => {
                contributor::ActiveModel {
                    name: Set(new_name.clone()),
                    sheet_id: Set(sheet_id),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
                result.added.push(new_name);
            }
        }
    }

    let mut active: sheet::ActiveModel = current.into();
    active.name = Set(name);
    active.notes = Set(normalize_notes(notes));
    active.modified_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    txn.commit().await?;
    Ok(result)
}

/// Deletes a sheet with all of its consumer weights, items and contributors.
pub async fn delete_sheet(db: &DatabaseConnection, sheet_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let current = Sheet::find_by_id(sheet_id)
        .one(&txn)
        .await?
        .ok_or(Error::SheetNotFound { id: sheet_id })?;

    let item_ids: Vec<i64> = Item::find()
        .filter(item::Column::SheetId.eq(sheet_id))
        .all(&txn)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    ItemConsumer::delete_many()
        .filter(item_consumer::Column::ItemId.is_in(item_ids))
        .exec(&txn)
        .await?;
    Item::delete_many()
        .filter(item::Column::SheetId.eq(sheet_id))
        .exec(&txn)
        .await?;
    Contributor::delete_many()
        .filter(contributor::Column::SheetId.eq(sheet_id))
        .exec(&txn)
        .await?;
    current.delete(&txn).await?;

    txn.commit().await?;
    info!("Deleted sheet {sheet_id}");
    Ok(())
}

/// Creates every configured sheet whose name is not taken yet. Returns how many were created.
pub async fn seed_sheets(db: &DatabaseConnection, seeds: &[SheetSeed]) -> Result<usize> {
    let mut created = 0;
    for seed in seeds {
        if get_sheet_by_name(db, seed.name.trim()).await?.is_some() {
            continue;
        }
        let names: Vec<&str> = seed.contributors.iter().map(String::as_str).collect();
        create_sheet(db, &seed.name, seed.notes.as_deref(), &names).await?;
        created += 1;
    }
    Ok(created)
}
