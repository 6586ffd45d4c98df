//! Item entity - One expense paid in full by a single contributor.
//!
//! Who consumed the item, and in what proportion, is stored separately in
//! `item_consumers`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Item database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "items")]
pub struct Model {
    /// Unique identifier for the item
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the sheet this item belongs to
    pub sheet_id: i64,
    /// Human-readable name (e.g., "Groceries", "Cabin rent")
    pub name: String,
    /// Total amount paid, always positive once validated
    pub amount: f64,
    /// Contributor who paid the full amount
    pub payer_id: i64,
    /// When the item was created
    pub created_at: DateTimeUtc,
    /// When the item was last edited
    pub modified_at: DateTimeUtc,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between Item and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one sheet
    #[sea_orm(
        belongs_to = "super::sheet::Entity",
        from = "Column::SheetId",
        to = "super::sheet::Column::Id",
        on_delete = "Cascade"
    )]
    Sheet,
    /// Each item is paid by one contributor
    #[sea_orm(
        belongs_to = "super::contributor::Entity",
        from = "Column::PayerId",
        to = "super::contributor::Column::Id",
        on_delete = "Cascade"
    )]
    Payer,
    /// One item has many consumer-weight rows
    #[sea_orm(has_many = "super::item_consumer::Entity")]
    Consumers,
}

impl Related<super::sheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sheet.def()
    }
}

impl Related<super::contributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl Related<super::item_consumer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consumers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
