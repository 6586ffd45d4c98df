//! Item consumer entity - One consumer's relative share of one item.
//!
//! `weight` is conventionally a percentage (0-100) but the balance engine only uses
//! it as a proportion of the item's total weight. Rows are replaced wholesale on
//! every item save.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Consumer-weight database model, keyed by `(item_id, contributor_id)`
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_consumers")]
pub struct Model {
    /// Item being consumed
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i64,
    /// Contributor consuming it
    #[sea_orm(primary_key, auto_increment = false)]
    pub contributor_id: i64,
    /// Relative share
    pub weight: f64,
}

/// Defines relationships between `ItemConsumer` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each row belongs to one item
    #[sea_orm(
        belongs_to = "super::item::Entity",
        from = "Column::ItemId",
        to = "super::item::Column::Id",
        on_delete = "Cascade"
    )]
    Item,
    /// Each row references one contributor
    #[sea_orm(
        belongs_to = "super::contributor::Entity",
        from = "Column::ContributorId",
        to = "super::contributor::Column::Id",
        on_delete = "Cascade"
    )]
    Contributor,
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Item.def()
    }
}

impl Related<super::contributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
