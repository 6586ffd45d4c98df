//! Contributor entity - A named participant in one sheet.
//!
//! Names are unique within a sheet, compared case-insensitively. The check lives in
//! `core::contributor`, not in the schema.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Contributor database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contributors")]
pub struct Model {
    /// Unique identifier for the contributor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name, unique within the sheet
    pub name: String,
    /// ID of the sheet this contributor belongs to
    pub sheet_id: i64,
}

/// Defines relationships between Contributor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each contributor belongs to one sheet
    #[sea_orm(
        belongs_to = "super::sheet::Entity",
        from = "Column::SheetId",
        to = "super::sheet::Column::Id",
        on_delete = "Cascade"
    )]
    Sheet,
    /// One contributor can consume many items
    #[sea_orm(has_many = "super::item_consumer::Entity")]
    Consumptions,
}

impl Related<super::sheet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sheet.def()
    }
}

impl Related<super::item_consumer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Consumptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
