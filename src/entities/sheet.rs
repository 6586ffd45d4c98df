//! Sheet entity - A named bill-splitting context.
//!
//! A sheet owns its contributors and items; deleting a sheet removes both.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sheet database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sheets")]
pub struct Model {
    /// Unique identifier for the sheet
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g., "Ski trip 2026")
    pub name: String,
    /// When the sheet was created
    pub created_at: DateTimeUtc,
    /// Bumped whenever the sheet, its contributors or its items change
    pub modified_at: DateTimeUtc,
    /// Free-form notes
    pub notes: Option<String>,
}

/// Defines relationships between Sheet and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One sheet has many contributors
    #[sea_orm(has_many = "super::contributor::Entity")]
    Contributors,
    /// One sheet has many items
    #[sea_orm(has_many = "super::item::Entity")]
    Items,
}

impl Related<super::contributor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contributors.def()
    }
}

impl Related<super::item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
