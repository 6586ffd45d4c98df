//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod contributor;
pub mod item;
pub mod item_consumer;
pub mod sheet;

// Re-export specific types to avoid conflicts
pub use contributor::{
    Column as ContributorColumn, Entity as Contributor, Model as ContributorModel,
};
pub use item::{Column as ItemColumn, Entity as Item, Model as ItemModel};
pub use item_consumer::{
    Column as ItemConsumerColumn, Entity as ItemConsumer, Model as ItemConsumerModel,
};
pub use sheet::{Column as SheetColumn, Entity as Sheet, Model as SheetModel};
