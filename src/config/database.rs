//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs, and creation is idempotent.

use crate::entities::{Contributor, Item, ItemConsumer, Sheet};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

/// Database used when neither `DATABASE_URL` nor the config file names one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/bill_splitter.sqlite?mode=rwc";

/// Gets the database URL from the environment or returns the default `SQLite` path.
///
/// An explicit `override_url` (from config.toml) wins over `DATABASE_URL`.
#[must_use]
pub fn get_database_url(override_url: Option<&str>) -> String {
    override_url.map_or_else(
        || std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
        str::to_string,
    )
}

/// Establishes a connection to the database at `database_url`.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    debug!("Connecting to database at {database_url}");
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables (sheets, contributors, items, consumer weights) if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, Sheet).await?;
    create_table(db, Contributor).await?;
    create_table(db, Item).await?;
    create_table(db, ItemConsumer).await?;
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContributorModel, ItemConsumerModel, ItemModel, SheetModel};
    use sea_orm::QuerySelect;

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<SheetModel> = Sheet::find().limit(1).all(&db).await?;
        let _: Vec<ContributorModel> = Contributor::find().limit(1).all(&db).await?;
        let _: Vec<ItemModel> = Item::find().limit(1).all(&db).await?;
        let _: Vec<ItemConsumerModel> = ItemConsumer::find().limit(1).all(&db).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }

    #[test]
    fn test_override_url_wins() {
        assert_eq!(
            get_database_url(Some("sqlite::memory:")),
            "sqlite::memory:".to_string()
        );
    }
}
