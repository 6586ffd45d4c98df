use bill_splitter::{
    config::{database, settings},
    core::{item, report, sheet},
    errors::Result,
};
use dotenvy::dotenv;
use std::{env, path::Path};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Creates the directory of a file-backed `SQLite` URL so `mode=rwc` can create the file.
fn ensure_sqlite_dir(database_url: &str) -> Result<()> {
    let Some(path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or_default();
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn load_configuration() -> Result<settings::AppConfig> {
    match env::var("BILL_SPLITTER_CONFIG") {
        Ok(path) => settings::load_config(path),
        Err(env::VarError::NotPresent) => settings::load_default_config(),
        Err(e) => Err(e.into()),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; variables can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = load_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;

    // 4. Initialize database
    let database_url = database::get_database_url(app_config.database_url.as_deref());
    ensure_sqlite_dir(&database_url)?;
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database initialized successfully.");

    // 5. Seed configured sheets
    let seeded = sheet::seed_sheets(&db, &app_config.sheets).await?;
    if seeded > 0 {
        info!("Seeded {seeded} sheet(s) from configuration.");
    }

    // 6. Print every sheet's items and balances
    let order = app_config.display.item_order();
    for current in sheet::get_sheets(&db).await? {
        let balance_report = report::generate_sheet_report(&db, current.id).await?;
        println!("{}", report::format_report(&balance_report));
        for entry in item::get_items(&db, current.id, order).await? {
            println!("    {:<24} {:>10.2}", entry.name, entry.amount);
        }
        println!();
    }

    Ok(())
}
