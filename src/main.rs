use elgu_core::{
    config::{AppConfig, catalog::load_catalog, database},
    core::{catalog, seed},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = AppConfig::from_env()
        .inspect_err(|e| error!("Invalid configuration: {}", e))?;
    info!(
        "Using currency {} with the {} income account resolver",
        app_config.currency,
        app_config.income_account_resolver().label()
    );

    // 4. Connect and create tables
    database::ensure_sqlite_parent_dir(&app_config.database_url)?;
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the catalog when a catalog file is present
    if app_config.catalog_path.exists() {
        let catalog_config = load_catalog(&app_config.catalog_path)?;
        let summary = seed::seed_catalog(&db, &catalog_config)
            .await
            .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;
        info!("Catalog applied: {:?}", summary);
    } else {
        warn!(
            "Catalog file {} not found, skipping seed",
            app_config.catalog_path.display()
        );
    }

    for request_type in catalog::list_request_types(&db, true).await? {
        let requirements = catalog::type_requirements(&db, &request_type).await?;
        let stages = catalog::allowed_stages(&db, &request_type).await?;
        info!(
            "Request type {} ({}): {} stages, {} requirements, fee {:.2}",
            request_type.name,
            request_type.code,
            stages.len(),
            requirements.len(),
            request_type.fee_amount
        );
    }

    Ok(())
}
