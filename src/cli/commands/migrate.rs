use anyhow::Context;

use crate::cli::utils::{load_config, output_success};
use crate::cli::OutputFormat;
use crate::database::DatabaseManager;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config()?;
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("failed to connect to PostgreSQL")?;

    DatabaseManager::migrate(&pool).await?;
    output_success(&output_format, "Migrations applied", None)
}
