use crate::cli::utils::{connect, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let database = connect(&config).await?;

    database.migrate().await?;
    database.close().await;

    output_success(&output_format, "Database migrations applied", None)
}
