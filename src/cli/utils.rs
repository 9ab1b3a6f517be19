use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(fields)) = data {
                if let Some(object) = response.as_object_mut() {
                    object.extend(fields);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Connects using `DATABASE_URL`; every CLI command works against Postgres
pub async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseManager> {
    if config.database.url.is_none() {
        anyhow::bail!("DATABASE_URL must be set for CLI commands");
    }
    Ok(DatabaseManager::connect(&config.database).await?)
}
