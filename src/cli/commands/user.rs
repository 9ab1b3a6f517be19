use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;

use crate::auth::password::Hasher;
use crate::auth::{PinGate, RateLimiter, Role};
use crate::cli::utils::{connect, output_error, output_success};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{NewUser, User};
use crate::database::{PgAttemptStore, PgStore, UserRepository};
use crate::handlers::protected::account::{PIN_MAX_DIGITS, PIN_MIN_DIGITS};
use crate::validation::FieldErrors;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "Create a user account")]
    Create {
        #[arg(help = "Display name")]
        name: String,

        #[arg(help = "Login email")]
        email: String,

        #[arg(long, help = "Primary password")]
        password: String,

        #[arg(long, default_value = "user", help = "Role: admin or user")]
        role: Role,
    },

    #[command(about = "Set or replace a user's transaction PIN")]
    SetPin {
        #[arg(help = "Login email")]
        email: String,

        #[arg(help = "4 to 6 digit PIN")]
        pin: String,
    },

    #[command(about = "Change a user's role")]
    SetRole {
        #[arg(help = "Login email")]
        email: String,

        #[arg(help = "Role: admin or user")]
        role: Role,
    },
}

async fn find_user(store: &PgStore, email: &str) -> anyhow::Result<User> {
    store
        .find_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("User '{}' not found", email))
}

pub async fn handle(cmd: UserCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let database = connect(&config).await?;
    let store = PgStore::new(database.pool().clone());
    let hasher = Hasher::from_config(&config.security)?;

    match cmd {
        UserCommands::Create { name, email, password, role } => {
            let mut errors = FieldErrors::new();
            errors.required_text("name", Some(&name), Some(255));
            errors.required_text("email", Some(&email), Some(255));
            errors.email("email", Some(&email));
            errors.required_text("password", Some(&password), None);
            errors.min_chars("password", Some(&password), 8);
            if let Err(errors) = errors.into_result() {
                let mut fields: Vec<_> = errors.into_map().into_iter().collect();
                fields.sort();
                for (field, message) in fields {
                    output_error(&output_format, &format!("{}: {}", field, message), Some("VALIDATION_ERROR"))?;
                }
                anyhow::bail!("User not created");
            }

            let user = store
                .create_user(NewUser {
                    name,
                    email,
                    password_hash: hasher.hash(&password)?,
                    role,
                })
                .await?;

            output_success(
                &output_format,
                &format!("Created {} '{}'", user.role, user.email),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::SetPin { email, pin } => {
            let mut errors = FieldErrors::new();
            errors.digits("pin", Some(&pin), PIN_MIN_DIGITS, PIN_MAX_DIGITS);
            if let Some(message) = errors.get("pin") {
                anyhow::bail!("{}", message);
            }

            let user = find_user(&store, &email).await?;
            store.set_pin(user.id, Some(hasher.hash(&pin)?)).await?;

            let pins = PinGate::new(RateLimiter::new(Arc::new(PgAttemptStore::new(database.pool().clone()))));
            pins.reset(user.id).await?;

            output_success(
                &output_format,
                &format!("Transaction PIN set for '{}'", user.email),
                Some(json!({ "user_id": user.id })),
            )
        }
        UserCommands::SetRole { email, role } => {
            let user = find_user(&store, &email).await?;
            store.set_role(user.id, role).await?;

            output_success(
                &output_format,
                &format!("'{}' is now {}", user.email, role),
                Some(json!({ "user_id": user.id, "role": role })),
            )
        }
    }
}
