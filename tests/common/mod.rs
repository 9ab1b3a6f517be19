#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use portfolio_api::auth::Role;
use portfolio_api::config::AppConfig;
use portfolio_api::database::models::{NewUser, User};
use portfolio_api::state::AppState;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const NO_PIN_ADMIN_EMAIL: &str = "fresh-admin@example.com";
pub const USER_EMAIL: &str = "user@example.com";
pub const PASSWORD: &str = "password123";
pub const ADMIN_PIN: &str = "1234";

/// One in-process server per test, so PIN counters never leak between tests
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    pub client: reqwest::Client,
    pub admin: User,
    pub no_pin_admin: User,
    pub user: User,
    uploads: TempDir,
}

impl TestServer {
    pub async fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let uploads = tempfile::tempdir()?;

        let mut config = AppConfig::development();
        config.security.jwt_secret = "integration-test-secret".to_string();
        // Cheapest argon2 cost that is still valid
        config.security.argon2_memory_kib = 1024;
        config.security.argon2_iterations = 1;
        config.storage.upload_dir = uploads.path().to_path_buf();
        config.storage.public_url = base_url.clone();

        let state = AppState::in_memory(config)?;
        let admin = seed_user(&state, "Admin", ADMIN_EMAIL, Role::Admin, Some(ADMIN_PIN)).await?;
        let no_pin_admin = seed_user(&state, "Fresh Admin", NO_PIN_ADMIN_EMAIL, Role::Admin, None).await?;
        let user = seed_user(&state, "Visitor", USER_EMAIL, Role::User, None).await?;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        let app = portfolio_api::app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let server = Self {
            base_url,
            state,
            client: reqwest::Client::new(),
            admin,
            no_pin_admin,
            user,
            uploads,
        };
        server.wait_ready(Duration::from_secs(5)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn upload_dir(&self) -> &std::path::Path {
        self.uploads.path()
    }

    /// Logs in and returns the bearer token
    pub async fn login(&self, email: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": PASSWORD }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login for {} failed: {}", email, res.status());

        let body: Value = res.json().await?;
        body["data"]["token"]
            .as_str()
            .map(str::to_string)
            .context("login response has no token")
    }

    pub async fn pin_failures(&self, user: &User) -> u32 {
        self.state.pipeline.pins().failed_attempts(user.id).await.unwrap()
    }
}

async fn seed_user(state: &AppState, name: &str, email: &str, role: Role, pin: Option<&str>) -> Result<User> {
    let user = state
        .users
        .create_user(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: state.hasher.hash(PASSWORD)?,
            role,
        })
        .await?;

    if let Some(pin) = pin {
        state.users.set_pin(user.id, Some(state.hasher.hash(pin)?)).await?;
    }
    Ok(state.users.find_by_id(user.id).await?.context("seeded user vanished")?)
}

/// Parses a response body, asserting the status first
pub async fn expect_json(res: reqwest::Response, status: StatusCode) -> Result<Value> {
    let actual = res.status();
    let body: Value = res.json().await.unwrap_or(Value::Null);
    anyhow::ensure!(actual == status, "expected {}, got {}: {}", status, actual, body);
    Ok(body)
}
