//! Shared application state handed to every handler.

use std::sync::Arc;
use thiserror::Error;

use crate::auth::password::{Hasher, PasswordError};
use crate::auth::{AttemptStore, AuthPipeline, JwtTokens, MemoryAttemptStore, PinGate, RateLimiter, TokenError};
use crate::config::AppConfig;
use crate::database::{
    ContactRepository, DatabaseManager, MemoryStore, PgAttemptStore, PgStore, ProjectRepository, RevocationStore,
    SkillRepository, UserRepository,
};
use crate::storage::{BlobStore, LocalDisk};

#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Every store trait at once, so one backend value can fill all slots
pub trait Store:
    UserRepository + ProjectRepository + SkillRepository + ContactRepository + RevocationStore + 'static
{
}

impl<T> Store for T where
    T: UserRepository + ProjectRepository + SkillRepository + ContactRepository + RevocationStore + 'static
{
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when running on in-memory stores
    pub database: Option<DatabaseManager>,
    pub users: Arc<dyn UserRepository>,
    pub projects: Arc<dyn ProjectRepository>,
    pub skills: Arc<dyn SkillRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub tokens: Arc<JwtTokens>,
    pub pipeline: Arc<AuthPipeline>,
    pub hasher: Hasher,
    pub blobs: Arc<dyn BlobStore>,
}

impl AppState {
    /// Postgres-backed state; attempt counters live in the database so
    /// several instances share them.
    pub fn with_postgres(config: AppConfig, database: DatabaseManager) -> Result<Self, InitError> {
        let store = Arc::new(PgStore::new(database.pool().clone()));
        let attempts = Arc::new(PgAttemptStore::new(database.pool().clone()));
        Self::assemble(config, Some(database), store, attempts)
    }

    /// Process-local state for development and tests
    pub fn in_memory(config: AppConfig) -> Result<Self, InitError> {
        Self::assemble(config, None, Arc::new(MemoryStore::new()), Arc::new(MemoryAttemptStore::new()))
    }

    fn assemble<S: Store>(
        config: AppConfig,
        database: Option<DatabaseManager>,
        store: Arc<S>,
        attempts: Arc<dyn AttemptStore>,
    ) -> Result<Self, InitError> {
        let tokens = Arc::new(JwtTokens::new(
            &config.security.jwt_secret,
            config.security.jwt_expiry_hours,
            store.clone(),
            store.clone(),
        )?);
        let pins = PinGate::new(RateLimiter::new(attempts));
        let pipeline = Arc::new(AuthPipeline::new(tokens.clone(), pins));
        let hasher = Hasher::from_config(&config.security)?;
        let blobs = Arc::new(LocalDisk::new(
            config.storage.upload_dir.clone(),
            config.storage.public_url.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            database,
            users: store.clone(),
            projects: store.clone(),
            skills: store.clone(),
            contacts: store,
            tokens,
            pipeline,
            hasher,
            blobs,
        })
    }
}
