// handlers/mod.rs - 3-Tier Handler Architecture
//
// Public (no auth) → Protected (bearer token) → Elevated (admin role, some
// routes additionally PIN-gated). The tier only says which guard the router
// attaches; handlers themselves never re-check authorization.
pub mod elevated; // Tier 3: admin role, optionally + transaction PIN
pub mod protected; // Tier 2: any authenticated user
pub mod public; // Tier 1: no authentication required

use uuid::Uuid;

use crate::error::ApiError;

/// Ids that fail to parse can't match a row, so they are reported the same way
pub(crate) fn parse_id(raw: &str, what: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::not_found(format!("{} not found", what)))
}
