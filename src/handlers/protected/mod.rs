// handlers/protected/mod.rs - Handlers for any authenticated user
//
// The guard has already resolved the caller; handlers read it from the
// `Extension<Identity>` the middleware inserted.

pub mod account; // GET /api/auth/me, POST /api/auth/logout, PUT /api/auth/pin
