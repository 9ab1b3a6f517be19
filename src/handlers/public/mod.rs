// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, read-only portfolio content, the contact form, and
// service status.

pub mod contact; // POST /api/contact
pub mod projects; // GET /api/projects[/:id]
pub mod session; // POST /api/auth/login
pub mod skills; // GET /api/skills
pub mod system; // GET /, GET /health
