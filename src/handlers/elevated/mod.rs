// handlers/elevated/mod.rs - Admin-only handlers
//
// Every route here is registered behind `Guard::ADMIN`; destructive ones use
// `Guard::ADMIN_WITH_PIN`.

pub mod contact; // GET /api/contact
pub mod projects; // POST /api/projects, POST|DELETE /api/projects/:id
pub mod skills; // POST /api/skills, PUT|DELETE /api/skills/:id
