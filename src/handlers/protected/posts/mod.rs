// handlers/protected/posts/mod.rs - Post CRUD scoped to the authenticated user

pub mod collection; // GET/POST /api/posts
pub mod record;     // GET/PATCH/DELETE /api/posts/:id

pub use collection::{posts_get, posts_post};
pub use record::{post_delete, post_get, post_patch};
