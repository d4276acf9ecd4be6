// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Routed behind `jwt_auth_middleware`, which injects `AuthUser` into the
// request extensions before any of these run.

pub mod ai;    // Text generation proxy
pub mod auth;  // Current user
pub mod posts; // Owner-scoped post CRUD
