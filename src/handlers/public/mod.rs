// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition endpoints. Every input is validated here since there
// is no trusted user context.

pub mod auth;
