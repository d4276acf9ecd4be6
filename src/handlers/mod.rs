// handlers/mod.rs - Handlers grouped by security tier
//
// Public (no auth) → Protected (bearer token required)

pub mod public;    // /api/auth/register, /api/auth/login
pub mod protected; // /api/auth/me, /api/posts/*, /api/ai/*
