// handlers/protected/mod.rs - Endpoints that act on the caller's session
//
// Route prefix: /api/*

pub mod auth;
pub mod profile;
