// handlers/public/mod.rs - Endpoints that do not require a session
//
// Route prefix: /auth/*

pub mod auth;
