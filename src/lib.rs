pub mod actions;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod testing;

pub use server::app;
pub use state::AppState;
