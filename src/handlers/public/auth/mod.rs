// handlers/public/auth/mod.rs - Sign-up and sign-in

pub mod login; // POST /auth/login
pub mod oauth; // GET /auth/oauth/:provider[/callback]
pub mod register; // POST /auth/register

pub use login::login_post;
pub use oauth::{oauth_callback, oauth_start};
pub use register::register_post;
