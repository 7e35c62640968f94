pub mod claims;
pub mod credentials;
pub mod error;
pub mod oauth;
pub mod password;
pub mod role;
pub mod session;
pub mod validation;

pub use claims::{decode_token, encode_token, SessionUpdate, SessionUser, SessionView, TokenClaims};
pub use credentials::{Credentials, Registration};
pub use error::AuthError;
pub use oauth::{OAuthProfile, OAuthProvider, OAuthRegistry, OAuthTokens};
pub use role::Role;
pub use session::{ActiveSession, IssuedSession, SessionManager, SessionSettings};
