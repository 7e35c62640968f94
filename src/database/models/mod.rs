pub mod account;
pub mod session;
pub mod user;
pub mod verification_token;

pub use account::Account;
pub use session::Session;
pub use user::{NewUser, User, UserPatch};
pub use verification_token::VerificationToken;
