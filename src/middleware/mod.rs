pub mod auth;
pub mod correlation;
pub mod response;

pub use auth::{
    removal_cookie, session_cookie, session_middleware, CurrentSession, RequireSession, SESSION_TOKEN_HEADER,
};
pub use correlation::{correlation_id_middleware, CorrelationId, CORRELATION_HEADER};
pub use response::{ApiResponse, ApiResult};
