//! API middleware components

pub mod identity_auth;
pub mod logging;
pub mod security;

pub use identity_auth::{extract_bearer_token, RequireIdentity};
pub use logging::{logging_middleware, REQUEST_ID_HEADER};
pub use security::security_headers_middleware;
