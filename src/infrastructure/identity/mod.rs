//! Identity provider adapters
//!
//! `HttpIdentityProvider` talks to a hosted GoTrue-compatible service;
//! `LocalIdentityProvider` implements the same port in process.

mod code;
mod http_provider;
mod jwt;
mod local_provider;
mod password;
pub mod wire;

pub use code::{CodeGenerator, FixedCodeGenerator, RandomCodeGenerator};
pub use http_provider::HttpIdentityProvider;
pub use jwt::{JwtClaims, JwtConfig, JwtService};
pub use local_provider::{LocalIdentityProvider, LocalProviderConfig};
pub use password::{Argon2Hasher, PasswordHasher};
