//! Domain layer - Core business logic and entities

pub mod error;
pub mod identity;
pub mod task;

pub use error::{AuthError, DomainError};
pub use identity::{
    Identity, IdentityId, IdentityProvider, ProfileFields, Session, SignUpOutcome, SignUpRequest,
    VerificationPurpose,
};
pub use task::{Task, TaskId, TaskPatch, TaskRepository};
