//! Infrastructure layer - External service implementations

pub mod identity;
pub mod logging;
pub mod storage;
pub mod task;
