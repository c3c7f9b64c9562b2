// Common types and utilities shared across the application

pub mod session;
pub mod types;

pub use session::Session;
pub use types::*;
