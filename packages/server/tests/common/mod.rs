// Common test utilities

pub mod fixtures;
pub mod gateway;
pub mod harness;

pub use fixtures::*;
pub use gateway::*;
pub use harness::*;
