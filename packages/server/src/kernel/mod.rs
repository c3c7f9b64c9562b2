//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod http_fetcher;
pub mod nats;
pub mod progress_hub;
pub mod test_dependencies;
pub mod traits;

pub use deps::{RelaySettings, ServerDeps, WebDavAdapter};
pub use http_fetcher::HttpPageFetcher;
pub use nats::{NatsKeyValueStore, NatsMessageBus};
pub use progress_hub::{ClientId, ProgressHub, ProgressSink};
pub use test_dependencies::TestDependencies;
pub use traits::*;
