//! Test harness wiring the gateway and orchestrator to in-memory doubles.
//!
//! No containers: the bus, key-value store, remote store and page fetcher
//! are all the doubles from `relay_core::kernel::test_dependencies`.
//! Run tests with: RUST_LOG=debug cargo test -- --nocapture

use relay_core::domains::downloads::DownloadOrchestrator;
use relay_core::kernel::test_dependencies::{
    MemoryKeyValueStore, MockPageFetcher, MockRemoteStore, TestMessageBus,
};
use relay_core::kernel::{ServerDeps, TestDependencies};
use relay_core::server::build_app;
use std::sync::Arc;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tokio::task::JoinHandle;

use super::GatewayClient;

/// Test harness for one test.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &mut TestHarness) {
///     let (status, body) = ctx.gateway().get("/health").await;
///     // ... test code
/// }
/// ```
pub struct TestHarness {
    pub deps: TestDependencies,
    /// Shares every handle with the router built by `gateway()`
    pub server_deps: ServerDeps,
    /// Default save path for drains
    pub save_dir: TempDir,
    orchestrator: Option<JoinHandle<()>>,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new()
    }

    async fn teardown(mut self) {
        if let Some(handle) = self.orchestrator.take() {
            handle.abort();
        }
    }
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with(TestDependencies::new())
    }

    /// Harness around custom doubles. The save path is always a fresh
    /// temporary directory.
    pub fn with(deps: TestDependencies) -> Self {
        init_tracing();

        let save_dir = tempfile::tempdir().expect("temp dir");
        let deps = deps.save_path(save_dir.path());
        let server_deps = deps.into_server_deps();

        Self {
            deps,
            server_deps,
            save_dir,
            orchestrator: None,
        }
    }

    pub fn with_remote_store(store: MockRemoteStore) -> Self {
        Self::with(TestDependencies::new().mock_remote_store(store))
    }

    pub fn with_page_fetcher(fetcher: MockPageFetcher) -> Self {
        Self::with(TestDependencies::new().mock_page_fetcher(fetcher))
    }

    pub fn gateway(&self) -> GatewayClient {
        GatewayClient::new(build_app(self.server_deps.clone()))
    }

    pub fn bus(&self) -> &Arc<TestMessageBus> {
        &self.deps.bus
    }

    pub fn kv(&self) -> &Arc<MemoryKeyValueStore> {
        &self.deps.kv
    }

    pub fn remote_store(&self) -> &Arc<MockRemoteStore> {
        &self.deps.remote_store
    }

    pub fn channel(&self) -> &str {
        &self.server_deps.settings.channel
    }

    /// Boot the orchestrator loop and wait until it listens.
    pub async fn start_orchestrator(&mut self) {
        let handle = DownloadOrchestrator::from_deps(&self.server_deps).spawn();
        self.orchestrator = Some(handle);
        let channel = self.channel().to_string();
        self.bus().wait_for_subscriber(&channel).await;
    }
}

fn init_tracing() {
    // try_init: several tests share one process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
