//! Drain cycle of the download orchestrator.

mod common;

use std::sync::Arc;

use relay_core::common::Session;
use relay_core::domains::downloads::{DownloadOrchestrator, DrainError};
use relay_core::kernel::test_dependencies::{MemoryKeyValueStore, MockRemoteStore, StoreCall};
use relay_core::kernel::BaseMessageBus;
use test_context::test_context;

use crate::common::*;

fn orchestrator(ctx: &TestHarness) -> DownloadOrchestrator {
    DownloadOrchestrator::from_deps(&ctx.server_deps)
}

fn transfer_calls(calls: &[StoreCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|call| match call {
            StoreCall::List => None,
            StoreCall::Download { filename, .. } => Some(format!("download {}", filename)),
            StoreCall::Delete { filename } => Some(format!("delete {}", filename)),
        })
        .collect()
}

#[tokio::test]
async fn drain_moves_each_file_then_announces_once() {
    let store = MockRemoteStore::new()
        .with_file("a.zip", b"aaaa")
        .with_file("b.zip", b"bb");
    let ctx = TestHarness::with_remote_store(store);

    let report = orchestrator(&ctx).drain().await.unwrap();

    assert_eq!(report.files, vec!["a.zip", "b.zip"]);
    assert_eq!(report.bytes, 6);
    assert_eq!(
        transfer_calls(&ctx.remote_store().calls()),
        vec!["download a.zip", "delete a.zip", "download b.zip", "delete b.zip"]
    );
    assert_eq!(
        std::fs::read(ctx.save_dir.path().join("a.zip")).unwrap(),
        b"aaaa"
    );
    assert_eq!(ctx.bus().count_of(ctx.channel(), "DOWNLOAD FINISHED"), 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn drain_of_empty_store_still_announces(ctx: &mut TestHarness) {
    let report = orchestrator(ctx).drain().await.unwrap();

    assert!(report.files.is_empty());
    assert_eq!(ctx.remote_store().calls(), vec![StoreCall::List]);
    assert_eq!(ctx.bus().count_of(ctx.channel(), "DOWNLOAD FINISHED"), 1);
}

#[tokio::test]
async fn listing_failure_aborts_before_any_transfer() {
    let store = MockRemoteStore::new()
        .with_file("a.zip", b"a")
        .with_listing_status(401);
    let ctx = TestHarness::with_remote_store(store);

    let result = orchestrator(&ctx).drain().await;

    assert!(matches!(result, Err(DrainError::Listing { .. })));
    assert_eq!(ctx.remote_store().calls(), vec![StoreCall::List]);
    assert_eq!(ctx.remote_store().remaining(), vec!["a.zip"]);
    assert_eq!(ctx.bus().count_of(ctx.channel(), "DOWNLOAD FINISHED"), 0);
}

#[tokio::test]
async fn failed_download_stops_the_cycle_and_keeps_remote_file() {
    let store = MockRemoteStore::new()
        .with_file("a.zip", b"a")
        .with_file("b.zip", b"b")
        .with_file("c.zip", b"c")
        .failing_download("b.zip");
    let ctx = TestHarness::with_remote_store(store);

    let result = orchestrator(&ctx).drain().await;

    match result {
        Err(DrainError::Transfer { filename, .. }) => assert_eq!(filename, "b.zip"),
        other => panic!("expected transfer error, got {:?}", other),
    }
    // Never deleted without a local copy; c.zip never attempted
    assert_eq!(
        transfer_calls(&ctx.remote_store().calls()),
        vec!["download a.zip", "delete a.zip"]
    );
    assert_eq!(ctx.remote_store().remaining(), vec!["b.zip", "c.zip"]);
    assert_eq!(ctx.bus().count_of(ctx.channel(), "DOWNLOAD FINISHED"), 0);
}

#[tokio::test]
async fn failed_delete_is_a_transfer_error() {
    let store = MockRemoteStore::new()
        .with_file("a.zip", b"a")
        .failing_delete("a.zip");
    let ctx = TestHarness::with_remote_store(store);

    let result = orchestrator(&ctx).drain().await;

    assert!(matches!(
        result,
        Err(DrainError::Transfer { ref filename, .. }) if filename == "a.zip"
    ));
    // The local copy exists, the remote one stays for the next cycle
    assert!(ctx.save_dir.path().join("a.zip").exists());
    assert_eq!(ctx.remote_store().remaining(), vec!["a.zip"]);
}

#[tokio::test]
async fn unsafe_remote_name_is_refused() {
    let store = MockRemoteStore::new().with_file("../escape.zip", b"x");
    let ctx = TestHarness::with_remote_store(store);

    let result = orchestrator(&ctx).drain().await;

    assert!(matches!(result, Err(DrainError::Transfer { .. })));
    assert_eq!(transfer_calls(&ctx.remote_store().calls()), Vec::<String>::new());
}

#[tokio::test]
async fn drain_creates_missing_save_path() {
    let store = MockRemoteStore::new().with_file("a.zip", b"a");
    let ctx = TestHarness::with_remote_store(store);
    let nested = ctx.save_dir.path().join("nested").join("dir");
    ctx.server_deps.session.set_config(relay_core::common::ScrapeConfig {
        page_url: LISTING_URL.to_string(),
        save_path: nested.to_string_lossy().into_owned(),
    });

    orchestrator(&ctx).drain().await.unwrap();

    assert!(nested.join("a.zip").exists());
}

#[test_context(TestHarness)]
#[tokio::test]
async fn other_control_messages_are_ignored(ctx: &mut TestHarness) {
    let orchestrator = orchestrator(ctx);

    for payload in ["START DOWNLOAD TO DMS", "DOWNLOAD FINISHED", "START DOWNLOAD", "hello"] {
        assert!(orchestrator.handle(payload).await.is_none());
    }
    // Case matters on the wire
    assert!(orchestrator.handle("start local download").await.is_none());
    assert!(ctx.remote_store().calls().is_empty());
}

#[tokio::test]
async fn run_loop_serves_repeated_signals_after_a_failure() {
    let store = MockRemoteStore::new().with_file("a.zip", b"a").failing_download("a.zip");
    let mut ctx = TestHarness::with_remote_store(store);
    ctx.start_orchestrator().await;
    let channel = ctx.channel().to_string();

    // First cycle fails, the loop keeps listening
    ctx.bus().publish(&channel, "START LOCAL DOWNLOAD").await.unwrap();
    while ctx.remote_store().calls().is_empty() {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    ctx.bus().publish(&channel, "START LOCAL DOWNLOAD").await.unwrap();
    while ctx.remote_store().calls().len() < 2 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    assert_eq!(
        ctx.remote_store().calls(),
        vec![StoreCall::List, StoreCall::List]
    );
    assert_eq!(ctx.bus().count_of(&channel, "DOWNLOAD FINISHED"), 0);
}

#[tokio::test]
async fn completion_message_does_not_retrigger_a_drain() {
    let store = MockRemoteStore::new().with_file("a.zip", b"a");
    let mut ctx = TestHarness::with_remote_store(store);
    ctx.start_orchestrator().await;
    let channel = ctx.channel().to_string();

    ctx.bus().publish(&channel, "START LOCAL DOWNLOAD").await.unwrap();
    ctx.bus().wait_for_publish(&channel, "DOWNLOAD FINISHED", 1).await;

    // Give the loop a chance to see its own completion message
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let lists = ctx
        .remote_store()
        .calls()
        .into_iter()
        .filter(|c| *c == StoreCall::List)
        .count();
    assert_eq!(lists, 1);
    assert_eq!(ctx.bus().count_of(&channel, "DOWNLOAD FINISHED"), 1);
}

#[tokio::test]
async fn separate_process_drains_into_save_path_chosen_at_scrape() {
    let store = MockRemoteStore::new().with_file("a.zip", b"payload");
    let ctx = TestHarness::with_remote_store(store);
    let chosen = ctx.save_dir.path().join("chosen");
    let fallback = tempfile::tempdir().unwrap();

    // Orchestrator with its own session, sharing only bus, store and key-value
    let standalone = DownloadOrchestrator::new(
        ctx.bus().clone(),
        ctx.remote_store().clone(),
        ctx.kv().clone(),
        Session::new(fallback.path()),
        ctx.channel(),
    );

    let (status, _) = ctx
        .gateway()
        .post_json(
            "/scrape",
            serde_json::json!({"url": LISTING_URL, "save_path": chosen.to_string_lossy()}),
        )
        .await;
    assert!(status.is_success());

    standalone.drain().await.unwrap();

    assert_eq!(std::fs::read(chosen.join("a.zip")).unwrap(), b"payload");
    assert!(!fallback.path().join("a.zip").exists());
}

#[tokio::test]
async fn separate_process_falls_back_to_its_default_directory() {
    let store = MockRemoteStore::new().with_file("a.zip", b"payload");
    let ctx = TestHarness::with_remote_store(store);
    let fallback = tempfile::tempdir().unwrap();
    let standalone = DownloadOrchestrator::new(
        ctx.bus().clone(),
        ctx.remote_store().clone(),
        Arc::new(MemoryKeyValueStore::new()),
        Session::new(fallback.path()),
        ctx.channel(),
    );

    standalone.drain().await.unwrap();

    assert!(fallback.path().join("a.zip").exists());
}
