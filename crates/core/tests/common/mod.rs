//! Common test utilities for integration tests.
//!
//! Helpers for driving several in-process nodes over a `MemoryMesh`.

use meshtalk_core::{NodeHandle, NodeSnapshot};
use std::time::Duration;

/// Default timeout for test operations.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialize test logging with appropriate filters.
///
/// Safe to call multiple times (subsequent calls are no-ops).
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meshtalk_core=debug")),
        )
        .with_test_writer()
        .try_init();
}

/// Run an async operation with a timeout.
///
/// Panics with a timeout message if the operation does not finish in time.
#[allow(dead_code)]
pub async fn with_timeout<T, F>(fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, fut)
        .await
        .expect("Test operation timed out")
}

/// Poll a node's snapshot until `check` passes.
#[allow(dead_code)]
pub async fn wait_for<F>(handle: &NodeHandle, check: F) -> NodeSnapshot
where
    F: Fn(&NodeSnapshot) -> bool,
{
    with_timeout(async {
        loop {
            let snapshot = handle.snapshot().await.expect("node stopped");
            if check(&snapshot) {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
}

/// Let every queued event settle across the mesh.
#[allow(dead_code)]
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
