//! Shared helpers for tests.

use std::path::PathBuf;
use std::sync::Once;

use tempfile::TempDir;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per process.
///
/// Honors `RUST_LOG`, defaulting to `bptree=debug`. Output goes through the
/// test writer so it only shows for failing tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("bptree=debug"));
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_test_writer())
            .try_init();
    });
}

/// A fresh temp directory and a store path inside it.
///
/// Keep the `TempDir` alive for as long as the file is used.
pub fn temp_store_path(name: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join(name);
    (dir, path)
}
