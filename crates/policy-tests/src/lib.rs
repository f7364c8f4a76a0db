#![allow(dead_code)]

use std::sync::Once;

pub mod fixtures;
pub mod integration;
pub mod oracle;

static TRACING: Once = Once::new();

/// Installs the test log subscriber once; respects `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}
