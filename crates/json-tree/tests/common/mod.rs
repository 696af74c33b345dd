#![allow(dead_code)]

pub mod assertions;
pub mod fixtures;

use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness. Safe to call from
/// every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("json_tree=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}
