//! `tracing` bootstrap shared by binaries and tests.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::constants::{ENGINE_NAME, VERSION};

/// Install a global subscriber.
///
/// `filter` is an `EnvFilter` directive string (`"info"`,
/// `"atomatch_exchange=debug,info"`); an unparsable one falls back to
/// `info`. Calling this more than once is harmless: later calls keep the
/// first subscriber.
pub fn init(filter: &str, json: bool) {
    let filter = EnvFilter::try_new(filter.trim()).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = if json {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(false))
            .try_init()
            .is_ok()
    } else {
        registry
            .with(fmt::layer().with_target(true).compact())
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::info!(engine = ENGINE_NAME, version = VERSION, json, "Logging initialized");
    }
}

/// Test-friendly initializer honouring `RUST_LOG`, writing through the test
/// harness's captured output.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_test_writer().compact())
        .try_init();
}
