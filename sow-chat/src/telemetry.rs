//! Tracing subscriber setup for the `sow-chat` binary.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter when `RUST_LOG` is unset.
fn default_directives(verbose: bool) -> &'static str {
    if verbose { "sow_chat=debug,sow_rag=debug" } else { "sow_chat=warn,sow_rag=warn" }
}

/// Install a global subscriber that writes compact logs to stderr.
///
/// `RUST_LOG` takes precedence over `verbose`. Calling this more than once
/// is harmless; later calls leave the first subscriber in place.
pub fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .try_init();
}
