//! Logging setup for the `agentloop` binary.
//!
//! Call [init_logging] once at startup. Logs go to stderr so answers on stdout stay clean.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "agentloop=info";

/// Installs the global subscriber: `RUST_LOG` (or [DEFAULT_FILTER]) plus a stderr fmt layer.
///
/// `verbose` raises the default to `agentloop=debug`; an explicit `RUST_LOG` always wins.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "agentloop=debug" } else { DEFAULT_FILTER };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();
}
