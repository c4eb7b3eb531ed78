//! Logging setup.

use std::io;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the tracing subscriber.
///
/// `RUST_LOG` wins over `default_filter` (e.g. `RUST_LOG=lifteat_core=debug`).
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_install_is_harmless() {
        init_tracing("warn");
        assert!(!init_tracing("debug"));
    }
}
