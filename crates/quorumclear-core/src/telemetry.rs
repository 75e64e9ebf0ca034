//! Tracing subscriber setup.

use quorumclear_types::{QuorumClearError, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,quorumclear=debug";

/// Install a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// `json` switches to one JSON object per event.
///
/// # Errors
/// `Configuration` if a global subscriber is already installed.
pub fn init_tracing(json: bool) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if json {
        registry
            .with(fmt::layer().with_target(true).json())
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };
    installed.map_err(|e| QuorumClearError::Configuration(format!("tracing init: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_an_error() {
        let _ = init_tracing(false);
        assert!(matches!(
            init_tracing(true),
            Err(QuorumClearError::Configuration(_))
        ));
    }
}
