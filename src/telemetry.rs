use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = concat!(env!("CARGO_CRATE_NAME"), "=info,axum=info,tower_http=info");

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber. A second call is a no-op, so tests may
/// call it freely.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(fmt::layer().compact().with_target(false))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_this_crate() {
        assert!(DEFAULT_FILTER.starts_with("order_api=info"));
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing();
        init_tracing();
    }
}
