use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging from command-line options.
///
/// `RUST_LOG` still wins when set, e.g. `RUST_LOG=rtt_probe=debug` for
/// per-probe traffic from this crate only. `json` switches to one JSON
/// object per event.
pub fn init_logging_with_config(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_thread_names(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_names(true)
                    .with_line_number(true),
            )
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_with_config() {
        // The global subscriber can only be installed once per test binary.
        init_logging_with_config("debug", false);
        tracing::debug!(probes = 1, "Logging initialized");
    }
}
