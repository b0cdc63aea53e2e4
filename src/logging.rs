use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global subscriber: compact lines on stderr, filtered by
/// `RUST_LOG` when set.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose {
        "adaptrader=debug,warn"
    } else {
        "adaptrader=info,warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init();
}
