use anyhow::anyhow;
use tracing_subscriber::EnvFilter;

/// Diagnostic log level for a `-v` count. `RUST_LOG` takes precedence.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "repkg_runner=warn",
        1 => "repkg_runner=info",
        2 => "repkg_runner=debug",
        _ => "repkg_runner=trace",
    }
}

/// Installs the stderr subscriber. Stdout is left to the output formatter.
pub fn init_tracing(verbosity: u8) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(verbosity).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {}", e))
}
