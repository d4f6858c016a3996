//! Logging setup (`telemetry.log_level`). `RUST_LOG` always wins over
//! the configured level, matching the override rule used elsewhere in this
//! codebase's tracing init.

pub fn init_tracing(log_level: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).try_init()?;
    Ok(())
}
