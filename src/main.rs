use anyhow::Result;
use plant_pal::{config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Checks the configured level; `RUST_LOG` directives are left to `EnvFilter`.
fn validate_log_level(level: &str) -> Result<()> {
    level.parse::<LevelFilter>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Config comes first so its log level can seed the subscriber. A missing
    // API key stops the process here.
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log_level = config.server.logs.level.clone();
    if let Err(e) = validate_log_level(&log_level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!(
        "Starting Plant Pal with model {} (log level: {})",
        config.llm.model, log_level
    );

    server::run(config).await?;

    Ok(())
}
