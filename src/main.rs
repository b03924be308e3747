use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use zonewatch::cli;
use zonewatch::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parsed = cli::parse(&args)?;

    let config_path = parsed
        .config_path
        .clone()
        .unwrap_or_else(Config::default_path);
    let config = if config_path.exists() {
        Config::load(&config_path)
            .with_context(|| format!("loading {}", config_path.display()))?
    } else {
        Config::default()
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli::run(parsed.command, &config).await
}
