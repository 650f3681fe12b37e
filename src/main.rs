use anyhow::{Context, Result};
use boltview::{AppConfig, LoggingConfig, init_logging};

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = AppConfig::from_env();

    let mut logging = LoggingConfig::default();
    if let Some(filter) = &config.log_filter {
        logging = logging.with_filter(filter.clone());
    }
    init_logging(logging);

    let asset_dir = config.asset_dir.clone();
    boltview::run(config)
        .with_context(|| format!("viewer stopped (assets from {})", asset_dir.display()))?;

    Ok(())
}
