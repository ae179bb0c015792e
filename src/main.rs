use std::path::PathBuf;

use news_relay::config::ClientConfig;
use news_relay::error::Result;
use news_relay::pipeline::Pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    // --config <path> overrides the per-user config file
    let config_path = if args.len() >= 3 && args[1] == "--config" {
        Some(PathBuf::from(&args[2]))
    } else {
        None
    };

    let config = ClientConfig::load(config_path.as_deref())?;
    let sources = config.catalog()?.sources();
    tracing::info!(
        "Pulling {} feeds, delivering to {}",
        sources.len(),
        config.api_url
    );

    let pipeline = Pipeline::new(config)?;
    let summary = pipeline.run(&sources).await;

    println!(
        "fetched={} unique={} already_delivered={} attempted={} delivered={}",
        summary.fetched,
        summary.unique,
        summary.already_delivered,
        summary.attempted,
        summary.delivered
    );
    Ok(())
}
