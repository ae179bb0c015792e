use std::path::{Path, PathBuf};

use news_relay::api::{self, AppState};
use news_relay::config::{FeedCatalog, ServerConfig};
use news_relay::db::{self, Repository};
use news_relay::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = if args.len() >= 3 && args[1] == "--config" {
        Some(PathBuf::from(&args[2]))
    } else {
        None
    };

    let config = ServerConfig::load(config_path.as_deref())?;
    let repo = Repository::new(&config.db_path).await?;

    let catalog = match &config.feeds_path {
        Some(path) => FeedCatalog::load(Path::new(path))?,
        None => FeedCatalog::builtin()?,
    };
    db::seed_catalog(&repo, &catalog).await?;

    if !config.requires_api_key() {
        tracing::warn!("Ingest endpoints accept requests without an API key");
    }

    let app = api::router(AppState::new(repo, &config));
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
