use std::sync::Arc;

use clap::Parser;
use codatta_core::DocumentStore;
use codatta_resolver::{Config, ResolverState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::parse();

    let store = DocumentStore::new(&config.store_endpoint, config.store_token.clone())?;
    let state = Arc::new(ResolverState {
        store,
        root: config.store_root.clone(),
    });

    tracing::info!("DID resolver starting");
    tracing::info!("  Store: {}", config.store_endpoint);
    tracing::info!("  Root: {}", config.store_root);

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if std::env::var("LOG_JSON").is_ok() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
