use std::sync::Arc;

use clap::Parser;
use codatta_core::DocumentStore;
use codatta_updater::{Cli, Command, Config, UpdaterState, push_did_document, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let store = DocumentStore::new(&cli.config.store_endpoint, cli.config.store_token.clone())?;

    match cli.command {
        Some(Command::Update { did }) => push_did_document(&cli.config, &store, &did).await,
        Some(Command::Serve) | None => serve(cli.config, store).await,
    }
}

async fn serve(config: Config, store: DocumentStore) -> anyhow::Result<()> {
    tracing::info!("Document updater starting");
    tracing::info!("  Store: {}", config.store_endpoint);
    tracing::info!("  DID dir: {}", config.did_dir.display());
    tracing::info!("  Agent dir: {}", config.agent_dir.display());

    let listen = config.listen.clone();
    let state = Arc::new(UpdaterState { store, config });
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    tracing::info!(addr = %listen, "listening");
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
