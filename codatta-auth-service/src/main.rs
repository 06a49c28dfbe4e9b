use std::sync::Arc;

use clap::Parser;
use codatta_auth_service::{AuthServiceState, Config, cors_layer, router};
use codatta_core::FeedbackAuthorizer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::parse();

    let authorizer = FeedbackAuthorizer::new(
        &config.private_key,
        config.chain_id,
        config.identity_registry,
    )?;

    tracing::info!("Feedback authorization service starting");
    tracing::info!("  Signer: {}", authorizer.signer_address());
    tracing::info!("  Chain id: {}", authorizer.chain_id());
    tracing::info!("  Registry: {}", authorizer.identity_registry());

    let state = Arc::new(AuthServiceState { authorizer });
    let app = router(state, cors_layer(&config.cors_origins));

    let listener = tokio::net::TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %config.listen, "listening");
    axum::serve(listener, app).await?;
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
