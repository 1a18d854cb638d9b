use anyhow::{Context, Result};
use colored::Colorize;

use promptlib_logging::{Logger, Notice};
use promptlib_store::PromptStore;

use crate::api;

pub async fn handle_serve_command(
    store: PromptStore,
    modalities: Vec<String>,
    host: &str,
    port: u16,
    logger: &Logger,
) -> Result<()> {
    let router = api::create_router(store, modalities);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    let local = listener
        .local_addr()
        .context("Failed to read bound address")?;
    logger.log(&Notice::ServerListening {
        addr: local.to_string(),
    });
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
