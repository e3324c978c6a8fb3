//src/main.rs

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod common;
mod config;
mod docs;
mod handlers;
mod middleware;
mod models;
mod repo;
mod routes;
mod services;

use crate::config::{AppState, Settings};
use crate::services::refresh::spawn_refresher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG manda; sem ele, info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let settings = Settings::from_env()?;
    let app_state = AppState::new(settings)?;

    // Snapshot do relatório público, gerado em segundo plano
    let refresher = spawn_refresher(
        app_state.report_service.clone(),
        app_state.snapshot.clone(),
        app_state.settings.refresh_interval,
    );

    let app = routes::build_router(app_state.clone());

    // Inicia o servidor
    let listener = TcpListener::bind(&app_state.settings.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.stop().await;
    tracing::info!("Servidor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Falha ao escutar Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
