use chat_service::config::ChatConfig;
use chat_service::services::init_metrics;
use chat_service::startup::Application;
use service_core::observability::init_tracing;
use tokio::signal;

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize metrics recorder (must be before any metrics are recorded)
    init_metrics();

    let config = ChatConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "chat-service",
        &config.common.log_level,
        config.otlp_endpoint.as_deref(),
    );

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to build application");
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_with_shutdown(shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}
