//! BookPress server.

use axum::routing::get;
use bookpress_core::environment::{Clock, SystemClock};
use bookpress_core::event_bus::EventBus;
use bookpress_platform::bootstrap::{book_catalog, build_pipeline, publishing_settings};
use bookpress_platform::telemetry::{init_tracing, install_metrics};
use bookpress_platform::{AppState, Config, Services, build_router};
use bookpress_publishing::AuthorRoster;
use bookpress_runtime::LocalEventBus;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("Starting BookPress server");

    let config = Config::from_env();
    info!(
        bind = %config.server.bind_address(),
        storage_root = %config.storage.root,
        openai_base_url = %config.openai.base_url,
        max_concurrent_publishes = config.publishing.max_concurrent_publishes,
        "Configuration loaded"
    );

    let metrics = install_metrics()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let event_bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::new());

    let roster = AuthorRoster::new();
    let (pipeline, storage) = build_pipeline(&config, Arc::clone(&clock), roster.clone()).await?;
    info!(storage_root = %storage.root().display(), "Publishing pipeline ready");

    let services = Services::new(
        pipeline,
        publishing_settings(&config),
        Arc::new(book_catalog(&config)),
        clock,
        event_bus,
        roster,
    );

    let (shutdown_tx, _) = broadcast::channel(1);
    let consumers = services.spawn_consumers(&config.publishing.manuscript_topic, &shutdown_tx);
    info!(count = consumers.len(), "Event consumers started");

    let state = AppState::new(
        Arc::clone(&services.manuscripts),
        Arc::clone(&services.subscribers),
        Arc::clone(&services.authors),
        Arc::clone(&services.reviews),
        config.command_timeout(),
    );
    let app = build_router(state, storage).route(
        "/metrics",
        get(move || std::future::ready(metrics.render())),
    );

    let listener = tokio::net::TcpListener::bind(config.server.bind_address()).await?;
    info!(address = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped, shutting down consumers and stores");
    let _ = shutdown_tx.send(());
    for consumer in consumers {
        if let Err(e) = consumer.await {
            error!(error = %e, "Event consumer task failed");
        }
    }
    if let Err(e) = services.shutdown(config.shutdown_timeout()).await {
        error!(error = %e, "Stores did not shut down cleanly");
    }

    info!("BookPress server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
