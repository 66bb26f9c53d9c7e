//! Task Race Back binary entrypoint wiring REST, SSE, and snapshot storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::snapshot_store::{SnapshotStore, StoreBackend};
use dao::storage::StorageError;
use services::{sse_service, storage_supervisor, sync_service};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    let backend = StoreBackend::from_env();
    info!(?backend, "selected snapshot store backend");
    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        connect_store(backend)
    }));
    tokio::spawn(sse_service::watch_degraded(app_state.clone()));
    let sync_handle = sync_service::spawn(app_state.clone(), sync_service::interval_from_env());

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    sync_handle.shutdown().await;

    Ok(())
}

/// Open the snapshot store selected at startup.
async fn connect_store(backend: StoreBackend) -> Result<Arc<dyn SnapshotStore>, StorageError> {
    match backend {
        #[cfg(feature = "file-store")]
        StoreBackend::File => {
            use crate::dao::snapshot_store::file::{FileSnapshotStore, FileStoreConfig};

            let store = FileSnapshotStore::open(FileStoreConfig::from_env()).await?;
            Ok(Arc::new(store))
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            use crate::dao::snapshot_store::couchdb::{CouchConfig, CouchSnapshotStore};

            let store = CouchSnapshotStore::connect(CouchConfig::from_env()?).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: state::SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
