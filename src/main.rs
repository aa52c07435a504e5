//! Scrapbook Back binary entrypoint wiring REST, SSE and the board store supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, extract::DefaultBodyLimit};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrapbook_back::{
    config::AppConfig,
    dao::{
        board_store::{BoardStore, MemoryBoardStore},
        preferences::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore},
    },
    routes,
    services::palette_service,
    state::{AppState, SharedState},
};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let preferences: Arc<dyn PreferenceStore> = match &config.palette().path {
        Some(path) => Arc::new(FilePreferenceStore::new(
            path.clone(),
            config.palette().quota_bytes,
        )),
        None => Arc::new(MemoryPreferenceStore::new(config.palette().quota_bytes)),
    };

    let app_state = AppState::new(config, preferences);
    palette_service::load_palette(&app_state).await;
    install_board_store(&app_state).await?;

    let app = build_router(app_state, max_upload_bytes());

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

    Ok(())
}

/// Pick the board store from `BOARD_STORE` (`couch` by default when compiled in).
async fn install_board_store(state: &SharedState) -> anyhow::Result<()> {
    let default_backend = if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    };
    let backend = env::var("BOARD_STORE").unwrap_or_else(|_| default_backend.into());

    match backend.as_str() {
        "memory" => {
            warn!("using in-memory board store; boards are not shared between servers");
            let store: Arc<dyn BoardStore> = Arc::new(MemoryBoardStore::new());
            state.set_board_store(store).await;
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use scrapbook_back::dao::{
                board_store::couchdb::{CouchBoardStore, CouchConfig},
                storage::StorageError,
            };
            use scrapbook_back::services::storage_supervisor;

            let couch = CouchConfig::from_env().context("reading CouchDB configuration")?;
            info!(
                base_url = %couch.base_url,
                database = %couch.database,
                "supervising CouchDB board store"
            );
            tokio::spawn(storage_supervisor::run(state.clone(), move || {
                let couch = couch.clone();
                async move {
                    let store = CouchBoardStore::connect(couch)
                        .await
                        .map_err(StorageError::from)?;
                    Ok::<Arc<dyn BoardStore>, StorageError>(Arc::new(store))
                }
            }));
        }
        other => anyhow::bail!("unknown BOARD_STORE backend `{other}`"),
    }
    Ok(())
}

fn max_upload_bytes() -> usize {
    env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, max_upload_bytes: usize) -> Router<()> {
    routes::router(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
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
