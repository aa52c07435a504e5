pub mod board;
pub mod engine;
pub mod palette;
pub mod rewards;
pub mod session;
mod sse;
pub mod state_machine;

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{board_store::BoardStore, preferences::PreferenceStore},
    error::ServiceError,
};

pub use self::sse::SseHub;
use self::{board::SessionId, palette::Palette, session::SessionRuntime};

/// Handle shared by every handler and background task.
pub type SharedState = Arc<AppState>;

/// Central application state: configuration, the board store handle, per-session runtimes
/// and the local palette.
pub struct AppState {
    config: AppConfig,
    board_store: RwLock<Option<Arc<dyn BoardStore>>>,
    sessions: DashMap<SessionId, Arc<SessionRuntime>>,
    palette: RwLock<Palette>,
    preferences: Arc<dyn PreferenceStore>,
    knocks: AtomicU64,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a board store is installed.
    pub fn new(config: AppConfig, preferences: Arc<dyn PreferenceStore>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            board_store: RwLock::new(None),
            sessions: DashMap::new(),
            palette: RwLock::new(Palette::default()),
            preferences,
            knocks: AtomicU64::new(0),
            degraded: degraded_tx,
        })
    }

    /// Configuration loaded at start-up.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current board store, if one is installed.
    pub async fn board_store(&self) -> Option<Arc<dyn BoardStore>> {
        let guard = self.board_store.read().await;
        guard.as_ref().cloned()
    }

    /// Board store handle, or [`ServiceError::Degraded`] while none is usable.
    pub async fn require_board_store(&self) -> Result<Arc<dyn BoardStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.board_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new board store implementation and leave degraded mode.
    pub async fn set_board_store(&self, store: Arc<dyn BoardStore>) {
        {
            let mut guard = self.board_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Runtime for `session`, created on first use.
    pub fn session(&self, session: &SessionId) -> Arc<SessionRuntime> {
        self.sessions
            .entry(session.clone())
            .or_insert_with(|| Arc::new(SessionRuntime::new()))
            .clone()
    }

    /// Runtime for `session` only if some client already touched it.
    pub fn existing_session(&self, session: &SessionId) -> Option<Arc<SessionRuntime>> {
        self.sessions.get(session).map(|entry| entry.value().clone())
    }

    /// Local mood-board palette.
    pub fn palette(&self) -> &RwLock<Palette> {
        &self.palette
    }

    /// Where the palette is persisted.
    pub fn preferences(&self) -> &Arc<dyn PreferenceStore> {
        &self.preferences
    }

    /// Count one knock and return how many came before it.
    pub fn record_knock(&self) -> u64 {
        self.knocks.fetch_add(1, Ordering::Relaxed)
    }
}
