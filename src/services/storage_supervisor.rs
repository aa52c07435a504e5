use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{board_store::BoardStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

/// Connect to the remote board store and keep the application degraded while it is
/// unreachable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn BoardStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                state.set_board_store(store.clone()).await;
                info!("board store connected; leaving degraded mode");
                delay = INITIAL_DELAY;

                monitor(&state, store.as_ref()).await;
                warn!("board store lost; reconnecting from scratch");
            }
            Err(err) => warn!(error = %err, "board store connection attempt failed"),
        }
        sleep(delay).await;
        delay = next_delay(delay);
    }
}

/// Poll the store until it fails and cannot be revived in place.
async fn monitor(state: &SharedState, store: &dyn BoardStore) {
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("board store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
            }
            Err(err) => {
                warn!(error = %err, "board store health check failed");
                if !reconnect(state, store).await {
                    warn!("exhausted board store reconnect attempts; staying in degraded mode");
                    return;
                }
                state.update_degraded(false);
            }
        }
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn reconnect(state: &SharedState, store: &dyn BoardStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "board store reconnected after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(attempt, error = %err, "board store reconnect failed; degraded mode");
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "board store reconnect attempt failed");
                }
                sleep(delay).await;
                delay = next_delay(delay);
            }
        }
    }
    false
}
