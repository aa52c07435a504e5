use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashSet;
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::{dao::models::WriteTag, dto::reward::RewardPresentation, state::sse::SseHub};

const SESSION_SSE_CAPACITY: usize = 32;
/// Armed tags kept before the oldest generation is forgotten.
const MAX_ARMED_TAGS: usize = 16;

/// Server-local runtime attached to one shared board.
///
/// Nothing in here is authoritative: the board itself lives in the board store. This only
/// holds what one server needs to serialize its own writes and fan out notifications.
pub struct SessionRuntime {
    hub: SseHub,
    transition_gate: Mutex<()>,
    displayed_reward: RwLock<Option<RewardPresentation>>,
    echo_guard: EchoGuard,
    watching: AtomicBool,
}

impl SessionRuntime {
    /// Runtime with an empty hub, no displayed reward and no watcher.
    pub fn new() -> Self {
        Self {
            hub: SseHub::new(SESSION_SSE_CAPACITY),
            transition_gate: Mutex::new(()),
            displayed_reward: RwLock::new(None),
            echo_guard: EchoGuard::default(),
            watching: AtomicBool::new(false),
        }
    }

    /// Broadcast hub for this session's SSE stream.
    pub fn hub(&self) -> &SseHub {
        &self.hub
    }

    /// Serialize captures, dismissals and resets issued through this server.
    pub async fn lock_transitions(&self) -> MutexGuard<'_, ()> {
        self.transition_gate.lock().await
    }

    /// Tags of local writes whose store echo must not be re-broadcast.
    pub fn echo_guard(&self) -> &EchoGuard {
        &self.echo_guard
    }

    /// Reward this server is currently showing, if any.
    pub async fn displayed_reward(&self) -> Option<RewardPresentation> {
        self.displayed_reward.read().await.clone()
    }

    /// Replace the single displayed reward slot.
    pub async fn show_reward(&self, presentation: RewardPresentation) {
        *self.displayed_reward.write().await = Some(presentation);
    }

    /// Empty the displayed reward slot, returning what was shown.
    pub async fn clear_reward(&self) -> Option<RewardPresentation> {
        self.displayed_reward.write().await.take()
    }

    /// Claim the watcher slot; returns `false` when a watcher is already running.
    pub fn try_start_watching(&self) -> bool {
        self.watching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the watcher slot.
    pub fn stop_watching(&self) {
        self.watching.store(false, Ordering::Release);
    }

    /// Whether a watcher currently forwards store changes for this session.
    pub fn is_watching(&self) -> bool {
        self.watching.load(Ordering::Acquire)
    }
}

impl Default for SessionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Write tags whose change notifications must not be re-broadcast by the watcher.
#[derive(Default)]
pub struct EchoGuard {
    armed: DashSet<WriteTag>,
}

impl EchoGuard {
    /// Arm a fresh tag right before issuing the write it will mark.
    ///
    /// Feeds that coalesce revisions may never echo a tag, so the set is cleared once it
    /// reaches [`MAX_ARMED_TAGS`].
    pub fn arm(&self) -> WriteTag {
        if self.armed.len() >= MAX_ARMED_TAGS {
            self.armed.clear();
        }
        let tag = WriteTag::new();
        self.armed.insert(tag);
        tag
    }

    /// Consume `tag` if armed; each armed tag suppresses exactly one echo.
    pub fn consume(&self, tag: &WriteTag) -> bool {
        self.armed.remove(tag).is_some()
    }

    /// Drop a tag whose write failed and will never echo.
    pub fn disarm(&self, tag: &WriteTag) {
        self.armed.remove(tag);
    }

    /// Number of tags still waiting for their echo.
    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn armed_tag_suppresses_a_single_echo() {
        let guard = EchoGuard::default();
        let tag = guard.arm();
        assert!(guard.consume(&tag));
        assert!(!guard.consume(&tag));
        assert!(!guard.consume(&WriteTag::new()));
    }

    #[test]
    fn unechoed_tags_are_bounded() {
        let guard = EchoGuard::default();
        for _ in 0..100 {
            guard.arm();
        }
        assert!(guard.armed_count() <= MAX_ARMED_TAGS);
        let latest = guard.arm();
        assert!(guard.consume(&latest));
    }

    #[test]
    fn only_one_watcher_can_start() {
        let runtime = SessionRuntime::new();
        assert!(runtime.try_start_watching());
        assert!(!runtime.try_start_watching());
        runtime.stop_watching();
        assert!(!runtime.is_watching());
        assert!(runtime.try_start_watching());
    }
}
