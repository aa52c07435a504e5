use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use futures::future::BoxFuture;
use image::{Rgb, RgbImage};
use scrapbook_back::{
    config::AppConfig,
    dao::{
        board_store::{BoardStore, BoardSubscription, MemoryBoardStore},
        models::{BoardRecord, FieldPath, FieldValue, WriteTag},
        preferences::MemoryPreferenceStore,
        storage::{StorageError, StorageResult},
    },
    error::ServiceError,
    routes,
    services::{board_service, image_service},
    state::{AppState, SharedState, board::SessionId, rewards::RewardTier},
};
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

async fn state_with(config: AppConfig) -> SharedState {
    state_on(config, Arc::new(MemoryBoardStore::new())).await
}

async fn state_on(config: AppConfig, store: Arc<dyn BoardStore>) -> SharedState {
    let state = AppState::new(config, Arc::new(MemoryPreferenceStore::new(1 << 20)));
    state.set_board_store(store).await;
    state
}

/// Memory store that can refuse reward claims and fail reads right after a photo write.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryBoardStore,
    refuse_claims: AtomicBool,
    reads_failing_after_photo: AtomicUsize,
    reads_to_fail: AtomicUsize,
}

fn flaky() -> StorageError {
    StorageError::rejected("flaky store")
}

impl BoardStore for FlakyStore {
    fn subscribe(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<BoardSubscription>> {
        self.inner.subscribe(session)
    }

    fn write_field(
        &self,
        session: &SessionId,
        path: FieldPath,
        value: FieldValue,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        match path {
            FieldPath::RewardClaim if self.refuse_claims.load(Ordering::SeqCst) => {
                return Box::pin(async { Err(flaky()) });
            }
            FieldPath::CellPhoto(_) => {
                let failing = self.reads_failing_after_photo.swap(0, Ordering::SeqCst);
                self.reads_to_fail.store(failing, Ordering::SeqCst);
            }
            _ => {}
        }
        self.inner.write_field(session, path, value, tag)
    }

    fn read_once(
        &self,
        session: &SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<BoardRecord>>> {
        let failing = self
            .reads_to_fail
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Box::pin(async { Err(flaky()) });
        }
        self.inner.read_once(session)
    }

    fn replace_all(
        &self,
        session: &SessionId,
        record: BoardRecord,
        tag: WriteTag,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.replace_all(session, record, tag)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

fn photo() -> Vec<u8> {
    image_service::encode_png(RgbImage::from_pixel(640, 480, Rgb([180, 90, 60]))).unwrap()
}

fn session(id: &str) -> SessionId {
    SessionId::parse(id).unwrap()
}

#[tokio::test]
async fn first_line_unlocks_milestone_until_dismissed() {
    let state = state_with(AppConfig::default()).await;
    let alice = session("alice");
    let opened = board_service::open_board(&state, &alice).await.unwrap();
    assert_eq!(opened.filled, 0);
    assert_eq!(opened.cells.len(), 9);

    for index in [0, 1] {
        let capture = board_service::capture_photo(&state, &alice, index, photo())
            .await
            .unwrap();
        assert!(capture.reward.is_none());
    }

    let capture = board_service::capture_photo(&state, &alice, 2, photo())
        .await
        .unwrap();
    let reward = capture.reward.expect("top row unlocks the first milestone");
    assert_eq!(reward.tier, RewardTier::Minor { index: 0 });
    assert_eq!(capture.board.claimed_milestones, 1);
    assert!(capture.board.reward_pending);
    assert_eq!(capture.board.completed_lines, vec![[0, 1, 2]]);

    let slot = board_service::current_reward(&state, &alice).await.unwrap();
    assert_eq!(slot.reward.map(|r| r.tier), Some(RewardTier::Minor { index: 0 }));

    let dismissed = board_service::dismiss_reward(&state, &alice).await.unwrap();
    assert!(!dismissed.reward_pending);
    assert!(
        board_service::current_reward(&state, &alice)
            .await
            .unwrap()
            .reward
            .is_none()
    );
    assert!(matches!(
        board_service::dismiss_reward(&state, &alice).await,
        Err(ServiceError::InvalidState(_))
    ));
}

#[tokio::test]
async fn pending_reward_blocks_next_milestone() {
    let state = state_with(AppConfig::default()).await;
    let bob = session("bob");
    board_service::open_board(&state, &bob).await.unwrap();

    for index in [0, 1, 2, 3, 4] {
        board_service::capture_photo(&state, &bob, index, photo())
            .await
            .unwrap();
    }
    let second_line = board_service::capture_photo(&state, &bob, 5, photo())
        .await
        .unwrap();
    assert!(second_line.reward.is_none());
    assert_eq!(second_line.board.claimed_milestones, 1);
}

#[tokio::test]
async fn full_board_awards_grand_prize_and_reset_clears_it() {
    let state = state_with(AppConfig::default()).await;
    let carol = session("carol");
    board_service::open_board(&state, &carol).await.unwrap();

    let mut last = None;
    for index in 0..9 {
        let capture = board_service::capture_photo(&state, &carol, index, photo())
            .await
            .unwrap();
        if capture.reward.is_some() && index < 8 {
            board_service::dismiss_reward(&state, &carol).await.unwrap();
        }
        last = Some(capture);
    }
    let last = last.unwrap();
    assert_eq!(last.reward.unwrap().tier, RewardTier::Grand);
    assert!(last.board.grand_prize_claimed);

    let reset = board_service::reset_board(&state, &carol).await.unwrap();
    assert_eq!(reset.filled, 0);
    assert_eq!(reset.claimed_milestones, 0);
    assert!(!reset.grand_prize_claimed);
    assert!(
        board_service::current_reward(&state, &carol)
            .await
            .unwrap()
            .reward
            .is_none()
    );
}

#[tokio::test]
async fn capture_rejects_bad_index_and_taken_cell() {
    let state = state_with(AppConfig::default()).await;
    let dave = session("dave");
    board_service::open_board(&state, &dave).await.unwrap();

    assert!(matches!(
        board_service::capture_photo(&state, &dave, 9, photo()).await,
        Err(ServiceError::InvalidInput(_))
    ));
    board_service::capture_photo(&state, &dave, 4, photo())
        .await
        .unwrap();
    assert!(matches!(
        board_service::capture_photo(&state, &dave, 4, photo()).await,
        Err(ServiceError::InvalidState(_))
    ));
    assert!(matches!(
        board_service::capture_photo(&state, &dave, 5, b"not an image".to_vec()).await,
        Err(ServiceError::Unprocessable(_))
    ));
}

#[tokio::test]
async fn concurrent_captures_on_distinct_cells_all_land() {
    let state = state_with(AppConfig::default()).await;
    let erin = session("erin");
    board_service::open_board(&state, &erin).await.unwrap();

    let tasks: Vec<_> = [0usize, 4, 8]
        .into_iter()
        .map(|index| {
            let state = state.clone();
            let erin = erin.clone();
            tokio::spawn(async move {
                board_service::capture_photo(&state, &erin, index, photo()).await
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let board = board_service::get_board(&state, &erin).await.unwrap();
    assert_eq!(board.filled, 3);
    assert_eq!(board.claimed_milestones, 1);
}

#[tokio::test]
async fn router_serves_health_and_missing_board() {
    let state = state_with(AppConfig::default()).await;
    let app = routes::router(state);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/healthcheck").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = to_bytes(health.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");

    let missing = app
        .oneshot(
            Request::builder()
                .uri("/sessions/nobody")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn enforced_gate_locks_board_but_not_countdown() {
    let config = AppConfig::default()
        .with_gate_enforced(true)
        .with_unlock_at(OffsetDateTime::now_utc() + Duration::days(1));
    let app = routes::router(state_with(config).await);

    let locked = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions/alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(locked.status(), StatusCode::LOCKED);

    let gate = app
        .oneshot(Request::builder().uri("/gate").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(gate.status(), StatusCode::OK);
    let body = to_bytes(gate.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["unlocked"], false);
}

#[tokio::test]
async fn degraded_state_answers_service_unavailable() {
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(MemoryPreferenceStore::new(1 << 20)),
    );
    let app = routes::router(state);
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions/alice")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn refused_claim_leaves_the_milestone_for_the_next_line() {
    let store = Arc::new(FlakyStore::default());
    let state = state_on(AppConfig::default(), store.clone()).await;
    let frank = session("frank");
    board_service::open_board(&state, &frank).await.unwrap();

    store.refuse_claims.store(true, Ordering::SeqCst);
    for index in [0, 1, 2] {
        let capture = board_service::capture_photo(&state, &frank, index, photo())
            .await
            .unwrap();
        assert!(capture.reward.is_none());
    }
    let board = board_service::get_board(&state, &frank).await.unwrap();
    assert_eq!(board.claimed_milestones, 0);
    assert!(!board.reward_pending);

    store.refuse_claims.store(false, Ordering::SeqCst);
    for index in [3, 4] {
        board_service::capture_photo(&state, &frank, index, photo())
            .await
            .unwrap();
    }
    let capture = board_service::capture_photo(&state, &frank, 5, photo())
        .await
        .unwrap();
    assert_eq!(
        capture.reward.map(|r| r.tier),
        Some(RewardTier::Minor { index: 0 })
    );
    assert_eq!(capture.board.claimed_milestones, 1);
}

#[tokio::test]
async fn failed_reread_after_photo_still_awards_the_line() {
    let store = Arc::new(FlakyStore::default());
    let state = state_on(AppConfig::default(), store.clone()).await;
    let gina = session("gina");
    board_service::open_board(&state, &gina).await.unwrap();

    for index in [0, 1] {
        board_service::capture_photo(&state, &gina, index, photo())
            .await
            .unwrap();
    }
    store.reads_failing_after_photo.store(2, Ordering::SeqCst);
    let capture = board_service::capture_photo(&state, &gina, 2, photo())
        .await
        .unwrap();
    assert_eq!(
        capture.reward.map(|r| r.tier),
        Some(RewardTier::Minor { index: 0 })
    );

    let board = board_service::get_board(&state, &gina).await.unwrap();
    assert_eq!(board.claimed_milestones, 1);
    assert!(board.reward_pending);
}

#[tokio::test]
async fn resets_without_listeners_arm_no_echo_tags() {
    let state = state_with(AppConfig::default()).await;
    let hank = session("hank");
    board_service::open_board(&state, &hank).await.unwrap();

    for _ in 0..100 {
        board_service::reset_board(&state, &hank).await.unwrap();
    }
    assert_eq!(state.session(&hank).echo_guard().armed_count(), 0);
}

#[tokio::test]
async fn dismissal_on_another_server_clears_reward_everywhere() {
    let shared = Arc::new(MemoryBoardStore::new());
    let server_a = state_on(AppConfig::default(), shared.clone()).await;
    let server_b = state_on(AppConfig::default(), shared).await;
    let ivy = session("ivy");
    board_service::open_board(&server_a, &ivy).await.unwrap();

    let mut last = None;
    for index in [0, 1, 2] {
        last = Some(
            board_service::capture_photo(&server_a, &ivy, index, photo())
                .await
                .unwrap(),
        );
    }
    assert!(last.unwrap().reward.is_some());
    let on_b = board_service::current_reward(&server_b, &ivy).await.unwrap();
    assert_eq!(on_b.reward.map(|r| r.tier), Some(RewardTier::Minor { index: 0 }));

    board_service::dismiss_reward(&server_b, &ivy).await.unwrap();
    let on_a = board_service::current_reward(&server_a, &ivy).await.unwrap();
    assert!(on_a.reward.is_none());
}

#[tokio::test]
async fn openapi_document_describes_the_scrapbook() {
    let state = AppState::new(
        AppConfig::default(),
        Arc::new(MemoryPreferenceStore::new(1 << 20)),
    );
    let app = routes::router(state);

    let health = app
        .clone()
        .oneshot(Request::builder().uri("/healthcheck").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let body = to_bytes(health.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "degraded");

    let doc = app
        .oneshot(
            Request::builder()
                .uri("/api-doc/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(doc.status(), StatusCode::OK);
    let body = to_bytes(doc.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["info"]["title"], "Scrapbook Back");
    assert!(json["paths"]["/sessions/{id}/cells/{index}/photo"].is_object());
}
