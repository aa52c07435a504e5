//! Board operations: open, read, capture, dismiss and reset.
//!
//! Every decision follows the same protocol: write, re-read the authoritative record, then
//! decide against that fresh snapshot. The per-session transition gate serializes the steps
//! issued through this server; claim writes carry absolute values so two servers deciding the
//! same milestone converge on the same record.

use std::sync::Arc;

use tracing::{debug, info, warn};

/// Reads attempted after a photo write before falling back to the local snapshot.
const REREAD_ATTEMPTS: usize = 2;

use crate::{
    dao::{
        board_store::BoardStore,
        models::{FieldPath, FieldValue, RewardClaim, WriteTag},
    },
    dto::{
        board::{BoardView, CaptureResponse},
        reward::RewardSlotResponse,
    },
    error::ServiceError,
    services::{image_service, reward_presenter, sse_events},
    state::{
        SharedState,
        board::{BoardState, CELL_COUNT, SessionId},
        engine::{Award, evaluate_capture},
        rewards::{RewardCatalog, RewardTier},
        state_machine::{BoardEvent, BoardPhase, transition},
    },
};

async fn read_board(
    state: &SharedState,
    store: &Arc<dyn BoardStore>,
    session: &SessionId,
) -> Result<Option<BoardState>, ServiceError> {
    let record = store.read_once(session).await?;
    Ok(record.map(|record| BoardState::from_record(record, state.config().labels())))
}

async fn require_board(
    state: &SharedState,
    store: &Arc<dyn BoardStore>,
    session: &SessionId,
) -> Result<BoardState, ServiceError> {
    read_board(state, store, session)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("board `{session}`")))
}

/// Return the board for `session`, creating a fresh one when none exists yet.
pub async fn open_board(
    state: &SharedState,
    session: &SessionId,
) -> Result<BoardView, ServiceError> {
    let store = state.require_board_store().await?;
    let runtime = state.session(session);
    let _gate = runtime.lock_transitions().await;

    if let Some(board) = read_board(state, &store, session).await? {
        return Ok(BoardView::new(session, &board));
    }

    let board = BoardState::fresh(state.config().labels());
    store
        .replace_all(session, board.clone().into(), WriteTag::new())
        .await?;
    info!(%session, "created board");
    Ok(BoardView::new(session, &board))
}

/// Read the board for `session`.
pub async fn get_board(
    state: &SharedState,
    session: &SessionId,
) -> Result<BoardView, ServiceError> {
    let store = state.require_board_store().await?;
    let board = require_board(state, &store, session).await?;
    Ok(BoardView::new(session, &board))
}

/// Store a photo for cell `index` and award whatever this capture unlocked.
pub async fn capture_photo(
    state: &SharedState,
    session: &SessionId,
    index: usize,
    image: Vec<u8>,
) -> Result<CaptureResponse, ServiceError> {
    if index >= CELL_COUNT {
        return Err(ServiceError::InvalidInput(format!(
            "cell index {index} is outside the {CELL_COUNT}-cell board"
        )));
    }

    let store = state.require_board_store().await?;
    let runtime = state.session(session);
    let _gate = runtime.lock_transitions().await;

    let before = require_board(state, &store, session).await?;
    if before.cells[index].has_photo() {
        return Err(ServiceError::InvalidState(format!(
            "cell {index} already has a photo"
        )));
    }

    let encoded = image_service::downscale_async(image, state.config().image()).await?;
    store
        .write_field(
            session,
            FieldPath::CellPhoto(index),
            FieldValue::Photo(Some(encoded.data_url.clone())),
            WriteTag::new(),
        )
        .await
        .inspect_err(|err| warn!(%session, index, error = %err, "photo write failed"))?;

    let snapshot =
        snapshot_after_photo(state, &store, session, before, index, encoded.data_url).await?;
    let decision = evaluate_capture(&snapshot, index, state.config().rewards());
    let phase = BoardPhase::of(&snapshot);

    let awarded = match decision.award {
        Some(award) => match transition(
            phase,
            BoardEvent::CellFilled {
                reward: Some(award.tier),
            },
        ) {
            Ok(next) => match claim(&store, session, &snapshot, &award).await {
                Ok(()) => {
                    info!(%session, index, tier = ?award.tier, phase = ?next, "reward unlocked");
                    Some(award)
                }
                Err(err) => {
                    warn!(%session, index, error = %err, "reward claim write failed");
                    claim_landed(state, &store, session, award).await
                }
            },
            Err(err) => {
                warn!(%session, index, error = %err, "reward decision rejected");
                None
            }
        },
        None => {
            if let Err(err) = transition(phase, BoardEvent::CellFilled { reward: None }) {
                debug!(%session, index, error = %err, "capture outside the reward flow");
            }
            None
        }
    };

    let board = match read_board(state, &store, session).await {
        Ok(Some(board)) => board,
        Ok(None) => snapshot,
        Err(err) => {
            warn!(%session, error = %err, "re-read after capture failed; using last snapshot");
            snapshot
        }
    };

    let hub = runtime.hub();
    let (reward, celebration) = match awarded {
        Some(award) => {
            let presentation = reward_presenter::present(&award);
            runtime.show_reward(presentation.clone()).await;
            sse_events::broadcast_reward_unlocked(hub, &presentation);
            let celebration = presentation.celebration.clone();
            (Some(presentation), celebration)
        }
        None => {
            let celebration = reward_presenter::fill_celebration();
            sse_events::broadcast_cell_filled(
                hub,
                index,
                decision.completed_lines,
                celebration.clone(),
            );
            (None, celebration)
        }
    };

    Ok(CaptureResponse {
        board: BoardView::new(session, &board),
        index,
        reward,
        celebration,
    })
}

/// Fresh snapshot right after the photo write.
///
/// The photo is already durable at this point. When [`REREAD_ATTEMPTS`] reads fail, the
/// decision runs on `before` with the photo applied instead of failing the capture.
async fn snapshot_after_photo(
    state: &SharedState,
    store: &Arc<dyn BoardStore>,
    session: &SessionId,
    mut before: BoardState,
    index: usize,
    data_url: String,
) -> Result<BoardState, ServiceError> {
    for attempt in 1..=REREAD_ATTEMPTS {
        match require_board(state, store, session).await {
            Ok(board) => return Ok(board),
            Err(ServiceError::Unavailable(err)) => {
                warn!(%session, index, attempt, error = %err, "re-read after photo write failed");
            }
            Err(err) => return Err(err),
        }
    }
    before.cells[index].photo = Some(data_url);
    Ok(before)
}

/// Persist the claim for `award`, computed from the snapshot the decision was made on.
///
/// Counters and the pending flag go out in a single write so a claim is either fully
/// durable or absent.
async fn claim(
    store: &Arc<dyn BoardStore>,
    session: &SessionId,
    snapshot: &BoardState,
    award: &Award,
) -> Result<(), ServiceError> {
    let claim = match award.tier {
        RewardTier::Minor { .. } => RewardClaim {
            claimed_milestones: snapshot.claimed_milestones + 1,
            grand_prize_claimed: snapshot.grand_prize_claimed,
        },
        RewardTier::Grand => RewardClaim {
            claimed_milestones: snapshot.claimed_milestones,
            grand_prize_claimed: true,
        },
    };
    store
        .write_field(
            session,
            FieldPath::RewardClaim,
            FieldValue::Claim(claim),
            WriteTag::new(),
        )
        .await?;
    Ok(())
}

/// After a failed claim write, report `award` only if the record shows it landed anyway.
async fn claim_landed(
    state: &SharedState,
    store: &Arc<dyn BoardStore>,
    session: &SessionId,
    award: Award,
) -> Option<Award> {
    match read_board(state, store, session).await {
        Ok(Some(board)) => {
            let durable = pending_award(&board, state.config().rewards());
            if durable.as_ref().map(|pending| pending.tier) == Some(award.tier) {
                info!(%session, tier = ?award.tier, "reward claim landed despite the error");
                Some(award)
            } else {
                None
            }
        }
        Ok(None) => None,
        Err(err) => {
            warn!(%session, error = %err, "cannot confirm reward claim; no reward reported");
            None
        }
    }
}

/// Close the reward modal so the next tier can fire.
pub async fn dismiss_reward(
    state: &SharedState,
    session: &SessionId,
) -> Result<BoardView, ServiceError> {
    let store = state.require_board_store().await?;
    let runtime = state.session(session);
    let _gate = runtime.lock_transitions().await;

    let snapshot = require_board(state, &store, session).await?;
    let phase = BoardPhase::of(&snapshot);
    if let Err(err) = transition(phase, BoardEvent::RewardDismissed) {
        runtime.clear_reward().await;
        return Err(err.into());
    }

    if snapshot.reward_pending {
        store
            .write_field(
                session,
                FieldPath::RewardPending,
                FieldValue::Flag(false),
                WriteTag::new(),
            )
            .await?;
    }
    let shown = runtime.clear_reward().await;
    sse_events::broadcast_reward_dismissed(runtime.hub(), shown.map(|p| p.tier));

    let board = require_board(state, &store, session).await?;
    Ok(BoardView::new(session, &board))
}

/// Wipe every photo and claim, starting a fresh board.
pub async fn reset_board(
    state: &SharedState,
    session: &SessionId,
) -> Result<BoardView, ServiceError> {
    let store = state.require_board_store().await?;
    let runtime = state.session(session);
    let _gate = runtime.lock_transitions().await;

    let from = read_board(state, &store, session)
        .await?
        .map(|board| BoardPhase::of(&board))
        .unwrap_or(BoardPhase::Idle);
    let to = transition(from, BoardEvent::Reset)?;

    let board = BoardState::fresh(state.config().labels());
    // Only a running watcher ever consumes the echo.
    let tag = if runtime.is_watching() {
        runtime.echo_guard().arm()
    } else {
        WriteTag::new()
    };
    if let Err(err) = store.replace_all(session, board.clone().into(), tag).await {
        runtime.echo_guard().disarm(&tag);
        warn!(%session, error = %err, "board reset failed");
        return Err(err.into());
    }
    runtime.clear_reward().await;

    let view = BoardView::new(session, &board);
    sse_events::broadcast_board_reset(runtime.hub(), &view);
    info!(%session, ?from, ?to, "board reset");
    Ok(view)
}

/// Reward currently on screen for `session`.
///
/// The durable pending flag decides whether anything is shown. The locally displayed
/// presentation is reused when present; otherwise it is rebuilt from the counters so every
/// server reports the same pending tier.
pub async fn current_reward(
    state: &SharedState,
    session: &SessionId,
) -> Result<RewardSlotResponse, ServiceError> {
    let store = state.require_board_store().await?;
    let board = require_board(state, &store, session).await?;
    let runtime = state.existing_session(session);

    if !board.reward_pending {
        if let Some(runtime) = runtime {
            runtime.clear_reward().await;
        }
        return Ok(RewardSlotResponse { reward: None });
    }

    if let Some(runtime) = runtime {
        if let Some(reward) = runtime.displayed_reward().await {
            return Ok(RewardSlotResponse {
                reward: Some(reward),
            });
        }
    }

    let reward = pending_award(&board, state.config().rewards())
        .map(|award| reward_presenter::present(&award));
    Ok(RewardSlotResponse { reward })
}

/// The award a pending flag refers to, reconstructed from the counters.
fn pending_award(board: &BoardState, catalog: &RewardCatalog) -> Option<Award> {
    if !board.reward_pending {
        return None;
    }
    if board.grand_prize_claimed {
        return Some(Award {
            tier: RewardTier::Grand,
            reward: catalog.grand_prize().clone(),
        });
    }
    let index = board.claimed_milestones.checked_sub(1)?;
    let reward = catalog.milestones().get(index as usize)?.clone();
    Some(Award {
        tier: RewardTier::Minor { index },
        reward,
    })
}
