use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the scrapbook backend.
#[openapi(
    info(title = "Scrapbook Back", description = "Shared photo-bingo boards and a local palette"),
    paths(
        crate::routes::health::healthcheck,
        crate::routes::gate::gate_status,
        crate::routes::gate::knock,
        crate::routes::board::open_board,
        crate::routes::board::get_board,
        crate::routes::board::capture_photo,
        crate::routes::board::current_reward,
        crate::routes::board::dismiss_reward,
        crate::routes::board::reset_board,
        crate::routes::sse::board_events,
        crate::routes::palette::list_palette,
        crate::routes::palette::add_swatch,
        crate::routes::palette::update_swatch,
        crate::routes::palette::set_swatch_photo,
        crate::routes::palette::remove_swatch,
        crate::routes::palette::export_palette,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::gate::GateStatus,
            crate::dto::gate::TimeLeft,
            crate::dto::gate::KnockResponse,
            crate::dto::board::BoardView,
            crate::dto::board::CellView,
            crate::dto::board::VisibleBoardPhase,
            crate::dto::board::CaptureResponse,
            crate::dto::reward::RewardPresentation,
            crate::dto::reward::RewardSlotResponse,
            crate::dto::reward::Celebration,
            crate::dto::reward::ConfettiBurst,
            crate::dto::palette::SwatchView,
            crate::dto::palette::PaletteView,
            crate::dto::palette::UpdateSwatchRequest,
            crate::dto::sse::BoardAbsentEvent,
            crate::dto::sse::CellFilledEvent,
            crate::dto::sse::RewardDismissedEvent,
            crate::state::rewards::Reward,
            crate::state::rewards::RewardTier,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "gate", description = "Countdown lock screen"),
        (name = "board", description = "Shared photo bingo boards"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "palette", description = "Local mood-board palette"),
    )
)]
pub struct ApiDoc;
