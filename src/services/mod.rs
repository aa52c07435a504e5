/// Board lifecycle: open, capture, dismiss, reset.
pub mod board_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Lock screen countdown, knocks and the unlock middleware.
pub mod gate_service;
/// Health check service.
pub mod health_service;
/// Photo downscaling and PNG encoding.
pub mod image_service;
/// Local mood-board palette operations.
pub mod palette_service;
/// Celebration plans for captures and rewards.
pub mod reward_presenter;
/// Per-session store watchers feeding the SSE hubs.
pub mod session_watcher;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events streaming service.
pub mod sse_service;
/// Board store connection supervisor with backoff.
pub mod storage_supervisor;
