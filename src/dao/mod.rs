/// Shared board record storage and change subscriptions.
pub mod board_store;
/// Database model definitions.
pub mod models;
/// Local on-device preference persistence (palette swatches).
pub mod preferences;
/// Storage abstraction layer for database operations.
pub mod storage;
