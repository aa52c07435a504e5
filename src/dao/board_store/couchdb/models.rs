use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    dao::models::{BoardRecord, WriteTag},
    state::board::SessionId,
};

/// Document id prefix for session boards.
pub const BOARD_PREFIX: &str = "board::";

/// One session record stored as a CouchDB document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchBoardDocument {
    /// `board::{session}`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision, required to overwrite the document.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Tag of the last write, echoed to `_changes` subscribers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<WriteTag>,
    /// Board fields, stored at the document root.
    #[serde(flatten)]
    pub record: BoardRecord,
}

impl CouchBoardDocument {
    /// Unrevisioned document for `session`, written with `origin`.
    pub fn new(session: &SessionId, record: BoardRecord, origin: WriteTag) -> Self {
        Self {
            id: board_doc_id(session),
            rev: None,
            origin: Some(origin),
            record,
        }
    }
}

/// Database metadata returned by `GET /{db}`.
#[derive(Debug, Deserialize)]
pub struct DatabaseInfo {
    /// Latest sequence, where a new change feed starts.
    pub update_seq: Value,
}

/// Body of a `_changes` long-poll response.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    /// Changed documents in this batch.
    #[serde(default)]
    pub results: Vec<ChangeRow>,
    /// Sequence to resume from.
    pub last_seq: Value,
}

/// One entry of a `_changes` batch.
#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    /// The document was deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Document body, present with `include_docs=true`.
    #[serde(default)]
    pub doc: Option<Value>,
}

/// CouchDB document id of the board for `session`.
pub fn board_doc_id(session: &SessionId) -> String {
    format!("{BOARD_PREFIX}{session}")
}

/// Render a sequence token for the `since` query parameter.
pub fn seq_param(seq: &Value) -> String {
    match seq {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
