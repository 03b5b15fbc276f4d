//! Request and response bodies.

use ideas_ledger::IdeaView;
use serde::{Deserialize, Serialize};

use crate::pagination::PaginationMeta;

// ── Ideas ────────────────────────────────────────────────────────────────

/// A description given either as an existing locator or as inline text that
/// the server stores in the content store first.
#[derive(Debug, Default, Deserialize)]
pub struct DescriptionInput {
    pub description_locator: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIdeaRequest {
    pub title: String,
    #[serde(flatten)]
    pub description: DescriptionInput,
}

#[derive(Debug, Deserialize)]
pub struct EditTitleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct EditDescriptionRequest {
    #[serde(flatten)]
    pub description: DescriptionInput,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Leave tombstones out of the listing.
    #[serde(default)]
    pub live: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdeaPage {
    pub ideas: Vec<IdeaView>,
    #[serde(flatten)]
    pub pagination: PaginationMeta,
}

// ── Votes ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// 1 = approve, 2 = reject.
    pub decision: u8,
}

// ── Comments ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AddCommentRequest {
    #[serde(flatten)]
    pub description: DescriptionInput,
}

// ── Mutation results ─────────────────────────────────────────────────────

/// Returned when a command creates a record.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: u64,
    pub sequence: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MutationResponse {
    pub sequence: u64,
}

// ── Events ───────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: u64,
}

// ── Content ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentResponse {
    pub locator: String,
}

// ── Health ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub idea_slots: u64,
    pub live_ideas: u64,
    pub comments: u64,
    pub last_sequence: u64,
}
