//! Route handlers and the router.

use axum::{
    body::Bytes,
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use ideas_ledger::{live, CommandKind, ErrorKind, EventReplay, IdeaView, LedgerError, Receipt};
use ideas_store::StoreError;
use ideas_types::{CommentId, ContentLocator, IdeaId, VoteDecision};

type JsonArg<T> = Result<Json<T>, JsonRejection>;
type PathArg<T> = Result<Path<T>, PathRejection>;

use crate::caller::{Caller, Viewer};
use crate::error::{RpcError, RpcResult};
use crate::handlers::{
    AddCommentRequest, ContentResponse, CreateIdeaRequest, CreatedResponse, DescriptionInput,
    EditDescriptionRequest, EditTitleRequest, EventsQuery, HealthResponse, IdeaPage, ListQuery,
    MutationResponse, VoteRequest,
};
use crate::pagination::{next_cursor, PaginationMeta, PaginationParams};
use crate::server::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        // Ideas
        .route("/ideas", get(list_ideas).post(create_idea))
        .route("/ideas/page", get(page_ideas))
        .route("/ideas/:id", get(get_idea).delete(delete_idea))
        .route("/ideas/:id/title", put(edit_title))
        .route("/ideas/:id/description", put(edit_description))
        .route("/ideas/:id/votes", post(vote))
        .route("/ideas/:id/comments", post(add_comment))
        // Comments
        .route("/comments/:id", delete(delete_comment))
        // Events
        .route("/events", get(events))
        // Content
        .route("/content", post(put_content))
        .route("/content/:locator", get(get_content).delete(unpin_content))
        .with_state(state)
}

// ── Health & metrics ─────────────────────────────────────────────────────

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.ledger.stats().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        idea_slots: stats.idea_slots,
        live_ideas: stats.live_ideas,
        comments: stats.comments,
        last_sequence: stats.last_sequence,
    })
}

async fn metrics(State(state): State<AppState>) -> RpcResult<impl IntoResponse> {
    state.metrics.observe(&state.ledger.stats().await);
    let body = state.metrics.encode()?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}

// ── Reads ────────────────────────────────────────────────────────────────

async fn list_ideas(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(query): Query<ListQuery>,
) -> Json<Vec<IdeaView>> {
    let views = state.ledger.all_ideas(&viewer).await;
    Json(if query.live { live(views) } else { views })
}

async fn page_ideas(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    Query(params): Query<PaginationParams>,
) -> RpcResult<Json<IdeaPage>> {
    let offset = params
        .decode_offset()
        .ok_or_else(|| RpcError::InvalidRequest("malformed cursor".into()))?;
    let count = params.effective_count() as usize;

    let views = state.ledger.all_ideas(&viewer).await;
    let total = views.len();
    let ideas: Vec<IdeaView> = views
        .into_iter()
        .skip(offset.min(total as u64) as usize)
        .take(count)
        .collect();
    let cursor = next_cursor(offset, ideas.len(), total);

    Ok(Json(IdeaPage {
        ideas,
        pagination: PaginationMeta { cursor },
    }))
}

async fn get_idea(
    State(state): State<AppState>,
    Viewer(viewer): Viewer,
    id: PathArg<IdeaId>,
) -> RpcResult<Json<IdeaView>> {
    let Path(id) = id?;
    state
        .ledger
        .idea(id, &viewer)
        .await
        .map(Json)
        .ok_or(RpcError::Ledger(LedgerError::IdeaNotFound(id)))
}

async fn events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<EventReplay> {
    Json(state.ledger.events_since(query.since).await)
}

// ── Idea mutations ───────────────────────────────────────────────────────

async fn create_idea(
    State(state): State<AppState>,
    Caller(caller): Caller,
    req: JsonArg<CreateIdeaRequest>,
) -> RpcResult<(StatusCode, Json<CreatedResponse>)> {
    let kind = CommandKind::CreateIdea;
    let Json(req) = counted(&state, kind, req)?;
    let locator = counted(&state, kind, resolve_description(&state, req.description).await)?;
    let result = state.ledger.create_idea(&caller, req.title, locator).await;
    let receipt = settle(&state, kind, result).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: receipt.value.as_u64(),
            sequence: receipt.event.sequence,
        }),
    ))
}

async fn edit_title(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: PathArg<IdeaId>,
    req: JsonArg<EditTitleRequest>,
) -> RpcResult<Json<MutationResponse>> {
    let kind = CommandKind::EditIdeaTitle;
    let Path(id) = counted(&state, kind, id)?;
    let Json(req) = counted(&state, kind, req)?;
    let result = state.ledger.edit_idea_title(&caller, id, req.title).await;
    mutation(settle(&state, kind, result).await?)
}

async fn edit_description(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: PathArg<IdeaId>,
    req: JsonArg<EditDescriptionRequest>,
) -> RpcResult<Json<MutationResponse>> {
    let kind = CommandKind::EditIdeaDescription;
    let Path(id) = counted(&state, kind, id)?;
    let Json(req) = counted(&state, kind, req)?;
    let locator = counted(&state, kind, resolve_description(&state, req.description).await)?;
    let result = state
        .ledger
        .edit_idea_description(&caller, id, locator)
        .await;
    mutation(settle(&state, kind, result).await?)
}

async fn delete_idea(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: PathArg<IdeaId>,
) -> RpcResult<Json<MutationResponse>> {
    let kind = CommandKind::DeleteIdea;
    let Path(id) = counted(&state, kind, id)?;
    let result = state.ledger.delete_idea(&caller, id).await;
    mutation(settle(&state, kind, result).await?)
}

async fn vote(
    State(state): State<AppState>,
    Caller(caller): Caller,
    id: PathArg<IdeaId>,
    req: JsonArg<VoteRequest>,
) -> RpcResult<Json<MutationResponse>> {
    let kind = CommandKind::VoteForIdea;
    let Path(id) = counted(&state, kind, id)?;
    let Json(req) = counted(&state, kind, req)?;
    let decision = counted(&state, kind, VoteDecision::try_from(req.decision))?;
    let result = state.ledger.vote_for_idea(&caller, id, decision).await;
    mutation(settle(&state, kind, result).await?)
}

// ── Comment mutations ────────────────────────────────────────────────────

async fn add_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    idea_id: PathArg<IdeaId>,
    req: JsonArg<AddCommentRequest>,
) -> RpcResult<(StatusCode, Json<CreatedResponse>)> {
    let kind = CommandKind::AddComment;
    let Path(idea_id) = counted(&state, kind, idea_id)?;
    let Json(req) = counted(&state, kind, req)?;
    let locator = counted(&state, kind, resolve_description(&state, req.description).await)?;
    let result = state.ledger.add_comment(&caller, idea_id, locator).await;
    let receipt = settle(&state, kind, result).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            id: receipt.value.as_u64(),
            sequence: receipt.event.sequence,
        }),
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    Caller(caller): Caller,
    comment_id: PathArg<CommentId>,
) -> RpcResult<Json<MutationResponse>> {
    let kind = CommandKind::DeleteComment;
    let Path(comment_id) = counted(&state, kind, comment_id)?;
    let result = state.ledger.delete_comment(&caller, comment_id).await;
    mutation(settle(&state, kind, result).await?)
}

// ── Content ──────────────────────────────────────────────────────────────

async fn put_content(
    State(state): State<AppState>,
    Caller(_): Caller,
    body: Bytes,
) -> RpcResult<(StatusCode, Json<ContentResponse>)> {
    let content = state.content.clone();
    let locator = blocking(move || content.put(&body)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ContentResponse {
            locator: locator.to_string(),
        }),
    ))
}

async fn get_content(
    State(state): State<AppState>,
    Path(locator): Path<String>,
) -> RpcResult<impl IntoResponse> {
    let locator = ContentLocator::new(locator)?;
    let content = state.content.clone();
    let bytes = blocking(move || content.get(&locator)).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}

async fn unpin_content(
    State(state): State<AppState>,
    Caller(_): Caller,
    Path(locator): Path<String>,
) -> RpcResult<StatusCode> {
    let locator = ContentLocator::new(locator)?;
    let content = state.content.clone();
    blocking(move || content.unpin(&locator)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Helpers ──────────────────────────────────────────────────────────────

/// Count the outcome, refresh the gauges and convert the error.
async fn settle<T>(
    state: &AppState,
    kind: CommandKind,
    result: Result<Receipt<T>, LedgerError>,
) -> RpcResult<Receipt<T>> {
    match &result {
        Ok(_) => state.metrics.record_accepted(kind),
        Err(e) => state.metrics.record_rejected(kind, e.kind()),
    }
    state.metrics.observe(&state.ledger.stats().await);
    Ok(result?)
}

/// Convert an argument error, counting malformed input as a rejected command.
fn counted<T, E>(state: &AppState, kind: CommandKind, result: Result<T, E>) -> RpcResult<T>
where
    E: Into<RpcError>,
{
    result.map_err(|e| {
        let e = e.into();
        if e.status_and_code().0 == StatusCode::BAD_REQUEST {
            state.metrics.record_rejected(kind, ErrorKind::InvalidInput);
        }
        e
    })
}

fn mutation(receipt: Receipt<()>) -> RpcResult<Json<MutationResponse>> {
    Ok(Json(MutationResponse {
        sequence: receipt.event.sequence,
    }))
}

/// Turn a description input into a locator, storing inline text first.
async fn resolve_description(
    state: &AppState,
    input: DescriptionInput,
) -> RpcResult<ContentLocator> {
    match (input.description_locator, input.description) {
        (Some(_), Some(_)) => Err(RpcError::InvalidRequest(
            "give either description or description_locator, not both".into(),
        )),
        (Some(locator), None) => Ok(ContentLocator::new(locator)?),
        (None, Some(text)) => {
            if text.trim().is_empty() {
                return Err(RpcError::InvalidRequest(
                    "description must not be empty".into(),
                ));
            }
            let content = state.content.clone();
            blocking(move || content.put(text.as_bytes())).await
        }
        (None, None) => Err(RpcError::InvalidRequest(
            "description or description_locator is required".into(),
        )),
    }
}

/// Run a content store call on the blocking pool.
async fn blocking<T, F>(f: F) -> RpcResult<T>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RpcError::Server(e.to_string()))?
        .map_err(RpcError::from)
}
