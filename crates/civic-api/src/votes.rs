use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use civic_core::Actor;
use civic_types::api::{CastVoteRequest, Claims};
use civic_types::models::{Vote, VoteTally};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{extract_id, extract_json};
use crate::middleware::Viewer;
use crate::state::AppState;

/// Like/dislike counts, plus the caller's own vote when a token is sent.
pub async fn tally(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<VoteTally>, ApiError> {
    let id = extract_id(id)?;
    let actor = viewer.actor();
    Ok(Json(state.lifecycle.tally(actor.as_ref(), id).await?))
}

pub async fn cast(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<CastVoteRequest>, JsonRejection>,
) -> Result<Json<Vote>, ApiError> {
    let id = extract_id(id)?;
    let req = extract_json(body)?;
    let actor = Actor::from(&claims);
    Ok(Json(state.lifecycle.cast_vote(&actor, id, &req.kind).await?))
}
