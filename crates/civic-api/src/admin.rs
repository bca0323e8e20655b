//! Staff routes. Mounted behind `require_auth` and `require_staff`; the
//! lifecycle checks the role matrix again per operation.

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};
use civic_core::Actor;
use civic_types::api::{Claims, DeletedResponse, OfficialResponseRequest, ProposalResponse, SetStatusRequest};
use civic_types::models::AdminStats;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{extract_id, extract_json};
use crate::state::AppState;

pub async fn set_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<SetStatusRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = extract_id(id)?;
    let req = extract_json(body)?;
    let proposal = state
        .lifecycle
        .set_status(&Actor::from(&claims), id, &req.status)
        .await?;
    Ok(Json(ProposalResponse::new(proposal, true)))
}

pub async fn publish_response(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<OfficialResponseRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = extract_id(id)?;
    let req = extract_json(body)?;
    let proposal = state
        .lifecycle
        .publish_response(&Actor::from(&claims), id, &req.official_response)
        .await?;
    Ok(Json(ProposalResponse::new(proposal, true)))
}

/// No body; publishes with the fixed placeholder text.
pub async fn publish_as_is(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = extract_id(id)?;
    let proposal = state
        .lifecycle
        .publish_as_is(&Actor::from(&claims), id)
        .await?;
    Ok(Json(ProposalResponse::new(proposal, true)))
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = extract_id(id)?;
    state
        .lifecycle
        .delete_proposal(&Actor::from(&claims), id)
        .await?;
    Ok(Json(DeletedResponse { deleted: true, id }))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AdminStats>, ApiError> {
    Ok(Json(state.lifecycle.stats(&Actor::from(&claims)).await?))
}
