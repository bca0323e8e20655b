use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use civic_core::Actor;
use civic_core::lifecycle::{ListQuery, ProposalDraft, ProposalRevision};
use civic_types::api::{
    Claims, CreateProposalRequest, DeletedResponse, ProposalResponse, ReviseProposalRequest,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{extract_id, extract_json, extract_query};
use crate::middleware::Viewer;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListParams {
    pub view: Option<String>,
    pub ministry_id: Option<i64>,
    pub province_id: Option<i64>,
    pub status: Option<String>,
    pub sort: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<ProposalResponse>>, ApiError> {
    let params = extract_query(params)?;
    let query = ListQuery {
        view: params.view.as_deref().unwrap_or_default().trim().parse()?,
        ministry_id: params.ministry_id,
        province_id: params.province_id,
        status: params.status,
        sort: params.sort,
    };

    let actor = viewer.actor();
    let proposals = state.lifecycle.list_proposals(actor.as_ref(), query).await?;

    let staff = viewer.is_staff();
    Ok(Json(
        proposals
            .into_iter()
            .map(|p| ProposalResponse::new(p, staff))
            .collect(),
    ))
}

pub async fn detail(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = extract_id(id)?;
    let actor = viewer.actor();
    let proposal = state.lifecycle.proposal(actor.as_ref(), id).await?;
    Ok(Json(ProposalResponse::new(proposal, viewer.is_staff())))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Result<Json<CreateProposalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = extract_json(body)?;
    let actor = Actor::from(&claims);

    let draft = ProposalDraft {
        ministry_id: req.ministry_id,
        province_id: req.province_id,
        problem: req.problem,
        solution: req.solution,
        impact: req.impact,
    };
    let proposal = state.lifecycle.create_proposal(&actor, draft).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProposalResponse::new(proposal, actor.is_staff())),
    ))
}

pub async fn revise(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ReviseProposalRequest>, JsonRejection>,
) -> Result<Json<ProposalResponse>, ApiError> {
    let id = extract_id(id)?;
    let req = extract_json(body)?;
    let actor = Actor::from(&claims);

    let revision = ProposalRevision {
        problem: req.problem,
        solution: req.solution,
        impact: req.impact,
    };
    let proposal = state.lifecycle.revise_proposal(&actor, id, revision).await?;
    Ok(Json(ProposalResponse::new(proposal, actor.is_staff())))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedResponse>, ApiError> {
    let id = extract_id(id)?;
    let actor = Actor::from(&claims);
    state.lifecycle.withdraw_proposal(&actor, id).await?;
    Ok(Json(DeletedResponse { deleted: true, id }))
}
