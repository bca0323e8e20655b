use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use civic_core::Actor;
use civic_types::api::{AddCommentRequest, Claims, CommentResponse};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{extract_id, extract_json};
use crate::middleware::Viewer;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    Extension(viewer): Extension<Viewer>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<CommentResponse>>, ApiError> {
    let id = extract_id(id)?;
    let actor = viewer.actor();
    let comments = state.lifecycle.comments(actor.as_ref(), id).await?;

    let staff = viewer.is_staff();
    Ok(Json(
        comments
            .into_iter()
            .map(|c| CommentResponse::new(c, staff))
            .collect(),
    ))
}

pub async fn add(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<AddCommentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = extract_id(id)?;
    let req = extract_json(body)?;
    let actor = Actor::from(&claims);

    let comment = state.lifecycle.add_comment(&actor, id, &req.content).await?;
    Ok((
        StatusCode::CREATED,
        Json(CommentResponse::new(comment, actor.is_staff())),
    ))
}
