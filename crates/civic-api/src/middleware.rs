use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use civic_core::Actor;
use civic_types::api::Claims;
use jsonwebtoken::{DecodingKey, Validation, decode};

use crate::error::ApiError;
use crate::state::AppState;

/// Claims of the caller on routes where a token is optional.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Claims>);

impl Viewer {
    pub fn actor(&self) -> Option<Actor> {
        self.0.as_ref().map(Actor::from)
    }

    pub fn is_staff(&self) -> bool {
        self.0.as_ref().is_some_and(|c| c.role.is_staff())
    }
}

pub fn decode_token(secret: &str, token: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .ok()
}

fn bearer(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Extract and validate JWT from Authorization header.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer(&req)
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".into()))?;

    let claims = decode_token(&state.jwt_secret, token)
        .ok_or_else(|| ApiError::Unauthenticated("invalid or expired token".into()))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Attaches a [`Viewer`]. A missing or unusable token reads as anonymous.
pub async fn optional_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let claims = bearer(&req).and_then(|token| decode_token(&state.jwt_secret, token));
    req.extensions_mut().insert(Viewer(claims));
    next.run(req).await
}

/// Runs after [`require_auth`]; lets admins and ministry responsibles through.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, ApiError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| ApiError::Unauthenticated("authentication required".into()))?;

    if !claims.role.is_staff() {
        return Err(ApiError::Forbidden(format!(
            "role {} may not use staff routes",
            claims.role
        )));
    }
    Ok(next.run(req).await)
}
