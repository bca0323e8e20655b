//! REST surface: handlers, auth middleware, the moderation oracle client
//! and the router that ties them to a [`state::AppState`].

pub mod admin;
pub mod auth;
pub mod comments;
pub mod directory;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod moderation;
pub mod proposals;
pub mod state;
pub mod votes;

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};

use crate::middleware::{optional_auth, require_auth, require_staff};
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Every route, with auth applied per group. Groups share paths and differ
/// by method, so they are merged rather than nested.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/ministries", get(directory::ministries))
        .route("/provinces", get(directory::provinces));

    let reader_routes = Router::new()
        .route("/proposals", get(proposals::list))
        .route("/proposals/{id}", get(proposals::detail))
        .route("/proposals/{id}/votes", get(votes::tally))
        .route("/proposals/{id}/comments", get(comments::list))
        .layer(from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/proposals", post(proposals::create))
        .route(
            "/proposals/{id}",
            patch(proposals::revise).delete(proposals::withdraw),
        )
        .route("/proposals/{id}/votes", post(votes::cast))
        .route("/proposals/{id}/comments", post(comments::add))
        .layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/admin/proposals/stats", get(admin::stats))
        .route("/admin/proposals/{id}/status", patch(admin::set_status))
        .route("/admin/proposals/{id}/response", post(admin::publish_response))
        .route("/admin/proposals/{id}/publish", patch(admin::publish_as_is))
        .route("/admin/proposals/{id}", delete(admin::delete))
        .layer(from_fn(require_staff))
        .layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(reader_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .with_state(state)
}
