use axum::{Json, extract::State};
use civic_core::CoreError;
use civic_core::store::blocking;
use civic_types::models::{Ministry, Province};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn ministries(State(state): State<AppState>) -> Result<Json<Vec<Ministry>>, ApiError> {
    let ministries = blocking(state.store(), |s| s.ministries())
        .await
        .map_err(CoreError::from)?;
    Ok(Json(ministries))
}

pub async fn provinces(State(state): State<AppState>) -> Result<Json<Vec<Province>>, ApiError> {
    let provinces = blocking(state.store(), |s| s.provinces())
        .await
        .map_err(CoreError::from)?;
    Ok(Json(provinces))
}
