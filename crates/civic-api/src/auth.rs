use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use civic_core::store::{UserRecord, blocking};
use civic_core::CoreError;
use civic_types::api::{AuthResponse, Claims, LoginRequest, MeResponse, RegisterRequest, SessionUser};
use civic_types::models::{Role, User};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::extract_json;
use crate::state::AppState;

const MIN_PASSWORD_CHARS: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let req = extract_json(body)?;

    // Validate input
    let name = req.name.trim().to_string();
    let email = normalize_email(&req.email);
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if !email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::Validation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let password_hash = hash_password(&req.password)?;
    let user = User {
        id: Uuid::new_v4(),
        name,
        email,
        role: Role::Citizen,
        created_at: Utc::now(),
    };

    let record = UserRecord {
        user: user.clone(),
        password_hash,
    };
    blocking(state.store(), move |s| s.insert_user(&record))
        .await
        .map_err(CoreError::from)?;

    let token = create_token(&state.jwt_secret, &user, state.token_ttl)?;
    info!("User {} registered", user.id);

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let req = extract_json(body)?;
    let email = normalize_email(&req.email);

    let record = blocking(state.store(), move |s| s.user_by_email(&email))
        .await
        .map_err(CoreError::from)?
        .ok_or_else(bad_credentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&record.password_hash).map_err(ApiError::internal)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| bad_credentials())?;

    let token = create_token(&state.jwt_secret, &record.user, state.token_ttl)?;
    Ok(Json(AuthResponse {
        user: record.user,
        token,
    }))
}

pub async fn me(Extension(claims): Extension<Claims>) -> Json<MeResponse> {
    Json(MeResponse {
        user: SessionUser::from(&claims),
    })
}

/// Emails are compared case-insensitively.
fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn bad_credentials() -> ApiError {
    ApiError::Unauthenticated("invalid email or password".into())
}

/// Argon2id with a random salt, PHC string format.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(ApiError::internal)
}

pub fn create_token(
    secret: &str,
    user: &User,
    ttl: chrono::Duration,
) -> Result<String, ApiError> {
    let expires = Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| ApiError::Internal("token lifetime out of range".into()))?;
    let claims = Claims {
        sub: user.id,
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role,
        exp: expires.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(ApiError::internal)
}
