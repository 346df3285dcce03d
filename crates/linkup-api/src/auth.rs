use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};

use linkup_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest};
use linkup_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 100;

pub async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();

    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Name must be between 1 and {} characters",
            MAX_NAME_LEN
        )));
    }
    if !email.contains('@') || email.len() > 254 {
        return Err(ApiError::BadRequest("A valid email is required".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    let role = req.role.unwrap_or(Role::Student);
    if role == Role::Admin {
        return Err(ApiError::BadRequest("Admin accounts cannot self-register".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let stored_name = name.clone();
    let user_id = blocking(&state, move |db| {
        db.create_user(&stored_name, &email, &password_hash, role)
    })
    .await?;

    let token = create_token(&state.jwt_secret, user_id, role, state.token_ttl)?;
    info!(user_id, role = role.as_str(), "User registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            user_id,
            name,
            role,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let user = blocking(&state, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or_else(|| {
            warn!("Login for unknown email");
            ApiError::InvalidCredentials
        })?;

    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| {
            warn!(user_id = user.id, "Login with wrong password");
            ApiError::InvalidCredentials
        })?;

    let user_id = user.id;
    let user = user.into_user()?;
    let token = create_token(&state.jwt_secret, user_id, user.role, state.token_ttl)?;

    Ok(Json(AuthResponse {
        success: true,
        user_id,
        name: user.name,
        role: user.role,
        token,
    }))
}

pub fn create_token(
    secret: &str,
    user_id: i64,
    role: Role,
    ttl: chrono::Duration,
) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        role,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
