use axum::{
    RequestExt,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use tracing::debug;

use linkup_types::api::Claims;
use linkup_types::models::Role;

use crate::error::ApiError;
use crate::state::{AppState, blocking};

/// The verified identity of the user making a request.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub id: i64,
    pub role: Role,
}

/// Validate the bearer JWT and confirm the subject still exists in the
/// user directory before handing the request on.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let TypedHeader(Authorization(bearer)) = req
        .extract_parts::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| ApiError::Unauthorized)?;

    let claims = decode_token(bearer.token(), &state.jwt_secret).ok_or(ApiError::Unauthorized)?;
    let user_id = claims.sub;

    let role = blocking(&state, move |db| db.get_user_role(user_id))
        .await?
        .ok_or_else(|| {
            debug!(user_id, "Token subject no longer exists");
            ApiError::Unauthorized
        })?;

    req.extensions_mut().insert(Caller { id: user_id, role });
    Ok(next.run(req).await)
}

pub fn decode_token(token: &str, secret: &str) -> Option<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .ok()
    .map(|data| data.claims)
    .filter(|claims| claims.sub > 0)
}
