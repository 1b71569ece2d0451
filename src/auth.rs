use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::server::AppState;

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub admin: bool,
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.admin {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }
}

/// Caller identity on routes where signing in is optional.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<AuthUser>);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn require_user(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers()).ok_or(AppError::Unauthorized)?;
    let user = state.identity.verify_token(token).await?;

    tracing::debug!(uid = %user.uid, admin = user.admin, "Authenticated request");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Attach the caller when a valid token is present; anonymous otherwise.
pub async fn identify_caller(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let user = match bearer_token(request.headers()) {
        Some(token) => match state.identity.verify_token(token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!("Ignoring unusable caller token: {e}");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(Caller(user));
    next.run(request).await
}
