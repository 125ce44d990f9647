//! Authentication extractor.

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use std::future::{ready, Ready};

use super::service::AuthService;
use crate::error::AppError;
use crate::user::User;

/// Authenticated user extractor.
///
/// Use this as a parameter in route handlers to require a valid access token.
///
/// # Example
/// ```ignore
/// async fn protected_route(user: AuthenticatedUser) -> impl Responder {
///     format!("Hello, {}!", user.0.name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl FromRequest for AuthenticatedUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

/// Pull the bearer token out of the Authorization header.
fn bearer_token(req: &HttpRequest) -> Result<&str, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(
                "Invalid Authorization header format. Expected: Bearer <token>".to_string(),
            )
        })
}

/// Extract the authenticated user from request headers.
fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, AppError> {
    let token = bearer_token(req)?;

    let service = req.app_data::<web::Data<AuthService>>().ok_or_else(|| {
        tracing::error!("AuthService missing from app data");
        AppError::Internal("Authentication is not configured".to_string())
    })?;

    service
        .get_user_from_access_token(Some(token))?
        .map(AuthenticatedUser)
        .ok_or_else(|| AppError::Unauthorized("Account no longer exists".to_string()))
}
