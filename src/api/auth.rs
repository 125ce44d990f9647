//! Authentication API endpoints.

use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{AuthService, AuthenticatedUser, Session};
use crate::error::{AppError, AppResult};
use crate::user::PublicUser;

/// Request body for account registration.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "Email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 1, max = 64, message = "Name must be 1-64 characters"))]
    pub name: String,
    /// Password (8-128 characters).
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for session refresh.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Response for successful authentication.
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: PublicUser,
    pub session: Session,
}

/// Register a new account.
///
/// POST /auth/signup
#[post("/signup")]
pub async fn signup(
    service: web::Data<AuthService>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (user, session) = service.signup(body.email.trim(), body.name.trim(), &body.password)?;

    Ok(HttpResponse::Created().json(AuthResponse {
        user: user.to_public(),
        session,
    }))
}

/// Login with email and password.
///
/// POST /auth/login
#[post("/login")]
pub async fn login(
    service: web::Data<AuthService>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let (user, session) = service.login(body.email.trim(), &body.password)?;

    Ok(HttpResponse::Ok().json(AuthResponse {
        user: user.to_public(),
        session,
    }))
}

/// Exchange the current refresh token for a new session.
///
/// POST /auth/refresh
#[post("/refresh")]
pub async fn refresh(
    service: web::Data<AuthService>,
    body: web::Json<RefreshRequest>,
) -> AppResult<HttpResponse> {
    let session = service.refresh_session(&body.refresh_token)?;
    Ok(HttpResponse::Ok().json(session))
}

/// Get current user information.
///
/// GET /auth/me
///
/// Requires authentication.
#[get("/me")]
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(user.0.to_public())
}

/// Configure auth routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Malformed bodies get the same JSON error shape as everything else
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into());

    cfg.service(
        web::scope("/auth")
            .app_data(json_config)
            .service(signup)
            .service(login)
            .service(refresh)
            .service(me),
    );
}
