//! Health check endpoints.

use actix_web::{get, web, HttpResponse};
use serde::Serialize;
use std::path::Path;

use crate::config;
use crate::user::SharedUserRepository;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: &'static str,
    /// Service version.
    pub version: &'static str,
    /// Service name.
    pub service: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    /// Data directories accessible.
    pub data_files: bool,
    /// Registered users, if the user store could be read.
    pub users: Option<usize>,
}

/// Health check endpoint.
///
/// GET /health
///
/// Returns 200 if the service is running.
#[get("/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: env!("CARGO_PKG_NAME"),
    })
}

fn parent_exists(file: &Path) -> bool {
    file.parent()
        .map(|p| p.as_os_str().is_empty() || p.exists())
        .unwrap_or(true)
}

/// Readiness check endpoint.
///
/// GET /ready
///
/// Returns 200 if the service is ready to accept requests.
#[get("/ready")]
pub async fn ready(users: web::Data<SharedUserRepository>) -> HttpResponse {
    let data_files = config::get()
        .map(|c| parent_exists(&c.users_file) && parent_exists(&c.auth_users_file))
        .unwrap_or(false);
    let users = users.count().ok();

    let all_ok = data_files && users.is_some();
    let response = ReadyResponse {
        status: if all_ok { "ready" } else { "not_ready" },
        data_files,
        users,
    };

    if all_ok {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

/// Configure health routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health).service(ready);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::JsonUserRepository;
    use actix_web::{http::StatusCode, test as atest, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health() {
        let app = atest::init_service(App::new().configure(configure)).await;
        let req = atest::TestRequest::get().uri("/health").to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: serde_json::Value = atest::read_body_json(resp).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "chew-auth");
    }

    #[actix_web::test]
    async fn test_ready_reports_user_count() {
        let dir = tempfile::tempdir().unwrap();
        let users: SharedUserRepository =
            Arc::new(JsonUserRepository::new(dir.path().join("users.json")).unwrap());
        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(users))
                .configure(configure),
        )
        .await;

        let req = atest::TestRequest::get().uri("/ready").to_request();
        let resp = atest::call_service(&app, req).await;
        let body: serde_json::Value = atest::read_body_json(resp).await;

        assert_eq!(body["users"], 0);
    }

    #[test]
    fn test_parent_exists() {
        assert!(parent_exists(Path::new("users.json")));
        assert!(!parent_exists(Path::new("/definitely/not/here/users.json")));
    }
}
