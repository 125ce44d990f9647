//! Chew Auth - account, credential and session service.
//!
//! Issues short-lived access tokens and rotating refresh tokens over a
//! small JSON REST API, with Argon2 password hashing and JSON-file storage.

mod api;
mod auth;
mod config;
mod error;
mod storage;
mod user;

use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use std::sync::Arc;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{
    Argon2PasswordEncoder, AuthService, JsonAuthUserRepository, JwtTokenHelper, TokenLifetimes,
};
use crate::config::LogFormat;
use crate::user::{JsonUserRepository, SharedUserRepository};

/// Initialize the tracing/logging subsystem.
fn init_tracing(config: &config::Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match config.log_format {
        LogFormat::Json => {
            subscriber
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Configure CORS based on application config.
fn configure_cors(config: &config::Config) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![
            header::AUTHORIZATION,
            header::ACCEPT,
            header::CONTENT_TYPE,
        ])
        .max_age(3600);

    if config.cors_origins.len() == 1 && config.cors_origins[0] == "*" {
        cors = cors.allow_any_origin();
    } else {
        for origin in &config.cors_origins {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}

fn io_error(context: &str, e: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %e, "{}", context);
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, e))
}

/// Graceful shutdown handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize configuration
    let config = config::init().map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    // Initialize logging
    init_tracing(config);

    // Validate configuration
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Configuration validation failed");
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()));
    }

    // Initialize repositories
    let user_repo: SharedUserRepository = Arc::new(
        JsonUserRepository::new(&config.users_file)
            .map_err(|e| io_error("Failed to initialize user repository", e))?,
    );
    let auth_user_repo = Arc::new(
        JsonAuthUserRepository::new(&config.auth_users_file, user_repo.clone())
            .map_err(|e| io_error("Failed to initialize credential repository", e))?,
    );

    let auth_service = web::Data::new(AuthService::new(
        auth_user_repo,
        Arc::new(JwtTokenHelper::new(&config.jwt_secret)),
        Arc::new(Argon2PasswordEncoder::default()),
        TokenLifetimes {
            access: config.access_token_ttl(),
            refresh: config.refresh_token_ttl(),
        },
    ));
    let user_repo = web::Data::new(user_repo);

    let bind_address = config.bind_address();

    tracing::info!(
        address = %bind_address,
        users_file = %config.users_file.display(),
        auth_users_file = %config.auth_users_file.display(),
        "Starting Chew Auth server"
    );

    // Create and start server
    let server = HttpServer::new(move || {
        App::new()
            // Middleware
            .wrap(TracingLogger::default())
            .wrap(configure_cors(config))
            // Shared state
            .app_data(auth_service.clone())
            .app_data(user_repo.clone())
            // Health endpoints (no auth required)
            .configure(api::health::configure)
            // Auth endpoints
            .configure(api::auth::configure)
    })
    .bind(&bind_address)?
    .shutdown_timeout(30)
    .run();

    // Run server with graceful shutdown
    tokio::select! {
        result = server => {
            result
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown complete");
            Ok(())
        }
    }
}
