//! Authentication: credentials, tokens and sessions.

pub mod middleware;
pub mod model;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

pub use middleware::AuthenticatedUser;
pub use model::Session;
pub use password::Argon2PasswordEncoder;
pub use repository::JsonAuthUserRepository;
pub use service::{AuthService, TokenLifetimes};
pub use token::JwtTokenHelper;
