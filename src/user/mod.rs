//! User identity records.

pub mod repository;

pub use repository::{JsonUserRepository, PublicUser, SharedUserRepository, User};
