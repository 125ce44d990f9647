//! Credential and session types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::User;

/// Credential record paired one-to-one with a [`User`].
///
/// `id` is always the id of the embedded user; use [`AuthUser::new`] to
/// build one so the two cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    /// Password hash, never the plaintext.
    pub password: String,
    /// Refresh token of the current session, if one has been issued.
    pub refresh_token: Option<String>,
    pub user: User,
}

impl AuthUser {
    pub fn new(user: User, password_hash: String) -> Self {
        Self {
            id: user.id,
            password: password_hash,
            refresh_token: None,
            user,
        }
    }

    /// Copy of this record carrying a new refresh token.
    pub fn with_refresh_token(&self, refresh_token: String) -> Self {
        Self {
            refresh_token: Some(refresh_token),
            ..self.clone()
        }
    }
}

/// Access/refresh token pair handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
}
