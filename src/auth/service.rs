//! Account, credential and session orchestration.

use chrono::Duration;
use std::sync::Arc;

use super::model::{AuthUser, Session};
use super::password::PasswordEncoder;
use super::repository::SharedAuthUserRepository;
use super::token::{TokenHelper, TokenKind};
use crate::error::{AppError, AppResult};
use crate::user::User;

/// How long each half of a session stays valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(30),
            refresh: Duration::days(30),
        }
    }
}

/// Credential and session lifecycle.
///
/// Every failure from the store, the encoder or the token helper is returned
/// as-is. Each account holds a single refresh token; issuing a session
/// replaces it, last write wins.
pub struct AuthService {
    auth_users: SharedAuthUserRepository,
    tokens: Arc<dyn TokenHelper>,
    encoder: Arc<dyn PasswordEncoder>,
    lifetimes: TokenLifetimes,
}

impl AuthService {
    pub fn new(
        auth_users: SharedAuthUserRepository,
        tokens: Arc<dyn TokenHelper>,
        encoder: Arc<dyn PasswordEncoder>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            auth_users,
            tokens,
            encoder,
            lifetimes,
        }
    }

    /// Persist a new credential record (and its user).
    pub fn create_account(&self, auth_user: AuthUser) -> AppResult<AuthUser> {
        self.auth_users.save(auth_user)
    }

    /// Look up a credential record by its user's email.
    pub fn get_user_with_email(&self, email: &str) -> AppResult<Option<AuthUser>> {
        self.auth_users.find_by_user_email(email)
    }

    /// Resolve the user a token was issued for.
    ///
    /// Absent or blank tokens give `Ok(None)` without touching the token
    /// helper. A token that fails to parse is [`AppError::InvalidToken`]; a
    /// valid token for an account that no longer exists is `Ok(None)`.
    pub fn get_user_from_token(&self, token: Option<&str>) -> AppResult<Option<User>> {
        self.resolve_token(token, None)
    }

    /// Like [`get_user_from_token`](Self::get_user_from_token), but only
    /// access tokens are accepted; a refresh token is [`AppError::InvalidToken`].
    pub fn get_user_from_access_token(&self, token: Option<&str>) -> AppResult<Option<User>> {
        self.resolve_token(token, Some(TokenKind::Access))
    }

    fn resolve_token(
        &self,
        token: Option<&str>,
        required: Option<TokenKind>,
    ) -> AppResult<Option<User>> {
        let token = match token {
            Some(token) if !token.trim().is_empty() => token,
            _ => return Ok(None),
        };

        let parsed = self.tokens.parse_token(token)?;
        if required.is_some_and(|kind| kind != parsed.kind) {
            return Err(AppError::InvalidToken);
        }

        Ok(self
            .auth_users
            .find_by_id(parsed.user_id)?
            .map(|auth_user| auth_user.user))
    }

    /// Issue a new access/refresh pair and store the refresh half.
    pub fn create_session(&self, auth_user: &AuthUser) -> AppResult<Session> {
        let session = Session {
            access_token: self.tokens.create_token(
                &auth_user.user,
                TokenKind::Access,
                self.lifetimes.access,
            )?,
            refresh_token: self.tokens.create_token(
                &auth_user.user,
                TokenKind::Refresh,
                self.lifetimes.refresh,
            )?,
        };

        self.auth_users
            .save(auth_user.with_refresh_token(session.refresh_token.clone()))?;

        tracing::debug!(user_id = %auth_user.id, "Issued session");
        Ok(session)
    }

    /// Rotate a session given its current refresh token.
    ///
    /// Only the most recently issued refresh token is accepted.
    pub fn refresh_session(&self, refresh_token: &str) -> AppResult<Session> {
        if refresh_token.trim().is_empty() {
            return Err(AppError::InvalidToken);
        }

        let parsed = self.tokens.parse_token(refresh_token)?;
        if parsed.kind != TokenKind::Refresh {
            return Err(AppError::InvalidToken);
        }

        let auth_user = self
            .auth_users
            .find_by_id(parsed.user_id)?
            .ok_or(AppError::InvalidToken)?;

        if auth_user.refresh_token.as_deref() != Some(refresh_token) {
            tracing::warn!(user_id = %parsed.user_id, "Rejected stale refresh token");
            return Err(AppError::InvalidToken);
        }

        self.create_session(&auth_user)
    }

    pub fn encrypt_password(&self, password: &str) -> AppResult<String> {
        self.encoder.encode(password)
    }

    /// Check a login password against the stored hash.
    pub fn validate_for_login(&self, auth_user: &AuthUser, password: &str) -> AppResult<()> {
        if !self.encoder.matches(password, &auth_user.password)? {
            return Err(AppError::InvalidCredentials);
        }
        Ok(())
    }

    /// Register a new account and open its first session.
    pub fn signup(&self, email: &str, name: &str, password: &str) -> AppResult<(User, Session)> {
        if self.get_user_with_email(email)?.is_some() {
            return Err(AppError::email_taken(email));
        }

        let password_hash = self.encrypt_password(password)?;
        let user = User::new(email.to_string(), name.to_string());
        let auth_user = self.create_account(AuthUser::new(user, password_hash))?;
        let session = self.create_session(&auth_user)?;

        tracing::info!(user_id = %auth_user.id, email = %auth_user.user.email, "New account registered");
        Ok((auth_user.user, session))
    }

    /// Authenticate with email and password and open a session.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> AppResult<(User, Session)> {
        let auth_user = self
            .get_user_with_email(email)?
            .ok_or(AppError::InvalidCredentials)?;

        self.validate_for_login(&auth_user, password)?;
        let session = self.create_session(&auth_user)?;

        tracing::info!(user_id = %auth_user.id, "User logged in");
        Ok((auth_user.user, session))
    }
}
