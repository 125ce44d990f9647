//! JWT token handling.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::user::User;

/// Which half of a session a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    /// Unique token ID, so two tokens minted in the same second still differ.
    pub jti: Uuid,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Issued at time (Unix timestamp).
    pub iat: i64,
}

impl Claims {
    /// Create new claims for a user.
    pub fn new(user: &User, kind: TokenKind, ttl: Duration) -> Self {
        let now = Utc::now();
        let exp = now + ttl;

        Self {
            sub: user.id,
            email: user.email.clone(),
            kind,
            jti: Uuid::new_v4(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// What a verified token says about its bearer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedToken {
    pub user_id: Uuid,
    pub kind: TokenKind,
}

/// Creates and parses signed, expiring tokens bound to a user.
pub trait TokenHelper: Send + Sync {
    /// Mint a token for `user` that expires after `ttl`.
    fn create_token(&self, user: &User, kind: TokenKind, ttl: Duration) -> AppResult<String>;

    /// Verify a token and return the user ID and kind it was issued with.
    ///
    /// Fails with [`AppError::InvalidToken`] on any signature, structure or
    /// expiry problem.
    fn parse_token(&self, token: &str) -> AppResult<ParsedToken>;
}

/// HMAC-SHA256 signed JWTs.
pub struct JwtTokenHelper {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenHelper {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Encode a JWT token.
    pub fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode JWT");
            AppError::Internal("Failed to generate token".to_string())
        })
    }

    /// Decode and validate a JWT token.
    pub fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Failed to decode JWT");
                AppError::InvalidToken
            })
    }
}

impl TokenHelper for JwtTokenHelper {
    fn create_token(&self, user: &User, kind: TokenKind, ttl: Duration) -> AppResult<String> {
        self.encode_claims(&Claims::new(user, kind, ttl))
    }

    fn parse_token(&self, token: &str) -> AppResult<ParsedToken> {
        self.decode_claims(token).map(|claims| ParsedToken {
            user_id: claims.sub,
            kind: claims.kind,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-purposes-only";

    fn user() -> User {
        User::new("ada@example.com".to_string(), "Ada".to_string())
    }

    #[test]
    fn test_claims_creation() {
        let user = user();
        let claims = Claims::new(&user, TokenKind::Access, Duration::minutes(30));

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "ada@example.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_token_roundtrip() {
        let helper = JwtTokenHelper::new(SECRET);
        let user = user();

        let token = helper
            .create_token(&user, TokenKind::Refresh, Duration::days(30))
            .unwrap();
        let claims = helper.decode_claims(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.kind, TokenKind::Refresh);
        assert_eq!(
            helper.parse_token(&token).unwrap(),
            ParsedToken {
                user_id: user.id,
                kind: TokenKind::Refresh,
            }
        );
    }

    #[test]
    fn test_tokens_for_same_user_differ() {
        let helper = JwtTokenHelper::new(SECRET);
        let user = user();
        let ttl = Duration::minutes(30);

        let first = helper.create_token(&user, TokenKind::Access, ttl).unwrap();
        let second = helper.create_token(&user, TokenKind::Access, ttl).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_malformed_token() {
        let helper = JwtTokenHelper::new(SECRET);

        assert!(matches!(
            helper.parse_token("definitely.not.a-jwt"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = JwtTokenHelper::new("some-other-secret")
            .create_token(&user(), TokenKind::Access, Duration::minutes(30))
            .unwrap();

        assert!(matches!(
            JwtTokenHelper::new(SECRET).parse_token(&token),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token() {
        let helper = JwtTokenHelper::new(SECRET);
        // Past the default validation leeway
        let token = helper
            .create_token(&user(), TokenKind::Access, Duration::minutes(-5))
            .unwrap();

        assert!(matches!(helper.parse_token(&token), Err(AppError::InvalidToken)));
    }
}
