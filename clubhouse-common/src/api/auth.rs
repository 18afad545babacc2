//! Bearer tokens and password hashing
//!
//! # Tokens
//!
//! HS256 JWTs carrying the account id (`sub`), email, role and a `purpose`.
//! The purpose keeps the three token kinds apart: a session token cannot
//! confirm a password reset and a reset link cannot authenticate API calls.
//!
//! | Purpose          | Default lifetime |
//! |------------------|------------------|
//! | `session`        | 24 hours         |
//! | `verify_email`   | 24 hours         |
//! | `password_reset` | 15 minutes       |
//!
//! # Passwords
//!
//! Argon2id with default parameters, stored as PHC strings.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::db::Role;
use crate::{Error, Result};

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    Session,
    VerifyEmail,
    PasswordReset,
}

impl TokenPurpose {
    /// Lifetime used by [`TokenSigner::issue`]
    pub fn default_ttl(&self) -> Duration {
        match self {
            TokenPurpose::Session | TokenPurpose::VerifyEmail => Duration::hours(24),
            TokenPurpose::PasswordReset => Duration::minutes(15),
        }
    }
}

/// Payload stored in every token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub purpose: TokenPurpose,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expiration time (Unix seconds)
    pub exp: i64,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token generator and validator sharing one signing secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    session_ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            session_ttl: TokenPurpose::Session.default_ttl(),
        }
    }

    /// Override the session lifetime (from `auth.session_ttl_hours`)
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Issue a token with the purpose's default lifetime
    pub fn issue(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
        purpose: TokenPurpose,
    ) -> Result<String> {
        let ttl = match purpose {
            TokenPurpose::Session => self.session_ttl,
            other => other.default_ttl(),
        };
        self.issue_with_ttl(user_id, email, role, purpose, ttl)
    }

    pub fn issue_with_ttl(
        &self,
        user_id: &str,
        email: &str,
        role: Role,
        purpose: TokenPurpose,
        ttl: Duration,
    ) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            purpose,
            iat: now,
            exp: now + ttl.num_seconds(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Verify signature and expiry, and require `expected` purpose
    pub fn verify(&self, token: &str, expected: TokenPurpose) -> Result<Claims> {
        let claims = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "Token expired",
                    ErrorKind::InvalidSignature => "Invalid signature",
                    _ => "Invalid token",
                };
                Error::Unauthorized(reason.to_string())
            })?;

        if claims.purpose != expected {
            return Err(Error::Unauthorized("Token not valid for this use".to_string()));
        }

        Ok(claims)
    }
}

/// Reject callers without the admin role
pub fn require_admin(claims: &Claims) -> Result<()> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden("Admin role required".to_string()))
    }
}

/// Allow the account owner or any admin
pub fn require_owner_or_admin(claims: &Claims, user_id: &str) -> Result<()> {
    if claims.sub == user_id || claims.is_admin() {
        Ok(())
    } else {
        Err(Error::Forbidden("Not allowed to modify another user".to_string()))
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Hash a password using Argon2id
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored PHC hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| Error::Internal(format!("Invalid password hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_session_token_round_trip() {
        let signer = TokenSigner::new(SECRET);
        let token = signer
            .issue("u-1", "ada@example.com", Role::Admin, TokenPurpose::Session)
            .unwrap();

        let claims = signer.verify(&token, TokenPurpose::Session).unwrap();
        assert_eq!(claims.sub, "u-1");
        assert_eq!(claims.email, "ada@example.com");
        assert!(claims.is_admin());
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_purpose_mismatch_rejected() {
        let signer = TokenSigner::new(SECRET);
        let reset = signer
            .issue("u-1", "ada@example.com", Role::User, TokenPurpose::PasswordReset)
            .unwrap();

        let err = signer.verify(&reset, TokenPurpose::Session).unwrap_err();
        assert!(matches!(err, Error::Unauthorized(_)));
    }

    #[test]
    fn test_reset_token_lifetime() {
        let signer = TokenSigner::new(SECRET);
        let token = signer
            .issue("u-1", "a@b.c", Role::User, TokenPurpose::PasswordReset)
            .unwrap();
        let claims = signer.verify(&token, TokenPurpose::PasswordReset).unwrap();
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::new(SECRET);
        // Well past the validator's default leeway
        let token = signer
            .issue_with_ttl("u-1", "a@b.c", Role::User, TokenPurpose::Session, Duration::hours(-2))
            .unwrap();

        match signer.verify(&token, TokenPurpose::Session) {
            Err(Error::Unauthorized(msg)) => assert_eq!(msg, "Token expired"),
            other => panic!("expected expiry rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenSigner::new(SECRET)
            .issue("u-1", "a@b.c", Role::User, TokenPurpose::Session)
            .unwrap();
        let other = TokenSigner::new("ffffffffffffffffffffffffffffffff");
        assert!(other.verify(&token, TokenPurpose::Session).is_err());
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct-horse-battery-staple", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_invalid_hash_format() {
        assert!(verify_password("password", "not-a-valid-hash").is_err());
    }

    #[test]
    fn test_role_guards() {
        let signer = TokenSigner::new(SECRET);
        let member = signer
            .issue("u-1", "a@b.c", Role::User, TokenPurpose::Session)
            .unwrap();
        let member = signer.verify(&member, TokenPurpose::Session).unwrap();

        assert!(matches!(require_admin(&member), Err(Error::Forbidden(_))));
        assert!(require_owner_or_admin(&member, "u-1").is_ok());
        assert!(matches!(
            require_owner_or_admin(&member, "u-2"),
            Err(Error::Forbidden(_))
        ));

        let admin = signer
            .issue("u-9", "root@b.c", Role::Admin, TokenPurpose::Session)
            .unwrap();
        let admin = signer.verify(&admin, TokenPurpose::Session).unwrap();
        assert!(require_admin(&admin).is_ok());
        assert!(require_owner_or_admin(&admin, "u-2").is_ok());
    }
}
