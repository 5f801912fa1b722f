use crate::model::{
    Id,
    user::{Role, UserMarker},
};
use argon2::{
    Argon2,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;
use time::{Duration, UtcDateTime};

/// Access tokens expire a fixed day after issuance.
pub const TOKEN_TTL: Duration = Duration::days(1);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing the password failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

#[derive(Debug, Error)]
#[error("Signing the access token failed: {0}")]
pub struct TokenIssueError(#[from] jsonwebtoken::errors::Error);

#[derive(Debug, Error)]
#[error("The access token failed verification: {0}")]
pub struct TokenVerifyError(#[from] jsonwebtoken::errors::Error);

/// The identity a verified token vouches for.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct TokenIdentity {
    pub user_id: Id<UserMarker>,
    pub role: Role,
}

#[derive(Clone, Eq, PartialEq, Serialize, Deserialize)]
struct Claims {
    sub: u64,
    role: Role,
    iat: i64,
    exp: i64,
}

/// Signing and verification keys derived from one shared secret.
///
/// Verification is a pure function of the token string; there is no
/// session store, every request re-verifies.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    #[must_use]
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    pub fn issue(&self, identity: TokenIdentity) -> Result<String, TokenIssueError> {
        self.issue_at(identity, UtcDateTime::now())
    }

    pub fn issue_at(
        &self,
        identity: TokenIdentity,
        issued_at: UtcDateTime,
    ) -> Result<String, TokenIssueError> {
        let claims = Claims {
            sub: identity.user_id.into(),
            role: identity.role,
            iat: issued_at.unix_timestamp(),
            exp: (issued_at + TOKEN_TTL).unix_timestamp(),
        };

        Ok(jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &self.encoding,
        )?)
    }

    pub fn verify(&self, token: &str) -> Result<TokenIdentity, TokenVerifyError> {
        let data: TokenData<Claims> =
            jsonwebtoken::decode(token, &self.decoding, &Validation::default())?;

        Ok(TokenIdentity {
            user_id: data.claims.sub.into(),
            role: data.claims.role,
        })
    }
}

impl Debug for TokenKeys {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("encoding", &"[redacted]")
            .field("decoding", &"[redacted]")
            .finish()
    }
}

/// Hashes a password into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>()).map_err(PasswordHashError)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(PasswordHashError)?;

    Ok(hash.to_string())
}

/// An unparseable stored hash counts as a mismatch, the caller cannot
/// distinguish the two.
#[must_use]
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use crate::model::{
        auth::{TOKEN_TTL, TokenIdentity, TokenKeys, hash_password, verify_password},
        user::Role,
    };
    use time::UtcDateTime;

    #[test]
    fn token_round_trip() {
        let keys = TokenKeys::from_secret(b"test-secret");
        let identity = TokenIdentity {
            user_id: 42.into(),
            role: Role::Admin,
        };

        let token = keys.issue(identity).unwrap();
        assert_eq!(keys.verify(&token).unwrap(), identity);
    }

    #[test]
    fn expired_token_rejected() {
        let keys = TokenKeys::from_secret(b"test-secret");
        let identity = TokenIdentity {
            user_id: 7.into(),
            role: Role::User,
        };

        let stale = keys
            .issue_at(identity, UtcDateTime::now() - TOKEN_TTL * 2)
            .unwrap();
        assert!(keys.verify(&stale).is_err());
    }

    #[test]
    fn foreign_token_rejected() {
        let keys = TokenKeys::from_secret(b"test-secret");
        let other_keys = TokenKeys::from_secret(b"other-secret");
        let identity = TokenIdentity {
            user_id: 7.into(),
            role: Role::User,
        };

        let token = other_keys.issue(identity).unwrap();
        assert!(keys.verify(&token).is_err());
        assert!(keys.verify("not-even-a-token").is_err());
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").unwrap();

        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "garbage-stored-hash"));
    }
}
