//! Authentication module.

use crate::db::{Database, User, now_timestamp};
use crate::error::{AppError, Result};
use crate::validate::{LoginRequest, SignupRequest};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Hash a password using Argon2.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: String,
    /// Login handle, for log context.
    pub user_name: String,
    /// Issued-at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Claims for the given user, expiring `ttl_hours` from now.
    pub fn new(user_id: &str, user_name: &str, ttl_hours: i64) -> Self {
        let now = now_timestamp();
        Self {
            sub: user_id.to_string(),
            user_name: user_name.to_string(),
            iat: now,
            exp: now + ttl_hours * 60 * 60,
        }
    }
}

/// Authentication service: signup, login, bearer-token validation.
pub struct AuthService {
    db: Database,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    token_ttl_hours: i64,
}

impl AuthService {
    /// Create a new auth service signing tokens with the given secret.
    pub fn new(db: Database, jwt_secret: &str, token_ttl_hours: i64) -> Self {
        Self {
            db,
            encoding_key: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation: Validation::default(),
            token_ttl_hours,
        }
    }

    /// Register a new user.
    pub fn signup(&self, req: &SignupRequest) -> Result<User> {
        let (first_name, last_name, user_name, email, password) = req.validate()?;

        // Pre-checked so the duplicate-email message survives even when the
        // username would also collide.
        if self.db.email_taken(email)? {
            return Err(AppError::Conflict("Email already exists".to_string()));
        }

        let password_hash = hash_password(password)?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            user_name: user_name.to_string(),
            password_hash,
            is_deleted: false,
            created_at: now_timestamp(),
        };

        self.db.create_user(&user)?;
        Ok(user)
    }

    /// Verify credentials and issue a bearer token.
    ///
    /// Unknown email and wrong password produce the same failure, so the
    /// two cases are indistinguishable to a caller.
    pub fn login(&self, req: &LoginRequest) -> Result<(User, String)> {
        let (email, password) = req.validate()?;

        let user = self
            .db
            .get_user_by_email(email)?
            .ok_or_else(|| AppError::NotFound("Invalid email or password".to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::NotFound("Invalid email or password".to_string()));
        }

        let token = self.sign_token(&user)?;
        Ok((user, token))
    }

    /// Sign a token for the given user.
    pub fn sign_token(&self, user: &User) -> Result<String> {
        let claims = Claims::new(&user.id, &user.user_name, self.token_ttl_hours);
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Validate a bearer token and return its claims.
    pub fn authenticate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Forbidden("Access denied: invalid or expired token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_token_round_trip() {
        let db = Database::open_memory().unwrap();
        let auth = AuthService::new(db, "test-secret", 24);

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: "Test".to_string(),
            last_name: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            user_name: "reader".to_string(),
            password_hash: "hash".to_string(),
            is_deleted: false,
            created_at: now_timestamp(),
        };

        let token = auth.sign_token(&user).unwrap();
        let claims = auth.authenticate(&token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.user_name, "reader");
    }

    #[test]
    fn test_token_wrong_secret_rejected() {
        let db = Database::open_memory().unwrap();
        let auth = AuthService::new(db.clone(), "secret-a", 24);
        let other = AuthService::new(db, "secret-b", 24);

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            first_name: "Test".to_string(),
            last_name: "Reader".to_string(),
            email: "reader@example.com".to_string(),
            user_name: "reader".to_string(),
            password_hash: "hash".to_string(),
            is_deleted: false,
            created_at: now_timestamp(),
        };

        let token = auth.sign_token(&user).unwrap();
        assert!(matches!(
            other.authenticate(&token),
            Err(AppError::Forbidden(_))
        ));
    }
}
