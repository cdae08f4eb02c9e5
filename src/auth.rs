//! Authentication module.
//!
//! Resolves bearer credentials to user ids for the reader. Tokens are
//! issued by [`AuthService::login`] and stored in the sessions table.

use crate::db::{Database, Session, User, now_timestamp};
use crate::error::{AppError, Result};
use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::{OsRng, RngCore},
    },
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

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

/// Generate a secure random token.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Strip an optional `Bearer ` scheme from a credential.
pub fn extract_token(credential: &str) -> Option<&str> {
    let credential = credential.trim_start();
    let token = credential
        .strip_prefix("Bearer ")
        .or_else(|| credential.strip_prefix("bearer "))
        .unwrap_or(credential)
        .trim();

    (!token.is_empty()).then_some(token)
}

/// Turns a bearer credential into a user id.
///
/// `None` means the caller is anonymous.
pub trait Authenticator: Send + Sync {
    /// Resolve a credential to a user id.
    fn resolve(&self, credential: &str) -> Result<Option<String>>;
}

/// Authentication service.
pub struct AuthService {
    db: Database,
    session_duration_days: u32,
}

impl AuthService {
    /// Create a new auth service.
    pub fn new(db: Database, session_duration_days: u32) -> Self {
        Self {
            db,
            session_duration_days,
        }
    }

    /// Register a reader account.
    pub fn create_user(&self, username: &str, password: &str) -> Result<User> {
        validate_username(username)?;
        validate_password(password)?;

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            created_at: now_timestamp(),
            last_login: None,
        };

        self.db.create_user(&user)?;
        tracing::info!(user_id = %user.id, username = %user.username, "Created user");
        Ok(user)
    }

    /// Check a password and open a session; returns the user and its token.
    pub fn login(
        &self,
        username: &str,
        password: &str,
        device_id: Option<String>,
    ) -> Result<(User, String)> {
        let Some(user) = self.db.get_user_by_username(username)? else {
            return Err(invalid_credentials());
        };
        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(username, "Rejected login");
            return Err(invalid_credentials());
        }

        let lifetime = chrono::Duration::days(i64::from(self.session_duration_days));
        let session = Session {
            token: generate_token(),
            user_id: user.id.clone(),
            device_id,
            expires_at: (chrono::Utc::now() + lifetime).timestamp(),
        };

        self.db.create_session(&session)?;
        self.db.update_user_last_login(&user.id)?;
        tracing::debug!(user_id = %user.id, expires_at = session.expires_at, "Session created");

        Ok((user, session.token))
    }

    /// Look up the user behind a token. Expired sessions are removed.
    pub fn validate_token(&self, token: &str) -> Result<Option<User>> {
        let Some(session) = self.db.get_session(token)? else {
            return Ok(None);
        };

        if session.expires_at < now_timestamp() {
            tracing::debug!(user_id = %session.user_id, "Session expired");
            self.db.delete_session(token)?;
            return Ok(None);
        }

        self.db.get_user_by_id(&session.user_id)
    }

    /// Logout (delete session).
    pub fn logout(&self, token: &str) -> Result<()> {
        self.db.delete_session(token)
    }

    /// Change user password.
    pub fn change_password(&self, username: &str, new_password: &str) -> Result<bool> {
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;
        self.db.update_user_password(username, &password_hash)
    }

    /// Delete a user.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        self.db.delete_user(username)
    }

    /// List all users.
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }
}

impl Authenticator for AuthService {
    fn resolve(&self, credential: &str) -> Result<Option<String>> {
        let Some(token) = extract_token(credential) else {
            return Ok(None);
        };

        Ok(self.validate_token(token)?.map(|user| user.id))
    }
}

fn invalid_credentials() -> AppError {
    AppError::InvalidFormat("Invalid username or password".to_string())
}

fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.chars().count() > 64 {
        return Err(AppError::InvalidFormat(
            "Username must be 1-64 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::InvalidFormat(
            "Username can only contain letters, numbers, _ and -".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<()> {
    if password.len() < 4 {
        return Err(AppError::InvalidFormat(
            "Password must be at least 4 characters".to_string(),
        ));
    }
    Ok(())
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
    fn test_generate_token() {
        let token1 = generate_token();
        let token2 = generate_token();

        assert_eq!(token1.len(), 43); // Base64 of 32 bytes
        assert_ne!(token1, token2);
    }

    #[test]
    fn test_extract_token() {
        assert_eq!(extract_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_token("  abc  "), Some("abc"));
        assert_eq!(extract_token("Bearer "), None);
        assert_eq!(extract_token(""), None);
    }
}
