#![cfg(feature = "web")]

use crate::config::AuthConfig;
use crate::error::DashboardError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::collections::HashMap;
use std::sync::Arc;

/// Static allow-list of users allowed to open the dashboard
///
/// Passwords are kept only as Argon2 hashes; plaintext passwords from the
/// configuration are hashed when the list is built.
#[derive(Debug, Clone)]
pub struct AllowList {
    realm: String,
    users: HashMap<String, String>,
}

impl AllowList {
    /// Build the allow-list from the `[auth]` configuration section
    ///
    /// # Arguments
    /// * `config` - Realm and user entries
    ///
    /// # Returns
    /// * `Result<AllowList, DashboardError>` - The allow-list, or a config error
    ///   if a stored hash cannot be parsed
    pub fn from_config(config: &AuthConfig) -> Result<Self, DashboardError> {
        let mut users = HashMap::new();
        for entry in &config.users {
            let hash = match (&entry.password, &entry.password_hash) {
                (_, Some(hash)) => {
                    PasswordHash::new(hash).map_err(|_| {
                        DashboardError::Config(format!(
                            "invalid password_hash for user '{}'",
                            entry.username
                        ))
                    })?;
                    hash.clone()
                }
                (Some(password), None) => hash_password(password)?,
                (None, None) => {
                    return Err(DashboardError::Config(format!(
                        "user '{}' has no password",
                        entry.username
                    )));
                }
            };
            users.insert(entry.username.clone(), hash);
        }
        Ok(AllowList {
            realm: config.realm.clone(),
            users,
        })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Check a username/password pair against the list.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        match self.users.get(username) {
            Some(hash) => verify_password(password, hash),
            None => false,
        }
    }

    /// Check the value of an `Authorization` header.
    pub fn verify_header(&self, value: &str) -> bool {
        match parse_basic_auth(value) {
            Some((username, password)) => self.verify(&username, &password),
            None => false,
        }
    }
}

/// Hash a password using Argon2
///
/// # Arguments
/// * `password` - The plaintext password to hash
///
/// # Returns
/// * `Result<String, DashboardError>` - The PHC-formatted hash or an error
pub fn hash_password(password: &str) -> Result<String, DashboardError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    match argon2.hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => Err(DashboardError::Config("Password hashing failed".to_string())),
    }
}

/// Verify a password against a stored Argon2 hash. An unparseable hash
/// never verifies.
fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Decode `Basic <base64(username:password)>` into its two parts.
pub fn parse_basic_auth(value: &str) -> Option<(String, String)> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (username, password) = text.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}

/// Authentication middleware
///
/// Lets the request through when its `Authorization` header matches the
/// allow-list, otherwise answers `401` with a Basic challenge so the
/// browser prompts for credentials.
pub async fn require_auth(
    State(allow_list): State<Arc<AllowList>>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| allow_list.verify_header(v))
        .unwrap_or(false);

    if authorized {
        return next.run(request).await;
    }

    log::warn!("Rejected unauthenticated request to {}", request.uri().path());
    unauthorized(allow_list.realm())
}

fn unauthorized(realm: &str) -> Response {
    let challenge = format!("Basic realm=\"{}\", charset=\"UTF-8\"", realm.replace('"', ""));
    let mut response = (StatusCode::UNAUTHORIZED, "Authentication required").into_response();
    if let Ok(value) = HeaderValue::from_str(&challenge) {
        response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserEntry;

    fn config() -> AuthConfig {
        AuthConfig {
            realm: "Test".to_string(),
            users: vec![UserEntry {
                username: "naruto".to_string(),
                password: Some("uzumaki".to_string()),
                password_hash: None,
            }],
        }
    }

    #[test]
    fn test_parse_basic_auth() {
        let header = format!("Basic {}", STANDARD.encode("user:pa:ss"));
        assert_eq!(
            parse_basic_auth(&header),
            Some(("user".to_string(), "pa:ss".to_string()))
        );
        assert_eq!(parse_basic_auth("Bearer abc"), None);
        assert_eq!(parse_basic_auth("Basic !!!"), None);
        assert_eq!(
            parse_basic_auth(&format!("Basic {}", STANDARD.encode("nocolon"))),
            None
        );
    }

    #[test]
    fn test_allow_list_verify() {
        let list = AllowList::from_config(&config()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.realm(), "Test");
        assert!(list.verify("naruto", "uzumaki"));
        assert!(!list.verify("naruto", "sasuke"));
        assert!(!list.verify("sasuke", "uzumaki"));

        let header = format!("Basic {}", STANDARD.encode("naruto:uzumaki"));
        assert!(list.verify_header(&header));
    }

    #[test]
    fn test_prehashed_password() {
        let hash = hash_password("secret").unwrap();
        let cfg = AuthConfig {
            realm: "Test".to_string(),
            users: vec![UserEntry {
                username: "admin".to_string(),
                password: None,
                password_hash: Some(hash),
            }],
        };
        let list = AllowList::from_config(&cfg).unwrap();
        assert!(list.verify("admin", "secret"));
    }

    #[test]
    fn test_invalid_stored_hash_rejected() {
        let cfg = AuthConfig {
            realm: "Test".to_string(),
            users: vec![UserEntry {
                username: "admin".to_string(),
                password: None,
                password_hash: Some("not-a-phc-string".to_string()),
            }],
        };
        assert!(AllowList::from_config(&cfg).is_err());
    }
}
