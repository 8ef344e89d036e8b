use std::fmt;
use std::str::FromStr;

use auth::TokenSubject;
use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::user::errors::EmailError;
use crate::user::errors::UserIdError;
use crate::user::errors::UsernameError;

/// Permission identifiers known to the system.
///
/// Permissions are opaque strings granted through role membership; downstream
/// services may introduce further identifiers without changes here.
pub mod permissions {
    pub const CREATE_LINK: &str = "CREATE_LINK";
    pub const READ_OWN_LINKS: &str = "READ_OWN_LINKS";
    pub const READ_ALL_LINKS: &str = "READ_ALL_LINKS";
    pub const UPDATE_OWN_LINKS: &str = "UPDATE_OWN_LINKS";
    pub const UPDATE_ALL_LINKS: &str = "UPDATE_ALL_LINKS";
    pub const DELETE_OWN_LINKS: &str = "DELETE_OWN_LINKS";
    pub const DELETE_ALL_LINKS: &str = "DELETE_ALL_LINKS";
    pub const MANAGE_USERS: &str = "MANAGE_USERS";
    pub const VIEW_USERS: &str = "VIEW_USERS";
    pub const MANAGE_ROLES: &str = "MANAGE_ROLES";
    pub const ADMIN_ACCESS: &str = "ADMIN_ACCESS";
}

/// User aggregate entity.
///
/// The id is immutable after creation. Password hash and salt are stored
/// separately and never leave the domain through sanitized views.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role_ids: Vec<String>,
}

impl User {
    /// Identity snapshot carried into signed tokens.
    pub fn token_subject(&self) -> TokenSubject {
        let mut subject = TokenSubject::new(self.id.to_string(), self.username.as_str())
            .with_email(self.email.as_str());
        if let (Some(first), Some(last)) = (&self.first_name, &self.last_name) {
            subject = subject.with_name(first, last);
        }
        subject
    }
}

/// User unique identifier type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Generate a new random user ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a user ID from string.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a valid UUID
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        Uuid::parse_str(s)
            .map(UserId)
            .map_err(|e| UserIdError::InvalidFormat(e.to_string()))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// Normalized to lowercase so existence checks are case-insensitive.
/// Must be 3-30 characters of letters, numbers, and underscores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 3;
    const MAX_LENGTH: usize = 30;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Username shorter than 3 characters
    /// * `TooLong` - Username longer than 30 characters
    /// * `InvalidCharacters` - Contains characters outside [a-zA-Z0-9_]
    pub fn new(username: impl Into<String>) -> Result<Self, UsernameError> {
        let username = username.into().trim().to_lowercase();

        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            return Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            });
        }
        if length > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }
        if !username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(UsernameError::InvalidCharacters);
        }

        Ok(Self(username))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// Validated with an RFC 5322 compliant parser and normalized to lowercase
/// so existence checks are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: impl Into<String>) -> Result<Self, EmailError> {
        let email = email.into().trim().to_lowercase();
        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Role: a named, ordered set of permission strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl Role {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_normalized_to_lowercase() {
        let username = Username::new("Alice_99").unwrap();
        assert_eq!(username.as_str(), "alice_99");
    }

    #[test]
    fn test_username_length_bounds() {
        assert!(matches!(
            Username::new("ab"),
            Err(UsernameError::TooShort { .. })
        ));
        assert!(matches!(
            Username::new("a".repeat(31)),
            Err(UsernameError::TooLong { .. })
        ));
    }

    #[test]
    fn test_username_rejects_symbols() {
        assert_eq!(Username::new("al ice"), Err(UsernameError::InvalidCharacters));
        assert_eq!(Username::new("al-ice"), Err(UsernameError::InvalidCharacters));
    }

    #[test]
    fn test_email_normalized_to_lowercase() {
        let email = EmailAddress::new("Alice@Example.COM").unwrap();
        assert_eq!(email.as_str(), "alice@example.com");
    }

    #[test]
    fn test_email_rejects_garbage() {
        assert!(EmailAddress::new("not-an-email").is_err());
    }

    #[test]
    fn test_role_permission_lookup() {
        let role = Role {
            id: "role-user".to_string(),
            name: "USER".to_string(),
            permissions: vec![permissions::CREATE_LINK.to_string()],
        };

        assert!(role.has_permission(permissions::CREATE_LINK));
        assert!(!role.has_permission(permissions::ADMIN_ACCESS));
    }

    #[test]
    fn test_token_subject_snapshot() {
        let user = User {
            id: UserId::new(),
            username: Username::new("alice").unwrap(),
            email: EmailAddress::new("alice@example.com").unwrap(),
            password_hash: "$argon2id$hash".to_string(),
            password_salt: "salt".to_string(),
            created_at: Utc::now(),
            last_login_at: None,
            active: true,
            first_name: Some("Alice".to_string()),
            last_name: Some("Smith".to_string()),
            role_ids: vec![],
        };

        let subject = user.token_subject();
        assert_eq!(subject.user_id, user.id.to_string());
        assert_eq!(subject.username, "alice");
        assert_eq!(subject.first_name.as_deref(), Some("Alice"));
    }
}
