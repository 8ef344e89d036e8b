use serde::Deserialize;
use serde::Serialize;

/// Distinguishes access tokens from refresh tokens via the `token_type` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Identity fields carried into a signed token.
///
/// Decoupled from any service-side user model so the library stays free of
/// domain dependencies.
#[derive(Debug, Clone)]
pub struct TokenSubject {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl TokenSubject {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            email: None,
            first_name: None,
            last_name: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = Some(first_name.into());
        self.last_name = Some(last_name.into());
        self
    }
}

/// Claims carried inside signed bearer tokens.
///
/// Access tokens carry the full identity snapshot; refresh tokens carry only
/// subject and username. The nonce guarantees two tokens issued in the same
/// instant are never byte-identical.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    pub username: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "firstName", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    #[serde(rename = "lastName", skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    pub token_type: TokenKind,

    /// Random per-token value
    pub nonce: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Check if the token carries the expected type claim.
    pub fn is_kind(&self, kind: TokenKind) -> bool {
        self.token_type == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TokenKind::Access).unwrap(),
            "\"access\""
        );
        assert_eq!(
            serde_json::to_string(&TokenKind::Refresh).unwrap(),
            "\"refresh\""
        );
    }

    #[test]
    fn test_subject_builder() {
        let subject = TokenSubject::new("user123", "alice")
            .with_email("alice@example.com")
            .with_name("Alice", "Smith");

        assert_eq!(subject.user_id, "user123");
        assert_eq!(subject.email.as_deref(), Some("alice@example.com"));
        assert_eq!(subject.first_name.as_deref(), Some("Alice"));
        assert_eq!(subject.last_name.as_deref(), Some("Smith"));
    }
}
