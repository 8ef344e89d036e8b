use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use rand::RngCore;

use super::claims::Claims;
use super::claims::TokenKind;
use super::claims::TokenSubject;
use super::errors::JwtError;

/// Signs and verifies bearer tokens.
///
/// Uses HS256 (HMAC with SHA-256). Validation checks signature, issuer, and
/// expiration atomically; revocation state is deliberately out of scope and
/// belongs to the caller's ledger lookup.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    issuer: String,
}

impl TokenSigner {
    /// Create a new signer with a secret key and issuer identifier.
    ///
    /// # Security Notes
    /// - The secret should be at least 256 bits (32 bytes) for HS256;
    ///   see [`crate::secret::resolve_signing_secret`]
    /// - Store secrets in environment variables or secure vaults, never in code
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            issuer: issuer.into(),
        }
    }

    /// Generate a signed access token carrying the full identity snapshot.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn generate_access_token(
        &self,
        subject: &TokenSubject,
        expires_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        self.sign(Claims {
            sub: subject.user_id.clone(),
            username: subject.username.clone(),
            email: subject.email.clone(),
            first_name: subject.first_name.clone(),
            last_name: subject.last_name.clone(),
            token_type: TokenKind::Access,
            nonce: generate_nonce(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        })
    }

    /// Generate a signed refresh token carrying subject and username only.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn generate_refresh_token(
        &self,
        subject: &TokenSubject,
        expires_at: DateTime<Utc>,
    ) -> Result<String, JwtError> {
        self.sign(Claims {
            sub: subject.user_id.clone(),
            username: subject.username.clone(),
            email: None,
            first_name: None,
            last_name: None,
            token_type: TokenKind::Refresh,
            nonce: generate_nonce(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        })
    }

    /// Decode and validate a token.
    ///
    /// Signature, issuer, and expiration are checked in one pass with zero
    /// leeway. A failure in any check yields an error and no claims.
    ///
    /// # Errors
    /// * `TokenExpired` - Token expiry is in the past
    /// * `InvalidToken` - Signature or issuer check failed, or the token is
    ///   structurally malformed
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[&self.issuer]);
        validation.leeway = 0;

        let token_data =
            decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => JwtError::TokenExpired,
                    _ => JwtError::InvalidToken(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }

    /// Extract the subject without verifying the signature.
    ///
    /// # Security Warning
    /// This does NOT validate the token. Only use for diagnostics or ledger
    /// lookups, never for authorization decisions.
    pub fn extract_user_id(&self, token: &str) -> Option<String> {
        self.decode_unverified(token).map(|claims| claims.sub).ok()
    }

    /// Read the expiry timestamp without verifying the signature.
    pub fn token_expiration(&self, token: &str) -> Option<DateTime<Utc>> {
        let claims = self.decode_unverified(token).ok()?;
        Utc.timestamp_opt(claims.exp, 0).single()
    }

    fn sign(&self, claims: Claims) -> Result<String, JwtError> {
        let header = Header::new(self.algorithm);

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingFailed(e.to_string()))
    }

    fn decode_unverified(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.insecure_disable_signature_validation();
        validation.required_spec_claims.clear();
        validation.validate_exp = false;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| JwtError::InvalidToken(e.to_string()))?;

        Ok(token_data.claims)
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    const SECRET: &[u8] = b"test_secret_key_at_least_32_bytes_long!";

    fn signer() -> TokenSigner {
        TokenSigner::new(SECRET, "linkdeck")
    }

    fn subject() -> TokenSubject {
        TokenSubject::new("user123", "alice")
            .with_email("alice@example.com")
            .with_name("Alice", "Smith")
    }

    #[test]
    fn test_access_token_round_trip() {
        let signer = signer();
        let token = signer
            .generate_access_token(&subject(), Utc::now() + Duration::minutes(15))
            .expect("Failed to generate token");

        let claims = signer.validate_token(&token).expect("Failed to validate");
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.email.as_deref(), Some("alice@example.com"));
        assert_eq!(claims.token_type, TokenKind::Access);
        assert_eq!(claims.iss, "linkdeck");
    }

    #[test]
    fn test_refresh_token_carries_type_claim() {
        let signer = signer();
        let token = signer
            .generate_refresh_token(&subject(), Utc::now() + Duration::days(7))
            .expect("Failed to generate token");

        let claims = signer.validate_token(&token).expect("Failed to validate");
        assert_eq!(claims.token_type, TokenKind::Refresh);
        assert!(claims.email.is_none());
    }

    #[test]
    fn test_tokens_issued_in_same_instant_differ() {
        let signer = signer();
        let expires_at = Utc::now() + Duration::minutes(15);

        let first = signer.generate_access_token(&subject(), expires_at).unwrap();
        let second = signer.generate_access_token(&subject(), expires_at).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = signer();
        let token = signer
            .generate_access_token(&subject(), Utc::now() - Duration::seconds(1))
            .expect("Failed to generate token");

        let result = signer.validate_token(&token);
        assert!(matches!(result, Err(JwtError::TokenExpired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let signer = signer();
        let other = TokenSigner::new(b"another_secret_key_32_bytes_minimum!!", "linkdeck");

        let token = signer
            .generate_access_token(&subject(), Utc::now() + Duration::minutes(15))
            .unwrap();
        assert!(matches!(
            other.validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let foreign = TokenSigner::new(SECRET, "someone-else");
        let token = foreign
            .generate_access_token(&subject(), Utc::now() + Duration::minutes(15))
            .unwrap();

        assert!(matches!(
            signer().validate_token(&token),
            Err(JwtError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_malformed_token_rejected() {
        assert!(signer().validate_token("not.a.token").is_err());
        assert!(signer().validate_token("").is_err());
    }

    #[test]
    fn test_extract_user_id_without_verification() {
        let signer = signer();
        let other = TokenSigner::new(b"another_secret_key_32_bytes_minimum!!", "linkdeck");

        let token = signer
            .generate_access_token(&subject(), Utc::now() + Duration::minutes(15))
            .unwrap();

        // Works even with a signer holding a different secret
        assert_eq!(other.extract_user_id(&token).as_deref(), Some("user123"));
        assert!(other.extract_user_id("garbage").is_none());
    }

    #[test]
    fn test_token_expiration_readable_unverified() {
        let signer = signer();
        let expires_at = Utc::now() + Duration::minutes(15);
        let token = signer.generate_access_token(&subject(), expires_at).unwrap();

        let read = signer.token_expiration(&token).expect("Missing expiration");
        assert_eq!(read.timestamp(), expires_at.timestamp());
    }
}
