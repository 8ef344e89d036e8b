//! Authentication infrastructure library
//!
//! Provides reusable authentication building blocks for services:
//! - Password hashing with an explicit external salt (Argon2id)
//! - Password strength scoring
//! - Signed bearer token generation and validation (access + refresh)
//! - Signing-secret provisioning policy
//!
//! Each service defines its own authentication traits and adapts these
//! implementations. This avoids coupling services through shared domain logic
//! while reducing code duplication.
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hashed = hasher.hash("Abcdef12").unwrap();
//! assert!(hasher.verify("Abcdef12", &hashed.hash, &hashed.salt));
//! assert!(!hasher.verify("wrong", &hashed.hash, &hashed.salt));
//! ```
//!
//! ## Signed Tokens
//! ```
//! use auth::{TokenSigner, TokenSubject, TokenKind};
//! use chrono::{Duration, Utc};
//!
//! let signer = TokenSigner::new(b"secret_key_at_least_32_bytes_long!", "my-service");
//! let subject = TokenSubject::new("user123", "alice");
//! let token = signer
//!     .generate_access_token(&subject, Utc::now() + Duration::minutes(15))
//!     .unwrap();
//! let claims = signer.validate_token(&token).unwrap();
//! assert_eq!(claims.sub, "user123");
//! assert_eq!(claims.token_type, TokenKind::Access);
//! ```

pub mod jwt;
pub mod password;
pub mod secret;

// Re-export commonly used items
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::TokenKind;
pub use jwt::TokenSigner;
pub use jwt::TokenSubject;
pub use password::HashedPassword;
pub use password::PasswordError;
pub use password::PasswordHasher;
pub use secret::resolve_signing_secret;
pub use secret::Environment;
pub use secret::SecretError;
