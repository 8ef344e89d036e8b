use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::PasswordHash;
use argon2::password_hash::PasswordHasher as Argon2PasswordHasher;
use argon2::password_hash::PasswordVerifier;
use argon2::password_hash::SaltString;
use argon2::Argon2;
use rand::RngCore;

use super::errors::PasswordError;

/// Length of the external salt in bytes (256 bits).
const SALT_LENGTH: usize = 32;

/// Hash and external salt produced for a password. Both must be stored.
#[derive(Debug, Clone)]
pub struct HashedPassword {
    /// PHC string format hash (includes algorithm, parameters, and hash)
    pub hash: String,
    /// Hex-encoded external salt combined with the plaintext before hashing
    pub salt: String,
}

/// Password hashing implementation.
///
/// Uses Argon2id with default parameters, tuned to roughly 100ms per hash on
/// commodity hardware. An external random salt is appended to the plaintext
/// before hashing, so both the hash and the salt must be persisted.
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    /// Create a new password hasher instance with secure defaults.
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a plaintext password securely.
    ///
    /// Generates a fresh 256-bit external salt, combines it with the
    /// plaintext, and hashes the result with Argon2id.
    ///
    /// # Errors
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<HashedPassword, PasswordError> {
        let mut salt_bytes = [0u8; SALT_LENGTH];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt = hex::encode(salt_bytes);

        let salted = format!("{}{}", password, salt);
        let algorithm_salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(salted.as_bytes(), &algorithm_salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;

        Ok(HashedPassword { hash, salt })
    }

    /// Verify a password against a stored hash and salt.
    ///
    /// Fails closed: any malformed input (empty or undecodable hash, wrong
    /// salt) yields `false`, never an error, so callers cannot distinguish
    /// a bad password from a corrupt record.
    pub fn verify(&self, password: &str, stored_hash: &str, salt: &str) -> bool {
        if stored_hash.is_empty() || salt.is_empty() {
            return false;
        }

        let parsed_hash = match PasswordHash::new(stored_hash) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };

        let salted = format!("{}{}", password, salt);
        self.argon2
            .verify_password(salted.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = PasswordHasher::new();
        let password = "my_secure_password";

        let hashed = hasher.hash(password).expect("Failed to hash password");
        assert!(hashed.hash.starts_with("$argon2"));
        // 32 bytes hex-encoded
        assert_eq!(hashed.salt.len(), 64);

        assert!(hasher.verify(password, &hashed.hash, &hashed.salt));
        assert!(!hasher.verify("wrong_password", &hashed.hash, &hashed.salt));
    }

    #[test]
    fn test_verify_with_wrong_salt() {
        let hasher = PasswordHasher::new();
        let hashed = hasher.hash("password").expect("Failed to hash password");
        let other = hasher.hash("password").expect("Failed to hash password");

        assert!(!hasher.verify("password", &hashed.hash, &other.salt));
    }

    #[test]
    fn test_verify_malformed_input_fails_closed() {
        let hasher = PasswordHasher::new();

        assert!(!hasher.verify("password", "not-a-phc-string", "abcd"));
        assert!(!hasher.verify("password", "", "abcd"));
        assert!(!hasher.verify("password", "$argon2id$v=19$whatever", ""));
    }

    #[test]
    fn test_two_hashes_of_same_password_differ() {
        let hasher = PasswordHasher::new();
        let first = hasher.hash("password").unwrap();
        let second = hasher.hash("password").unwrap();

        assert_ne!(first.hash, second.hash);
        assert_ne!(first.salt, second.salt);
    }
}
