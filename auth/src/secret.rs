//! Signing-secret provisioning.
//!
//! Resolves the token signing secret in priority order: explicit value,
//! secret file, then (development only) a machine-derived fallback. Outside
//! development, failing to resolve a valid secret is fatal at startup.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

/// Minimum secret size: 256 bits (32 bytes, UTF-8 encoded).
const MIN_SECRET_BYTES: usize = 32;

/// Deployment environment, as far as secret policy is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Classify a run-mode string. Anything that is not clearly a local or
    /// test mode is treated as production, so the strict policy is the
    /// default.
    pub fn from_run_mode(run_mode: &str) -> Self {
        let mode = run_mode.to_lowercase();
        if mode.contains("dev") || mode.contains("local") || mode.contains("test") {
            Environment::Development
        } else {
            Environment::Production
        }
    }
}

/// Error type for secret resolution failures.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Signing secret is too short: minimum {MIN_SECRET_BYTES} bytes, got {actual}")]
    TooShort { actual: usize },

    #[error("Failed to read signing secret from file {path}: {source}")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },

    #[error(
        "Signing secret not configured. Provide an explicit secret or a secret file \
         with at least {MIN_SECRET_BYTES} bytes"
    )]
    Missing,
}

/// Resolve the token signing secret.
///
/// Priority order:
/// 1. Explicit secret value
/// 2. Secret read from a file path
/// 3. Machine-derived fallback, development environments only
///
/// A configured candidate under 256 bits fails resolution outright; a weak
/// secret never falls through to a weaker source. In production a missing or
/// weak secret is an error; callers must refuse to start.
pub fn resolve_signing_secret(
    explicit: Option<&str>,
    secret_file: Option<&Path>,
    environment: Environment,
) -> Result<String, SecretError> {
    if let Some(secret) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
        validate_length(secret)?;
        tracing::debug!("Signing secret loaded from explicit configuration");
        return Ok(secret.to_string());
    }

    if let Some(path) = secret_file {
        let secret = fs::read_to_string(path)
            .map_err(|source| SecretError::Unreadable {
                path: path.display().to_string(),
                source,
            })?
            .trim()
            .to_string();
        validate_length(&secret)?;
        tracing::debug!(path = %path.display(), "Signing secret loaded from file");
        return Ok(secret);
    }

    if environment == Environment::Development {
        tracing::warn!("Using development signing secret. DO NOT USE IN PRODUCTION!");
        return Ok(development_secret().to_string());
    }

    Err(SecretError::Missing)
}

fn validate_length(secret: &str) -> Result<(), SecretError> {
    let actual = secret.as_bytes().len();
    if actual < MIN_SECRET_BYTES {
        return Err(SecretError::TooShort { actual });
    }
    Ok(())
}

/// Development fallback secret: a deterministic machine fingerprint combined
/// with random entropy generated once per process. Stable for the lifetime
/// of one running process only; tokens issued before a restart become
/// unverifiable afterward.
fn development_secret() -> &'static str {
    static DEV_SECRET: OnceLock<String> = OnceLock::new();

    DEV_SECRET.get_or_init(|| {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "linkdeck".to_string());
        let exe = std::env::current_exe()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let mut hasher = Sha256::new();
        hasher.update(user.as_bytes());
        hasher.update(exe.as_bytes());
        hasher.update(b"linkdeck-dev-secret-v1");
        let fingerprint = hasher.finalize();

        let mut entropy = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut entropy);

        format!("{}{}", hex::encode(fingerprint), hex::encode(entropy))
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const STRONG: &str = "an-explicit-secret-that-is-long-enough-for-hs256";

    #[test]
    fn test_explicit_secret_wins() {
        let secret =
            resolve_signing_secret(Some(STRONG), None, Environment::Production).unwrap();
        assert_eq!(secret, STRONG);
    }

    #[test]
    fn test_short_explicit_secret_rejected() {
        let result = resolve_signing_secret(Some("too-short"), None, Environment::Production);
        assert!(matches!(result, Err(SecretError::TooShort { actual: 9 })));
    }

    #[test]
    fn test_secret_from_file() {
        let mut file = tempfile_path("secret-from-file");
        writeln!(file.1, "{}", STRONG).unwrap();

        let secret =
            resolve_signing_secret(None, Some(&file.0), Environment::Production).unwrap();
        assert_eq!(secret, STRONG);
        std::fs::remove_file(&file.0).ok();
    }

    #[test]
    fn test_short_configured_secret_never_falls_through() {
        // Even in development a weak configured secret must fail loudly
        // rather than silently resolve to the fallback
        let result = resolve_signing_secret(Some("too-short"), None, Environment::Development);
        assert!(matches!(result, Err(SecretError::TooShort { .. })));

        let mut file = tempfile_path("short-secret");
        writeln!(file.1, "too-short").unwrap();
        let result = resolve_signing_secret(None, Some(&file.0), Environment::Development);
        assert!(matches!(result, Err(SecretError::TooShort { .. })));
        std::fs::remove_file(&file.0).ok();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = resolve_signing_secret(
            None,
            Some(Path::new("/nonexistent/secret")),
            Environment::Production,
        );
        assert!(matches!(result, Err(SecretError::Unreadable { .. })));
    }

    #[test]
    fn test_production_without_secret_fails() {
        let result = resolve_signing_secret(None, None, Environment::Production);
        assert!(matches!(result, Err(SecretError::Missing)));
    }

    #[test]
    fn test_development_fallback_is_stable_within_process() {
        let first = resolve_signing_secret(None, None, Environment::Development).unwrap();
        let second = resolve_signing_secret(None, None, Environment::Development).unwrap();

        assert_eq!(first, second);
        assert!(first.as_bytes().len() >= 32);
    }

    #[test]
    fn test_environment_classification() {
        assert_eq!(
            Environment::from_run_mode("development"),
            Environment::Development
        );
        assert_eq!(Environment::from_run_mode("local"), Environment::Development);
        assert_eq!(Environment::from_run_mode("test"), Environment::Development);
        assert_eq!(
            Environment::from_run_mode("production"),
            Environment::Production
        );
        assert_eq!(Environment::from_run_mode("staging"), Environment::Production);
    }

    fn tempfile_path(name: &str) -> (std::path::PathBuf, std::fs::File) {
        let path = std::env::temp_dir().join(format!("linkdeck-{}-{}", name, std::process::id()));
        let file = std::fs::File::create(&path).unwrap();
        (path, file)
    }
}
