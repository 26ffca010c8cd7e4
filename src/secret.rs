//! Startup-time credential loading.
//!
//! The API key is read exactly once, before the server binds, and handed to
//! [`Config`](crate::Config) wrapped in a [`SecretString`].

use crate::error::{Error, Result};
use secrecy::SecretString;
use tracing::debug;

/// Environment variable that holds the completion API key.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Reads the API key from the process environment.
///
/// # Errors
///
/// Returns [`Error::MissingSecret`] if the variable is unset, not valid
/// Unicode, or blank.
pub fn load_api_key() -> Result<SecretString> {
    load_secret(API_KEY_VAR)
}

fn load_secret(name: &str) -> Result<SecretString> {
    secret_from_value(name, std::env::var(name).ok())
}

fn secret_from_value(name: &str, value: Option<String>) -> Result<SecretString> {
    match value {
        Some(value) if !value.trim().is_empty() => {
            debug!("Loaded secret {name} ({} chars)", value.len());
            Ok(SecretString::from(value))
        }
        _ => Err(Error::missing_secret(name)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_present_secret() {
        let secret = secret_from_value(API_KEY_VAR, Some("sk-abc".to_string())).unwrap();
        assert_eq!(secret.expose_secret(), "sk-abc");
    }

    #[test]
    fn test_absent_secret() {
        let err = secret_from_value(API_KEY_VAR, None).unwrap_err();
        assert!(matches!(err, Error::MissingSecret { ref name } if name == API_KEY_VAR));
    }

    #[test]
    fn test_blank_secret() {
        let err = secret_from_value(API_KEY_VAR, Some("  \n".to_string())).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_unset_variable() {
        let err = load_secret("CY2PW_TEST_SECRET_THAT_IS_NEVER_SET").unwrap_err();
        assert!(err.to_string().contains("CY2PW_TEST_SECRET_THAT_IS_NEVER_SET"));
    }
}
