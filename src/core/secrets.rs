//! API-key resolution and storage.
//!
//! The key is the one required secret: resolution tries the system keyring
//! first, then the environment, and otherwise fails with a fatal
//! configuration error carrying quick-fix hints. A temporarily unavailable
//! keyring backend falls back to the environment; a permanent backend
//! failure is surfaced as-is.

use keyring::Entry;
use std::error::Error as StdError;
use std::fmt;

use crate::core::config::DEFAULT_BASE_URL;

const KEYRING_SERVICE: &str = "kilnchat";
const KEYRING_ACCOUNT: &str = "api-key";

pub const API_KEY_ENV: &str = "KILNCHAT_API_KEY";
pub const BASE_URL_ENV: &str = "KILNCHAT_BASE_URL";

const QUICK_FIXES: &[&str] = &[
    "kilnchat auth                     # Store an API key in the system keyring",
    "export KILNCHAT_API_KEY=sk-...    # Use an environment variable instead",
];

/// Describes failures when attempting to access the system keyring.
///
/// Recoverable errors indicate that the credential backend was temporarily
/// unavailable (for example when the keychain service is locked). Permanent
/// errors surface the underlying cause directly.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner())
    }
}

impl StdError for KeyringAccessError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner())
    }
}

/// Fatal startup condition: no API key anywhere.
#[derive(Debug)]
pub struct MissingApiKeyError {
    message: String,
    quick_fixes: &'static [&'static str],
    exit_code: i32,
}

impl MissingApiKeyError {
    pub fn missing() -> Self {
        Self {
            message: format!(
                "❌ No API key configured and {API_KEY_ENV} environment variable not set\n\n\
                 Please either:\n\
                 1. Run 'kilnchat auth' to store a key in the system keyring, or\n\
                 2. Set the environment variable:\n   export {API_KEY_ENV}=\"your-api-key-here\""
            ),
            quick_fixes: QUICK_FIXES,
            exit_code: 2,
        }
    }

    pub fn quick_fixes(&self) -> &'static [&'static str] {
        self.quick_fixes
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl fmt::Display for MissingApiKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for MissingApiKeyError {}

#[derive(Clone, Debug)]
pub struct ApiCredentials {
    pub api_key: String,
    pub base_url: String,
}

/// Resolve the API key and base URL.
///
/// Key order: keyring (unless disabled) → `KILNCHAT_API_KEY` → fatal
/// [`MissingApiKeyError`]. Base URL order: `KILNCHAT_BASE_URL` → config →
/// the OpenAI-compatible default.
pub fn resolve_credentials(
    use_keyring: bool,
    config_base_url: Option<&str>,
) -> Result<ApiCredentials, Box<dyn StdError>> {
    let base_url = std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| config_base_url.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    if use_keyring {
        match keyring_api_key() {
            Ok(Some(api_key)) => return Ok(ApiCredentials { api_key, base_url }),
            Ok(None) => {}
            Err(err) if err.is_recoverable() => {
                eprintln!(
                    "⚠️  Unable to access stored credentials: {}. Falling back to environment variables if available.",
                    err
                );
            }
            Err(err) => return Err(Box::new(err)),
        }
    }

    match std::env::var(API_KEY_ENV) {
        Ok(api_key) if !api_key.is_empty() => Ok(ApiCredentials { api_key, base_url }),
        _ => Err(Box::new(MissingApiKeyError::missing())),
    }
}

pub fn store_api_key(token: &str) -> Result<(), Box<dyn StdError>> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
    entry.set_password(token)?;
    Ok(())
}

pub fn clear_api_key() -> Result<(), Box<dyn StdError>> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT)?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(err) => Err(Box::new(err)),
    }
}

fn keyring_api_key() -> Result<Option<String>, KeyringAccessError> {
    let entry = Entry::new(KEYRING_SERVICE, KEYRING_ACCOUNT).map_err(KeyringAccessError::from)?;
    match entry.get_password() {
        Ok(token) => Ok(Some(token)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(KeyringAccessError::from(err)),
    }
}
