//! One-time verification codes for registration and login.
//!
//! Per mobile number the verifier moves through `NoPending ->
//! Pending(code, expires_at)` and back to `NoPending` on consumption or
//! observed expiry. Codes are single use and live for sixty seconds; a
//! resend overwrites the pending entry. The code is handed back to the
//! caller for display; demo delivery, not a secrecy model.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;

pub const OTP_TTL_SECONDS: i64 = 60;
pub const OTP_LENGTH: usize = 6;

/// Pre-submission input check failed (e.g. a malformed code).
#[derive(Debug)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ValidationError {}

#[derive(Debug, Clone)]
pub struct OtpDelivery {
    pub mobile: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct OtpEntry {
    code: String,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct OtpVerifier {
    pending: HashMap<String, OtpEntry>,
}

impl OtpVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh code for a mobile number, replacing any pending one.
    pub fn send(&mut self, mobile: &str) -> Result<OtpDelivery, Box<dyn StdError>> {
        self.send_at(mobile, Utc::now())
    }

    /// Check a code. Fails closed: unknown number, expired entry (removed
    /// as a side effect), and mismatched code all return `false`. A match
    /// consumes the entry.
    pub fn verify(&mut self, mobile: &str, code: &str) -> bool {
        self.verify_at(mobile, code, Utc::now())
    }

    pub fn has_pending(&self, mobile: &str) -> bool {
        self.pending.contains_key(mobile)
    }

    fn send_at(
        &mut self,
        mobile: &str,
        now: DateTime<Utc>,
    ) -> Result<OtpDelivery, Box<dyn StdError>> {
        let code = generate_code()?;
        let expires_at = now + Duration::seconds(OTP_TTL_SECONDS);
        self.pending.insert(
            mobile.to_string(),
            OtpEntry {
                code: code.clone(),
                expires_at,
            },
        );
        Ok(OtpDelivery {
            mobile: mobile.to_string(),
            code,
            expires_at,
        })
    }

    fn verify_at(&mut self, mobile: &str, code: &str, now: DateTime<Utc>) -> bool {
        let Some(entry) = self.pending.get(mobile) else {
            return false;
        };
        if now > entry.expires_at {
            self.pending.remove(mobile);
            return false;
        }
        if entry.code != code {
            return false;
        }
        self.pending.remove(mobile);
        true
    }
}

/// Reject anything that is not exactly six ASCII digits before it reaches
/// the verifier.
pub fn validate_code_format(code: &str) -> Result<(), ValidationError> {
    if code.len() == OTP_LENGTH && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new(format!(
            "The code must be exactly {} digits",
            OTP_LENGTH
        )))
    }
}

fn generate_code() -> Result<String, Box<dyn StdError>> {
    let mut buf = [0u8; 4];
    getrandom::fill(&mut buf).map_err(|err| format!("entropy source unavailable: {err}"))?;
    let n = u32::from_le_bytes(buf);
    Ok(format!("{}", 100_000 + n % 900_000))
}
