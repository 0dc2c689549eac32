//! Time-based one-time codes (RFC 6238 over HMAC-SHA1) used to prove that a
//! customer controls the email address they booked with.
//!
//! The verifier is stateless: callers keep the secret and hand it back on
//! every check.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

/// Length of one code window.
pub const STEP_SECONDS: u64 = 300;
/// Windows accepted on either side of the current one.
pub const TOLERANCE_STEPS: u64 = 6;
pub const CODE_DIGITS: usize = 6;

const SECRET_BYTES: usize = 20;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("secret cannot be used as an HMAC key")]
    InvalidKey,
    #[error("step must be at least one second")]
    ZeroStep,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct OtpSecret(Vec<u8>);

impl OtpSecret {
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; SECRET_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(&self.0)
    }

    pub fn decode(encoded: &str) -> Result<Self, String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| format!("malformed secret: {e}"))?;
        if bytes.is_empty() {
            return Err("secret is empty".to_string());
        }
        Ok(Self(bytes))
    }
}

impl fmt::Debug for OtpSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpSecret(..)")
    }
}

impl From<OtpSecret> for String {
    fn from(secret: OtpSecret) -> Self {
        secret.encode()
    }
}

impl TryFrom<String> for OtpSecret {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OtpSecret::decode(&value)
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCode {
    pub secret: OtpSecret,
    pub code: String,
    pub step_seconds: u64,
    pub issued_at: DateTime<Utc>,
}

/// Fresh secret plus the code for the window containing `now`.
pub fn issue(now: DateTime<Utc>) -> Result<IssuedCode, OtpError> {
    let secret = OtpSecret::generate();
    let code = code_at(&secret, STEP_SECONDS, now)?;
    Ok(IssuedCode {
        secret,
        code,
        step_seconds: STEP_SECONDS,
        issued_at: now,
    })
}

pub fn code_at(secret: &OtpSecret, step_seconds: u64, at: DateTime<Utc>) -> Result<String, OtpError> {
    let counter = counter_at(at, step_seconds)?;
    Ok(format_code(hotp(&secret.0, counter)?))
}

/// True when `supplied` matches the code of the current window or of any
/// window within [`TOLERANCE_STEPS`] of it.
pub fn verify(secret: &OtpSecret, supplied: &str, step_seconds: u64, now: DateTime<Utc>) -> bool {
    let supplied = supplied.trim();
    if supplied.len() != CODE_DIGITS || !supplied.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let Ok(current) = counter_at(now, step_seconds) else {
        return false;
    };

    let first = current.saturating_sub(TOLERANCE_STEPS);
    let last = current.saturating_add(TOLERANCE_STEPS);
    (first..=last).any(|counter| match hotp(&secret.0, counter) {
        Ok(value) => format_code(value) == supplied,
        Err(_) => false,
    })
}

fn counter_at(at: DateTime<Utc>, step_seconds: u64) -> Result<u64, OtpError> {
    if step_seconds == 0 {
        return Err(OtpError::ZeroStep);
    }
    Ok(at.timestamp().max(0) as u64 / step_seconds)
}

// RFC 4226 section 5.3 dynamic truncation.
fn hotp(key: &[u8], counter: u64) -> Result<u32, OtpError> {
    let mut mac = Hmac::<Sha1>::new_from_slice(key).map_err(|_| OtpError::InvalidKey)?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    Ok(binary % 10u32.pow(CODE_DIGITS as u32))
}

fn format_code(value: u32) -> String {
    format!("{value:0width$}", width = CODE_DIGITS)
}
