//! Time-based one-time codes for SmartAPI login.
use std::time::{SystemTime, UNIX_EPOCH};

use alert_common::{AlertError, Result};
use totp_rs::{Algorithm, Secret, TOTP};

fn totp(secret: &str) -> Result<TOTP> {
    let normalized: String = secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    let bytes = Secret::Encoded(normalized)
        .to_bytes()
        .map_err(|e| AlertError::Auth(format!("invalid TOTP secret: {e:?}")))?;
    Ok(TOTP::new_unchecked(Algorithm::SHA1, 6, 1, 30, bytes))
}

/// Six-digit code for the current 30 s window.
pub fn current_code(secret: &str) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AlertError::Auth(format!("system clock before epoch: {e}")))?;
    code_at(secret, now.as_secs())
}

/// Six-digit code for the window containing `unix_secs`.
pub fn code_at(secret: &str, unix_secs: u64) -> Result<String> {
    Ok(totp(secret)?.generate(unix_secs))
}
