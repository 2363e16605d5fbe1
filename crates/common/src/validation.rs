//! Input validation for values arriving over the HTTP surface and from the
//! environment.

use anyhow::{anyhow, Result};

/// Maximum length for camera names
pub const MAX_CAMERA_NAME_LENGTH: usize = 256;

/// Maximum length for snapshot and stream URLs
pub const MAX_URL_LENGTH: usize = 4096;

/// Longest timeout accepted from configuration
pub const MAX_TIMEOUT_SECS: u64 = 300;

/// Validate string length against a maximum
pub fn validate_length(value: &str, max_length: usize, field_name: &str) -> Result<()> {
    if value.len() > max_length {
        return Err(anyhow!(
            "{} exceeds maximum length of {} bytes (got {})",
            field_name,
            max_length,
            value.len()
        ));
    }
    Ok(())
}

/// Validate non-empty string
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{} cannot be empty", field_name));
    }
    Ok(())
}

/// Validate a camera name supplied by a caller
pub fn validate_camera_name(name: &str) -> Result<()> {
    validate_non_empty(name, "camera name")?;
    validate_length(name, MAX_CAMERA_NAME_LENGTH, "camera name")?;
    Ok(())
}

/// Validate a webcam url: either relative to the local server or plain http(s).
pub fn validate_webcam_url(url: &str, field_name: &str) -> Result<()> {
    validate_non_empty(url, field_name)?;
    validate_length(url, MAX_URL_LENGTH, field_name)?;

    let lower = url.to_ascii_lowercase();
    if !(url.starts_with('/') || lower.starts_with("http://") || lower.starts_with("https://")) {
        return Err(anyhow!(
            "{} must be a relative path or an http(s) url (got '{}')",
            field_name,
            url
        ));
    }
    Ok(())
}

/// Validate a timeout read from configuration
pub fn validate_timeout_secs(secs: u64, field_name: &str) -> Result<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(anyhow!(
            "{} must be between 1 and {} seconds (got {})",
            field_name,
            MAX_TIMEOUT_SECS,
            secs
        ));
    }
    Ok(())
}
