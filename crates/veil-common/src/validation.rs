//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes. Cryptographic
//! validation (key shape, signatures) lives in [`crate::crypto`]; this
//! module only covers ordinary request-body shape checks.

use validator::Validate;

use crate::error::VeilError;

/// Validate a request body, returning a `VeilError::Validation` on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), VeilError> {
    body.validate().map_err(|e| VeilError::Validation {
        message: format_validation_errors(e),
    })
}

/// Format validation errors into a human-readable string.
fn format_validation_errors(errors: validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for '{field}'"))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a device label: non-empty, printable, reasonably short.
/// Device labels are explicitly not unique per spec — this only guards
/// against empty or absurd input.
pub fn validate_device_label(label: &str) -> Result<(), VeilError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(VeilError::Validation {
            message: "device label cannot be empty or whitespace only".into(),
        });
    }
    if trimmed.chars().count() > 128 {
        return Err(VeilError::Validation {
            message: "device label is too long".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_device_label() {
        assert!(validate_device_label("").is_err());
    }
}
