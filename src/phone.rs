//! Phone number validation.
//!
//! Accepts Russian mobile/landline numbers the way customers actually type
//! them (`+7 912 345-67-89`, `8(912)3456789`, bare `9123456789`) and
//! normalizes to the canonical `+7XXXXXXXXXX` form before persisting.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Optional +7/7/8 prefix, then exactly 10 digits.
        Regex::new(r"^(?:\+7|7|8)?(\d{10})$").expect("phone regex is valid")
    })
}

/// Validate a raw phone string and return the normalized `+7XXXXXXXXXX` form.
pub fn validate_phone(input: &str) -> Result<String, ValidationError> {
    let stripped: String = input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
        .collect();

    let captures = phone_re()
        .captures(&stripped)
        .ok_or_else(|| ValidationError::InvalidPhone {
            input: input.to_string(),
        })?;

    Ok(format!("+7{}", &captures[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_formats() {
        for input in [
            "+79123456789",
            "89123456789",
            "79123456789",
            "9123456789",
            "+7 912 345-67-89",
            "8 (912) 345 67 89",
        ] {
            let normalized = validate_phone(input).unwrap();
            assert_eq!(normalized, "+79123456789", "input: {input}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for input in ["abc", "", "+7912345678", "+791234567890", "+1 650 555 0100", "8912345678a"] {
            assert!(validate_phone(input).is_err(), "should reject: {input}");
        }
    }

    #[test]
    fn error_carries_input() {
        let err = validate_phone("abc").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }
}
