use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

pub const MIN_PHONE_DIGITS: usize = 7;
pub const MAX_PHONE_DIGITS: usize = 15;

/// National digit-count patterns by calling code. Numbers for codes not
/// listed here only have to pass the generic length and plausibility rules.
static COUNTRY_PATTERNS: Lazy<BTreeMap<&'static str, Regex>> = Lazy::new(|| {
    [
        ("+1", r"^\d{10}$"),
        ("+33", r"^\d{9}$"),
        ("+34", r"^\d{9}$"),
        ("+39", r"^\d{9,10}$"),
        ("+44", r"^\d{10,11}$"),
        ("+49", r"^\d{10,11}$"),
        ("+52", r"^\d{10}$"),
        ("+61", r"^\d{9}$"),
        ("+81", r"^\d{10}$"),
        ("+86", r"^\d{11}$"),
        ("+91", r"^\d{10}$"),
    ]
    .into_iter()
    .map(|(code, pattern)| {
        (
            code,
            Regex::new(pattern).expect("static phone pattern compiles"),
        )
    })
    .collect()
});

/// Why a phone number was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhoneError {
    #[error("phone number is too short ({digits} digits, minimum 7)")]
    TooShort { digits: usize },
    #[error("phone number is too long ({digits} digits, maximum 15)")]
    TooLong { digits: usize },
    #[error("phone number does not match the national format for {country_code}")]
    CountryFormatMismatch { country_code: String },
    #[error("phone number is not a plausible dialable number")]
    ImplausibleNumber,
}

/// A phone number that passed validation, normalized to bare digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPhone {
    digits: String,
    country_code: String,
}

impl ValidPhone {
    pub fn digits(&self) -> &str {
        &self.digits
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// `+<country><national digits>` rendering for storage and display.
    pub fn e164(&self) -> String {
        format!("{}{}", self.country_code, self.digits)
    }
}

/// Validate a raw phone string against a calling code such as `"+1"`.
///
/// Total function: cheap enough to run on every keystroke and never
/// panics. A leading copy of the calling code is tolerated and stripped,
/// as are separators and whitespace.
pub fn validate_phone(raw: &str, country_code: &str) -> Result<ValidPhone, PhoneError> {
    let trimmed = raw.trim();
    let national = trimmed.strip_prefix(country_code).unwrap_or(trimmed);
    let digits: String = national.chars().filter(char::is_ascii_digit).collect();

    if digits.len() < MIN_PHONE_DIGITS {
        return Err(PhoneError::TooShort {
            digits: digits.len(),
        });
    }
    if digits.len() > MAX_PHONE_DIGITS {
        return Err(PhoneError::TooLong {
            digits: digits.len(),
        });
    }

    // A single repeated digit (including all zeros) is never dialable.
    let mut chars = digits.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return Err(PhoneError::ImplausibleNumber);
        }
    }

    if let Some(pattern) = COUNTRY_PATTERNS.get(country_code) {
        if !pattern.is_match(&digits) {
            return Err(PhoneError::CountryFormatMismatch {
                country_code: country_code.to_string(),
            });
        }
    }

    Ok(ValidPhone {
        digits,
        country_code: country_code.to_string(),
    })
}

pub fn is_valid_phone(raw: &str, country_code: &str) -> bool {
    validate_phone(raw, country_code).is_ok()
}
