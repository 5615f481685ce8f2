//! Password strength policy
//!
//! Rules are checked in a fixed order and the first failing rule is reported.
//! Length is counted in Unicode scalar values, and character classes use
//! Unicode categories rather than an ASCII allow-list.

use thiserror::Error;
use unicode_general_category::{GeneralCategory, get_general_category};

/// Minimum password length in characters
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A password strength rule that was not met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PolicyViolation {
    #[error("Password must be at least {min} characters long")]
    TooShort { min: usize },

    #[error("Password must contain at least one uppercase letter")]
    MissingUppercase,

    #[error("Password must contain at least one lowercase letter")]
    MissingLowercase,

    #[error("Password must contain at least one digit")]
    MissingDigit,

    #[error("Password must contain at least one special character")]
    MissingSymbol,
}

/// Check a candidate password against the strength rules
pub fn validate(password: &str) -> Result<(), PolicyViolation> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(PolicyViolation::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if !password.chars().any(char::is_uppercase) {
        return Err(PolicyViolation::MissingUppercase);
    }

    if !password.chars().any(char::is_lowercase) {
        return Err(PolicyViolation::MissingLowercase);
    }

    if !password.chars().any(char::is_numeric) {
        return Err(PolicyViolation::MissingDigit);
    }

    if !password.chars().any(is_symbol) {
        return Err(PolicyViolation::MissingSymbol);
    }

    Ok(())
}

/// Unicode punctuation (P*) or symbol (S*) general category
fn is_symbol(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
            | GeneralCategory::MathSymbol
            | GeneralCategory::CurrencySymbol
            | GeneralCategory::ModifierSymbol
            | GeneralCategory::OtherSymbol
    )
}
