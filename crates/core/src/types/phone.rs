//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone cannot be empty")]
    Empty,
    /// The input does not match the accepted pattern.
    #[error("invalid phone format")]
    InvalidFormat,
}

/// A loosely validated phone number.
///
/// Accepts the pattern `+?D[D-]{6,}`: an optional leading `+`, a digit, then
/// at least six more digits or `-` separators. This is deliberately
/// permissive - the CRM stores whatever a human typed, it only rejects
/// values that cannot plausibly be a phone number.
///
/// ## Examples
///
/// ```
/// use meridian_core::Phone;
///
/// assert!(Phone::parse("+1234567890").is_ok());
/// assert!(Phone::parse("123-456-7890").is_ok());
///
/// assert!(Phone::parse("").is_err());
/// assert!(Phone::parse("not a phone").is_err());
/// assert!(Phone::parse("+12").is_err()); // too short
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Phone(String);

impl Phone {
    /// Parse a `Phone` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or does not match the
    /// accepted pattern.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let rest = s.strip_prefix('+').unwrap_or(s);
        let mut chars = rest.chars();

        // First char after the optional + must be a digit.
        if !chars.next().is_some_and(|c| c.is_ascii_digit()) {
            return Err(PhoneError::InvalidFormat);
        }

        let tail: Vec<char> = chars.collect();
        if tail.len() < 6 {
            return Err(PhoneError::InvalidFormat);
        }
        if !tail.iter().all(|c| c.is_ascii_digit() || *c == '-') {
            return Err(PhoneError::InvalidFormat);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Phone` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_phones() {
        assert!(Phone::parse("+1234567890").is_ok());
        assert!(Phone::parse("1234567").is_ok());
        assert!(Phone::parse("123-456-7890").is_ok());
        assert!(Phone::parse("555-000-1212").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(Phone::parse(""), Err(PhoneError::Empty)));
    }

    #[test]
    fn test_parse_too_short() {
        assert!(matches!(
            Phone::parse("+12345"),
            Err(PhoneError::InvalidFormat)
        ));
    }

    #[test]
    fn test_parse_letters_rejected() {
        assert!(matches!(
            Phone::parse("call-me-maybe"),
            Err(PhoneError::InvalidFormat)
        ));
        assert!(matches!(
            Phone::parse("+1 (555) 123"),
            Err(PhoneError::InvalidFormat)
        ));
    }

    #[test]
    fn test_plus_must_lead_digit() {
        assert!(matches!(
            Phone::parse("+-1234567"),
            Err(PhoneError::InvalidFormat)
        ));
    }

    #[test]
    fn test_display() {
        let phone = Phone::parse("123-456-7890").unwrap();
        assert_eq!(phone.to_string(), "123-456-7890");
    }
}
