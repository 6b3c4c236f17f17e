/// Input validators
///
/// Normalises and checks user-supplied fields before they reach the user
/// directory. Every validator returns the cleaned value.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 5;
const MAX_LOCAL_PART_LENGTH: usize = 64;
const MIN_PHONE_DIGITS: usize = 7;
const MAX_PHONE_DIGITS: usize = 15; // E.164
const MAX_NAME_LENGTH: usize = 100;
/// bcrypt only looks at the first 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).expect("email regex is valid");
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()));
    }
    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email".to_string(), MIN_EMAIL_LENGTH));
    }
    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email".to_string(), MAX_EMAIL_LENGTH));
    }
    if has_suspicious_email_patterns(trimmed) {
        return Err(ValidationError::SuspiciousContent("email".to_string()));
    }
    if !EMAIL_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat("email".to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates a phone number and returns it as `+digits` or `digits`
///
/// Spaces, dashes and parentheses are ignored.
pub fn is_valid_phone(phone: &str) -> Result<String, ValidationError> {
    let trimmed = phone.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("phone_number".to_string()));
    }

    let (plus, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };
    let digits: String = rest
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat("phone_number".to_string()));
    }
    if digits.len() < MIN_PHONE_DIGITS {
        return Err(ValidationError::TooShort("phone_number".to_string(), MIN_PHONE_DIGITS));
    }
    if digits.len() > MAX_PHONE_DIGITS {
        return Err(ValidationError::TooLong("phone_number".to_string(), MAX_PHONE_DIGITS));
    }

    Ok(format!("{}{}", plus, digits))
}

/// Validates an optional first/last name; blank input becomes `None`
pub fn is_valid_name(field: &str, name: Option<&str>) -> Result<Option<String>, ValidationError> {
    let trimmed = match name.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(trimmed) => trimmed,
    };

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_NAME_LENGTH));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(ValidationError::SuspiciousContent(field.to_string()));
    }

    Ok(Some(trimmed.to_string()))
}

/// Checks a new password before it is hashed
pub fn is_valid_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong("password".to_string(), MAX_PASSWORD_BYTES));
    }
    Ok(())
}

fn has_suspicious_email_patterns(email: &str) -> bool {
    if email.matches('@').count() != 1 {
        return true;
    }
    if let Some(at_pos) = email.find('@') {
        if email[..at_pos].len() > MAX_LOCAL_PART_LENGTH {
            return true;
        }
    }
    email.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert_eq!(is_valid_email(" a@x.com ").unwrap(), "a@x.com");
        assert!(is_valid_email("test.email@domain.co.uk").is_ok());
        assert!(is_valid_email("user+tag@example.com").is_ok());
    }

    #[test]
    fn test_invalid_email_format() {
        assert!(is_valid_email("invalid").is_err());
        assert!(is_valid_email("user@").is_err());
        assert!(is_valid_email("@example.com").is_err());
        assert!(is_valid_email("user@@example.com").is_err());
        assert!(is_valid_email("").is_err());
    }

    #[test]
    fn test_email_length_limits() {
        let too_long = format!("{}@example.com", "a".repeat(250));
        assert!(is_valid_email(&too_long).is_err());

        let long_local = format!("{}@example.com", "a".repeat(65));
        assert!(is_valid_email(&long_local).is_err());

        assert!(is_valid_email("a@b").is_err());
    }

    #[test]
    fn test_phone_normalisation() {
        assert_eq!(is_valid_phone("+7 (701) 123-45-67").unwrap(), "+77011234567");
        assert_eq!(is_valid_phone("87011234567").unwrap(), "87011234567");
    }

    #[test]
    fn test_invalid_phone() {
        assert!(is_valid_phone("").is_err());
        assert!(is_valid_phone("12345").is_err());
        assert!(is_valid_phone("+1234567890123456").is_err());
        assert!(is_valid_phone("+7701abc4567").is_err());
    }

    #[test]
    fn test_names() {
        assert_eq!(is_valid_name("first_name", None).unwrap(), None);
        assert_eq!(is_valid_name("first_name", Some("  ")).unwrap(), None);
        assert_eq!(
            is_valid_name("first_name", Some(" Aigerim ")).unwrap().as_deref(),
            Some("Aigerim")
        );
        assert!(is_valid_name("last_name", Some("Name\0with\0null")).is_err());
        assert!(is_valid_name("last_name", Some(&"a".repeat(101))).is_err());
    }

    #[test]
    fn test_passwords() {
        assert!(is_valid_password("pw1").is_ok());
        assert!(is_valid_password("").is_err());
        assert!(is_valid_password(&"a".repeat(73)).is_err());
    }
}
