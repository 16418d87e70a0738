// Local form checks - run before anything touches the network
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,4}$").expect("email pattern is valid")
});

pub fn validate_email(email: &str) -> Result<()> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(Error::Validation("Invalid email format.".into()))
    }
}

pub fn validate_login(email: &str, password: &str) -> Result<()> {
    validate_email(email)?;
    if password.is_empty() {
        return Err(Error::Validation("Password is required.".into()));
    }
    Ok(())
}

/// Email shape, then confirmation match, then length
pub fn validate_signup(email: &str, password: &str, confirm: &str) -> Result<()> {
    validate_email(email)?;

    if password != confirm {
        return Err(Error::Validation(
            "Password and Confirm Password do not match.".into(),
        ));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LEN
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: Result<()>) -> String {
        match result {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_emails() {
        assert!(validate_email("a@b.com").is_ok());
        assert!(validate_email("first.last-1_x@mail.example.org").is_ok());
    }

    #[test]
    fn test_invalid_emails() {
        for email in ["", "plainaddress", "a@b", "a@b.c", "a b@c.com", "a@b.comland"] {
            assert!(validate_email(email).is_err(), "{} should be rejected", email);
        }
    }

    #[test]
    fn test_signup_happy_path() {
        assert!(validate_signup("a@b.com", "secret1", "secret1").is_ok());
    }

    #[test]
    fn test_signup_mismatch() {
        assert_eq!(
            message(validate_signup("a@b.com", "secret1", "secret2")),
            "Password and Confirm Password do not match."
        );
    }

    #[test]
    fn test_signup_short_password() {
        assert_eq!(
            message(validate_signup("a@b.com", "abc", "abc")),
            "Password must be at least 6 characters long."
        );
    }

    #[test]
    fn test_email_checked_first() {
        assert_eq!(
            message(validate_signup("nope", "a", "b")),
            "Invalid email format."
        );
    }

    #[test]
    fn test_login_requires_password() {
        assert_eq!(message(validate_login("a@b.com", "")), "Password is required.");
        assert!(validate_login("a@b.com", "x").is_ok());
    }
}
