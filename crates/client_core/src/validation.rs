use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

const EMAIL_PATTERN: &str = r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#;

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern is a valid regex"))
}

/// Shape check only; whether the mailbox exists is the server's concern.
pub fn is_plausible_email(raw: &str) -> bool {
    email_regex().is_match(&raw.to_lowercase())
}

pub fn require_filled(fields: &[&str]) -> Result<(), ValidationError> {
    if fields.iter().any(|field| field.is_empty()) {
        return Err(ValidationError::MissingFields);
    }
    Ok(())
}

pub fn require_email(raw: &str) -> Result<(), ValidationError> {
    if !is_plausible_email(raw) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

pub fn require_matching_passwords(password: &str, confirm: &str) -> Result<(), ValidationError> {
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    Ok(())
}
