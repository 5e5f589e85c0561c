use lazy_static::lazy_static;
use regex::Regex;

use crate::error::FieldErrors;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Absolute http(s) URL or a server-relative path.
pub fn is_valid_image_url(url: &str) -> bool {
    lazy_static! {
        static ref URL_RE: Regex = Regex::new(r"^(https?://[^\s/]+|/)[^\s]*$").unwrap();
    }
    URL_RE.is_match(url)
}

/// Trims `value` and records an error when it is empty or longer than `max` chars.
pub fn required_text(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    max: usize,
) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else {
        max_chars(errors, field, label, value, max);
    }
    value.to_string()
}

pub fn max_chars(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str, max: usize) {
    if value.chars().count() > max {
        errors.add(field, format!("{label} cannot be longer than {max} characters"));
    }
}
