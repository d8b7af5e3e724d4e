//! Character rules for usernames and subject names.
//!
//! All names share the same shape constraints: non-empty, never starting
//! with a digit, `.` or `_`, never ending with `.` or `_`, and no digit
//! directly next to an underscore. They differ only in the allowed alphabet.

use super::error::CoreError;

fn shaped(value: &str, allowed: impl Fn(char) -> bool) -> bool {
    let chars: Vec<char> = value.chars().collect();
    let (Some(first), Some(last)) = (chars.first(), chars.last()) else {
        return false;
    };
    if first.is_ascii_digit() || matches!(first, '.' | '_') || matches!(last, '.' | '_') {
        return false;
    }
    let digit_next_to_underscore = chars
        .windows(2)
        .any(|w| (w[0].is_ascii_digit() && w[1] == '_') || (w[0] == '_' && w[1].is_ascii_digit()));
    !digit_next_to_underscore && chars.iter().all(|c| allowed(*c))
}

fn check(field: &str, value: &str, allowed: impl Fn(char) -> bool, hint: &str) -> Result<(), CoreError> {
    if shaped(value, allowed) {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!("Invalid {}: {}", field, hint)))
    }
}

pub fn username(value: &str) -> Result<(), CoreError> {
    check(
        "username",
        value,
        |c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_',
        "allow only lowercase english characters, digits and underscore",
    )
}

pub fn full_name(value: &str) -> Result<(), CoreError> {
    check("full_name", value, |c| c.is_ascii_alphabetic() || c == ' ', "allow only english characters")
}

/// Organization and intermediate names
pub fn subject(value: &str) -> Result<(), CoreError> {
    check(
        "name",
        value,
        |c| c.is_ascii_alphanumeric() || c == ' ',
        "allow only english characters, digits and spaces",
    )
}

pub fn terminal_subject(value: &str) -> Result<(), CoreError> {
    check(
        "name",
        value,
        |c| c.is_ascii_alphanumeric() || c == ' ' || c == '_',
        "allow only english characters, digits, spaces and underscore",
    )
}
