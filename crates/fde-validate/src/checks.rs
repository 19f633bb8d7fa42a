//! Single-field checks.
//!
//! Each check takes a field value and returns a [`Verdict`], so it can be
//! passed straight to [`ValidationRule::single`]. Empty values pass; use the
//! required flag of a conditional field to demand a value.
//!
//! [`ValidationRule::single`]: crate::ValidationRule::single

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use fde_model::is_empty_value;
use regex::Regex;
use serde_json::Value;

use crate::rule::Verdict;

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("Invalid email regex"));

static URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://[^\s/?#]+[^\s]*$").expect("Invalid URL regex")
});

static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[\d\s\-\(\)]{10,}$").expect("Invalid phone regex"));

/// Free-mail domains rejected by [`business_email`].
const FREE_MAIL_DOMAINS: &[&str] = &["@gmail.com", "@yahoo.com"];

/// At least 8 characters with upper, lower, digit, and special characters.
///
/// Reports the first requirement that is not met.
pub fn strong_password(value: &Value) -> Verdict {
    let Some(password) = text(value) else {
        return Verdict::Pass;
    };
    let requirements: [(bool, &str); 5] = [
        (
            password.chars().count() >= 8,
            "Password must be at least 8 characters",
        ),
        (
            password.chars().any(|c| c.is_ascii_uppercase()),
            "Password must contain at least one uppercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_lowercase()),
            "Password must contain at least one lowercase letter",
        ),
        (
            password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one number",
        ),
        (
            password.chars().any(|c| !c.is_ascii_alphanumeric()),
            "Password must contain at least one special character",
        ),
    ];
    requirements
        .into_iter()
        .find(|(met, _)| !met)
        .map_or(Verdict::Pass, |(_, message)| message.into())
}

/// A valid email address outside the free-mail domains.
pub fn business_email(value: &Value) -> Verdict {
    let Some(email) = text(value) else {
        return Verdict::Pass;
    };
    if !EMAIL_REGEX.is_match(email) {
        return "Please enter a valid email address".into();
    }
    let lower = email.to_ascii_lowercase();
    if FREE_MAIL_DOMAINS.iter().any(|domain| lower.ends_with(domain)) {
        return "Please use a business email address".into();
    }
    Verdict::Pass
}

/// An absolute URL using the `https` scheme.
pub fn https_url(value: &Value) -> Verdict {
    let Some(url) = text(value) else {
        return Verdict::Pass;
    };
    if !URL_REGEX.is_match(url) {
        return "Please enter a valid URL".into();
    }
    if !url.starts_with("https://") {
        return "URL must use HTTPS".into();
    }
    Verdict::Pass
}

/// Ten or more digits, spaces, dashes, or parentheses with an optional `+`.
pub fn phone_number(value: &Value) -> Verdict {
    match text(value) {
        Some(phone) if !PHONE_REGEX.is_match(phone) => "Please enter a valid phone number".into(),
        _ => Verdict::Pass,
    }
}

/// A list with at least `min` items. An absent value counts as empty.
pub fn min_items(min: usize) -> impl Fn(&Value) -> Verdict + Send + Sync + 'static {
    move |value: &Value| -> Verdict {
        let count = match value {
            Value::Array(items) => items.len(),
            Value::Null => 0,
            _ => return "Expected a list".into(),
        };
        if count < min {
            format!("Please select at least {min} item(s)").into()
        } else {
            Verdict::Pass
        }
    }
}

/// A date or timestamp later than now.
pub fn future_date(value: &Value) -> Verdict {
    let Some(raw) = text(value) else {
        return Verdict::Pass;
    };
    match parse_date(raw) {
        Some(date) if date > fde_common::now() => Verdict::Pass,
        Some(_) => "Date must be in the future".into(),
        None => "Please enter a valid date".into(),
    }
}

/// Parse an RFC 3339 timestamp or a plain `YYYY-MM-DD` date (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Password strength score from 0 to 5, one point per criterion met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PasswordStrength(u8);

impl PasswordStrength {
    pub fn score(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            0 | 1 => "Very Weak",
            2 => "Weak",
            3 => "Fair",
            4 => "Good",
            _ => "Strong",
        }
    }
}

impl fmt::Display for PasswordStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Score a password against the criteria of [`strong_password`].
pub fn password_strength(password: &str) -> PasswordStrength {
    let criteria = [
        password.chars().count() >= 8,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_lowercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_ascii_alphanumeric()),
    ];
    PasswordStrength(criteria.into_iter().filter(|met| *met).count() as u8)
}

/// Non-empty string content of a value. Non-string values yield `None`.
fn text(value: &Value) -> Option<&str> {
    if is_empty_value(value) {
        return None;
    }
    value.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(verdict: Verdict) -> Option<String> {
        verdict.into_error("unused")
    }

    #[test]
    fn test_strong_password_reports_first_missing_requirement() {
        assert_eq!(
            message(strong_password(&json!("short"))).as_deref(),
            Some("Password must be at least 8 characters")
        );
        assert_eq!(
            message(strong_password(&json!("lowercase1!"))).as_deref(),
            Some("Password must contain at least one uppercase letter")
        );
        assert_eq!(
            message(strong_password(&json!("NoDigits!!"))).as_deref(),
            Some("Password must contain at least one number")
        );
        assert_eq!(message(strong_password(&json!("Secr3t!pass"))), None);
        assert_eq!(message(strong_password(&json!(""))), None);
    }

    #[test]
    fn test_business_email() {
        assert_eq!(
            message(business_email(&json!("not-an-email"))).as_deref(),
            Some("Please enter a valid email address")
        );
        assert_eq!(
            message(business_email(&json!("ada@Gmail.com"))).as_deref(),
            Some("Please use a business email address")
        );
        assert_eq!(message(business_email(&json!("ada@acme.io"))), None);
    }

    #[test]
    fn test_https_url() {
        assert_eq!(
            message(https_url(&json!("example"))).as_deref(),
            Some("Please enter a valid URL")
        );
        assert_eq!(
            message(https_url(&json!("http://example.com"))).as_deref(),
            Some("URL must use HTTPS")
        );
        assert_eq!(message(https_url(&json!("https://example.com/a?b=c"))), None);
    }

    #[test]
    fn test_phone_number() {
        assert_eq!(message(phone_number(&json!("+1 (555) 010-9999"))), None);
        assert_eq!(
            message(phone_number(&json!("555-01"))).as_deref(),
            Some("Please enter a valid phone number")
        );
        assert_eq!(
            message(phone_number(&json!("555-010-999x"))).as_deref(),
            Some("Please enter a valid phone number")
        );
    }

    #[test]
    fn test_min_items() {
        let check = min_items(2);
        assert_eq!(
            message(check(&json!(["a"]))).as_deref(),
            Some("Please select at least 2 item(s)")
        );
        assert!(message(check(&Value::Null)).is_some());
        assert_eq!(message(check(&json!(["a", "b"]))), None);
    }

    #[test]
    fn test_future_date() {
        assert_eq!(message(future_date(&json!("2999-01-01"))), None);
        assert_eq!(
            message(future_date(&json!("2000-01-01"))).as_deref(),
            Some("Date must be in the future")
        );
        assert_eq!(
            message(future_date(&json!("tomorrow"))).as_deref(),
            Some("Please enter a valid date")
        );
    }

    #[test]
    fn test_parse_date_accepts_both_forms() {
        assert!(parse_date("2024-02-29").is_some());
        assert!(parse_date("2024-02-29T10:00:00+02:00").is_some());
        assert!(parse_date("2024-02-30").is_none());
    }

    #[test]
    fn test_password_strength_labels() {
        assert_eq!(password_strength("").label(), "Very Weak");
        assert_eq!(password_strength("abc").label(), "Very Weak");
        assert_eq!(password_strength("abcABC").label(), "Weak");
        assert_eq!(password_strength("abcdefgh1").score(), 3);
        assert_eq!(password_strength("Abcdefgh1").label(), "Good");
        assert_eq!(password_strength("Abcdefgh1!").to_string(), "Strong");
    }
}
