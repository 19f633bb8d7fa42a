//! Ready-made cross-field rules and conditional fields.

use fde_model::{FormValues, is_empty_value};
use serde_json::Value;

use crate::checks::parse_date;
use crate::conditional::ConditionalField;
use crate::rule::ValidationRule;

/// `confirm` must equal `password`.
pub fn confirm_password(password: &str, confirm: &str) -> ValidationRule {
    let password = password.to_string();
    ValidationRule::new(confirm, "Passwords do not match", move |value, values| {
        values.value(&password) == *value
    })
}

/// `end` must be a date strictly after `start`.
///
/// Passes while either field is empty. Fails when either is not a date.
pub fn date_range(start: &str, end: &str) -> ValidationRule {
    let start = start.to_string();
    ValidationRule::new(end, "End date must be after start date", move |value, values| {
        let start_value = values.value(&start);
        if is_empty_value(value) || is_empty_value(&start_value) {
            return true;
        }
        let parsed_start = start_value.as_str().and_then(parse_date);
        let parsed_end = value.as_str().and_then(parse_date);
        matches!((parsed_start, parsed_end), (Some(s), Some(e)) if e > s)
    })
}

/// `field` must be non-empty whenever `condition` holds.
pub fn conditional_required<F>(field: &str, condition: F, message: &str) -> ValidationRule
where
    F: Fn(&FormValues) -> bool + Send + Sync + 'static,
{
    ValidationRule::new(field, message, move |value, values| {
        !condition(values) || !is_empty_value(value)
    })
}

/// `target` is visible and required while `trigger` is truthy.
pub fn show_when_checked(trigger: &str, target: &str) -> ConditionalField {
    let visible = trigger.to_string();
    let required = trigger.to_string();
    ConditionalField::new(target, move |values| values.is_truthy(&visible))
        .required_when(move |values| values.is_truthy(&required))
}

/// `target` is visible and required while `trigger` equals `expected`.
pub fn show_when_equals(trigger: &str, target: &str, expected: impl Into<Value>) -> ConditionalField {
    let expected = expected.into();
    let (visible_trigger, visible_expected) = (trigger.to_string(), expected.clone());
    let required_trigger = trigger.to_string();
    ConditionalField::new(target, move |values| {
        values.get(&visible_trigger) == Some(&visible_expected)
    })
    .required_when(move |values| values.get(&required_trigger) == Some(&expected))
}

/// `target` is visible while `trigger` has a value. Never required.
pub fn show_when_not_empty(trigger: &str, target: &str) -> ConditionalField {
    let trigger = trigger.to_string();
    ConditionalField::new(target, move |values| !values.is_field_empty(&trigger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditional::compute;
    use serde_json::json;

    #[test]
    fn test_confirm_password() {
        let rule = confirm_password("password", "confirm");
        assert_eq!(rule.field(), "confirm");

        let mismatch = FormValues::from([("password", json!("abc")), ("confirm", json!("abd"))]);
        assert_eq!(rule.check(&mismatch).as_deref(), Some("Passwords do not match"));

        let matching = FormValues::from([("password", json!("abc")), ("confirm", json!("abc"))]);
        assert_eq!(rule.check(&matching), None);
    }

    #[test]
    fn test_date_range() {
        let rule = date_range("start", "end");
        let values = |start: &str, end: &str| {
            FormValues::from([("start", json!(start)), ("end", json!(end))])
        };

        assert_eq!(rule.check(&values("2024-01-01", "2024-01-02")), None);
        assert_eq!(
            rule.check(&values("2024-01-02", "2024-01-02")).as_deref(),
            Some("End date must be after start date")
        );
        assert!(rule.check(&values("2024-01-01", "soon")).is_some());
        assert_eq!(rule.check(&values("", "2024-01-02")), None);
    }

    #[test]
    fn test_conditional_required() {
        let rule = conditional_required(
            "vatNumber",
            |values| values.str("country") == Some("DE"),
            "VAT number is required in Germany",
        );
        let mut values = FormValues::from([("country", json!("FR")), ("vatNumber", json!(""))]);
        assert_eq!(rule.check(&values), None);

        values.insert("country", "DE");
        assert_eq!(
            rule.check(&values).as_deref(),
            Some("VAT number is required in Germany")
        );
    }

    #[test]
    fn test_conditional_presets() {
        let specs = vec![
            show_when_checked("newsletter", "email"),
            show_when_equals("contact", "phone", "phone"),
            show_when_not_empty("company", "companySize"),
        ];

        let values = FormValues::from([
            ("newsletter", json!(true)),
            ("contact", json!("email")),
            ("company", json!("Acme")),
        ]);
        let flags = compute(&values, &specs);

        assert!(flags["email"].visible && flags["email"].required);
        assert!(!flags["phone"].visible && !flags["phone"].required);
        assert!(flags["companySize"].visible && !flags["companySize"].required);
    }
}
