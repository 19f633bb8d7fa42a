//! Aggregate view of field errors for display.

use std::fmt;

use fde_model::FieldErrors;
use serde::Serialize;

/// Display-ready overview of a form's errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub error_count: usize,
    pub entries: Vec<SummaryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub field: String,
    pub message: String,
}

impl ValidationSummary {
    /// Entries are ordered by field name.
    pub fn from_errors(errors: &FieldErrors) -> Self {
        let entries: Vec<SummaryEntry> = errors
            .iter()
            .map(|(field, message)| SummaryEntry {
                field: field.clone(),
                message: message.clone(),
            })
            .collect();
        Self {
            error_count: entries.len(),
            entries,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error_count == 0
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.field.as_str())
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_count {
            0 => write!(f, "no errors"),
            1 => write!(f, "1 error"),
            n => write!(f, "{n} errors"),
        }?;
        for entry in &self.entries {
            write!(f, "\n  {}: {}", entry.field, entry.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_orders_entries() {
        let errors = FieldErrors::from([
            ("zip".to_string(), "Invalid ZIP".to_string()),
            ("email".to_string(), "Invalid email".to_string()),
        ]);
        let summary = ValidationSummary::from_errors(&errors);

        assert_eq!(summary.error_count, 2);
        assert!(!summary.is_valid());
        assert_eq!(summary.fields().collect::<Vec<_>>(), ["email", "zip"]);
        assert_eq!(
            summary.to_string(),
            "2 errors\n  email: Invalid email\n  zip: Invalid ZIP"
        );
    }

    #[test]
    fn test_empty_summary_is_valid() {
        let summary = ValidationSummary::from_errors(&FieldErrors::new());
        assert!(summary.is_valid());
        assert_eq!(summary.to_string(), "no errors");
    }
}
