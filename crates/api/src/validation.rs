//! Request validation helpers.
//!
//! Handlers collect every problem with a request into [`FieldErrors`] and
//! fail once, so clients see all invalid fields together.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use storekeep_core::validate_amount;

use crate::error::AppError;

/// Largest value an `INTEGER` column accepts.
pub const MAX_COUNT: u32 = i32::MAX.unsigned_abs();

/// Per-field validation messages, keyed by camelCase field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-field error set.
    #[must_use]
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a message for a field. The first message per field wins.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Trim a required text field and bound its length.
    pub fn text(&mut self, field: &str, value: &str, max: usize) -> String {
        let value = value.trim();
        if value.is_empty() {
            self.add(field, "is required");
        } else if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
        value.to_string()
    }

    /// Trim an optional text field; blank becomes `None`.
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max: usize) -> Option<String> {
        let value = value.map(str::trim).filter(|v| !v.is_empty())?;
        if value.chars().count() > max {
            self.add(field, format!("must be at most {max} characters"));
        }
        Some(value.to_string())
    }

    /// Check a non-negative amount in whole cents.
    pub fn amount(&mut self, field: &str, value: Decimal) -> Decimal {
        if let Err(e) = validate_amount(value) {
            self.add(field, e.to_string());
        }
        value
    }

    /// Check a strictly positive amount in whole cents.
    pub fn positive_amount(&mut self, field: &str, value: Decimal) -> Decimal {
        if value <= Decimal::ZERO {
            self.add(field, "must be greater than 0");
        }
        self.amount(field, value)
    }

    /// Check a count that is stored in an `INTEGER` column.
    pub fn count(&mut self, field: &str, value: u32) -> u32 {
        if value > MAX_COUNT {
            self.add(field, format!("must be at most {MAX_COUNT}"));
        }
        value
    }

    /// Fail with `VALIDATION_ERROR` if anything was recorded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` carrying every recorded message.
    pub fn finish(self) -> Result<(), AppError> {
        if self.is_empty() {
            return Ok(());
        }
        Err(AppError::Validation {
            message: "Validation failed".to_string(),
            fields: Some(self),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_text_trims_and_requires() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.text("name", "  Mug  ", 10), "Mug");
        assert!(errors.is_empty());

        errors.text("category", "   ", 10);
        errors.text("name", &"x".repeat(11), 10);
        assert_eq!(errors.get("category"), Some("is required"));
        assert_eq!(errors.get("name"), Some("must be at most 10 characters"));
    }

    #[test]
    fn test_optional_text_blank_is_none() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.optional_text("line2", Some("  "), 10), None);
        assert_eq!(errors.optional_text("line2", None, 10), None);
        assert_eq!(
            errors.optional_text("line2", Some(" Apt 4 "), 10),
            Some("Apt 4".to_string())
        );
        assert!(errors.is_empty());
    }

    #[test]
    fn test_amounts() {
        let mut errors = FieldErrors::new();
        errors.amount("price", Decimal::new(1999, 2));
        assert!(errors.is_empty());

        errors.amount("price", Decimal::new(-1, 0));
        errors.positive_amount("discount", Decimal::ZERO);
        errors.amount("fee", Decimal::new(1001, 3));
        assert_eq!(errors.get("price"), Some("amount cannot be negative"));
        assert_eq!(errors.get("discount"), Some("must be greater than 0"));
        assert!(errors.get("fee").is_some());
    }

    #[test]
    fn test_amount_beyond_column_range() {
        let mut errors = FieldErrors::new();
        errors.amount("price", Decimal::new(100_000_000_000, 0));
        errors.positive_amount("discount", Decimal::new(100_000_000_000, 0));
        assert_eq!(errors.get("price"), Some("amount cannot exceed 9999999999.99"));
        assert!(errors.get("discount").is_some());
    }

    #[test]
    fn test_count_fits_integer_column() {
        let mut errors = FieldErrors::new();
        assert_eq!(errors.count("stock", MAX_COUNT), MAX_COUNT);
        assert!(errors.is_empty());

        errors.count("stock", u32::MAX);
        assert_eq!(errors.get("stock"), Some("must be at most 2147483647"));
    }

    #[test]
    fn test_finish() {
        assert!(FieldErrors::new().finish().is_ok());

        let err = FieldErrors::single("email", "is required").finish().unwrap_err();
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }
}
