//! Field-level input validation.

use crate::error::{ShopError, ShopResult};
use std::collections::BTreeMap;

/// Field name to human-readable problem
pub type FieldErrors = BTreeMap<String, String>;

/// Collects field errors; only the first problem per field is kept.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message` for `field` unless `ok` holds
    pub fn check(&mut self, field: &str, ok: bool, message: &str) -> &mut Self {
        if !ok {
            self.errors
                .entry(field.to_string())
                .or_insert_with(|| message.to_string());
        }
        self
    }

    /// Field must contain something other than whitespace
    pub fn require(&mut self, field: &str, value: &str, message: &str) -> &mut Self {
        self.check(field, !value.trim().is_empty(), message)
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold in errors produced elsewhere (e.g. by the transport)
    pub fn merge(&mut self, other: FieldErrors) -> &mut Self {
        for (field, message) in other {
            self.errors.entry(field).or_insert(message);
        }
        self
    }

    /// `Ok(())` when nothing was recorded, otherwise a `Validation` error
    pub fn finish(self, message: &str) -> ShopResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ShopError::Validation {
                message: message.to_string(),
                errors: self.errors,
            })
        }
    }
}

/// Trim, drop empties and duplicates, keep first-seen order
pub fn normalize_set(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_error_per_field_wins() {
        let mut v = Validator::new();
        v.require("email", "", "Email is empty")
            .check("email", false, "Email is invalid");

        let err = v.finish("Could not create user.").unwrap_err();
        match err {
            ShopError::Validation { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors["email"], "Email is empty");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_clean_input_passes() {
        let mut v = Validator::new();
        v.require("name", "Ada", "Name is empty");
        assert!(v.is_valid());
        assert!(v.finish("irrelevant").is_ok());
    }

    #[test]
    fn test_normalize_set() {
        let sizes = normalize_set(vec![
            " S".into(),
            "M".into(),
            "".into(),
            "S".into(),
            "L ".into(),
        ]);
        assert_eq!(sizes, vec!["S", "M", "L"]);
    }
}
