//! The module contains the errors the ledger can raise.
//!
//! Validation problems are collected per field into a [`ValidationReport`]
//! before the operation fails, so a single bad request reports every broken
//! field at once. The report serializes to the payload shape the API layer
//! returns, `{"field": ["message", ...]}`.
//!
//! Everything else is a plain enum variant:
//!
//! - [`NotFound`] when the target row is missing or owned by someone else
//!   (the two cases are deliberately indistinguishable).
//! - [`LockedForEdit`] when a settled row has aged past the edit window.
//!
//! [`NotFound`]: LedgerError::NotFound
//! [`LockedForEdit`]: LedgerError::LockedForEdit
use std::collections::BTreeMap;
use std::fmt;

use sea_orm::DbErr;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::util::EDIT_LOCK_DAYS;

/// Classifies a single field violation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    DuplicateName,
    DuplicateLabel,
    Permission,
    InvalidHierarchy,
    NoDefaultRemaining,
    NoPendingAmount,
    AmountExceedsPending,
    NotFound,
    Required,
    Invalid,
}

/// One violation on one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

/// Field-keyed violations collected by a failed operation.
///
/// Fields iterate in name order; violations on the same field keep the order
/// they were pushed in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidationReport {
    violations: BTreeMap<String, Vec<Violation>>,
}

impl ValidationReport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, kind: ViolationKind, message: impl Into<String>) {
        self.violations
            .entry(field.to_string())
            .or_default()
            .push(Violation {
                kind,
                message: message.into(),
            });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Violations recorded for one field (empty when the field is clean).
    #[must_use]
    pub fn field(&self, field: &str) -> &[Violation] {
        self.violations.get(field).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, field: &str, kind: ViolationKind) -> bool {
        self.field(field).iter().any(|v| v.kind == kind)
    }

    /// Fails with [`LedgerError::Validation`] if anything was collected.
    pub fn into_result(self) -> Result<(), LedgerError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, violations) in &self.violations {
            for violation in violations {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {}", violation.message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Serialize for ValidationReport {
    /// Emits the `{"field": ["message", ...]}` wire shape.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.violations.len()))?;
        for (field, violations) in &self.violations {
            let messages: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

/// Ledger custom errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(ValidationReport),
    #[error("\"{0}\" not found")]
    NotFound(String),
    #[error("locked for edit: settled and untouched for more than {EDIT_LOCK_DAYS} days")]
    LockedForEdit,
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl LedgerError {
    /// Shorthand for a report carrying exactly one violation.
    #[must_use]
    pub fn single(field: &str, kind: ViolationKind, message: impl Into<String>) -> Self {
        let mut report = ValidationReport::new();
        report.push(field, kind, message);
        Self::Validation(report)
    }
}

impl PartialEq for LedgerError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::LockedForEdit, Self::LockedForEdit) => true,
            (Self::InvalidTimezone(a), Self::InvalidTimezone(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_collects_in_push_order_per_field() {
        let mut report = ValidationReport::new();
        report.push("amount", ViolationKind::Invalid, "first");
        report.push("label", ViolationKind::Required, "blank");
        report.push("amount", ViolationKind::AmountExceedsPending, "second");

        let amount = report.field("amount");
        assert_eq!(amount.len(), 2);
        assert_eq!(amount[0].message, "first");
        assert_eq!(amount[1].message, "second");
        assert!(report.contains("label", ViolationKind::Required));
        assert!(!report.contains("label", ViolationKind::Invalid));
    }

    #[test]
    fn report_serializes_to_field_message_map() {
        let mut report = ValidationReport::new();
        report.push(
            "amount",
            ViolationKind::AmountExceedsPending,
            "The amount you entered exceeds the pending amount of 5.00",
        );
        report.push("label", ViolationKind::Required, "This field may not be blank.");

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "amount": ["The amount you entered exceeds the pending amount of 5.00"],
                "label": ["This field may not be blank."],
            })
        );
    }

    #[test]
    fn empty_report_is_ok() {
        assert!(ValidationReport::new().into_result().is_ok());

        let mut report = ValidationReport::new();
        report.push("name", ViolationKind::DuplicateName, "dup");
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }
}
