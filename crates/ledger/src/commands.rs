//! Command structs for ledger operations.
//!
//! These types group parameters for the multi-field write operations
//! (contacts, transactions, repayments), keeping call sites readable and
//! avoiding long argument lists.
//!
//! Update commands use `None` for "keep the stored value". Nullable columns
//! get a dedicated `clear_*` builder so clearing and leaving-alone stay
//! distinct.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::{EntryKind, MoneyCents};

/// Create or fully replace a contact.
#[derive(Clone, Debug)]
pub struct ContactCmd {
    pub name: String,
    pub data: Value,
    pub groups: Vec<i64>,
}

impl ContactCmd {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Value::Object(serde_json::Map::new()),
            groups: Vec::new(),
        }
    }

    #[must_use]
    pub fn data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn groups(mut self, groups: Vec<i64>) -> Self {
        self.groups = groups;
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct TransactionCmd {
    pub label: String,
    pub contact: i64,
    pub kind: EntryKind,
    pub amount: MoneyCents,
    pub description: String,
    pub return_date: Option<DateTime<Utc>>,
    pub payment_method: Option<i64>,
    pub payment_source: Option<i64>,
    pub reference: Option<String>,
}

impl TransactionCmd {
    #[must_use]
    pub fn new(label: impl Into<String>, contact: i64, kind: EntryKind, amount: MoneyCents) -> Self {
        Self {
            label: label.into(),
            contact,
            kind,
            amount,
            description: String::new(),
            return_date: None,
            payment_method: None,
            payment_source: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn return_date(mut self, return_date: DateTime<Utc>) -> Self {
        self.return_date = Some(return_date);
        self
    }

    #[must_use]
    pub fn payment_method(mut self, payment_method: i64) -> Self {
        self.payment_method = Some(payment_method);
        self
    }

    #[must_use]
    pub fn payment_source(mut self, payment_source: i64) -> Self {
        self.payment_source = Some(payment_source);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Partially update a transaction.
///
/// `None` fields keep the stored value. `return_date`, `payment_source` and
/// `reference` are nullable columns, so they use a double `Option`: the outer
/// level is "touch or not", the inner level is the new value.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub label: Option<String>,
    pub contact: Option<i64>,
    pub kind: Option<EntryKind>,
    pub amount: Option<MoneyCents>,
    pub description: Option<String>,
    pub return_date: Option<Option<DateTime<Utc>>>,
    pub payment_method: Option<i64>,
    pub payment_source: Option<Option<i64>>,
    pub reference: Option<Option<String>>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: None,
            contact: None,
            kind: None,
            amount: None,
            description: None,
            return_date: None,
            payment_method: None,
            payment_source: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn contact(mut self, contact: i64) -> Self {
        self.contact = Some(contact);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: EntryKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn return_date(mut self, return_date: DateTime<Utc>) -> Self {
        self.return_date = Some(Some(return_date));
        self
    }

    #[must_use]
    pub fn clear_return_date(mut self) -> Self {
        self.return_date = Some(None);
        self
    }

    #[must_use]
    pub fn payment_method(mut self, payment_method: i64) -> Self {
        self.payment_method = Some(payment_method);
        self
    }

    #[must_use]
    pub fn payment_source(mut self, payment_source: i64) -> Self {
        self.payment_source = Some(Some(payment_source));
        self
    }

    #[must_use]
    pub fn clear_payment_source(mut self) -> Self {
        self.payment_source = Some(None);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(Some(reference.into()));
        self
    }

    #[must_use]
    pub fn clear_reference(mut self) -> Self {
        self.reference = Some(None);
        self
    }
}

/// Create a repayment against a transaction.
#[derive(Clone, Debug)]
pub struct RepaymentCmd {
    pub label: String,
    pub transaction: i64,
    pub amount: MoneyCents,
    pub remarks: String,
    pub payment_method: Option<i64>,
    pub payment_source: Option<i64>,
    pub reference: Option<String>,
}

impl RepaymentCmd {
    #[must_use]
    pub fn new(label: impl Into<String>, transaction: i64, amount: MoneyCents) -> Self {
        Self {
            label: label.into(),
            transaction,
            amount,
            remarks: String::new(),
            payment_method: None,
            payment_source: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = remarks.into();
        self
    }

    #[must_use]
    pub fn payment_method(mut self, payment_method: i64) -> Self {
        self.payment_method = Some(payment_method);
        self
    }

    #[must_use]
    pub fn payment_source(mut self, payment_source: i64) -> Self {
        self.payment_source = Some(payment_source);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Partially update a repayment.
#[derive(Clone, Debug)]
pub struct UpdateRepaymentCmd {
    pub label: Option<String>,
    pub transaction: Option<i64>,
    pub amount: Option<MoneyCents>,
    pub remarks: Option<String>,
    pub payment_method: Option<i64>,
    pub payment_source: Option<Option<i64>>,
    pub reference: Option<Option<String>>,
}

impl UpdateRepaymentCmd {
    #[must_use]
    pub fn new() -> Self {
        Self {
            label: None,
            transaction: None,
            amount: None,
            remarks: None,
            payment_method: None,
            payment_source: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn transaction(mut self, transaction: i64) -> Self {
        self.transaction = Some(transaction);
        self
    }

    #[must_use]
    pub fn amount(mut self, amount: MoneyCents) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    #[must_use]
    pub fn payment_method(mut self, payment_method: i64) -> Self {
        self.payment_method = Some(payment_method);
        self
    }

    #[must_use]
    pub fn payment_source(mut self, payment_source: i64) -> Self {
        self.payment_source = Some(Some(payment_source));
        self
    }

    #[must_use]
    pub fn clear_payment_source(mut self) -> Self {
        self.payment_source = Some(None);
        self
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(Some(reference.into()));
        self
    }

    #[must_use]
    pub fn clear_reference(mut self) -> Self {
        self.reference = Some(None);
        self
    }
}
