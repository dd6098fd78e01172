use sea_orm::DatabaseConnection;

use crate::error::{ValidationReport, ViolationKind};
use crate::util::MSG_BLANK;
use crate::ResultLedger;

mod access;
mod balances;
mod contacts;
mod groups;
mod payment_methods;
mod payment_sources;
mod repayments;
mod transactions;

pub use balances::ContactBalance;
pub use transactions::TransactionFilter;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Ledger {
    database: DatabaseConnection,
}

impl Ledger {
    /// Return a builder for `Ledger`. Help to build the struct.
    pub fn builder() -> LedgerBuilder {
        LedgerBuilder::default()
    }
}

/// Trim a required name field, recording a blank violation in the report.
///
/// The returned string is always the trimmed input so later checks (duplicate
/// probes) run on the value that would be stored.
fn checked_name(report: &mut ValidationReport, field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        report.push(field, ViolationKind::Required, MSG_BLANK);
    }
    trimmed.to_string()
}

fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Ledger`
#[derive(Default)]
pub struct LedgerBuilder {
    database: DatabaseConnection,
}

impl LedgerBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> LedgerBuilder {
        self.database = db;
        self
    }

    /// Construct `Ledger`
    pub async fn build(self) -> ResultLedger<Ledger> {
        Ok(Ledger {
            database: self.database,
        })
    }
}
