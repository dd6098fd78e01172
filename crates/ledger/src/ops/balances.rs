use sea_orm::{Statement, TransactionTrait, prelude::*};
use serde::Serialize;

use crate::{MoneyCents, ResultLedger};

use super::{Ledger, with_tx};

/// Per-contact totals for the outstanding balances report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactBalance {
    pub contact_id: i64,
    pub name: String,
    pub total_amount: MoneyCents,
    pub total_repaid: MoneyCents,
    pub outstanding: MoneyCents,
}

impl Ledger {
    /// Contacts that still owe or are owed money: everyone with a positive
    /// outstanding balance, largest first.
    ///
    /// Totals are summed per contact in independent subqueries, so contacts
    /// without repayments report a zero repaid total instead of dropping out,
    /// and a transaction's amount counts once no matter how many repayments
    /// hang off it.
    pub async fn outstanding_balances(&self, owner: &str) -> ResultLedger<Vec<ContactBalance>> {
        with_tx!(self, |db_tx| {
            let backend = self.database.get_database_backend();
            let stmt = Statement::from_sql_and_values(
                backend,
                "SELECT c.id AS contact_id, c.name AS name, \
                 COALESCE((SELECT SUM(t.amount_minor) FROM transactions t \
                     WHERE t.contact_id = c.id), 0) AS total_amount, \
                 COALESCE((SELECT SUM(r.amount_minor) FROM repayments r \
                     INNER JOIN transactions t ON r.transaction_id = t.id \
                     WHERE t.contact_id = c.id), 0) AS total_repaid \
                 FROM contacts c WHERE c.owner = ? ORDER BY c.id"
                    .to_string(),
                vec![owner.into()],
            );
            let rows = db_tx.query_all(stmt).await?;

            let mut balances = Vec::with_capacity(rows.len());
            for row in rows {
                let total_amount = MoneyCents::new(row.try_get("", "total_amount")?);
                let total_repaid = MoneyCents::new(row.try_get("", "total_repaid")?);
                let outstanding = total_amount - total_repaid;
                if !outstanding.is_positive() {
                    continue;
                }
                balances.push(ContactBalance {
                    contact_id: row.try_get("", "contact_id")?,
                    name: row.try_get("", "name")?,
                    total_amount,
                    total_repaid,
                    outstanding,
                });
            }
            balances.sort_by(|a, b| b.outstanding.cmp(&a.outstanding));
            Ok(balances)
        })
    }
}
