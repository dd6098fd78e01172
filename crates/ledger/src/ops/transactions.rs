use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::commands::{TransactionCmd, UpdateTransactionCmd};
use crate::error::{LedgerError, ValidationReport, ViolationKind};
use crate::repayments::Repayment;
use crate::util::{MSG_NON_NEGATIVE, MSG_REQUIRED, edit_locked, invalid_pk};
use crate::{
    EntryKind, MoneyCents, ResultLedger, TransactionDetail, contacts, repayments, transactions,
};

use super::{Ledger, checked_name, normalize_optional_text, normalize_text, with_tx};

/// Filters for listing transactions.
///
/// `from` is inclusive and `to` is exclusive (`[from, to)`), both in UTC.
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub contact: Option<i64>,
    pub kind: Option<EntryKind>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

fn validate_list_filter(filter: &TransactionFilter) -> ResultLedger<()> {
    if let (Some(from), Some(to)) = (filter.from, filter.to)
        && from >= to
    {
        return Err(LedgerError::single(
            "date",
            ViolationKind::Invalid,
            "invalid range: from must be < to",
        ));
    }
    Ok(())
}

impl Ledger {
    /// Return a transaction with its computed pending amount and repayments.
    pub async fn transaction(
        &self,
        transaction_id: i64,
        owner: &str,
    ) -> ResultLedger<TransactionDetail> {
        with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, transaction_id, owner).await?;
            let repayments = self.repayments_of(&db_tx, transaction_id).await?;
            TransactionDetail::try_from((model, repayments))
        })
    }

    /// Return the caller's transactions in id order, optionally narrowed by
    /// contact, kind or date range.
    pub async fn transactions(
        &self,
        filter: &TransactionFilter,
        owner: &str,
    ) -> ResultLedger<Vec<TransactionDetail>> {
        validate_list_filter(filter)?;
        with_tx!(self, |db_tx| {
            let mut query = transactions::Entity::find()
                .inner_join(contacts::Entity)
                .filter(contacts::Column::Owner.eq(owner.to_string()));
            if let Some(contact) = filter.contact {
                query = query.filter(transactions::Column::ContactId.eq(contact));
            }
            if let Some(kind) = filter.kind {
                query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
            }
            if let Some(from) = filter.from {
                query = query.filter(transactions::Column::Date.gte(from));
            }
            if let Some(to) = filter.to {
                query = query.filter(transactions::Column::Date.lt(to));
            }

            let models = query
                .order_by_asc(transactions::Column::Id)
                .all(&db_tx)
                .await?;

            let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
            let mut linked: HashMap<i64, Vec<Repayment>> = HashMap::new();
            if !ids.is_empty() {
                let rows = repayments::Entity::find()
                    .filter(repayments::Column::TransactionId.is_in(ids))
                    .order_by_asc(repayments::Column::Id)
                    .all(&db_tx)
                    .await?;
                for row in rows {
                    linked
                        .entry(row.transaction_id)
                        .or_default()
                        .push(Repayment::from(row));
                }
            }

            models
                .into_iter()
                .map(|model| {
                    let repayments = linked.remove(&model.id).unwrap_or_default();
                    TransactionDetail::try_from((model, repayments))
                })
                .collect()
        })
    }

    /// Record a new transaction against a contact.
    ///
    /// When no payment method is named the caller's default is used, then
    /// the lowest-id common method. The transaction date is set to now; only
    /// the expected return date is caller-controlled.
    pub async fn new_transaction(&self, cmd: TransactionCmd, owner: &str) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", &cmd.label);
        if cmd.amount.is_negative() {
            report.push("amount", ViolationKind::Invalid, MSG_NON_NEGATIVE);
        }
        with_tx!(self, |db_tx| {
            let contact_ok = contacts::Entity::find_by_id(cmd.contact)
                .filter(contacts::Column::Owner.eq(owner.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            if !contact_ok {
                report.push("contact", ViolationKind::NotFound, invalid_pk(cmd.contact));
            }
            let method_id = self
                .resolve_payment_method(&db_tx, cmd.payment_method, owner, &mut report)
                .await?;
            self.check_payment_source(&db_tx, cmd.payment_source, owner, &mut report)
                .await?;
            report.into_result()?;
            let Some(method_id) = method_id else {
                return Err(LedgerError::single(
                    "payment_method",
                    ViolationKind::Required,
                    MSG_REQUIRED,
                ));
            };

            let transaction = transactions::ActiveModel {
                label: ActiveValue::Set(label),
                contact_id: ActiveValue::Set(cmd.contact),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                amount_minor: ActiveValue::Set(cmd.amount.cents()),
                description: ActiveValue::Set(normalize_text(&cmd.description)),
                date: ActiveValue::Set(now),
                return_date: ActiveValue::Set(cmd.return_date),
                payment_method_id: ActiveValue::Set(method_id),
                payment_source_id: ActiveValue::Set(cmd.payment_source),
                reference: ActiveValue::Set(normalize_optional_text(cmd.reference.as_deref())),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let transaction = transaction.insert(&db_tx).await?;
            tracing::info!(owner, transaction = transaction.id, "created transaction");
            Ok(transaction.id)
        })
    }

    /// Partially update a transaction.
    ///
    /// A settled transaction left untouched past the edit window refuses the
    /// update outright; reads and deletes stay open. The transaction date
    /// moves to now on every successful update.
    pub async fn update_transaction(
        &self,
        transaction_id: i64,
        cmd: UpdateTransactionCmd,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let model = self.require_transaction(&db_tx, transaction_id, owner).await?;

            let now_local = self.owner_now(&db_tx, owner).await?;
            let repaid = self.repaid_total(&db_tx, transaction_id, None).await?;
            let pending = MoneyCents::new(model.amount_minor) - repaid;
            if edit_locked(pending, model.updated_at, now_local) {
                return Err(LedgerError::LockedForEdit);
            }

            let mut report = ValidationReport::new();
            let label = cmd
                .label
                .as_deref()
                .map(|label| checked_name(&mut report, "label", label));
            if let Some(amount) = cmd.amount
                && amount.is_negative()
            {
                report.push("amount", ViolationKind::Invalid, MSG_NON_NEGATIVE);
            }
            if let Some(contact) = cmd.contact {
                let contact_ok = contacts::Entity::find_by_id(contact)
                    .filter(contacts::Column::Owner.eq(owner.to_string()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                if !contact_ok {
                    report.push("contact", ViolationKind::NotFound, invalid_pk(contact));
                }
            }
            let method_id = match cmd.payment_method {
                Some(requested) => {
                    self.resolve_payment_method(&db_tx, Some(requested), owner, &mut report)
                        .await?
                }
                None => None,
            };
            if let Some(source) = cmd.payment_source {
                self.check_payment_source(&db_tx, source, owner, &mut report)
                    .await?;
            }
            report.into_result()?;

            let mut active = transactions::ActiveModel {
                id: ActiveValue::Set(transaction_id),
                date: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            if let Some(label) = label {
                active.label = ActiveValue::Set(label);
            }
            if let Some(contact) = cmd.contact {
                active.contact_id = ActiveValue::Set(contact);
            }
            if let Some(kind) = cmd.kind {
                active.kind = ActiveValue::Set(kind.as_str().to_string());
            }
            if let Some(amount) = cmd.amount {
                active.amount_minor = ActiveValue::Set(amount.cents());
            }
            if let Some(description) = cmd.description.as_deref() {
                active.description = ActiveValue::Set(normalize_text(description));
            }
            if let Some(return_date) = cmd.return_date {
                active.return_date = ActiveValue::Set(return_date);
            }
            if let Some(method_id) = method_id {
                active.payment_method_id = ActiveValue::Set(method_id);
            }
            if let Some(source) = cmd.payment_source {
                active.payment_source_id = ActiveValue::Set(source);
            }
            if let Some(reference) = cmd.reference {
                active.reference = ActiveValue::Set(normalize_optional_text(reference.as_deref()));
            }
            active.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete a transaction and its repayments. Deletes are never locked.
    pub async fn delete_transaction(&self, transaction_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            self.require_transaction(&db_tx, transaction_id, owner).await?;
            transactions::Entity::delete_by_id(transaction_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(owner, transaction = transaction_id, "deleted transaction");
            Ok(())
        })
    }

    pub(super) async fn repayments_of(
        &self,
        db: &DatabaseTransaction,
        transaction_id: i64,
    ) -> ResultLedger<Vec<Repayment>> {
        let rows = repayments::Entity::find()
            .filter(repayments::Column::TransactionId.eq(transaction_id))
            .order_by_asc(repayments::Column::Id)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(Repayment::from).collect())
    }
}
