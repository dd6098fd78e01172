use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*,
};

use crate::commands::{RepaymentCmd, UpdateRepaymentCmd};
use crate::error::{LedgerError, ValidationReport, ViolationKind};
use crate::util::{MSG_NON_NEGATIVE, MSG_REQUIRED, edit_locked, invalid_pk};
use crate::{MoneyCents, Repayment, ResultLedger, contacts, repayments, transactions};

use super::{Ledger, checked_name, normalize_optional_text, normalize_text, with_tx};

const MSG_NO_PENDING: &str = "You do not have any amounts pending in this transaction";

fn exceeds_pending(pending: MoneyCents) -> String {
    format!("The amount you entered exceeds the pending amount of {pending}")
}

impl Ledger {
    /// Return a repayment.
    pub async fn repayment(&self, repayment_id: i64, owner: &str) -> ResultLedger<Repayment> {
        with_tx!(self, |db_tx| {
            let (model, _) = self.require_repayment(&db_tx, repayment_id, owner).await?;
            Ok(Repayment::from(model))
        })
    }

    /// Return the caller's repayments in id order, optionally narrowed to
    /// one transaction.
    pub async fn repayments(
        &self,
        transaction: Option<i64>,
        owner: &str,
    ) -> ResultLedger<Vec<Repayment>> {
        with_tx!(self, |db_tx| {
            let mut query = repayments::Entity::find()
                .join(JoinType::InnerJoin, repayments::Relation::Transactions.def())
                .join(JoinType::InnerJoin, transactions::Relation::Contacts.def())
                .filter(contacts::Column::Owner.eq(owner.to_string()));
            if let Some(transaction_id) = transaction {
                query = query.filter(repayments::Column::TransactionId.eq(transaction_id));
            }
            let models = query
                .order_by_asc(repayments::Column::Id)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Repayment::from).collect())
        })
    }

    /// Record a repayment against a transaction.
    ///
    /// The repayment must fit inside the transaction's pending amount: a
    /// settled transaction takes no further repayments, and one that would
    /// overshoot what is left is rejected.
    pub async fn new_repayment(&self, cmd: RepaymentCmd, owner: &str) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", &cmd.label);
        if cmd.amount.is_negative() {
            report.push("amount", ViolationKind::Invalid, MSG_NON_NEGATIVE);
        }
        with_tx!(self, |db_tx| {
            let transaction = self
                .find_owned_transaction(&db_tx, cmd.transaction, owner)
                .await?;
            if transaction.is_none() {
                report.push(
                    "transaction",
                    ViolationKind::NotFound,
                    invalid_pk(cmd.transaction),
                );
            }
            let method_id = self
                .resolve_payment_method(&db_tx, cmd.payment_method, owner, &mut report)
                .await?;
            self.check_payment_source(&db_tx, cmd.payment_source, owner, &mut report)
                .await?;

            if let Some(tx_model) = &transaction {
                self.check_pending_fits(&db_tx, tx_model, None, cmd.amount, &mut report)
                    .await?;
            }
            report.into_result()?;
            let Some(transaction) = transaction else {
                return Err(LedgerError::single(
                    "transaction",
                    ViolationKind::NotFound,
                    invalid_pk(cmd.transaction),
                ));
            };
            let Some(method_id) = method_id else {
                return Err(LedgerError::single(
                    "payment_method",
                    ViolationKind::Required,
                    MSG_REQUIRED,
                ));
            };

            let repayment = repayments::ActiveModel {
                label: ActiveValue::Set(label),
                transaction_id: ActiveValue::Set(transaction.id),
                amount_minor: ActiveValue::Set(cmd.amount.cents()),
                remarks: ActiveValue::Set(normalize_text(&cmd.remarks)),
                date: ActiveValue::Set(now),
                payment_method_id: ActiveValue::Set(method_id),
                payment_source_id: ActiveValue::Set(cmd.payment_source),
                reference: ActiveValue::Set(normalize_optional_text(cmd.reference.as_deref())),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let repayment = repayment.insert(&db_tx).await?;
            tracing::info!(owner, repayment = repayment.id, "created repayment");
            Ok(repayment.id)
        })
    }

    /// Partially update a repayment.
    ///
    /// The pending check excludes this repayment's stored amount, so growing
    /// or shrinking it revalidates against what the siblings left over. Once
    /// the parent transaction is settled and this repayment has sat untouched
    /// past the edit window, the update is refused.
    pub async fn update_repayment(
        &self,
        repayment_id: i64,
        cmd: UpdateRepaymentCmd,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            let (model, parent) = self.require_repayment(&db_tx, repayment_id, owner).await?;

            let now_local = self.owner_now(&db_tx, owner).await?;
            let repaid = self.repaid_total(&db_tx, parent.id, None).await?;
            let parent_pending = MoneyCents::new(parent.amount_minor) - repaid;
            if edit_locked(parent_pending, model.updated_at, now_local) {
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

            // Moving the repayment to another transaction revalidates the
            // amount against the destination.
            let target = match cmd.transaction {
                Some(transaction_id) if transaction_id != model.transaction_id => {
                    match self
                        .find_owned_transaction(&db_tx, transaction_id, owner)
                        .await?
                    {
                        Some(destination) => Some(destination),
                        None => {
                            report.push(
                                "transaction",
                                ViolationKind::NotFound,
                                invalid_pk(transaction_id),
                            );
                            None
                        }
                    }
                }
                _ => Some(parent.clone()),
            };

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

            if let Some(target) = &target {
                let amount = cmd.amount.unwrap_or(MoneyCents::new(model.amount_minor));
                let exclude = (target.id == model.transaction_id).then_some(model.id);
                self.check_pending_fits(&db_tx, target, exclude, amount, &mut report)
                    .await?;
            }
            report.into_result()?;
            let Some(target) = target else {
                return Err(LedgerError::NotFound("transaction".to_string()));
            };

            let mut active = repayments::ActiveModel {
                id: ActiveValue::Set(repayment_id),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            if let Some(label) = label {
                active.label = ActiveValue::Set(label);
            }
            if target.id != model.transaction_id {
                active.transaction_id = ActiveValue::Set(target.id);
            }
            if let Some(amount) = cmd.amount {
                active.amount_minor = ActiveValue::Set(amount.cents());
            }
            if let Some(remarks) = cmd.remarks.as_deref() {
                active.remarks = ActiveValue::Set(normalize_text(remarks));
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

    /// Delete a repayment; the transaction's pending amount grows back by
    /// the removed amount. Deletes are never locked.
    pub async fn delete_repayment(&self, repayment_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            self.require_repayment(&db_tx, repayment_id, owner).await?;
            repayments::Entity::delete_by_id(repayment_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(owner, repayment = repayment_id, "deleted repayment");
            Ok(())
        })
    }

    /// Pushes the pending-amount violations for recording `amount` against
    /// `transaction`. `exclude` leaves one repayment out of the paid total.
    async fn check_pending_fits(
        &self,
        db: &DatabaseTransaction,
        transaction: &transactions::Model,
        exclude: Option<i64>,
        amount: MoneyCents,
        report: &mut ValidationReport,
    ) -> ResultLedger<()> {
        let repaid = self.repaid_total(db, transaction.id, exclude).await?;
        let pending = MoneyCents::new(transaction.amount_minor) - repaid;
        if pending.is_zero() {
            report.push("amount", ViolationKind::NoPendingAmount, MSG_NO_PENDING);
        } else if amount > pending {
            report.push(
                "amount",
                ViolationKind::AmountExceedsPending,
                exceeds_pending(pending),
            );
        }
        Ok(())
    }
}
