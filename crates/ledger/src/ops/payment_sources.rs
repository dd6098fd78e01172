use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::error::{ValidationReport, ViolationKind};
use crate::{PaymentSource, ResultLedger, payment_sources};

use super::{Ledger, checked_name, with_tx};

const MSG_DUPLICATE_SOURCE: &str = "Payment source already exist";

impl Ledger {
    pub async fn payment_source(&self, source_id: i64, owner: &str) -> ResultLedger<PaymentSource> {
        with_tx!(self, |db_tx| {
            let model = self.require_payment_source(&db_tx, source_id, owner).await?;
            Ok(PaymentSource::from(model))
        })
    }

    /// Return the caller's payment sources in id order.
    pub async fn payment_sources(&self, owner: &str) -> ResultLedger<Vec<PaymentSource>> {
        with_tx!(self, |db_tx| {
            let models = payment_sources::Entity::find()
                .filter(payment_sources::Column::Owner.eq(owner.to_string()))
                .order_by_asc(payment_sources::Column::Id)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(PaymentSource::from).collect())
        })
    }

    /// Add a new payment source.
    pub async fn new_payment_source(&self, label: &str, owner: &str) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", label);
        with_tx!(self, |db_tx| {
            if !label.is_empty() {
                self.check_duplicate_source_label(&db_tx, &label, None, owner, &mut report)
                    .await?;
            }
            report.into_result()?;

            let source = payment_sources::ActiveModel {
                label: ActiveValue::Set(label),
                owner: ActiveValue::Set(owner.to_string()),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let source = source.insert(&db_tx).await?;
            tracing::info!(owner, source = source.id, "created payment source");
            Ok(source.id)
        })
    }

    /// Relabel a payment source.
    pub async fn update_payment_source(
        &self,
        source_id: i64,
        label: &str,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", label);
        with_tx!(self, |db_tx| {
            self.require_payment_source(&db_tx, source_id, owner).await?;
            if !label.is_empty() {
                self.check_duplicate_source_label(&db_tx, &label, Some(source_id), owner, &mut report)
                    .await?;
            }
            report.into_result()?;

            let source = payment_sources::ActiveModel {
                id: ActiveValue::Set(source_id),
                label: ActiveValue::Set(label),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            source.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete a payment source. Transactions and repayments that pointed at
    /// it keep going with the reference nulled out.
    pub async fn delete_payment_source(&self, source_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            self.require_payment_source(&db_tx, source_id, owner).await?;
            payment_sources::Entity::delete_by_id(source_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(owner, source = source_id, "deleted payment source");
            Ok(())
        })
    }

    async fn check_duplicate_source_label(
        &self,
        db: &DatabaseTransaction,
        label: &str,
        exclude: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<()> {
        let mut query = payment_sources::Entity::find()
            .filter(payment_sources::Column::Owner.eq(owner.to_string()))
            .filter(payment_sources::Column::Label.eq(label.to_string()));
        if let Some(id) = exclude {
            query = query.filter(payment_sources::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            report.push("label", ViolationKind::DuplicateLabel, MSG_DUPLICATE_SOURCE);
        }
        Ok(())
    }
}
