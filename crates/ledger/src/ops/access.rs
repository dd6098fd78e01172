use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use sea_orm::{
    Condition, DatabaseTransaction, QueryFilter, QueryOrder, Select, Statement, prelude::*,
};

use crate::error::{LedgerError, ValidationReport, ViolationKind};
use crate::util::{MSG_REQUIRED, invalid_pk};
use crate::{
    MoneyCents, ResultLedger, contact_groups, contacts, payment_methods, payment_sources,
    repayments, transactions, users,
};

use super::Ledger;

/// Generates a `require_*` method for an entity with an `owner` column.
///
/// A row that is missing and a row that belongs to someone else produce the
/// same error, so ownership cannot be probed by id.
macro_rules! impl_require_owned {
    ($require_fn:ident, $entity:path, $owner_col:expr, $label:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            target_id: i64,
            owner: &str,
        ) -> ResultLedger<<$entity as EntityTrait>::Model> {
            <$entity>::find_by_id(target_id)
                .filter($owner_col.eq(owner.to_string()))
                .one(db)
                .await?
                .ok_or_else(|| LedgerError::NotFound($label.to_string()))
        }
    };
}

/// Methods the caller may read or attach to: their own, plus common methods
/// published by an admin account.
pub(super) fn visible_payment_methods(owner: &str) -> Select<payment_methods::Entity> {
    payment_methods::Entity::find()
        .inner_join(users::Entity)
        .filter(
            Condition::any()
                .add(payment_methods::Column::Owner.eq(owner.to_string()))
                .add(
                    Condition::all()
                        .add(users::Column::IsAdmin.eq(true))
                        .add(payment_methods::Column::IsCommon.eq(true)),
                ),
        )
}

impl Ledger {
    impl_require_owned!(
        require_group,
        contact_groups::Entity,
        contact_groups::Column::Owner,
        "contact group"
    );

    impl_require_owned!(
        require_contact,
        contacts::Entity,
        contacts::Column::Owner,
        "contact"
    );

    impl_require_owned!(
        require_payment_method,
        payment_methods::Entity,
        payment_methods::Column::Owner,
        "payment method"
    );

    impl_require_owned!(
        require_payment_source,
        payment_sources::Entity,
        payment_sources::Column::Owner,
        "payment source"
    );

    /// A transaction carries no owner column; ownership flows through its
    /// contact.
    pub(super) async fn find_owned_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: i64,
        owner: &str,
    ) -> ResultLedger<Option<transactions::Model>> {
        transactions::Entity::find_by_id(transaction_id)
            .inner_join(contacts::Entity)
            .filter(contacts::Column::Owner.eq(owner.to_string()))
            .one(db)
            .await
            .map_err(Into::into)
    }

    pub(super) async fn require_transaction(
        &self,
        db: &DatabaseTransaction,
        transaction_id: i64,
        owner: &str,
    ) -> ResultLedger<transactions::Model> {
        self.find_owned_transaction(db, transaction_id, owner)
            .await?
            .ok_or_else(|| LedgerError::NotFound("transaction".to_string()))
    }

    /// Returns the repayment together with its parent transaction.
    pub(super) async fn require_repayment(
        &self,
        db: &DatabaseTransaction,
        repayment_id: i64,
        owner: &str,
    ) -> ResultLedger<(repayments::Model, transactions::Model)> {
        let Some(repayment) = repayments::Entity::find_by_id(repayment_id).one(db).await? else {
            return Err(LedgerError::NotFound("repayment".to_string()));
        };
        let transaction = self
            .find_owned_transaction(db, repayment.transaction_id, owner)
            .await?
            .ok_or_else(|| LedgerError::NotFound("repayment".to_string()))?;
        Ok((repayment, transaction))
    }

    pub(super) async fn require_visible_payment_method(
        &self,
        db: &DatabaseTransaction,
        method_id: i64,
        owner: &str,
    ) -> ResultLedger<payment_methods::Model> {
        visible_payment_methods(owner)
            .filter(payment_methods::Column::Id.eq(method_id))
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("payment method".to_string()))
    }

    /// The current instant in the account's configured time zone.
    ///
    /// An unset time zone falls back to UTC; an unparseable one fails the
    /// operation rather than silently defaulting.
    pub(super) async fn owner_now(
        &self,
        db: &DatabaseTransaction,
        owner: &str,
    ) -> ResultLedger<DateTime<Tz>> {
        let user = users::Entity::find_by_id(owner.to_string())
            .one(db)
            .await?
            .ok_or_else(|| LedgerError::NotFound("user".to_string()))?;
        let tz = match user.timezone.as_deref() {
            None => Tz::UTC,
            Some(name) => name
                .parse::<Tz>()
                .map_err(|_| LedgerError::InvalidTimezone(name.to_string()))?,
        };
        Ok(Utc::now().with_timezone(&tz))
    }

    /// Sum of repayments recorded against a transaction, optionally leaving
    /// one repayment out of the total.
    pub(super) async fn repaid_total(
        &self,
        db: &DatabaseTransaction,
        transaction_id: i64,
        exclude: Option<i64>,
    ) -> ResultLedger<MoneyCents> {
        let backend = self.database.get_database_backend();
        let stmt = match exclude {
            Some(repayment_id) => Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM repayments \
                 WHERE transaction_id = ? AND id <> ?"
                    .to_string(),
                vec![transaction_id.into(), repayment_id.into()],
            ),
            None => Statement::from_sql_and_values(
                backend,
                "SELECT COALESCE(SUM(amount_minor), 0) AS sum \
                 FROM repayments \
                 WHERE transaction_id = ?"
                    .to_string(),
                vec![transaction_id.into()],
            ),
        };
        let row = db.query_one(stmt).await?;
        let total: i64 = row.and_then(|r| r.try_get("", "sum").ok()).unwrap_or(0);
        Ok(MoneyCents::new(total))
    }

    /// Resolves the payment method a transaction or repayment should carry.
    ///
    /// An explicit id must be visible to the caller. Without one the caller's
    /// default method is used, then the lowest-id common method. When nothing
    /// resolves, a violation lands in the report; the collaborator may still
    /// demand a method, so the gap is reported rather than stored.
    pub(super) async fn resolve_payment_method(
        &self,
        db: &DatabaseTransaction,
        requested: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<Option<i64>> {
        if let Some(id) = requested {
            let visible = visible_payment_methods(owner)
                .filter(payment_methods::Column::Id.eq(id))
                .one(db)
                .await?
                .is_some();
            if !visible {
                report.push("payment_method", ViolationKind::NotFound, invalid_pk(id));
                return Ok(None);
            }
            return Ok(Some(id));
        }

        let own_default = payment_methods::Entity::find()
            .filter(payment_methods::Column::Owner.eq(owner.to_string()))
            .filter(payment_methods::Column::IsDefault.eq(true))
            .order_by_asc(payment_methods::Column::Id)
            .one(db)
            .await?;
        if let Some(method) = own_default {
            return Ok(Some(method.id));
        }

        let common = payment_methods::Entity::find()
            .filter(payment_methods::Column::IsCommon.eq(true))
            .order_by_asc(payment_methods::Column::Id)
            .one(db)
            .await?;
        if let Some(method) = common {
            tracing::debug!(owner, method = method.id, "fell back to common payment method");
            return Ok(Some(method.id));
        }

        report.push("payment_method", ViolationKind::Required, MSG_REQUIRED);
        Ok(None)
    }

    /// Validates an optional payment source reference against the caller's
    /// own sources.
    pub(super) async fn check_payment_source(
        &self,
        db: &DatabaseTransaction,
        source: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<()> {
        if let Some(id) = source {
            let exists = payment_sources::Entity::find_by_id(id)
                .filter(payment_sources::Column::Owner.eq(owner.to_string()))
                .one(db)
                .await?
                .is_some();
            if !exists {
                report.push("payment_source", ViolationKind::NotFound, invalid_pk(id));
            }
        }
        Ok(())
    }
}
