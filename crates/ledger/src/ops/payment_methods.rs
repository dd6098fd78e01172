use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::error::{LedgerError, ValidationReport, ViolationKind};
use crate::util::MSG_NOT_PERMITTED;
use crate::{PaymentMethod, ResultLedger, payment_methods, users};

use super::access::visible_payment_methods;
use super::{Ledger, checked_name, with_tx};

const MSG_DUPLICATE_METHOD: &str = "Instance with this name already exists";
const MSG_NO_DEFAULT: &str = "Atleast one payment method should be set to default payment method";

impl Ledger {
    /// Return a payment method the caller can see: their own, or a common
    /// one published by an admin account.
    pub async fn payment_method(&self, method_id: i64, owner: &str) -> ResultLedger<PaymentMethod> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_visible_payment_method(&db_tx, method_id, owner)
                .await?;
            Ok(PaymentMethod::from(model))
        })
    }

    /// Return the payment methods visible to the caller in id order.
    pub async fn payment_methods(&self, owner: &str) -> ResultLedger<Vec<PaymentMethod>> {
        with_tx!(self, |db_tx| {
            let models = visible_payment_methods(owner)
                .order_by_asc(payment_methods::Column::Id)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(PaymentMethod::from).collect())
        })
    }

    /// Add a new payment method.
    ///
    /// The caller's first method becomes the default no matter what was
    /// requested. Requesting the default on a later method demotes the
    /// previous holder in the same transaction; declining it requires some
    /// other method to already hold the default.
    pub async fn new_payment_method(
        &self,
        label: &str,
        is_default: Option<bool>,
        owner: &str,
    ) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", label);
        with_tx!(self, |db_tx| {
            if !label.is_empty() {
                self.check_duplicate_label(&db_tx, &label, None, owner, &mut report)
                    .await?;
            }

            let has_any = payment_methods::Entity::find()
                .filter(payment_methods::Column::Owner.eq(owner.to_string()))
                .one(&db_tx)
                .await?
                .is_some();
            let effective_default = if has_any {
                is_default.unwrap_or(false)
            } else {
                true
            };
            if has_any
                && !effective_default
                && !self.other_default_exists(&db_tx, None, owner).await?
            {
                report.push("is_default", ViolationKind::NoDefaultRemaining, MSG_NO_DEFAULT);
            }
            report.into_result()?;

            if effective_default && has_any {
                self.demote_defaults(&db_tx, None, owner).await?;
            }

            let method = payment_methods::ActiveModel {
                label: ActiveValue::Set(label),
                owner: ActiveValue::Set(owner.to_string()),
                is_default: ActiveValue::Set(effective_default),
                is_common: ActiveValue::Set(false),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let method = method.insert(&db_tx).await?;
            tracing::info!(owner, method = method.id, "created payment method");
            Ok(method.id)
        })
    }

    /// Relabel a payment method and settle where the default sits.
    ///
    /// `is_default: None` reads as declining the default, same as
    /// `Some(false)`: the default moves only when a method claims it.
    pub async fn update_payment_method(
        &self,
        method_id: i64,
        label: &str,
        is_default: Option<bool>,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let label = checked_name(&mut report, "label", label);
        with_tx!(self, |db_tx| {
            self.require_payment_method(&db_tx, method_id, owner).await?;

            if !label.is_empty() {
                self.check_duplicate_label(&db_tx, &label, Some(method_id), owner, &mut report)
                    .await?;
            }
            let effective_default = is_default.unwrap_or(false);
            if !effective_default
                && !self
                    .other_default_exists(&db_tx, Some(method_id), owner)
                    .await?
            {
                report.push("is_default", ViolationKind::NoDefaultRemaining, MSG_NO_DEFAULT);
            }
            report.into_result()?;

            if effective_default {
                self.demote_defaults(&db_tx, Some(method_id), owner).await?;
            }

            let method = payment_methods::ActiveModel {
                id: ActiveValue::Set(method_id),
                label: ActiveValue::Set(label),
                is_default: ActiveValue::Set(effective_default),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            method.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Publish or retract a payment method as common. Only admin accounts
    /// may flip the flag, and only on their own methods.
    pub async fn set_payment_method_common(
        &self,
        method_id: i64,
        is_common: bool,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        with_tx!(self, |db_tx| {
            self.require_payment_method(&db_tx, method_id, owner).await?;
            let user = users::Entity::find_by_id(owner.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| LedgerError::NotFound("user".to_string()))?;
            if !user.is_admin {
                return Err(LedgerError::single(
                    "is_common",
                    ViolationKind::Permission,
                    MSG_NOT_PERMITTED,
                ));
            }

            let method = payment_methods::ActiveModel {
                id: ActiveValue::Set(method_id),
                is_common: ActiveValue::Set(is_common),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            method.update(&db_tx).await?;
            tracing::info!(owner, method = method_id, is_common, "set payment method common flag");
            Ok(())
        })
    }

    /// Delete a payment method. Deleting the default hands it to the
    /// lowest-id method left; methods referenced by transactions or
    /// repayments are protected and fail the delete.
    pub async fn delete_payment_method(&self, method_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_payment_method(&db_tx, method_id, owner).await?;
            payment_methods::Entity::delete_by_id(method_id)
                .exec(&db_tx)
                .await?;

            if model.is_default {
                let next = payment_methods::Entity::find()
                    .filter(payment_methods::Column::Owner.eq(owner.to_string()))
                    .order_by_asc(payment_methods::Column::Id)
                    .one(&db_tx)
                    .await?;
                if let Some(next) = next {
                    let promoted = payment_methods::ActiveModel {
                        id: ActiveValue::Set(next.id),
                        is_default: ActiveValue::Set(true),
                        ..Default::default()
                    };
                    promoted.update(&db_tx).await?;
                }
            }
            tracing::info!(owner, method = method_id, "deleted payment method");
            Ok(())
        })
    }

    async fn check_duplicate_label(
        &self,
        db: &DatabaseTransaction,
        label: &str,
        exclude: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<()> {
        let mut query = payment_methods::Entity::find()
            .filter(payment_methods::Column::Owner.eq(owner.to_string()))
            .filter(payment_methods::Column::Label.eq(label.to_string()));
        if let Some(id) = exclude {
            query = query.filter(payment_methods::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            report.push("label", ViolationKind::DuplicateLabel, MSG_DUPLICATE_METHOD);
        }
        Ok(())
    }

    async fn other_default_exists(
        &self,
        db: &DatabaseTransaction,
        exclude: Option<i64>,
        owner: &str,
    ) -> ResultLedger<bool> {
        let mut query = payment_methods::Entity::find()
            .filter(payment_methods::Column::Owner.eq(owner.to_string()))
            .filter(payment_methods::Column::IsDefault.eq(true));
        if let Some(id) = exclude {
            query = query.filter(payment_methods::Column::Id.ne(id));
        }
        Ok(query.one(db).await?.is_some())
    }

    async fn demote_defaults(
        &self,
        db: &DatabaseTransaction,
        exclude: Option<i64>,
        owner: &str,
    ) -> ResultLedger<()> {
        let mut query = payment_methods::Entity::update_many()
            .col_expr(payment_methods::Column::IsDefault, Expr::value(false))
            .filter(payment_methods::Column::Owner.eq(owner.to_string()))
            .filter(payment_methods::Column::IsDefault.eq(true));
        if let Some(id) = exclude {
            query = query.filter(payment_methods::Column::Id.ne(id));
        }
        query.exec(db).await?;
        Ok(())
    }
}
