//! Repayment entity.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::Serialize;

use crate::MoneyCents;

/// A repayment as returned by reads. `date` is fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Repayment {
    pub id: i64,
    pub label: String,
    pub transaction_id: i64,
    pub amount: MoneyCents,
    pub remarks: String,
    pub date: DateTime<Utc>,
    pub payment_method_id: i64,
    pub payment_source_id: Option<i64>,
    pub reference: Option<String>,
}

impl From<Model> for Repayment {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            label: model.label,
            transaction_id: model.transaction_id,
            amount: MoneyCents::new(model.amount_minor),
            remarks: model.remarks,
            date: model.date,
            payment_method_id: model.payment_method_id,
            payment_source_id: model.payment_source_id,
            reference: model.reference,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "repayments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub label: String,
    pub transaction_id: i64,
    pub amount_minor: i64,
    pub remarks: String,
    pub date: DateTimeUtc,
    pub payment_method_id: i64,
    pub payment_source_id: Option<i64>,
    pub reference: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transactions::Entity",
        from = "Column::TransactionId",
        to = "super::transactions::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Transactions,
    #[sea_orm(
        belongs_to = "super::payment_methods::Entity",
        from = "Column::PaymentMethodId",
        to = "super::payment_methods::Column::Id",
        on_update = "NoAction",
        on_delete = "Restrict"
    )]
    PaymentMethods,
    #[sea_orm(
        belongs_to = "super::payment_sources::Entity",
        from = "Column::PaymentSourceId",
        to = "super::payment_sources::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    PaymentSources,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
