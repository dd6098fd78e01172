//! Transaction primitives.
//!
//! A transaction records money lent to or borrowed from a contact. Its
//! `pending_amount` is never stored: every read recomputes it as the amount
//! minus the sum of linked repayments.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{LedgerError, MoneyCents, error::ViolationKind, repayments::Repayment};

/// Direction of a transaction: `credit` is money given out, `debit` money
/// taken in. The sign of the amount never encodes direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Credit,
    Debit,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }
}

impl TryFrom<&str> for EntryKind {
    type Error = LedgerError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(LedgerError::single(
                "type",
                ViolationKind::Invalid,
                format!("\"{other}\" is not a valid choice."),
            )),
        }
    }
}

/// A transaction as returned by reads, with the computed pending amount and
/// the repayments linked to it in id order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransactionDetail {
    pub id: i64,
    pub label: String,
    pub contact_id: i64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub amount: MoneyCents,
    pub pending_amount: MoneyCents,
    pub description: String,
    pub date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub payment_method_id: i64,
    pub payment_source_id: Option<i64>,
    pub reference: Option<String>,
    pub repayments: Vec<Repayment>,
}

impl TryFrom<(Model, Vec<Repayment>)> for TransactionDetail {
    type Error = LedgerError;

    fn try_from((model, repayments): (Model, Vec<Repayment>)) -> Result<Self, Self::Error> {
        let amount = MoneyCents::new(model.amount_minor);
        let repaid = repayments
            .iter()
            .fold(MoneyCents::ZERO, |total, repayment| total + repayment.amount);
        Ok(Self {
            id: model.id,
            label: model.label,
            contact_id: model.contact_id,
            kind: EntryKind::try_from(model.kind.as_str())?,
            amount,
            pending_amount: amount - repaid,
            description: model.description,
            date: model.date,
            return_date: model.return_date,
            payment_method_id: model.payment_method_id,
            payment_source_id: model.payment_source_id,
            reference: model.reference,
            repayments,
        })
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub label: String,
    pub contact_id: i64,
    pub kind: String,
    pub amount_minor: i64,
    pub description: String,
    pub date: DateTimeUtc,
    pub return_date: Option<DateTimeUtc>,
    pub payment_method_id: i64,
    pub payment_source_id: Option<i64>,
    pub reference: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contacts::Entity",
        from = "Column::ContactId",
        to = "super::contacts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Contacts,
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
    #[sea_orm(has_many = "super::repayments::Entity")]
    Repayments,
}

impl Related<super::contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl Related<super::repayments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repayments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn kind_round_trips_through_str() {
        assert_eq!(EntryKind::try_from("credit").unwrap(), EntryKind::Credit);
        assert_eq!(EntryKind::try_from("debit").unwrap(), EntryKind::Debit);
        assert_eq!(EntryKind::Credit.as_str(), "credit");
        assert!(EntryKind::try_from("refund").is_err());
    }

    #[test]
    fn detail_computes_pending_from_repayments() {
        let stamp = Utc.timestamp_opt(0, 0).unwrap();
        let model = Model {
            id: 1,
            label: "Lunch".to_string(),
            contact_id: 7,
            kind: "credit".to_string(),
            amount_minor: 10_00,
            description: String::new(),
            date: stamp,
            return_date: None,
            payment_method_id: 3,
            payment_source_id: None,
            reference: None,
            created_at: stamp,
            updated_at: stamp,
        };
        let repayments = vec![
            Repayment {
                id: 1,
                label: "First".to_string(),
                transaction_id: 1,
                amount: MoneyCents::new(2_50),
                remarks: String::new(),
                date: stamp,
                payment_method_id: 3,
                payment_source_id: None,
                reference: None,
            },
            Repayment {
                id: 2,
                label: "Second".to_string(),
                transaction_id: 1,
                amount: MoneyCents::new(1_00),
                remarks: String::new(),
                date: stamp,
                payment_method_id: 3,
                payment_source_id: None,
                reference: None,
            },
        ];

        let detail = TransactionDetail::try_from((model, repayments)).unwrap();
        assert_eq!(detail.amount, MoneyCents::new(10_00));
        assert_eq!(detail.pending_amount, MoneyCents::new(6_50));
        assert_eq!(detail.kind, EntryKind::Credit);
    }
}
