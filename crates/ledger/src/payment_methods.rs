//! Payment method entity.
//!
//! Per owner, exactly one method carries `is_default` whenever the owner has
//! any methods at all; the operations in [`crate::ops`] maintain that
//! invariant. `is_common` marks a method an administrative account shares
//! read-only with every other account.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A payment method as returned by reads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub label: String,
    pub owner: String,
    pub is_default: bool,
    pub is_common: bool,
}

impl From<Model> for PaymentMethod {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            label: model.label,
            owner: model.owner,
            is_default: model.is_default,
            is_common: model.is_common,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub label: String,
    pub owner: String,
    pub is_default: bool,
    pub is_common: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::Owner",
        to = "super::users::Column::Username",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
