//! Contact entity and its read model.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A contact as returned by reads: the stored row plus the ids of the groups
/// it belongs to, in id order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContactDetail {
    pub id: i64,
    pub name: String,
    pub data: Json,
    pub groups: Vec<i64>,
}

impl ContactDetail {
    pub(crate) fn from_parts(model: Model, groups: Vec<i64>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            data: model.data,
            groups,
        }
    }
}

/// The `data` column is a free-form JSON document, constrained to be an
/// object at validation time.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contacts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub data: Json,
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
    #[sea_orm(has_many = "super::contact_group_members::Entity")]
    Memberships,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::contact_group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Memberships.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
