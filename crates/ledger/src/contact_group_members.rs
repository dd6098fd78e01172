//! Join table linking contacts to the groups they belong to.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contact_group_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub contact_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub group_id: i64,
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
        belongs_to = "super::contact_groups::Entity",
        from = "Column::GroupId",
        to = "super::contact_groups::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ContactGroups,
}

impl Related<super::contacts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contacts.def()
    }
}

impl Related<super::contact_groups::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContactGroups.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
