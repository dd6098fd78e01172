//! Contact group entity and the nested tree read model.
//!
//! Groups form a single-parent tree per owner, stored as flat rows with a
//! nullable parent pointer. Reads rebuild the nesting from the flat rows;
//! nothing in the schema is recursive.

use sea_orm::entity::prelude::*;
use serde::Serialize;

/// A group with its subtree, as returned by reads.
///
/// `subgroups` nests recursively and keeps id order at every level. The field
/// is omitted from serialized output when empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GroupNode {
    pub id: i64,
    pub name: String,
    pub parent_group: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subgroups: Vec<GroupNode>,
}

/// Builds the nested node for `root` out of flat rows.
///
/// `rows` must be sorted by id and all belong to one owner. A row is attached
/// at most once, so a corrupt parent cycle degrades into a truncated branch
/// instead of unbounded recursion.
pub(crate) fn build_node(rows: &[Model], root: &Model) -> GroupNode {
    let mut attached = vec![false; rows.len()];
    for (index, row) in rows.iter().enumerate() {
        if row.id == root.id {
            attached[index] = true;
        }
    }
    assemble(rows, root, &mut attached)
}

/// Builds the forest of root nodes (groups without a parent) from flat rows.
pub(crate) fn build_forest(rows: &[Model]) -> Vec<GroupNode> {
    rows.iter()
        .filter(|row| row.parent_group_id.is_none())
        .map(|row| build_node(rows, row))
        .collect()
}

fn assemble(rows: &[Model], node: &Model, attached: &mut [bool]) -> GroupNode {
    let mut subgroups = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if row.parent_group_id == Some(node.id) && !attached[index] {
            attached[index] = true;
            subgroups.push(assemble(rows, row, attached));
        }
    }
    GroupNode {
        id: node.id,
        name: node.name.clone(),
        parent_group: node.parent_group_id,
        subgroups,
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "contact_groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub parent_group_id: Option<i64>,
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
    #[sea_orm(
        belongs_to = "Entity",
        from = "Column::ParentGroupId",
        to = "Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Parent,
    #[sea_orm(has_many = "super::contact_group_members::Entity")]
    Members,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::contact_group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Members.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
