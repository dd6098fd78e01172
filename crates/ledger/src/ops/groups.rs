use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
    sea_query::Expr,
};

use crate::error::{ValidationReport, ViolationKind};
use crate::util::invalid_pk;
use crate::{GroupNode, ResultLedger, contact_groups};

use super::{Ledger, checked_name, with_tx};

const MSG_DUPLICATE_GROUP: &str = "This contact group already exists";
const MSG_FOREIGN_PARENT: &str = "You do not have permission to add sub groups to this group.";
const MSG_SELF_PARENT: &str = "Parent group cannot be the same instance";

impl Ledger {
    /// Return a group with its nested subtree.
    pub async fn contact_group(&self, group_id: i64, owner: &str) -> ResultLedger<GroupNode> {
        with_tx!(self, |db_tx| {
            let root = self.require_group(&db_tx, group_id, owner).await?;
            let rows = self.owned_group_rows(&db_tx, owner).await?;
            Ok(contact_groups::build_node(&rows, &root))
        })
    }

    /// Return the caller's group forest: root groups in id order, each with
    /// its subtree nested.
    pub async fn contact_groups(&self, owner: &str) -> ResultLedger<Vec<GroupNode>> {
        with_tx!(self, |db_tx| {
            let rows = self.owned_group_rows(&db_tx, owner).await?;
            Ok(contact_groups::build_forest(&rows))
        })
    }

    /// Add a new contact group, optionally under a parent.
    ///
    /// A parent keeps a single direct child: attaching to `parent_group`
    /// detaches whatever child it held before.
    pub async fn new_contact_group(
        &self,
        name: &str,
        parent_group: Option<i64>,
        owner: &str,
    ) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let name = checked_name(&mut report, "name", name);
        with_tx!(self, |db_tx| {
            if !name.is_empty() {
                self.check_duplicate_group_name(&db_tx, &name, None, owner, &mut report)
                    .await?;
            }
            let parent_id = self
                .check_parent_group(&db_tx, parent_group, None, owner, &mut report)
                .await?;
            report.into_result()?;

            if let Some(parent_id) = parent_id {
                self.detach_children_of(&db_tx, parent_id).await?;
            }

            let group = contact_groups::ActiveModel {
                name: ActiveValue::Set(name),
                owner: ActiveValue::Set(owner.to_string()),
                parent_group_id: ActiveValue::Set(parent_id),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let group = group.insert(&db_tx).await?;
            tracing::info!(owner, group = group.id, "created contact group");
            Ok(group.id)
        })
    }

    /// Rename a group and/or move it under a new parent. `parent_group:
    /// None` makes the group a root.
    pub async fn update_contact_group(
        &self,
        group_id: i64,
        name: &str,
        parent_group: Option<i64>,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let name = checked_name(&mut report, "name", name);
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id, owner).await?;

            if !name.is_empty() {
                self.check_duplicate_group_name(&db_tx, &name, Some(group_id), owner, &mut report)
                    .await?;
            }
            let parent_id = self
                .check_parent_group(&db_tx, parent_group, Some(group_id), owner, &mut report)
                .await?;
            report.into_result()?;

            // Detaching may null out this group's own pointer when it already
            // sits under the new parent; the update below rewrites it.
            if let Some(parent_id) = parent_id {
                self.detach_children_of(&db_tx, parent_id).await?;
            }

            let group = contact_groups::ActiveModel {
                id: ActiveValue::Set(group_id),
                name: ActiveValue::Set(name),
                parent_group_id: ActiveValue::Set(parent_id),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            group.update(&db_tx).await?;
            Ok(())
        })
    }

    /// Delete a group. Subgroups survive as roots and contacts keep their
    /// other memberships; nothing else is removed.
    pub async fn delete_contact_group(&self, group_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            self.require_group(&db_tx, group_id, owner).await?;
            // Orphan the children explicitly; membership rows cascade.
            self.detach_children_of(&db_tx, group_id).await?;
            contact_groups::Entity::delete_by_id(group_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(owner, group = group_id, "deleted contact group");
            Ok(())
        })
    }

    async fn owned_group_rows(
        &self,
        db: &DatabaseTransaction,
        owner: &str,
    ) -> ResultLedger<Vec<contact_groups::Model>> {
        contact_groups::Entity::find()
            .filter(contact_groups::Column::Owner.eq(owner.to_string()))
            .order_by_asc(contact_groups::Column::Id)
            .all(db)
            .await
            .map_err(Into::into)
    }

    async fn check_duplicate_group_name(
        &self,
        db: &DatabaseTransaction,
        name: &str,
        exclude: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<()> {
        let mut query = contact_groups::Entity::find()
            .filter(contact_groups::Column::Owner.eq(owner.to_string()))
            .filter(contact_groups::Column::Name.eq(name.to_string()));
        if let Some(id) = exclude {
            query = query.filter(contact_groups::Column::Id.ne(id));
        }
        if query.one(db).await?.is_some() {
            report.push("name", ViolationKind::DuplicateName, MSG_DUPLICATE_GROUP);
        }
        Ok(())
    }

    /// Validates the requested parent and returns it when usable.
    ///
    /// The parent must exist and belong to the caller; a group can never be
    /// its own parent. Foreign parents are reported as a permission problem
    /// only when the id is real, unknown ids read as missing references.
    async fn check_parent_group(
        &self,
        db: &DatabaseTransaction,
        parent_group: Option<i64>,
        updating: Option<i64>,
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<Option<i64>> {
        let Some(parent_id) = parent_group else {
            return Ok(None);
        };
        if updating == Some(parent_id) {
            report.push(
                "parent_group",
                ViolationKind::InvalidHierarchy,
                MSG_SELF_PARENT,
            );
            return Ok(None);
        }
        match contact_groups::Entity::find_by_id(parent_id).one(db).await? {
            None => {
                report.push(
                    "parent_group",
                    ViolationKind::NotFound,
                    invalid_pk(parent_id),
                );
                Ok(None)
            }
            Some(parent) if parent.owner != owner => {
                report.push("parent_group", ViolationKind::Permission, MSG_FOREIGN_PARENT);
                Ok(None)
            }
            Some(parent) => Ok(Some(parent.id)),
        }
    }

    async fn detach_children_of(
        &self,
        db: &DatabaseTransaction,
        parent_id: i64,
    ) -> ResultLedger<()> {
        contact_groups::Entity::update_many()
            .col_expr(
                contact_groups::Column::ParentGroupId,
                Expr::value(Option::<i64>::None),
            )
            .filter(contact_groups::Column::ParentGroupId.eq(parent_id))
            .exec(db)
            .await?;
        Ok(())
    }
}
