use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};

use crate::commands::ContactCmd;
use crate::error::{ValidationReport, ViolationKind};
use crate::util::invalid_pk;
use crate::{ContactDetail, ResultLedger, contact_group_members, contact_groups, contacts};

use super::{Ledger, checked_name, with_tx};

const MSG_DATA_NOT_OBJECT: &str = "Invalid format json";

impl Ledger {
    /// Return a contact with its group memberships.
    pub async fn contact(&self, contact_id: i64, owner: &str) -> ResultLedger<ContactDetail> {
        with_tx!(self, |db_tx| {
            let model = self.require_contact(&db_tx, contact_id, owner).await?;
            let groups = self.membership_ids(&db_tx, contact_id).await?;
            Ok(ContactDetail::from_parts(model, groups))
        })
    }

    /// Return the caller's contacts in id order.
    pub async fn contacts(&self, owner: &str) -> ResultLedger<Vec<ContactDetail>> {
        with_tx!(self, |db_tx| {
            let models = contacts::Entity::find()
                .filter(contacts::Column::Owner.eq(owner.to_string()))
                .order_by_asc(contacts::Column::Id)
                .all(&db_tx)
                .await?;

            let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
            let mut memberships: HashMap<i64, Vec<i64>> = HashMap::new();
            if !ids.is_empty() {
                let rows = contact_group_members::Entity::find()
                    .filter(contact_group_members::Column::ContactId.is_in(ids))
                    .order_by_asc(contact_group_members::Column::GroupId)
                    .all(&db_tx)
                    .await?;
                for row in rows {
                    memberships.entry(row.contact_id).or_default().push(row.group_id);
                }
            }

            Ok(models
                .into_iter()
                .map(|model| {
                    let groups = memberships.remove(&model.id).unwrap_or_default();
                    ContactDetail::from_parts(model, groups)
                })
                .collect())
        })
    }

    /// Add a new contact.
    pub async fn new_contact(&self, cmd: ContactCmd, owner: &str) -> ResultLedger<i64> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let name = checked_name(&mut report, "name", &cmd.name);
        check_data_shape(&cmd, &mut report);
        with_tx!(self, |db_tx| {
            let group_ids = self
                .checked_membership_ids(&db_tx, &cmd.groups, owner, &mut report)
                .await?;
            report.into_result()?;

            let contact = contacts::ActiveModel {
                name: ActiveValue::Set(name),
                owner: ActiveValue::Set(owner.to_string()),
                data: ActiveValue::Set(cmd.data),
                created_at: ActiveValue::Set(now),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            let contact = contact.insert(&db_tx).await?;
            self.replace_memberships(&db_tx, contact.id, &group_ids)
                .await?;
            tracing::info!(owner, contact = contact.id, "created contact");
            Ok(contact.id)
        })
    }

    /// Replace a contact's name, data and group memberships.
    pub async fn update_contact(
        &self,
        contact_id: i64,
        cmd: ContactCmd,
        owner: &str,
    ) -> ResultLedger<()> {
        let now = Utc::now();
        let mut report = ValidationReport::new();
        let name = checked_name(&mut report, "name", &cmd.name);
        check_data_shape(&cmd, &mut report);
        with_tx!(self, |db_tx| {
            self.require_contact(&db_tx, contact_id, owner).await?;
            let group_ids = self
                .checked_membership_ids(&db_tx, &cmd.groups, owner, &mut report)
                .await?;
            report.into_result()?;

            let contact = contacts::ActiveModel {
                id: ActiveValue::Set(contact_id),
                name: ActiveValue::Set(name),
                data: ActiveValue::Set(cmd.data),
                updated_at: ActiveValue::Set(now),
                ..Default::default()
            };
            contact.update(&db_tx).await?;

            contact_group_members::Entity::delete_many()
                .filter(contact_group_members::Column::ContactId.eq(contact_id))
                .exec(&db_tx)
                .await?;
            self.replace_memberships(&db_tx, contact_id, &group_ids)
                .await?;
            Ok(())
        })
    }

    /// Delete a contact together with its transactions and their repayments.
    pub async fn delete_contact(&self, contact_id: i64, owner: &str) -> ResultLedger<()> {
        with_tx!(self, |db_tx| {
            self.require_contact(&db_tx, contact_id, owner).await?;
            contacts::Entity::delete_by_id(contact_id)
                .exec(&db_tx)
                .await?;
            tracing::info!(owner, contact = contact_id, "deleted contact");
            Ok(())
        })
    }

    async fn membership_ids(
        &self,
        db: &DatabaseTransaction,
        contact_id: i64,
    ) -> ResultLedger<Vec<i64>> {
        let rows = contact_group_members::Entity::find()
            .filter(contact_group_members::Column::ContactId.eq(contact_id))
            .order_by_asc(contact_group_members::Column::GroupId)
            .all(db)
            .await?;
        Ok(rows.into_iter().map(|row| row.group_id).collect())
    }

    /// Validates requested group ids against the caller's own groups and
    /// returns them deduplicated in id order. Unknown and foreign ids read
    /// the same.
    async fn checked_membership_ids(
        &self,
        db: &DatabaseTransaction,
        requested: &[i64],
        owner: &str,
        report: &mut ValidationReport,
    ) -> ResultLedger<Vec<i64>> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }
        let owned: Vec<i64> = contact_groups::Entity::find()
            .filter(contact_groups::Column::Owner.eq(owner.to_string()))
            .filter(contact_groups::Column::Id.is_in(requested.to_vec()))
            .all(db)
            .await?
            .into_iter()
            .map(|group| group.id)
            .collect();
        for id in requested {
            if !owned.contains(id) {
                report.push("groups", ViolationKind::NotFound, invalid_pk(*id));
            }
        }
        let mut ids = requested.to_vec();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    async fn replace_memberships(
        &self,
        db: &DatabaseTransaction,
        contact_id: i64,
        group_ids: &[i64],
    ) -> ResultLedger<()> {
        if group_ids.is_empty() {
            return Ok(());
        }
        let rows = group_ids.iter().map(|group_id| contact_group_members::ActiveModel {
            contact_id: ActiveValue::Set(contact_id),
            group_id: ActiveValue::Set(*group_id),
        });
        contact_group_members::Entity::insert_many(rows)
            .exec(db)
            .await?;
        Ok(())
    }
}

fn check_data_shape(cmd: &ContactCmd, report: &mut ValidationReport) {
    if !cmd.data.is_object() {
        report.push("data", ViolationKind::Invalid, MSG_DATA_NOT_OBJECT);
    }
}
