//! Initial schema migration - creates all tables from scratch.
//!
//! This is a consolidated migration covering the whole ledger schema:
//!
//! - `users`: accounts; every other row is partitioned by owner
//! - `contact_groups`: single-parent group tree, flat rows with a parent pointer
//! - `contacts`: people money moves to and from
//! - `contact_group_members`: contact <-> group membership
//! - `payment_methods`: per-owner methods, one default each, admins may publish common ones
//! - `payment_sources`: per-owner funding sources
//! - `transactions`: credit/debit entries against a contact
//! - `repayments`: partial settlements against a transaction

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
    IsAdmin,
    Timezone,
}

#[derive(Iden)]
enum ContactGroups {
    Table,
    Id,
    Name,
    Owner,
    ParentGroupId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Contacts {
    Table,
    Id,
    Name,
    Owner,
    Data,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum ContactGroupMembers {
    Table,
    ContactId,
    GroupId,
}

#[derive(Iden)]
enum PaymentMethods {
    Table,
    Id,
    Label,
    Owner,
    IsDefault,
    IsCommon,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum PaymentSources {
    Table,
    Id,
    Label,
    Owner,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    Label,
    ContactId,
    Kind,
    AmountMinor,
    Description,
    Date,
    ReturnDate,
    PaymentMethodId,
    PaymentSourceId,
    Reference,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Repayments {
    Table,
    Id,
    Label,
    TransactionId,
    AmountMinor,
    Remarks,
    Date,
    PaymentMethodId,
    PaymentSourceId,
    Reference,
    CreatedAt,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsAdmin)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Users::Timezone).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Contact groups
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ContactGroups::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactGroups::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ContactGroups::Name).string().not_null())
                    .col(ColumnDef::new(ContactGroups::Owner).string().not_null())
                    .col(ColumnDef::new(ContactGroups::ParentGroupId).big_integer())
                    .col(
                        ColumnDef::new(ContactGroups::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactGroups::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact_groups-owner")
                            .from(ContactGroups::Table, ContactGroups::Owner)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact_groups-parent_group_id")
                            .from(ContactGroups::Table, ContactGroups::ParentGroupId)
                            .to(ContactGroups::Table, ContactGroups::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contact_groups-owner-name-unique")
                    .table(ContactGroups::Table)
                    .col(ContactGroups::Owner)
                    .col(ContactGroups::Name)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Contacts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Contacts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Contacts::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Contacts::Name).string().not_null())
                    .col(ColumnDef::new(Contacts::Owner).string().not_null())
                    .col(ColumnDef::new(Contacts::Data).json().not_null())
                    .col(ColumnDef::new(Contacts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Contacts::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contacts-owner")
                            .from(Contacts::Table, Contacts::Owner)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Contact group memberships
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(ContactGroupMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ContactGroupMembers::ContactId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ContactGroupMembers::GroupId)
                            .big_integer()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(ContactGroupMembers::ContactId)
                            .col(ContactGroupMembers::GroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact_group_members-contact_id")
                            .from(ContactGroupMembers::Table, ContactGroupMembers::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-contact_group_members-group_id")
                            .from(ContactGroupMembers::Table, ContactGroupMembers::GroupId)
                            .to(ContactGroups::Table, ContactGroups::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-contact_group_members-group_id")
                    .table(ContactGroupMembers::Table)
                    .col(ContactGroupMembers::GroupId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Payment methods
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentMethods::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentMethods::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentMethods::Label).string().not_null())
                    .col(ColumnDef::new(PaymentMethods::Owner).string().not_null())
                    .col(
                        ColumnDef::new(PaymentMethods::IsDefault)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::IsCommon)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentMethods::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_methods-owner")
                            .from(PaymentMethods::Table, PaymentMethods::Owner)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_methods-owner-label-unique")
                    .table(PaymentMethods::Table)
                    .col(PaymentMethods::Owner)
                    .col(PaymentMethods::Label)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Payment sources
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PaymentSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentSources::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PaymentSources::Label).string().not_null())
                    .col(ColumnDef::new(PaymentSources::Owner).string().not_null())
                    .col(
                        ColumnDef::new(PaymentSources::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentSources::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-payment_sources-owner")
                            .from(PaymentSources::Table, PaymentSources::Owner)
                            .to(Users::Table, Users::Username)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-payment_sources-owner-label-unique")
                    .table(PaymentSources::Table)
                    .col(PaymentSources::Owner)
                    .col(PaymentSources::Label)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::Label).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::ContactId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::Description)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Date).timestamp().not_null())
                    .col(ColumnDef::new(Transactions::ReturnDate).timestamp())
                    .col(
                        ColumnDef::new(Transactions::PaymentMethodId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::PaymentSourceId).big_integer())
                    .col(ColumnDef::new(Transactions::Reference).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-contact_id")
                            .from(Transactions::Table, Transactions::ContactId)
                            .to(Contacts::Table, Contacts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-payment_method_id")
                            .from(Transactions::Table, Transactions::PaymentMethodId)
                            .to(PaymentMethods::Table, PaymentMethods::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-payment_source_id")
                            .from(Transactions::Table, Transactions::PaymentSourceId)
                            .to(PaymentSources::Table, PaymentSources::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-contact_id")
                    .table(Transactions::Table)
                    .col(Transactions::ContactId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Repayments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Repayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Repayments::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Repayments::Label).string().not_null())
                    .col(
                        ColumnDef::new(Repayments::TransactionId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Repayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repayments::Remarks).string().not_null())
                    .col(ColumnDef::new(Repayments::Date).timestamp().not_null())
                    .col(
                        ColumnDef::new(Repayments::PaymentMethodId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Repayments::PaymentSourceId).big_integer())
                    .col(ColumnDef::new(Repayments::Reference).string())
                    .col(ColumnDef::new(Repayments::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Repayments::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-repayments-transaction_id")
                            .from(Repayments::Table, Repayments::TransactionId)
                            .to(Transactions::Table, Transactions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-repayments-payment_method_id")
                            .from(Repayments::Table, Repayments::PaymentMethodId)
                            .to(PaymentMethods::Table, PaymentMethods::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-repayments-payment_source_id")
                            .from(Repayments::Table, Repayments::PaymentSourceId)
                            .to(PaymentSources::Table, PaymentSources::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-repayments-transaction_id")
                    .table(Repayments::Table)
                    .col(Repayments::TransactionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop in reverse order of creation (respecting FK dependencies)
        manager
            .drop_table(Table::drop().table(Repayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentSources::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PaymentMethods::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContactGroupMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Contacts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContactGroups::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
