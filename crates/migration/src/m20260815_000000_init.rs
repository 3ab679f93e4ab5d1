//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for the settlement core:
//!
//! - `expenses`: payments made by one member on behalf of the group
//! - `shares`: per-member portions of an expense
//! - `transfers`: attested peer-to-peer settlement payments
//!
//! The partial unique index on `transfers` enforces at most one
//! unresolved (requested or sent) transfer per ordered member pair per
//! group at the storage layer, closing the check-then-insert race in
//! the commit path.

use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    Title,
    AmountMinor,
    PayerId,
    CreatedBy,
    PaidAt,
}

#[derive(Iden)]
enum Shares {
    Table,
    Id,
    ExpenseId,
    MemberId,
    AmountMinor,
}

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    GroupId,
    FromMember,
    ToMember,
    AmountMinor,
    Status,
    ProofUrl,
    Memo,
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
        // 1. Expenses
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().not_null())
                    .col(ColumnDef::new(Expenses::Title).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Expenses::PaidAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id-paid_at")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .col(Expenses::PaidAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Shares
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Shares::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shares::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Shares::ExpenseId).string().not_null())
                    .col(ColumnDef::new(Shares::MemberId).string().not_null())
                    .col(
                        ColumnDef::new(Shares::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-shares-expense_id")
                            .from(Shares::Table, Shares::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-shares-expense_id-member_id-unique")
                    .table(Shares::Table)
                    .col(Shares::ExpenseId)
                    .col(Shares::MemberId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Transfers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::GroupId).string().not_null())
                    .col(ColumnDef::new(Transfers::FromMember).string().not_null())
                    .col(ColumnDef::new(Transfers::ToMember).string().not_null())
                    .col(
                        ColumnDef::new(Transfers::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::Status).string().not_null())
                    .col(ColumnDef::new(Transfers::ProofUrl).string())
                    .col(ColumnDef::new(Transfers::Memo).string())
                    .col(ColumnDef::new(Transfers::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Transfers::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-group_id-created_at")
                    .table(Transfers::Table)
                    .col(Transfers::GroupId)
                    .col(Transfers::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // sea-query has no builder for partial indexes, so raw SQL it is.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX IF NOT EXISTS \"idx-transfers-unresolved-pair-unique\" \
                 ON \"transfers\" (\"group_id\", \"from_member\", \"to_member\") \
                 WHERE \"status\" IN ('requested', 'sent')",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Shares::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
