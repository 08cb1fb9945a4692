use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(AlertLogs::Table)
                .if_not_exists()
                .col(ColumnDef::new(AlertLogs::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(AlertLogs::AlertRuleId).uuid().not_null())
                .col(ColumnDef::new(AlertLogs::UserId).string().not_null())
                .col(ColumnDef::new(AlertLogs::Symbol).string().not_null())
                .col(ColumnDef::new(AlertLogs::AlertType).string().not_null())
                .col(ColumnDef::new(AlertLogs::TriggeredAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(AlertLogs::ConditionMet).json().not_null())
                .col(ColumnDef::new(AlertLogs::MarketData).json().not_null())
                .col(ColumnDef::new(AlertLogs::EmailSent).boolean())
                .col(ColumnDef::new(AlertLogs::InAppSent).boolean())
                .col(ColumnDef::new(AlertLogs::IsRead).boolean().not_null().default(false))
                .col(ColumnDef::new(AlertLogs::IsDismissed).boolean().not_null().default(false))
                .to_owned()
        ).await?;

        // Daily-cap counters scan (user_id, triggered_at).
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_alert_logs_user_triggered")
                .table(AlertLogs::Table)
                .col(AlertLogs::UserId)
                .col(AlertLogs::TriggeredAt)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AlertLogs::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum AlertLogs {
    Table,
    Id,
    AlertRuleId,
    UserId,
    Symbol,
    AlertType,
    TriggeredAt,
    ConditionMet,
    MarketData,
    EmailSent,
    InAppSent,
    IsRead,
    IsDismissed,
}
