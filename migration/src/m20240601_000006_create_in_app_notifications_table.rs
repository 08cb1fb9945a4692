use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(InAppNotifications::Table)
                .if_not_exists()
                .col(ColumnDef::new(InAppNotifications::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(InAppNotifications::UserId).string().not_null())
                .col(ColumnDef::new(InAppNotifications::AlertLogId).uuid().not_null())
                .col(ColumnDef::new(InAppNotifications::AlertRuleId).uuid().not_null())
                .col(ColumnDef::new(InAppNotifications::TriggeredAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(InAppNotifications::NotificationType).string().not_null())
                .col(ColumnDef::new(InAppNotifications::Title).string().not_null())
                .col(ColumnDef::new(InAppNotifications::Message).string().not_null())
                .col(ColumnDef::new(InAppNotifications::Data).json().not_null())
                .col(ColumnDef::new(InAppNotifications::IsRead).boolean().not_null().default(false))
                .col(ColumnDef::new(InAppNotifications::CreatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_in_app_notifications_user_id")
                .table(InAppNotifications::Table)
                .col(InAppNotifications::UserId)
                .to_owned()
        ).await?;

        // Delivery retries after a crash must not duplicate rows.
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("uq_in_app_notifications_rule_triggered")
                .table(InAppNotifications::Table)
                .col(InAppNotifications::AlertRuleId)
                .col(InAppNotifications::TriggeredAt)
                .unique()
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(InAppNotifications::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum InAppNotifications {
    Table,
    Id,
    UserId,
    AlertLogId,
    AlertRuleId,
    TriggeredAt,
    NotificationType,
    Title,
    Message,
    Data,
    IsRead,
    CreatedAt,
}
