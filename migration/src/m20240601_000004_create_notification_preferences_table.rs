use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(NotificationPreferences::Table)
                .if_not_exists()
                .col(ColumnDef::new(NotificationPreferences::UserId).string().not_null().primary_key())
                .col(ColumnDef::new(NotificationPreferences::EmailEnabled).boolean().not_null().default(true))
                .col(ColumnDef::new(NotificationPreferences::EmailVerified).boolean().not_null().default(false))
                .col(ColumnDef::new(NotificationPreferences::EmailAddress).string())
                .col(ColumnDef::new(NotificationPreferences::InAppEnabled).boolean().not_null().default(true))
                .col(ColumnDef::new(NotificationPreferences::QuietHoursEnabled).boolean().not_null().default(false))
                .col(ColumnDef::new(NotificationPreferences::QuietHoursStart).string().not_null().default("22:00"))
                .col(ColumnDef::new(NotificationPreferences::QuietHoursEnd).string().not_null().default("07:00"))
                .col(ColumnDef::new(NotificationPreferences::QuietHoursTimezone).string().not_null().default("UTC"))
                .col(ColumnDef::new(NotificationPreferences::MaxAlertsPerDay).integer().not_null().default(0))
                .col(ColumnDef::new(NotificationPreferences::MaxEmailsPerDay).integer().not_null().default(0))
                .col(ColumnDef::new(NotificationPreferences::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(NotificationPreferences::UpdatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(NotificationPreferences::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum NotificationPreferences {
    Table,
    UserId,
    EmailEnabled,
    EmailVerified,
    EmailAddress,
    InAppEnabled,
    QuietHoursEnabled,
    QuietHoursStart,
    QuietHoursEnd,
    QuietHoursTimezone,
    MaxAlertsPerDay,
    MaxEmailsPerDay,
    CreatedAt,
    UpdatedAt,
}
