use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.create_table(
            Table::create()
                .table(AlertRules::Table)
                .if_not_exists()
                .col(ColumnDef::new(AlertRules::Id).uuid().not_null().primary_key())
                .col(ColumnDef::new(AlertRules::UserId).string().not_null())
                .col(ColumnDef::new(AlertRules::WatchListId).string())
                .col(ColumnDef::new(AlertRules::Symbol).string().not_null())
                .col(ColumnDef::new(AlertRules::Name).string().not_null())
                .col(ColumnDef::new(AlertRules::AlertType).string().not_null()) // "price_above", "price_below", "volume_above", "volume_below", "volume_spike", "price_change_pct"
                .col(ColumnDef::new(AlertRules::Conditions).json().not_null())
                .col(ColumnDef::new(AlertRules::IsActive).boolean().not_null().default(true))
                .col(ColumnDef::new(AlertRules::Frequency).string().not_null()) // "once", "daily", "always"
                .col(ColumnDef::new(AlertRules::NotifyEmail).boolean().not_null().default(false))
                .col(ColumnDef::new(AlertRules::NotifyInApp).boolean().not_null().default(true))
                .col(ColumnDef::new(AlertRules::LastTriggeredAt).timestamp_with_time_zone())
                .col(ColumnDef::new(AlertRules::TriggerCount).integer().not_null().default(0))
                .col(ColumnDef::new(AlertRules::CreatedAt).timestamp_with_time_zone().not_null())
                .col(ColumnDef::new(AlertRules::UpdatedAt).timestamp_with_time_zone().not_null())
                .to_owned()
        ).await?;

        // The evaluation hot path filters on (symbol, is_active).
        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_alert_rules_symbol_active")
                .table(AlertRules::Table)
                .col(AlertRules::Symbol)
                .col(AlertRules::IsActive)
                .to_owned()
        ).await?;

        manager.create_index(
            Index::create()
                .if_not_exists()
                .name("idx_alert_rules_user_id")
                .table(AlertRules::Table)
                .col(AlertRules::UserId)
                .to_owned()
        ).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AlertRules::Table).to_owned()).await
    }
}

#[derive(Iden)]
enum AlertRules {
    Table,
    Id,
    UserId,
    WatchListId,
    Symbol,
    Name,
    AlertType,
    Conditions,
    IsActive,
    Frequency,
    NotifyEmail,
    NotifyInApp,
    LastTriggeredAt,
    TriggerCount,
    CreatedAt,
    UpdatedAt,
}
