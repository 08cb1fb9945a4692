pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_users_table;
mod m20240601_000002_create_symbol_stats_table;
mod m20240601_000003_create_alert_rules_table;
mod m20240601_000004_create_notification_preferences_table;
mod m20240601_000005_create_alert_logs_table;
mod m20240601_000006_create_in_app_notifications_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_users_table::Migration),
            Box::new(m20240601_000002_create_symbol_stats_table::Migration),
            Box::new(m20240601_000003_create_alert_rules_table::Migration),
            Box::new(m20240601_000004_create_notification_preferences_table::Migration),
            Box::new(m20240601_000005_create_alert_logs_table::Migration),
            Box::new(m20240601_000006_create_in_app_notifications_table::Migration)
        ]
    }
}
