use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// A row consumed by the frontend notification dropdown. Unique on
/// (alert_rule_id, triggered_at) so retried delivery after a crash
/// cannot create duplicates.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "in_app_notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub alert_log_id: Uuid,
    pub alert_rule_id: Uuid,
    pub triggered_at: DateTimeUtc,
    pub notification_type: String, // "alert_triggered"
    pub title: String,
    pub message: String,
    pub data: Json,
    pub is_read: bool,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
