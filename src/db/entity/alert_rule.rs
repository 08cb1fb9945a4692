use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// A user-created alert rule. This engine only ever writes the trigger
/// bookkeeping columns (`last_triggered_at`, `trigger_count`,
/// `is_active` for once-rules); rule content is owned by the CRUD API.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub watch_list_id: Option<String>,
    pub symbol: String,
    pub name: String,
    pub alert_type: String, // "price_above", "price_below", "volume_above", "volume_below", "volume_spike", "price_change_pct"
    pub conditions: Json,
    pub is_active: bool,
    pub frequency: String, // "once", "daily", "always"
    pub notify_email: bool,
    pub notify_in_app: bool,
    pub last_triggered_at: Option<DateTimeUtc>,
    pub trigger_count: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
