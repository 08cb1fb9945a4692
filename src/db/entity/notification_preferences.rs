use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Per-user notification settings. Read-only to this engine; owned and
/// mutated by the settings CRUD surface.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_preferences")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub email_enabled: bool,
    pub email_verified: bool,
    pub email_address: Option<String>,
    pub in_app_enabled: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: String, // "HH:MM" or "HH:MM:SS" local time
    pub quiet_hours_end: String,
    pub quiet_hours_timezone: String, // IANA, e.g. "America/New_York"
    pub max_alerts_per_day: i32, // 0 = unlimited
    pub max_emails_per_day: i32, // 0 = unlimited
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
