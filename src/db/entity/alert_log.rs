use sea_orm::entity::prelude::*;
use serde::{ Deserialize, Serialize };

/// Append-only audit record of an approved trigger. The per-channel
/// outcome flags start as NULL and are set exactly once after the
/// corresponding adapter reports back.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alert_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub alert_rule_id: Uuid,
    pub user_id: String,
    pub symbol: String,
    pub alert_type: String,
    pub triggered_at: DateTimeUtc,
    pub condition_met: Json,
    pub market_data: Json,
    pub email_sent: Option<bool>,
    pub in_app_sent: Option<bool>,
    pub is_read: bool,
    pub is_dismissed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
