use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ActiveValue, DatabaseConnection, EntityTrait};
use uuid::Uuid;

use crate::db::entity::{alert_log, in_app_notification};
use crate::enums::Channel;
use crate::error::Result;
use crate::models::SymbolQuote;

/// Write path for the audit log and the in-app notification rows.
#[derive(Clone)]
pub struct NotificationStore {
    db: Arc<DatabaseConnection>,
}

impl NotificationStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Appends the audit record for an approved trigger. Called exactly
    /// once per eligible transition, before any delivery attempt.
    pub async fn record_trigger(
        &self,
        rule: &crate::db::entity::alert_rule::Model,
        quote: &SymbolQuote,
        now: DateTime<Utc>,
    ) -> Result<alert_log::Model> {
        let condition_met = serde_json::json!({
            "alert_type": rule.alert_type,
            "conditions": rule.conditions,
            "triggered": true,
        });
        let market_data = serde_json::json!({
            "symbol": rule.symbol,
            "price": quote.price,
            "volume": quote.volume,
            "change_pct": quote.change_pct,
            "timestamp": now.timestamp(),
        });

        let log = alert_log::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            alert_rule_id: ActiveValue::Set(rule.id),
            user_id: ActiveValue::Set(rule.user_id.clone()),
            symbol: ActiveValue::Set(rule.symbol.clone()),
            alert_type: ActiveValue::Set(rule.alert_type.clone()),
            triggered_at: ActiveValue::Set(now),
            condition_met: ActiveValue::Set(condition_met),
            market_data: ActiveValue::Set(market_data),
            email_sent: ActiveValue::Set(None),
            in_app_sent: ActiveValue::Set(None),
            is_read: ActiveValue::Set(false),
            is_dismissed: ActiveValue::Set(false),
        };

        let log = log.insert(self.db.as_ref()).await?;
        Ok(log)
    }

    /// Sets a channel's delivery outcome flag, once, after the adapter
    /// has returned.
    pub async fn mark_channel_outcome(
        &self,
        log_id: Uuid,
        channel: Channel,
        success: bool,
    ) -> Result<()> {
        let log = alert_log::Entity::find_by_id(log_id).one(self.db.as_ref()).await?;

        if let Some(log) = log {
            let mut active: alert_log::ActiveModel = log.into();
            match channel {
                Channel::Email => active.email_sent = ActiveValue::Set(Some(success)),
                Channel::InApp => active.in_app_sent = ActiveValue::Set(Some(success)),
            }
            active.update(self.db.as_ref()).await?;
        }

        Ok(())
    }

    /// Inserts the in-app notification row. Idempotent on
    /// (alert_rule_id, triggered_at): a retried delivery attempt after a
    /// crash hits the unique index and becomes a no-op.
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_in_app(
        &self,
        user_id: &str,
        alert_log_id: Uuid,
        alert_rule_id: Uuid,
        triggered_at: DateTime<Utc>,
        title: String,
        message: String,
        data: serde_json::Value,
    ) -> Result<()> {
        let notification = in_app_notification::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(user_id.to_string()),
            alert_log_id: ActiveValue::Set(alert_log_id),
            alert_rule_id: ActiveValue::Set(alert_rule_id),
            triggered_at: ActiveValue::Set(triggered_at),
            notification_type: ActiveValue::Set("alert_triggered".to_string()),
            title: ActiveValue::Set(title),
            message: ActiveValue::Set(message),
            data: ActiveValue::Set(data),
            is_read: ActiveValue::Set(false),
            created_at: ActiveValue::Set(Utc::now()),
        };

        in_app_notification::Entity::insert(notification)
            .on_conflict(
                OnConflict::columns([
                    in_app_notification::Column::AlertRuleId,
                    in_app_notification::Column::TriggeredAt,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(())
    }
}
