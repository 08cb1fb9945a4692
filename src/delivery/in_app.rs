use tracing::debug;

use crate::db::entity::{alert_log, alert_rule};
use crate::db::NotificationStore;
use crate::error::Result;
use crate::models::{SymbolQuote, ThresholdCondition};

use super::{alert_type_label, format_volume};

/// Writes in-app notification rows for the frontend dropdown to poll.
pub struct InAppSender {
    store: NotificationStore,
}

impl InAppSender {
    pub fn new(store: NotificationStore) -> Self {
        Self { store }
    }

    pub async fn send(
        &self,
        rule: &alert_rule::Model,
        log: &alert_log::Model,
        quote: &SymbolQuote,
    ) -> Result<()> {
        let title = build_title(rule);
        let message = build_message(rule, quote);
        let data = build_data(rule, quote);

        self.store
            .insert_in_app(
                &rule.user_id,
                log.id,
                rule.id,
                log.triggered_at,
                title,
                message,
                data,
            )
            .await?;

        debug!(rule_id = %rule.id, symbol = %rule.symbol, "in-app notification created");
        Ok(())
    }
}

fn build_title(rule: &alert_rule::Model) -> String {
    format!("{} {}", rule.symbol, alert_type_label(&rule.alert_type))
}

/// Descriptive one-line message. Falls back to a generic line when the
/// condition payload cannot be parsed.
fn build_message(rule: &alert_rule::Model, quote: &SymbolQuote) -> String {
    let threshold = || -> Option<f64> {
        serde_json::from_value::<ThresholdCondition>(rule.conditions.clone())
            .ok()
            .map(|c| c.threshold)
    };

    match rule.alert_type.as_str() {
        "price_above" => match threshold() {
            Some(t) => format!(
                "{} crossed above ${:.2} (current: ${:.2})",
                rule.symbol, t, quote.price
            ),
            None => format!("Alert triggered for {}", rule.symbol),
        },
        "price_below" => match threshold() {
            Some(t) => format!(
                "{} dropped below ${:.2} (current: ${:.2})",
                rule.symbol, t, quote.price
            ),
            None => format!("Alert triggered for {}", rule.symbol),
        },
        "volume_above" => match threshold() {
            Some(t) => format!(
                "{} volume exceeded {} (current: {})",
                rule.symbol,
                format_volume(t),
                format_volume(quote.volume as f64)
            ),
            None => format!("Alert triggered for {}", rule.symbol),
        },
        "volume_below" => match threshold() {
            Some(t) => format!(
                "{} volume dropped below {} (current: {})",
                rule.symbol,
                format_volume(t),
                format_volume(quote.volume as f64)
            ),
            None => format!("Alert triggered for {}", rule.symbol),
        },
        "volume_spike" => format!(
            "{} volume spiked to {}",
            rule.symbol,
            format_volume(quote.volume as f64)
        ),
        "price_change_pct" => format!("{} moved {:.2}% today", rule.symbol, quote.change_pct),
        _ => format!("Alert triggered for {}", rule.symbol),
    }
}

/// Metadata stored with the notification; includes watch_list_id for
/// navigation in the frontend dropdown.
fn build_data(rule: &alert_rule::Model, quote: &SymbolQuote) -> serde_json::Value {
    serde_json::json!({
        "watch_list_id": rule.watch_list_id,
        "symbol": rule.symbol,
        "price": quote.price,
        "volume": quote.volume,
        "alert_type": rule.alert_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(alert_type: &str, conditions: serde_json::Value) -> alert_rule::Model {
        let now = Utc::now();
        alert_rule::Model {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            watch_list_id: Some("wl-1".to_string()),
            symbol: "TSLA".to_string(),
            name: "test".to_string(),
            alert_type: alert_type.to_string(),
            conditions,
            is_active: true,
            frequency: "always".to_string(),
            notify_email: false,
            notify_in_app: true,
            last_triggered_at: None,
            trigger_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn quote() -> SymbolQuote {
        SymbolQuote {
            price: 242.5,
            volume: 3_400_000,
            change_pct: -2.1,
        }
    }

    #[test]
    fn test_build_title() {
        let r = rule("price_below", json!({"threshold": 250.0}));
        assert_eq!(build_title(&r), "TSLA Price Below");
    }

    #[test]
    fn test_build_message_price_below() {
        let r = rule("price_below", json!({"threshold": 250.0}));
        assert_eq!(
            build_message(&r, &quote()),
            "TSLA dropped below $250.00 (current: $242.50)"
        );
    }

    #[test]
    fn test_build_message_volume_above() {
        let r = rule("volume_above", json!({"threshold": 1000000.0}));
        assert_eq!(
            build_message(&r, &quote()),
            "TSLA volume exceeded 1.0M (current: 3.4M)"
        );
    }

    #[test]
    fn test_build_message_falls_back_on_bad_conditions() {
        let r = rule("price_above", json!({"unexpected": true}));
        assert_eq!(build_message(&r, &quote()), "Alert triggered for TSLA");
    }

    #[test]
    fn test_build_data_includes_navigation_fields() {
        let r = rule("price_change_pct", json!({"percent_change": 2.0, "direction": "either"}));
        let data = build_data(&r, &quote());
        assert_eq!(data["watch_list_id"], "wl-1");
        assert_eq!(data["symbol"], "TSLA");
        assert_eq!(data["alert_type"], "price_change_pct");
    }
}
