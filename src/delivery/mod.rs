use std::sync::Arc;

use tracing::{debug, warn};

use crate::db::entity::{alert_log, alert_rule, notification_preferences};
use crate::db::NotificationStore;
use crate::enums::{AlertType, Channel};
use crate::models::SymbolQuote;

mod email;
mod in_app;

pub use email::EmailSender;
pub use in_app::InAppSender;

/// Fans a confirmed trigger out to its delivery channels. Each adapter
/// call is independent; a failure on one channel never blocks the other,
/// and the audit row's outcome flag is only set after the adapter
/// returns.
pub struct Router {
    notifications: NotificationStore,
    in_app: InAppSender,
    email: Option<Arc<EmailSender>>,
}

impl Router {
    pub fn new(
        notifications: NotificationStore,
        in_app: InAppSender,
        email: Option<Arc<EmailSender>>,
    ) -> Self {
        Self {
            notifications,
            in_app,
            email,
        }
    }

    pub async fn deliver(
        &self,
        rule: &alert_rule::Model,
        log: &alert_log::Model,
        quote: &SymbolQuote,
        prefs: Option<&notification_preferences::Model>,
        channels: &[Channel],
    ) {
        for channel in channels {
            let outcome = match channel {
                Channel::InApp => self.in_app.send(rule, log, quote).await,
                Channel::Email => match &self.email {
                    Some(sender) => sender.send(rule, log, quote, prefs).await,
                    None => {
                        debug!(rule_id = %rule.id, "email channel disabled — skipping");
                        continue;
                    }
                },
            };

            let success = match outcome {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        rule_id = %rule.id,
                        channel = %channel,
                        "delivery failed: {}",
                        e
                    );
                    false
                }
            };

            if let Err(e) = self
                .notifications
                .mark_channel_outcome(log.id, *channel, success)
                .await
            {
                warn!(log_id = %log.id, channel = %channel, "failed to record delivery outcome: {}", e);
            }
        }
    }
}

/// Human-readable label for an alert type string, tolerating values this
/// engine does not evaluate.
pub(crate) fn alert_type_label(alert_type: &str) -> String {
    match alert_type.parse::<AlertType>() {
        Ok(t) => t.label().to_string(),
        Err(_) => alert_type.replace('_', " "),
    }
}

/// Formats a volume with K/M/B suffixes for notification text.
pub(crate) fn format_volume(vol: f64) -> String {
    if vol >= 1_000_000_000.0 {
        format!("{:.1}B", vol / 1_000_000_000.0)
    } else if vol >= 1_000_000.0 {
        format!("{:.1}M", vol / 1_000_000.0)
    } else if vol >= 1_000.0 {
        format!("{:.1}K", vol / 1_000.0)
    } else {
        format!("{:.0}", vol)
    }
}
