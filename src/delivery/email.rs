use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::SmtpConfig;
use crate::db::entity::{alert_log, alert_rule, notification_preferences};
use crate::db::AlertStore;
use crate::enums::Channel;
use crate::error::{AppError, Result};
use crate::models::SymbolQuote;

use super::{alert_type_label, format_volume};

/// Sends alert notification emails over SMTP with bounded retries.
pub struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    frontend_url: String,
    max_retries: u32,
    store: AlertStore,
}

impl EmailSender {
    pub fn new(
        cfg: &SmtpConfig,
        frontend_url: String,
        max_retries: u32,
        store: AlertStore,
    ) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
            .map_err(|e| AppError::Email(e.to_string()))?
            .port(cfg.port)
            .credentials(Credentials::new(cfg.username.clone(), cfg.password.clone()))
            .build();

        let from = format!(
            "{} <{}>",
            sanitize_header(&cfg.from_name),
            sanitize_header(&cfg.from_email)
        )
        .parse::<Mailbox>()
        .map_err(|e| AppError::Email(format!("invalid from address: {}", e)))?;

        Ok(Self {
            transport,
            from,
            frontend_url,
            max_retries: max_retries.max(1),
            store,
        })
    }

    /// Renders and sends the alert email for one trigger. The recipient
    /// is the preferences override address when set, otherwise the
    /// account email.
    pub async fn send(
        &self,
        rule: &alert_rule::Model,
        _log: &alert_log::Model,
        quote: &SymbolQuote,
        prefs: Option<&notification_preferences::Model>,
    ) -> Result<()> {
        let contact = self.store.user_contact(&rule.user_id).await?;

        let to_email = prefs
            .and_then(|p| p.email_address.clone())
            .filter(|addr| !addr.is_empty())
            .or_else(|| contact.as_ref().map(|u| u.email.clone()))
            .ok_or_else(|| {
                AppError::Email(format!("no email address on file for user {}", rule.user_id))
            })?;
        let user_name = contact
            .map(|u| u.full_name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "there".to_string());

        let subject = sanitize_header(&format!(
            "Alert: {} {}",
            rule.symbol,
            alert_type_label(&rule.alert_type)
        ));
        let body = format_alert_email_body(rule, quote, &user_name, &self.frontend_url);

        let message = Message::builder()
            .from(self.from.clone())
            .to(sanitize_header(&to_email)
                .parse::<Mailbox>()
                .map_err(|e| AppError::Email(format!("invalid recipient: {}", e)))?)
            .subject(&subject)
            .header(ContentType::TEXT_HTML)
            .body(body)
            .map_err(|e| AppError::Email(e.to_string()))?;

        // Transport errors are retryable but bounded; the channel is
        // marked failed only after the last attempt.
        let mut delay = std::time::Duration::from_millis(500);
        let mut last_err = String::new();
        for attempt in 1..=self.max_retries {
            match self.transport.send(message.clone()).await {
                Ok(_) => {
                    info!(rule_id = %rule.id, channel = %Channel::Email, "email sent: {}", subject);
                    return Ok(());
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, attempt, "email send failed: {}", e);
                    last_err = e.to_string();
                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(AppError::Email(last_err))
    }

    /// Sends the canary test email used by the ops endpoint. A single
    /// attempt, no retries: the point is to report the transport's
    /// current state, not to paper over it.
    pub async fn send_canary(&self, to: &str, name: &str) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(sanitize_header(to)
                .parse::<Mailbox>()
                .map_err(|e| AppError::Email(format!("invalid recipient: {}", e)))?)
            .subject("Canary Test - Market Alerts")
            .header(ContentType::TEXT_HTML)
            .body(format_canary_email_body(name, Utc::now()))
            .map_err(|e| AppError::Email(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Email(e.to_string()))?;
        Ok(())
    }
}

/// Strips CR and LF characters so values interpolated into headers
/// cannot inject additional headers.
pub(crate) fn sanitize_header(s: &str) -> String {
    s.replace(['\r', '\n'], "")
}

/// Deterministic HTML body rendered from rule/trigger data.
pub(crate) fn format_alert_email_body(
    rule: &alert_rule::Model,
    quote: &SymbolQuote,
    user_name: &str,
    frontend_url: &str,
) -> String {
    let watchlist_url = match &rule.watch_list_id {
        Some(id) => format!("{}/watchlist/{}", frontend_url, id),
        None => format!("{}/alerts", frontend_url),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: #1a1a2e; color: #e0e0e0; padding: 24px; border-radius: 8px;">
    <h2 style="color: #4fc3f7; margin-top: 0;">Alert Triggered: {name}</h2>
    <p>Hi {user_name},</p>
    <p>Your alert <strong>{name}</strong> has been triggered:</p>
    <div style="background: #16213e; padding: 16px; border-radius: 6px; margin: 16px 0;">
      <table style="width: 100%; border-collapse: collapse; color: #e0e0e0;">
        <tr>
          <td style="padding: 8px 0;"><strong>Symbol</strong></td>
          <td style="padding: 8px 0; text-align: right;">{symbol}</td>
        </tr>
        <tr>
          <td style="padding: 8px 0;"><strong>Current Price</strong></td>
          <td style="padding: 8px 0; text-align: right;">${price:.2}</td>
        </tr>
        <tr>
          <td style="padding: 8px 0;"><strong>Change</strong></td>
          <td style="padding: 8px 0; text-align: right;">{change_pct:.2}%</td>
        </tr>
        <tr>
          <td style="padding: 8px 0;"><strong>Volume</strong></td>
          <td style="padding: 8px 0; text-align: right;">{volume}</td>
        </tr>
      </table>
    </div>
    <p>
      <a href="{watchlist_url}" style="display: inline-block; background: #4fc3f7; color: #1a1a2e; padding: 10px 24px; border-radius: 6px; text-decoration: none; font-weight: bold;">
        View Watchlist
      </a>
    </p>
    <hr style="border: none; border-top: 1px solid #333; margin: 20px 0;">
    <p style="color: #888; font-size: 12px;">
      You received this email because you have email alerts enabled.
      To manage your notification preferences, visit your
      <a href="{frontend_url}/settings" style="color: #4fc3f7;">account settings</a>.
    </p>
  </div>
</body>
</html>"#,
        name = rule.name,
        user_name = user_name,
        symbol = rule.symbol,
        price = quote.price,
        change_pct = quote.change_pct,
        volume = format_volume(quote.volume as f64),
        watchlist_url = watchlist_url,
        frontend_url = frontend_url,
    )
}

/// Minimal HTML body for canary test sends.
pub(crate) fn format_canary_email_body(name: &str, sent_at: DateTime<Utc>) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="UTF-8"></head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <div style="background: #1a1a2e; color: #e0e0e0; padding: 24px; border-radius: 8px;">
    <h2 style="color: #4fc3f7; margin-top: 0;">Canary Test</h2>
    <p>Hi {name},</p>
    <p>This is a canary test email from the alert engine.
       If you received this, email delivery is working correctly.</p>
    <div style="background: #16213e; padding: 16px; border-radius: 6px; margin: 16px 0;">
      <table style="width: 100%; border-collapse: collapse; color: #e0e0e0;">
        <tr>
          <td style="padding: 8px 0;"><strong>Service</strong></td>
          <td style="padding: 8px 0; text-align: right;">alert-engine</td>
        </tr>
        <tr>
          <td style="padding: 8px 0;"><strong>Sent At (UTC)</strong></td>
          <td style="padding: 8px 0; text-align: right;">{sent_at}</td>
        </tr>
        <tr>
          <td style="padding: 8px 0;"><strong>Status</strong></td>
          <td style="padding: 8px 0; text-align: right; color: #66bb6a;">PASS</td>
        </tr>
      </table>
    </div>
    <hr style="border: none; border-top: 1px solid #333; margin: 20px 0;">
    <p style="color: #888; font-size: 12px;">
      This is an automated canary test. No action required.
    </p>
  </div>
</body>
</html>"#,
        name = name,
        sent_at = sent_at.format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    fn rule() -> alert_rule::Model {
        let now = Utc::now();
        alert_rule::Model {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            watch_list_id: Some("wl-9".to_string()),
            symbol: "AAPL".to_string(),
            name: "AAPL above 150".to_string(),
            alert_type: "price_above".to_string(),
            conditions: json!({"threshold": 150.0}),
            is_active: true,
            frequency: "once".to_string(),
            notify_email: true,
            notify_in_app: false,
            last_triggered_at: None,
            trigger_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_sanitize_header_strips_crlf() {
        assert_eq!(
            sanitize_header("evil\r\nBcc: everyone@example.com"),
            "evilBcc: everyone@example.com"
        );
        assert_eq!(sanitize_header("plain subject"), "plain subject");
    }

    #[test]
    fn test_email_body_is_deterministic() {
        let r = rule();
        let quote = SymbolQuote {
            price: 151.2,
            volume: 2_300_000,
            change_pct: 1.34,
        };

        let a = format_alert_email_body(&r, &quote, "Ada", "https://app.example.com");
        let b = format_alert_email_body(&r, &quote, "Ada", "https://app.example.com");
        assert_eq!(a, b);

        assert!(a.contains("AAPL above 150"));
        assert!(a.contains("$151.20"));
        assert!(a.contains("1.34%"));
        assert!(a.contains("2.3M"));
        assert!(a.contains("https://app.example.com/watchlist/wl-9"));
    }

    #[test]
    fn test_canary_body_names_recipient_and_status() {
        use chrono::TimeZone;
        let sent_at = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let body = format_canary_email_body("Test User", sent_at);
        assert!(body.contains("Canary Test"));
        assert!(body.contains("Test User"));
        assert!(body.contains("PASS"));
        assert!(body.contains("2026-01-15 12:00:00 UTC"));
    }

    #[test]
    fn test_email_body_without_watchlist_links_alerts_page() {
        let mut r = rule();
        r.watch_list_id = None;
        let quote = SymbolQuote {
            price: 10.0,
            volume: 100,
            change_pct: 0.0,
        };
        let body = format_alert_email_body(&r, &quote, "Ada", "https://app.example.com");
        assert!(body.contains("https://app.example.com/alerts"));
    }
}
