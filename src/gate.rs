use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;

use crate::db::entity::{alert_rule, notification_preferences};
use crate::enums::{Channel, Frequency};

/// Today's usage counters for one user, read from alert_logs. Inputs to
/// the daily-cap checks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DailyUsage {
    pub alerts_today: u64,
    pub emails_today: u64,
}

/// Outcome of the throttle gate for one matched rule.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Fire: claim bookkeeping, audit, and deliver to `channels`.
    /// `channels` can be empty when the rule requests no delivery medium;
    /// the trigger is still audited and counted. Once-rule deactivation
    /// happens inside the storage claim, not here.
    Eligible { channels: Vec<Channel> },
    /// A once-rule that already fired matched again. Defensive no-op;
    /// the rule should already be inactive.
    Exhausted,
    /// Inside the frequency cooldown window (24h daily, 5min always).
    CoolingDown,
    /// Inside the user's quiet-hours window. Delivery is suppressed and
    /// bookkeeping is NOT advanced, so a qualifying event right after
    /// quiet hours end can still fire.
    SuppressedQuietHours,
    /// Every requested channel is over its daily cap. Bookkeeping is
    /// not advanced.
    SuppressedDailyCap,
}

/// Applies the throttle transition ladder for a rule whose condition
/// already matched. Pure with respect to the store: the caller supplies
/// preferences and usage counters, and applies bookkeeping afterwards
/// via the conditional-update claim.
pub fn decide(
    rule: &alert_rule::Model,
    frequency: Frequency,
    prefs: Option<&notification_preferences::Model>,
    usage: &DailyUsage,
    now: DateTime<Utc>,
) -> GateDecision {
    if frequency == Frequency::Once && rule.trigger_count > 0 {
        return GateDecision::Exhausted;
    }

    if let (Some(cooldown), Some(last)) = (frequency.cooldown(), rule.last_triggered_at) {
        if now - last < cooldown {
            return GateDecision::CoolingDown;
        }
    }

    if let Some(p) = prefs {
        if p.quiet_hours_enabled && in_quiet_hours(p, now) {
            return GateDecision::SuppressedQuietHours;
        }
    }

    let requested = requested_channels(rule, prefs);
    let channels = apply_daily_caps(&requested, prefs, usage);
    if channels.is_empty() && !requested.is_empty() {
        return GateDecision::SuppressedDailyCap;
    }

    GateDecision::Eligible { channels }
}

/// Channels the rule asks for, intersected with the user's enable flags.
/// A user with no preferences row gets defaults: every channel enabled.
fn requested_channels(
    rule: &alert_rule::Model,
    prefs: Option<&notification_preferences::Model>,
) -> Vec<Channel> {
    let mut channels = Vec::with_capacity(2);

    let in_app_enabled = prefs.map(|p| p.in_app_enabled).unwrap_or(true);
    if rule.notify_in_app && in_app_enabled {
        channels.push(Channel::InApp);
    }

    let email_enabled = prefs
        .map(|p| p.email_enabled && p.email_verified)
        .unwrap_or(true);
    if rule.notify_email && email_enabled {
        channels.push(Channel::Email);
    }

    channels
}

/// Drops channels whose daily cap is exhausted. `max_alerts_per_day`
/// caps every channel; `max_emails_per_day` additionally caps email.
/// A cap of 0 means unlimited.
fn apply_daily_caps(
    requested: &[Channel],
    prefs: Option<&notification_preferences::Model>,
    usage: &DailyUsage,
) -> Vec<Channel> {
    let Some(p) = prefs else {
        return requested.to_vec();
    };

    if p.max_alerts_per_day > 0 && usage.alerts_today >= p.max_alerts_per_day as u64 {
        return Vec::new();
    }

    requested
        .iter()
        .copied()
        .filter(|ch| {
            *ch != Channel::Email
                || p.max_emails_per_day <= 0
                || usage.emails_today < p.max_emails_per_day as u64
        })
        .collect()
}

/// Whether `now`, converted to the user's timezone, falls inside the
/// half-open `[start, end)` quiet-hours window. Windows where
/// `start > end` wrap midnight (e.g. 22:00–07:00). Unparseable
/// timezone or times fail open (no suppression) with a diagnostic.
fn in_quiet_hours(prefs: &notification_preferences::Model, now: DateTime<Utc>) -> bool {
    let tz: Tz = match prefs.quiet_hours_timezone.parse() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(
                user_id = %prefs.user_id,
                timezone = %prefs.quiet_hours_timezone,
                "invalid quiet-hours timezone — ignoring quiet hours"
            );
            return false;
        }
    };

    let (start, end) = match (
        parse_time_of_day(&prefs.quiet_hours_start),
        parse_time_of_day(&prefs.quiet_hours_end),
    ) {
        (Some(s), Some(e)) => (s, e),
        _ => {
            tracing::warn!(
                user_id = %prefs.user_id,
                start = %prefs.quiet_hours_start,
                end = %prefs.quiet_hours_end,
                "invalid quiet-hours window — ignoring quiet hours"
            );
            return false;
        }
    };

    let local = now.with_timezone(&tz).time();
    // Drop sub-second precision so boundaries compare exactly.
    let local = NaiveTime::from_hms_opt(local.hour(), local.minute(), local.second())
        .unwrap_or(local);

    if start <= end {
        local >= start && local < end
    } else {
        local >= start || local < end
    }
}

fn parse_time_of_day(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(frequency: &str, last_triggered_at: Option<DateTime<Utc>>, trigger_count: i32) -> alert_rule::Model {
        let now = Utc::now();
        alert_rule::Model {
            id: Uuid::new_v4(),
            user_id: "user-1".to_string(),
            watch_list_id: None,
            symbol: "AAPL".to_string(),
            name: "AAPL above 150".to_string(),
            alert_type: "price_above".to_string(),
            conditions: json!({"threshold": 150.0}),
            is_active: true,
            frequency: frequency.to_string(),
            notify_email: true,
            notify_in_app: true,
            last_triggered_at,
            trigger_count,
            created_at: now,
            updated_at: now,
        }
    }

    fn prefs() -> notification_preferences::Model {
        let now = Utc::now();
        notification_preferences::Model {
            user_id: "user-1".to_string(),
            email_enabled: true,
            email_verified: true,
            email_address: None,
            in_app_enabled: true,
            quiet_hours_enabled: false,
            quiet_hours_start: "22:00".to_string(),
            quiet_hours_end: "07:00".to_string(),
            quiet_hours_timezone: "America/New_York".to_string(),
            max_alerts_per_day: 0,
            max_emails_per_day: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_once_rule_fires_then_exhausts() {
        let now = Utc::now();
        let fresh = rule("once", None, 0);
        match decide(&fresh, Frequency::Once, None, &DailyUsage::default(), now) {
            GateDecision::Eligible { channels } => {
                assert_eq!(channels, vec![Channel::InApp, Channel::Email]);
            }
            other => panic!("expected Eligible, got {:?}", other),
        }

        // Redelivery of the same quote after the first fire is a no-op.
        let fired = rule("once", Some(now), 1);
        assert_eq!(
            decide(&fired, Frequency::Once, None, &DailyUsage::default(), now),
            GateDecision::Exhausted
        );
    }

    #[test]
    fn test_always_rule_cooldown_window() {
        let now = Utc::now();
        let usage = DailyUsage::default();

        let recent = rule("always", Some(now - chrono::Duration::minutes(1)), 3);
        assert_eq!(
            decide(&recent, Frequency::Always, None, &usage, now),
            GateDecision::CoolingDown
        );

        let stale = rule("always", Some(now - chrono::Duration::minutes(6)), 3);
        assert!(matches!(
            decide(&stale, Frequency::Always, None, &usage, now),
            GateDecision::Eligible { .. }
        ));
    }

    #[test]
    fn test_daily_rule_24h_window() {
        let now = Utc::now();
        let usage = DailyUsage::default();

        let too_soon = rule(
            "daily",
            Some(now - chrono::Duration::hours(23) - chrono::Duration::minutes(59)),
            1,
        );
        assert_eq!(
            decide(&too_soon, Frequency::Daily, None, &usage, now),
            GateDecision::CoolingDown
        );

        let due = rule("daily", Some(now - chrono::Duration::hours(24)), 1);
        assert!(matches!(
            decide(&due, Frequency::Daily, None, &usage, now),
            GateDecision::Eligible { .. }
        ));
    }

    #[test]
    fn test_quiet_hours_suppress_without_bookkeeping() {
        // 23:00 New York == 03:00 UTC next day (EDT, UTC-4).
        let now = Utc.with_ymd_and_hms(2024, 7, 2, 3, 0, 0).unwrap();
        let mut p = prefs();
        p.quiet_hours_enabled = true;

        let r = rule("always", None, 0);
        assert_eq!(
            decide(&r, Frequency::Always, Some(&p), &DailyUsage::default(), now),
            GateDecision::SuppressedQuietHours
        );

        // 07:01 local, just past the window end — fires, because the
        // suppressed event did not advance last_triggered_at.
        let morning = Utc.with_ymd_and_hms(2024, 7, 2, 11, 1, 0).unwrap();
        assert!(matches!(
            decide(&r, Frequency::Always, Some(&p), &DailyUsage::default(), morning),
            GateDecision::Eligible { .. }
        ));
    }

    #[test]
    fn test_quiet_hours_half_open_boundaries() {
        let mut p = prefs();
        p.quiet_hours_enabled = true;
        p.quiet_hours_timezone = "UTC".to_string();
        p.quiet_hours_start = "22:00".to_string();
        p.quiet_hours_end = "07:00".to_string();

        // Start is inclusive.
        let at_start = Utc.with_ymd_and_hms(2024, 7, 1, 22, 0, 0).unwrap();
        assert!(in_quiet_hours(&p, at_start));

        // End is exclusive.
        let at_end = Utc.with_ymd_and_hms(2024, 7, 2, 7, 0, 0).unwrap();
        assert!(!in_quiet_hours(&p, at_end));

        // Mid-window, past midnight.
        let middle = Utc.with_ymd_and_hms(2024, 7, 2, 3, 30, 0).unwrap();
        assert!(in_quiet_hours(&p, middle));
    }

    #[test]
    fn test_quiet_hours_same_day_window() {
        let mut p = prefs();
        p.quiet_hours_enabled = true;
        p.quiet_hours_timezone = "UTC".to_string();
        p.quiet_hours_start = "09:00".to_string();
        p.quiet_hours_end = "17:00".to_string();

        assert!(in_quiet_hours(&p, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()));
        assert!(!in_quiet_hours(&p, Utc.with_ymd_and_hms(2024, 7, 1, 8, 59, 59).unwrap()));
        assert!(!in_quiet_hours(&p, Utc.with_ymd_and_hms(2024, 7, 1, 17, 0, 0).unwrap()));
    }

    #[test]
    fn test_invalid_quiet_hours_fail_open() {
        let mut p = prefs();
        p.quiet_hours_enabled = true;
        p.quiet_hours_timezone = "Not/AZone".to_string();
        assert!(!in_quiet_hours(&p, Utc::now()));

        let mut p = prefs();
        p.quiet_hours_enabled = true;
        p.quiet_hours_start = "late".to_string();
        assert!(!in_quiet_hours(&p, Utc::now()));
    }

    #[test]
    fn test_daily_alert_cap_suppresses_all_channels() {
        let mut p = prefs();
        p.max_alerts_per_day = 10;
        let usage = DailyUsage {
            alerts_today: 10,
            emails_today: 0,
        };

        let r = rule("always", None, 0);
        assert_eq!(
            decide(&r, Frequency::Always, Some(&p), &usage, Utc::now()),
            GateDecision::SuppressedDailyCap
        );
    }

    #[test]
    fn test_email_cap_leaves_in_app_eligible() {
        let mut p = prefs();
        p.max_emails_per_day = 5;
        let usage = DailyUsage {
            alerts_today: 7,
            emails_today: 5,
        };

        let r = rule("always", None, 0);
        match decide(&r, Frequency::Always, Some(&p), &usage, Utc::now()) {
            GateDecision::Eligible { channels } => {
                assert_eq!(channels, vec![Channel::InApp]);
            }
            other => panic!("expected Eligible with in_app only, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_channels_are_not_requested() {
        let mut p = prefs();
        p.email_enabled = false;

        let r = rule("always", None, 0);
        match decide(&r, Frequency::Always, Some(&p), &DailyUsage::default(), Utc::now()) {
            GateDecision::Eligible { channels } => {
                assert_eq!(channels, vec![Channel::InApp]);
            }
            other => panic!("expected Eligible, got {:?}", other),
        }

        // Unverified email is treated as disabled.
        let mut p = prefs();
        p.email_verified = false;
        match decide(&r, Frequency::Always, Some(&p), &DailyUsage::default(), Utc::now()) {
            GateDecision::Eligible { channels } => {
                assert_eq!(channels, vec![Channel::InApp]);
            }
            other => panic!("expected Eligible, got {:?}", other),
        }
    }

    #[test]
    fn test_rule_without_channels_still_eligible_for_audit() {
        let mut r = rule("once", None, 0);
        r.notify_email = false;
        r.notify_in_app = false;

        match decide(&r, Frequency::Once, None, &DailyUsage::default(), Utc::now()) {
            GateDecision::Eligible { channels } => {
                assert!(channels.is_empty());
            }
            other => panic!("expected Eligible, got {:?}", other),
        }
    }
}
