use std::collections::HashMap;

use chrono::{DateTime, NaiveTime, Utc};
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::db::entity::alert_rule;
use crate::db::{AlertStore, NotificationStore};
use crate::delivery::Router;
use crate::enums::{AlertType, Frequency};
use crate::error::{AppError, Result};
use crate::evaluator;
use crate::gate::{self, GateDecision};
use crate::models::{Condition, PriceUpdateMessage, SymbolQuote};

/// The per-batch evaluation pipeline: load candidate rules, evaluate
/// conditions, gate, audit, deliver. One instance is shared by all
/// in-flight batches.
pub struct Engine {
    alerts: AlertStore,
    notifications: NotificationStore,
    router: Router,
    max_in_flight: usize,
}

impl Engine {
    pub fn new(
        alerts: AlertStore,
        notifications: NotificationStore,
        router: Router,
        max_in_flight: usize,
    ) -> Self {
        Self {
            alerts,
            notifications,
            router,
            max_in_flight: max_in_flight.clamp(1, 10),
        }
    }

    /// Processes one price-update batch. Returns `MalformedMessage` for
    /// undecodable payloads (the consumer discards those) and a database
    /// error when the candidate-rule fetch fails (the consumer leaves
    /// the message for redelivery). Failures scoped to a single rule or
    /// symbol are logged and never abort the batch.
    pub async fn handle_price_update(&self, payload: &[u8]) -> Result<()> {
        let update: PriceUpdateMessage = serde_json::from_slice(payload)
            .map_err(|e| AppError::MalformedMessage(e.to_string()))?;

        if update.symbols.is_empty() {
            return Ok(());
        }

        let symbols: Vec<&str> = update.symbols.keys().map(String::as_str).collect();
        let rules = self.alerts.active_rules_for_symbols(&symbols).await?;
        if rules.is_empty() {
            return Ok(());
        }

        let mut by_symbol: HashMap<&str, Vec<&alert_rule::Model>> = HashMap::new();
        for rule in &rules {
            by_symbol.entry(rule.symbol.as_str()).or_default().push(rule);
        }

        // Symbols are independent; evaluate them concurrently. Per-rule
        // serialization happens at the storage claim, not here.
        // Collected eagerly: holding the filter_map closure inside the
        // stream across awaits trips rustc's higher-ranked FnOnce check
        // when the future is spawned (the futures stay lazy either way).
        let tasks: Vec<_> = update
            .symbols
            .iter()
            .filter_map(|(symbol, quote)| {
                by_symbol
                    .get(symbol.as_str())
                    .map(|rules| self.process_symbol(symbol, quote, rules))
            })
            .collect();
        let triggered: usize = futures::stream::iter(tasks)
            .buffer_unordered(self.max_in_flight)
            .collect::<Vec<usize>>()
            .await
            .into_iter()
            .sum();

        if triggered > 0 {
            info!(
                evaluated = rules.len(),
                triggered,
                source = %update.source,
                "price update processed"
            );
        }

        Ok(())
    }

    async fn process_symbol(
        &self,
        symbol: &str,
        quote: &SymbolQuote,
        rules: &[&alert_rule::Model],
    ) -> usize {
        let mut triggered = 0;
        for rule in rules {
            match self.process_rule(rule, quote).await {
                Ok(true) => triggered += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(rule_id = %rule.id, symbol, "rule processing failed: {}", e);
                }
            }
        }
        triggered
    }

    /// Runs one rule through evaluate → gate → claim → audit → deliver.
    /// Returns Ok(true) when the rule fired.
    async fn process_rule(&self, rule: &alert_rule::Model, quote: &SymbolQuote) -> Result<bool> {
        // Data errors on a single rule fail closed: log and skip, never
        // abort the batch.
        let alert_type = match rule.alert_type.parse::<AlertType>() {
            Ok(t) => t,
            Err(_) => {
                warn!(rule_id = %rule.id, alert_type = %rule.alert_type, "unknown alert type — skipping rule");
                return Ok(false);
            }
        };
        let frequency = match rule.frequency.parse::<Frequency>() {
            Ok(f) => f,
            Err(_) => {
                warn!(rule_id = %rule.id, frequency = %rule.frequency, "unknown frequency — skipping rule");
                return Ok(false);
            }
        };
        let condition = match Condition::parse(alert_type, &rule.conditions) {
            Ok(c) => c,
            Err(e) => {
                warn!(rule_id = %rule.id, "invalid condition payload — skipping rule: {}", e);
                return Ok(false);
            }
        };

        let baseline = if alert_type == AlertType::VolumeSpike {
            self.alerts.volume_baseline(&rule.symbol).await?
        } else {
            None
        };

        if !evaluator::evaluate(alert_type, &condition, quote, baseline) {
            return Ok(false);
        }

        let now = Utc::now();
        let prefs = self.alerts.preferences(&rule.user_id).await?;
        let usage = self.alerts.daily_usage(&rule.user_id, day_start(now)).await?;

        match gate::decide(rule, frequency, prefs.as_ref(), &usage, now) {
            GateDecision::Exhausted => {
                warn!(
                    rule_id = %rule.id,
                    "once rule matched after it already fired — anomaly, ignoring"
                );
                Ok(false)
            }
            GateDecision::CoolingDown => {
                debug!(rule_id = %rule.id, "rule in cooldown — suppressed");
                Ok(false)
            }
            GateDecision::SuppressedQuietHours => {
                info!(
                    rule_id = %rule.id,
                    user_id = %rule.user_id,
                    symbol = %rule.symbol,
                    "trigger suppressed by quiet hours"
                );
                Ok(false)
            }
            GateDecision::SuppressedDailyCap => {
                info!(
                    rule_id = %rule.id,
                    user_id = %rule.user_id,
                    symbol = %rule.symbol,
                    "trigger suppressed by daily cap"
                );
                Ok(false)
            }
            GateDecision::Eligible { channels } => {
                // The conditional update is the serialization point: a
                // concurrent worker or a redelivered batch loses the
                // claim here and backs off.
                if !self.alerts.claim_trigger(rule.id, frequency, now).await? {
                    debug!(rule_id = %rule.id, "trigger already claimed — skipping");
                    return Ok(false);
                }

                // Audit before delivery; if this fails, do not deliver.
                let log = self.notifications.record_trigger(rule, quote, now).await?;

                info!(
                    rule_id = %rule.id,
                    user_id = %rule.user_id,
                    symbol = %rule.symbol,
                    alert_type = %rule.alert_type,
                    "alert triggered"
                );

                self.router
                    .deliver(rule, &log, quote, prefs.as_ref(), &channels)
                    .await;
                Ok(true)
            }
        }
    }
}

/// Start of the current UTC day; the boundary for daily caps.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
