use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::enums::{AlertType, ChangeDirection};
use crate::error::{AppError, Result};

// ─── Wire messages ───────────────────────────────────────────────────

/// One price-update batch published by the ingest pipeline. Ephemeral;
/// consumed once and never persisted by this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdateMessage {
    pub timestamp: i64,
    pub source: String,
    pub symbols: HashMap<String, SymbolQuote>,
}

/// Lightweight price snapshot for a single symbol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SymbolQuote {
    pub price: f64,
    pub volume: i64,
    pub change_pct: f64,
}

// ─── Condition payloads ──────────────────────────────────────────────

/// Covers price_above, price_below, volume_above, volume_below.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdCondition {
    pub threshold: f64,
}

/// Covers volume_spike. `baseline` names the reference average the rule
/// store resolves alongside the rule (currently "avg_30d").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSpikeCondition {
    pub volume_multiplier: f64,
    pub baseline: String,
}

/// Covers price_change_pct.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceChangeCondition {
    pub percent_change: f64,
    pub direction: ChangeDirection,
}

/// A rule's condition payload, tagged by its alert type. Parsing is the
/// single place malformed or non-positive payloads are rejected, so the
/// evaluator itself stays a pure comparison.
#[derive(Debug, Clone)]
pub enum Condition {
    Threshold(ThresholdCondition),
    VolumeSpike(VolumeSpikeCondition),
    PriceChange(PriceChangeCondition),
}

impl Condition {
    pub fn parse(alert_type: AlertType, raw: &serde_json::Value) -> Result<Self> {
        match alert_type {
            AlertType::PriceAbove
            | AlertType::PriceBelow
            | AlertType::VolumeAbove
            | AlertType::VolumeBelow => {
                let cond: ThresholdCondition = serde_json::from_value(raw.clone())
                    .map_err(|e| AppError::InvalidInput(format!("bad threshold condition: {}", e)))?;
                if cond.threshold <= 0.0 {
                    return Err(AppError::InvalidInput(format!(
                        "threshold must be positive, got {}",
                        cond.threshold
                    )));
                }
                Ok(Condition::Threshold(cond))
            }
            AlertType::VolumeSpike => {
                let cond: VolumeSpikeCondition = serde_json::from_value(raw.clone())
                    .map_err(|e| {
                        AppError::InvalidInput(format!("bad volume_spike condition: {}", e))
                    })?;
                if cond.volume_multiplier <= 0.0 {
                    return Err(AppError::InvalidInput(format!(
                        "volume_multiplier must be positive, got {}",
                        cond.volume_multiplier
                    )));
                }
                Ok(Condition::VolumeSpike(cond))
            }
            AlertType::PriceChangePct => {
                let cond: PriceChangeCondition = serde_json::from_value(raw.clone())
                    .map_err(|e| {
                        AppError::InvalidInput(format!("bad price_change_pct condition: {}", e))
                    })?;
                if cond.percent_change <= 0.0 {
                    return Err(AppError::InvalidInput(format!(
                        "percent_change must be positive, got {}",
                        cond.percent_change
                    )));
                }
                Ok(Condition::PriceChange(cond))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_price_update_wire_shape() {
        let raw = r#"{
            "timestamp": 1718000000,
            "source": "market-data",
            "symbols": {
                "AAPL": {"price": 151.2, "volume": 1200000, "change_pct": 1.3}
            }
        }"#;

        let msg: PriceUpdateMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.timestamp, 1718000000);
        assert_eq!(msg.source, "market-data");
        let quote = msg.symbols.get("AAPL").unwrap();
        assert_eq!(quote.price, 151.2);
        assert_eq!(quote.volume, 1200000);
        assert_eq!(quote.change_pct, 1.3);
    }

    #[test]
    fn test_parse_threshold_condition() {
        let cond = Condition::parse(AlertType::PriceAbove, &json!({"threshold": 150.0})).unwrap();
        match cond {
            Condition::Threshold(t) => assert_eq!(t.threshold, 150.0),
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_non_positive_threshold() {
        assert!(Condition::parse(AlertType::PriceAbove, &json!({"threshold": 0.0})).is_err());
        assert!(Condition::parse(AlertType::VolumeBelow, &json!({"threshold": -10.0})).is_err());
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        assert!(Condition::parse(AlertType::PriceAbove, &json!({"nope": true})).is_err());
        assert!(Condition::parse(AlertType::VolumeSpike, &json!({"volume_multiplier": "x"})).is_err());
    }

    #[test]
    fn test_parse_volume_spike() {
        let cond = Condition::parse(
            AlertType::VolumeSpike,
            &json!({"volume_multiplier": 3.0, "baseline": "avg_30d"}),
        )
        .unwrap();
        match cond {
            Condition::VolumeSpike(c) => {
                assert_eq!(c.volume_multiplier, 3.0);
                assert_eq!(c.baseline, "avg_30d");
            }
            other => panic!("unexpected condition: {:?}", other),
        }
    }

    #[test]
    fn test_parse_price_change_direction() {
        let cond = Condition::parse(
            AlertType::PriceChangePct,
            &json!({"percent_change": 5.0, "direction": "down"}),
        )
        .unwrap();
        match cond {
            Condition::PriceChange(c) => assert_eq!(c.direction, ChangeDirection::Down),
            other => panic!("unexpected condition: {:?}", other),
        }
    }
}
