use crate::enums::{AlertType, ChangeDirection};
use crate::models::{Condition, SymbolQuote};

/// Decides whether a rule condition is met by the current quote. Pure
/// comparison, no I/O. `baseline` is the resolved reference average
/// (e.g. 30-day average volume) for volume_spike rules.
///
/// Threshold comparisons are strict: a price or volume exactly at the
/// threshold does not trigger. A type/payload mismatch fails closed.
pub fn evaluate(
    alert_type: AlertType,
    condition: &Condition,
    quote: &SymbolQuote,
    baseline: Option<f64>,
) -> bool {
    match (alert_type, condition) {
        (AlertType::PriceAbove, Condition::Threshold(cond)) => quote.price > cond.threshold,
        (AlertType::PriceBelow, Condition::Threshold(cond)) => quote.price < cond.threshold,
        (AlertType::VolumeAbove, Condition::Threshold(cond)) => {
            (quote.volume as f64) > cond.threshold
        }
        (AlertType::VolumeBelow, Condition::Threshold(cond)) => {
            (quote.volume as f64) < cond.threshold
        }
        (AlertType::VolumeSpike, Condition::VolumeSpike(cond)) => match baseline {
            Some(avg) if avg > 0.0 => (quote.volume as f64) > avg * cond.volume_multiplier,
            _ => {
                tracing::warn!("volume_spike rule has no usable baseline — not triggering");
                false
            }
        },
        (AlertType::PriceChangePct, Condition::PriceChange(cond)) => match cond.direction {
            ChangeDirection::Up => quote.change_pct >= cond.percent_change,
            ChangeDirection::Down => quote.change_pct <= -cond.percent_change,
            ChangeDirection::Either => quote.change_pct.abs() >= cond.percent_change,
        },
        (alert_type, condition) => {
            tracing::warn!(
                %alert_type,
                ?condition,
                "alert type does not match condition payload — not triggering"
            );
            false
        }
    }
}
