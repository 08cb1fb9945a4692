use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

// ─── AlertType ───────────────────────────────────────────────────────

/// Supported alert rule types. The string form is the discriminant
/// stored in `alert_rules.alert_type` and tags the conditions payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    PriceAbove,
    PriceBelow,
    VolumeAbove,
    VolumeBelow,
    VolumeSpike,
    PriceChangePct,
}

impl AlertType {
    /// Canonical string stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceAbove => "price_above",
            AlertType::PriceBelow => "price_below",
            AlertType::VolumeAbove => "volume_above",
            AlertType::VolumeBelow => "volume_below",
            AlertType::VolumeSpike => "volume_spike",
            AlertType::PriceChangePct => "price_change_pct",
        }
    }

    /// Human-readable label for notification titles and email subjects.
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::PriceAbove => "Price Above",
            AlertType::PriceBelow => "Price Below",
            AlertType::VolumeAbove => "Volume Above",
            AlertType::VolumeBelow => "Volume Below",
            AlertType::VolumeSpike => "Volume Spike",
            AlertType::PriceChangePct => "Price Change %",
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "price_above" => Ok(AlertType::PriceAbove),
            "price_below" => Ok(AlertType::PriceBelow),
            "volume_above" => Ok(AlertType::VolumeAbove),
            "volume_below" => Ok(AlertType::VolumeBelow),
            "volume_spike" => Ok(AlertType::VolumeSpike),
            "price_change_pct" => Ok(AlertType::PriceChangePct),
            _ => Err(AppError::InvalidInput(format!(
                "Unknown alert type: {}. Supported: price_above, price_below, volume_above, volume_below, volume_spike, price_change_pct",
                s
            ))),
        }
    }
}

// ─── Frequency ───────────────────────────────────────────────────────

/// How often a rule may re-fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Once,
    Daily,
    Always,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Always => "always",
        }
    }

    /// Minimum interval between two triggers of the same rule.
    /// `Once` rules never re-fire, so no cooldown applies.
    pub fn cooldown(&self) -> Option<chrono::Duration> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(chrono::Duration::hours(24)),
            Frequency::Always => Some(chrono::Duration::minutes(5)),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "always" => Ok(Frequency::Always),
            _ => Err(AppError::InvalidInput(format!(
                "Invalid frequency: {}. Supported: once, daily, always",
                s
            ))),
        }
    }
}

// ─── ChangeDirection ─────────────────────────────────────────────────

/// Direction qualifier for `price_change_pct` conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeDirection {
    Up,
    Down,
    Either,
}

impl ChangeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeDirection::Up => "up",
            ChangeDirection::Down => "down",
            ChangeDirection::Either => "either",
        }
    }
}

impl fmt::Display for ChangeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Channel ─────────────────────────────────────────────────────────

/// A delivery medium, independently enabled per rule and per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    Email,
    InApp,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Email => "email",
            Channel::InApp => "in_app",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_type_round_trip() {
        for s in [
            "price_above",
            "price_below",
            "volume_above",
            "volume_below",
            "volume_spike",
            "price_change_pct",
        ] {
            let t: AlertType = s.parse().unwrap();
            assert_eq!(t.as_str(), s);
        }
    }

    #[test]
    fn test_unknown_alert_type_rejected() {
        assert!("news".parse::<AlertType>().is_err());
        assert!("".parse::<AlertType>().is_err());
    }

    #[test]
    fn test_frequency_cooldowns() {
        assert_eq!(Frequency::Once.cooldown(), None);
        assert_eq!(
            Frequency::Daily.cooldown(),
            Some(chrono::Duration::hours(24))
        );
        assert_eq!(
            Frequency::Always.cooldown(),
            Some(chrono::Duration::minutes(5))
        );
    }

    #[test]
    fn test_direction_serde_lowercase() {
        let d: ChangeDirection = serde_json::from_str("\"either\"").unwrap();
        assert_eq!(d, ChangeDirection::Either);
        assert_eq!(serde_json::to_string(&ChangeDirection::Up).unwrap(), "\"up\"");
    }
}
