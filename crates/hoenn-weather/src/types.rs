use hoenn_core::NetworkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Simulated weather shown on the map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Condition {
    #[default]
    Clear,
    Rain,
    HeavyRain,
    Sandstorm,
    HarshSunlight,
    Fog,
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Clear,
        Condition::Rain,
        Condition::HeavyRain,
        Condition::Sandstorm,
        Condition::HarshSunlight,
        Condition::Fog,
    ];

    /// Stable name used in cache values and catalog files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Rain => "rain",
            Self::HeavyRain => "heavy-rain",
            Self::Sandstorm => "sandstorm",
            Self::HarshSunlight => "harsh-sunlight",
            Self::Fog => "fog",
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Sandstorm => "Sandstorm",
            Self::HarshSunlight => "Harsh Sunlight",
            Self::Fog => "Fog",
        }
    }

    /// Upper-case label for the map's status indicator
    pub fn status_label(&self) -> String {
        self.description().to_uppercase()
    }

    /// Icon name for marker renderers
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::Rain => "cloud_rain",
            Self::HeavyRain => "cloud_lightning",
            Self::Sandstorm => "wind",
            Self::HarshSunlight => "sun_dim",
            Self::Fog => "cloud_fog",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown weather condition: {0}")]
pub struct ParseConditionError(pub String);

impl FromStr for Condition {
    type Err = ParseConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Condition::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseConditionError(s.to_string()))
    }
}

/// Real-world point standing in for a location's climate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A raw real-world weather reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Provider condition class, e.g. "Rain", "Clouds", "Mist"
    pub condition_class: String,
    /// Relative humidity, 0-100
    pub humidity: f64,
    /// Wind speed in m/s
    pub wind_speed: f64,
    pub temperature_c: f64,
}

/// Observation fetch failures. The engine recovers from all of them.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("No weather API key configured")]
    MissingApiKey,
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_condition_names_round_trip_through_from_str() {
        for condition in Condition::ALL {
            assert_eq!(condition.as_str().parse::<Condition>(), Ok(condition));
        }
    }

    #[test]
    fn test_unknown_condition_name() {
        let err = "snow".parse::<Condition>().unwrap_err();
        assert_eq!(err, ParseConditionError("snow".to_string()));
    }

    #[test]
    fn test_condition_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Condition::HarshSunlight).unwrap();
        assert_eq!(json, "\"harsh-sunlight\"");
        let parsed: Condition = serde_json::from_str("\"heavy-rain\"").unwrap();
        assert_eq!(parsed, Condition::HeavyRain);
    }

    #[test]
    fn test_status_label() {
        assert_eq!(Condition::HeavyRain.status_label(), "HEAVY RAIN");
        assert_eq!(Condition::Clear.status_label(), "CLEAR");
    }

    #[test]
    fn test_default_is_clear() {
        assert_eq!(Condition::default(), Condition::Clear);
    }

    #[test]
    fn test_coordinates_range() {
        assert!(Coordinates { lat: 33.59, lon: 130.40 }.is_valid());
        assert!(!Coordinates { lat: 91.0, lon: 0.0 }.is_valid());
        assert!(!Coordinates { lat: 0.0, lon: -181.0 }.is_valid());
    }

    #[test]
    fn test_icon_names_are_distinct() {
        let icons: std::collections::HashSet<&str> =
            Condition::ALL.iter().map(|c| c.icon_name()).collect();
        assert_eq!(icons.len(), Condition::ALL.len());
        assert_eq!(Condition::Fog.icon_name(), "cloud_fog");
    }
}
