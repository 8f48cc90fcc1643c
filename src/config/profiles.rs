use serde::{Deserialize, Serialize};

use super::runtime::AdvisorySettings;

/// Advisory sensitivity presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryProfile {
    /// Flags moderate moves early. Suited to food-security monitoring.
    Sensitive,

    /// Default thresholds (5% move, 10% band, 3-month trend)
    Standard,

    /// Only large dislocations
    Relaxed,
}

impl AdvisoryProfile {
    pub fn name(&self) -> &str {
        match self {
            Self::Sensitive => "Sensitive",
            Self::Standard => "Standard",
            Self::Relaxed => "Relaxed",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::Sensitive => "3% monthly move, 7.5% band around the 6-month mean, 2-month trend.",
            Self::Standard => "5% monthly move, 10% band around the 6-month mean, 3-month trend.",
            Self::Relaxed => "10% monthly move, 15% band around the 12-month mean, 4-month trend.",
        }
    }

    pub fn settings(&self) -> AdvisorySettings {
        match self {
            Self::Sensitive => AdvisorySettings {
                pct_change_threshold: 0.03,
                band_window: 6,
                band_pct: 0.075,
                trend_length: 2,
            },
            Self::Standard => AdvisorySettings::default(),
            Self::Relaxed => AdvisorySettings {
                pct_change_threshold: 0.10,
                band_window: 12,
                band_pct: 0.15,
                trend_length: 4,
            },
        }
    }
}

impl std::str::FromStr for AdvisoryProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sensitive" => Ok(Self::Sensitive),
            "standard" => Ok(Self::Standard),
            "relaxed" => Ok(Self::Relaxed),
            _ => Err(format!("Unknown advisory profile: {}", s)),
        }
    }
}
