use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub odds: OddsConfig,
    #[serde(default)]
    pub dispute: DisputeConfig,
    #[serde(default)]
    pub sweep: SweepConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsConfig {
    /// House margin applied to both sides of a live quote (0.05 = 5%).
    pub vig: Decimal,
    /// Quote shown for both sides while no stake has been placed.
    pub default_american: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisputeConfig {
    /// Hours after resolution during which a dispute may be filed.
    pub window_hours: i64,
    /// Allow a new dispute after one against the same resolution was rejected.
    pub allow_refile_after_rejection: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    pub interval_secs: u64,
}

impl Default for OddsConfig {
    fn default() -> Self {
        Self {
            vig: Decimal::new(5, 2), // 0.05
            default_american: -110,
        }
    }
}

impl Default for DisputeConfig {
    fn default() -> Self {
        Self {
            window_hours: 48,
            allow_refile_after_rejection: false,
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}
