use serde::{Deserialize, Serialize};

/// Process-level engine settings.
///
/// Per-association and per-event settings (tolerance windows, casting
/// requirements, approval flags) live in the store's config tables; the
/// values here are only the fallbacks used when those rows are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Lifetime of every cache entry the engine writes, capped at
    /// `MAX_CACHE_TTL_SECS`.
    pub cache_ttl_secs: u64,
    /// Fallback for association config `deadline_tolerance`.
    pub default_tolerance_days: i64,
    /// Fallback for event config `casting_characters`.
    pub default_casting_characters: i64,
    /// Fallback for event config `user_character_max`.
    pub default_max_characters: i64,
    pub urgency: UrgencyConfig,
    pub leaderboard_size: usize,
}

/// Ten years.
pub const MAX_CACHE_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// When the "hurry" banner shows on an open registration page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UrgencyConfig {
    pub remaining_below: i64,
    pub ratio_below: f64,
}

impl Default for UrgencyConfig {
    fn default() -> Self {
        Self {
            remaining_below: 10,
            ratio_below: 0.3,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60 * 60 * 24,
            default_tolerance_days: 30,
            default_casting_characters: 1,
            default_max_characters: 1,
            urgency: UrgencyConfig::default(),
            leaderboard_size: 25,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        if config.urgency.ratio_below < 0.0 || config.urgency.ratio_below > 1.0 {
            anyhow::bail!(
                "urgency.ratio_below must be within [0, 1], got {}",
                config.urgency.ratio_below
            );
        }
        Ok(config)
    }

    /// Config with hardcoded defaults for use in tests.
    pub fn default_test() -> Self {
        Self {
            leaderboard_size: 10,
            ..Self::default()
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        let secs = self.cache_ttl_secs.min(MAX_CACHE_TTL_SECS);
        chrono::Duration::seconds(secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{ "default_tolerance_days": 14 }"#).unwrap();
        assert_eq!(config.default_tolerance_days, 14);
        assert_eq!(config.cache_ttl_secs, 86_400);
        assert_eq!(config.urgency.remaining_below, 10);
    }

    #[test]
    fn cache_ttl_is_capped() {
        let config = EngineConfig {
            cache_ttl_secs: u64::MAX,
            ..EngineConfig::default()
        };
        assert_eq!(config.cache_ttl().num_seconds(), MAX_CACHE_TTL_SECS as i64);
        assert_eq!(EngineConfig::default().cache_ttl().num_seconds(), 86_400);
    }
}
