use serde::{Deserialize, Serialize};

use crate::events::GAME_MASTER;
use crate::viewport::ViewportConfig;

/// What a declined offer does to later offers in the same turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclinePolicy {
    /// Only the current offer is dismissed; the next "your turn" signal
    /// reopens the dialog.
    #[default]
    CurrentOfferOnly,
    /// Ignore "your turn" signals until the player's turn index advances.
    SuppressTurn,
}

/// Engine tunables. Every field has a default, so stored settings only need
/// the keys they override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub hex_width: f64,
    pub viewport: ViewportConfig,
    pub decline_policy: DeclinePolicy,
    /// Quiet period before an edited draft is written to the local store.
    pub draft_debounce_ms: u32,
    pub game_master_sender: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hex_width: 70.0,
            viewport: ViewportConfig::default(),
            decline_policy: DeclinePolicy::default(),
            draft_debounce_ms: 500,
            game_master_sender: GAME_MASTER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut config: Self = serde_json::from_str(raw)?;
        config.sanitize();
        Ok(config)
    }

    /// Replace values that would break the geometry with defaults.
    pub fn sanitize(&mut self) {
        let defaults = Self::default();
        if !(self.hex_width.is_finite() && self.hex_width > 0.0) {
            tracing::warn!(hex_width = self.hex_width, "invalid hex width, using default");
            self.hex_width = defaults.hex_width;
        }
        let viewport = &self.viewport;
        let bounds_ok = viewport.min_scale.is_finite()
            && viewport.max_scale.is_finite()
            && viewport.min_scale > 0.0
            && viewport.min_scale <= viewport.max_scale;
        let factors_ok = viewport.zoom_in_factor > 1.0
            && viewport.zoom_in_factor.is_finite()
            && viewport.zoom_out_factor > 0.0
            && viewport.zoom_out_factor < 1.0;
        if !(bounds_ok && factors_ok) {
            tracing::warn!(?viewport, "invalid viewport limits, using defaults");
            self.viewport = defaults.viewport;
        }
        if self.game_master_sender.is_empty() {
            self.game_master_sender = defaults.game_master_sender;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.game_master_sender, "GM");
        assert_eq!(config.decline_policy, DeclinePolicy::CurrentOfferOnly);
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let config = EngineConfig::from_json(
            r#"{"decline_policy":"suppress_turn","viewport":{"min_scale":0.5}}"#,
        )
        .unwrap();
        assert_eq!(config.decline_policy, DeclinePolicy::SuppressTurn);
        assert_eq!(config.viewport.min_scale, 0.5);
        assert_eq!(config.viewport.max_scale, 3.0);
        assert_eq!(config.hex_width, 70.0);
    }

    #[test]
    fn broken_geometry_falls_back() {
        let config = EngineConfig::from_json(
            r#"{"hex_width":-4,"viewport":{"min_scale":4.0,"max_scale":1.0},"game_master_sender":""}"#,
        )
        .unwrap();
        assert_eq!(config.hex_width, 70.0);
        assert_eq!(config.viewport, ViewportConfig::default());
        assert_eq!(config.game_master_sender, "GM");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(EngineConfig::from_json("{not json").is_err());
    }
}
