//! Session settings and preferences
//!
//! Persisted separately from level packs in LocalStorage. Native builds read
//! them from a JSON file passed on the command line.

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SessionError;

/// Session settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Flow ===
    /// Move to the next level once the completion hold elapses
    pub auto_advance: bool,
    /// Ticks the completion indicator stays up before advancing
    pub match_hold_ticks: u32,

    // === Simulation ===
    /// Spheres below this height are removed
    pub fall_limit: f32,
    /// Speed below which a shot sphere counts as stopped
    pub stop_threshold: f32,
    /// Power gauge speed multiplier (1.0 = 10 units/s)
    pub power_rate_scale: f32,

    // === HUD ===
    /// Show the red/yellow cell helpers
    pub cell_helpers: bool,

    // === Accessibility ===
    /// Skip the completion hold
    pub reduced_motion: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_advance: true,
            match_hold_ticks: MATCH_HOLD_TICKS,

            fall_limit: FALL_LIMIT,
            stop_threshold: STOP_THRESHOLD,
            power_rate_scale: 1.0,

            cell_helpers: true,

            reduced_motion: false,
        }
    }
}

impl Settings {
    /// Effective completion hold (respects reduced_motion)
    pub fn effective_match_hold(&self) -> u32 {
        if self.reduced_motion {
            0
        } else {
            self.match_hold_ticks
        }
    }

    /// Parse settings JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, SessionError> {
        let settings: Settings =
            serde_json::from_str(json).map_err(|e| SessionError::InvalidSettings {
                reason: e.to_string(),
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the simulation can't run with
    pub fn validate(&self) -> Result<(), SessionError> {
        if !self.fall_limit.is_finite() {
            return Err(SessionError::InvalidSettings {
                reason: "fall_limit must be finite".into(),
            });
        }
        if !(self.stop_threshold > 0.0) {
            return Err(SessionError::InvalidSettings {
                reason: "stop_threshold must be positive".into(),
            });
        }
        if !(self.power_rate_scale > 0.0) || !self.power_rate_scale.is_finite() {
            return Err(SessionError::InvalidSettings {
                reason: "power_rate_scale must be positive".into(),
            });
        }
        Ok(())
    }

    /// LocalStorage key
    const STORAGE_KEY: &'static str = "block_shape_settings";

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                match Self::from_json(&json) {
                    Ok(settings) => {
                        log::info!("Loaded settings from LocalStorage");
                        return settings;
                    }
                    Err(e) => log::warn!("Ignoring stored settings: {}", e),
                }
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
                log::info!("Settings saved");
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        log::debug!("No settings storage for key {}", Self::STORAGE_KEY);
        Self::default()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_constants() {
        let s = Settings::default();
        assert!(s.auto_advance);
        assert_eq!(s.match_hold_ticks, MATCH_HOLD_TICKS);
        assert_eq!(s.stop_threshold, STOP_THRESHOLD);
        assert_eq!(s.fall_limit, FALL_LIMIT);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let s = Settings::from_json(r#"{"auto_advance": false, "power_rate_scale": 2.0}"#).unwrap();
        assert!(!s.auto_advance);
        assert_eq!(s.power_rate_scale, 2.0);
        assert!(s.cell_helpers);
        assert_eq!(s.match_hold_ticks, MATCH_HOLD_TICKS);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Settings::from_json(r#"{"stop_threshold": 0.0}"#),
            Err(SessionError::InvalidSettings { .. })
        ));
        assert!(matches!(
            Settings::from_json(r#"{"power_rate_scale": -1.0}"#),
            Err(SessionError::InvalidSettings { .. })
        ));
        assert!(matches!(
            Settings::from_json("not json"),
            Err(SessionError::InvalidSettings { .. })
        ));
    }

    #[test]
    fn test_reduced_motion_skips_hold() {
        let s = Settings {
            reduced_motion: true,
            ..Default::default()
        };
        assert_eq!(s.effective_match_hold(), 0);
        assert_eq!(Settings::default().effective_match_hold(), MATCH_HOLD_TICKS);
    }

    #[test]
    fn test_native_load_is_default() {
        assert_eq!(Settings::load(), Settings::default());
    }
}
