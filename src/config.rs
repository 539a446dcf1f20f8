//! Chamber tuning
//!
//! Every constant of the simulation lives here. Defaults reproduce the
//! classic look; a JSON file may override any subset of fields.

use crate::error::{ChamberError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Optional lines between nearby particles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub enabled: bool,
    /// Pairs further apart than this (pixels) are not linked
    pub max_distance: f32,
    /// Opacity of a link between two coincident particles
    pub opacity: f32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_distance: 100.0,
            opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChamberConfig {
    pub max_particles: usize,
    /// Particles per emission batch
    pub emission_rate: usize,
    pub magnetic_field: f32,
    /// Velocity multiplier per frame
    pub friction: f32,
    pub max_trail_length: usize,
    /// Trail opacity lost per frame
    pub trail_fade_speed: f32,
    /// Pointer must move strictly more than this (pixels) to emit
    pub min_pointer_distance: f32,
    /// Emission jitter box around the pointer (pixels)
    pub spread: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub decay_min: f32,
    pub decay_max: f32,
    pub size_min: f32,
    pub size_max: f32,
    /// Particles this far past the surface edge are culled
    pub offscreen_margin: f32,
    /// Life above which heads get a glow
    pub glow_threshold: f32,
    /// Glow halo width (pixels)
    pub glow_blur: f32,
    /// Opacity of the per-frame fade wash
    pub fade_alpha: f32,
    pub connections: ConnectionConfig,
    /// Fixed RNG seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            max_particles: 50,
            emission_rate: 2,
            magnetic_field: 0.01,
            friction: 0.99,
            max_trail_length: 100,
            trail_fade_speed: 0.015,
            min_pointer_distance: 2.0,
            spread: 5.0,
            speed_min: 0.5,
            speed_max: 2.0,
            decay_min: 0.008,
            decay_max: 0.013,
            size_min: 1.0,
            size_max: 2.5,
            offscreen_margin: 100.0,
            glow_threshold: 0.5,
            glow_blur: 8.0,
            fade_alpha: 0.05,
            connections: ConnectionConfig::default(),
            seed: None,
        }
    }
}

impl ChamberConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_capacity(mut self, max_particles: usize, emission_rate: usize) -> Self {
        self.max_particles = max_particles;
        self.emission_rate = emission_rate;
        self
    }

    pub fn with_connections(mut self, enabled: bool) -> Self {
        self.connections.enabled = enabled;
        self
    }

    /// Reject settings that would break the bounds the chamber relies on
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl Into<String>) -> Result<()> {
            Err(ChamberError::InvalidConfig(msg.into()))
        }

        if self.max_particles == 0 {
            return invalid("max_particles must be at least 1");
        }
        if !(self.friction > 0.0 && self.friction <= 1.0) {
            return invalid(format!("friction must be in (0, 1], got {}", self.friction));
        }
        if self.speed_min <= 0.0 {
            return invalid(format!("speed_min must be positive, got {}", self.speed_min));
        }
        if self.speed_max < self.speed_min {
            return invalid("speed_max must not be below speed_min");
        }
        if self.decay_min <= 0.0 || self.decay_max < self.decay_min {
            return invalid("decay range must be positive and ordered");
        }
        if self.size_min <= 0.0 || self.size_max < self.size_min {
            return invalid("size range must be positive and ordered");
        }
        if !(self.fade_alpha > 0.0 && self.fade_alpha <= 1.0) {
            return invalid(format!("fade_alpha must be in (0, 1], got {}", self.fade_alpha));
        }
        if self.offscreen_margin < 0.0 || self.spread < 0.0 || self.glow_blur < 0.0 {
            return invalid("margin, spread and glow_blur must not be negative");
        }
        if self.connections.max_distance <= 0.0 {
            return invalid("connections.max_distance must be positive");
        }
        Ok(())
    }

    /// Load and validate config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ChamberConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: ChamberConfig =
            serde_json::from_str(r#"{"max_particles": 80, "connections": {"enabled": true}}"#)
                .unwrap();
        assert_eq!(config.max_particles, 80);
        assert_eq!(config.emission_rate, 2);
        assert!(config.connections.enabled);
        assert_eq!(config.connections.max_distance, 100.0);
    }

    #[test]
    fn test_rejects_bad_friction() {
        let config = ChamberConfig {
            friction: 1.5,
            ..ChamberConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChamberError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_rejects_zero_speed() {
        let config = ChamberConfig {
            speed_min: 0.0,
            ..ChamberConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_roundtrip_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chamber.json");
        let config = ChamberConfig::default().with_seed(7).with_capacity(10, 3);
        config.save(&path).unwrap();
        assert_eq!(ChamberConfig::load(&path).unwrap(), config);
    }
}
