//! Reactor tuning and world layout
//!
//! Live-tunable engine configuration. Persisted as JSON on disk; the
//! presentation layer may also mutate fields directly between ticks.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{ROD_FULL_INSERTION, ROD_SETPOINTS};
use crate::error::SettingsError;
use crate::sim::PidGains;

/// How the master rod height is driven each tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RodControl {
    /// Rod heights come straight from the setpoints
    #[default]
    Manual,
    /// Nudge the master rod at a fixed rate toward a neutron-count target
    RampToTarget {
        target_neutrons: f32,
        /// Height change per second
        rate: f32,
        /// Lowest insertion the controller may reach
        min_height: f32,
    },
    /// Drive the master rod from the PID controller
    FeedbackControlled {
        target_neutrons: f32,
        gains: PidGains,
        /// Symmetric bound on the integral accumulator
        integral_limit: f32,
        min_height: f32,
    },
}

impl RodControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            RodControl::Manual => "Manual",
            RodControl::RampToTarget { .. } => "Ramp",
            RodControl::FeedbackControlled { .. } => "PID",
        }
    }

    /// Reject non-finite targets, limits and gains
    fn validate(&self) -> Result<(), SettingsError> {
        let values: Vec<(&str, f32)> = match self {
            RodControl::Manual => Vec::new(),
            RodControl::RampToTarget {
                target_neutrons,
                rate,
                min_height,
            } => vec![
                ("target_neutrons", *target_neutrons),
                ("rate", *rate),
                ("min_height", *min_height),
            ],
            RodControl::FeedbackControlled {
                target_neutrons,
                gains,
                integral_limit,
                min_height,
            } => vec![
                ("target_neutrons", *target_neutrons),
                ("integral_limit", *integral_limit),
                ("min_height", *min_height),
                ("kp", gains.kp),
                ("ki", gains.ki),
                ("kd", gains.kd),
            ],
        };
        for (name, value) in values {
            if !value.is_finite() {
                return Err(SettingsError::Invalid(format!(
                    "{} {name} must be finite, got {value}",
                    self.as_str()
                )));
            }
        }

        match *self {
            RodControl::RampToTarget { rate, .. } if rate < 0.0 => Err(SettingsError::Invalid(
                format!("ramp rate must be non-negative, got {rate}"),
            )),
            RodControl::FeedbackControlled { integral_limit, .. } if integral_limit < 0.0 => {
                Err(SettingsError::Invalid(format!(
                    "integral limit must be non-negative, got {integral_limit}"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorSettings {
    // === Neutrons ===
    /// Fast neutrons emitted per fission event
    pub fission_neutron_count: u32,
    /// Thermal (moderated) neutron speed, lattice units per second
    pub thermal_neutron_speed: f32,
    /// Fast neutron speed, lattice units per second
    pub fast_neutron_speed: f32,
    /// Background emission chance per inert cell per second
    pub decay_chance: f32,
    /// Neutron capture chance per nearby water cell per second
    pub water_absorption_chance: f32,

    // === Material ===
    /// Inert -> xenon transmutation chance per second
    pub xenon_decay_chance: f32,

    // === Heat ===
    /// Temperature lost per second by every water cell
    pub heat_dissipate: f32,
    /// Column flow factor per second
    pub water_flow: f32,
    /// Temperature gained per second per nearby neutron
    pub heat_transfer: f32,

    // === Rods ===
    /// Per-rod height setpoints (0 = withdrawn, 100 = fully inserted)
    pub rod_heights: [f32; ROD_SETPOINTS],
    /// Mirror the master rod onto every other rod
    pub global_rods: bool,
    pub rod_control: RodControl,

    /// RNG seed for the engine
    pub seed: u64,
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self {
            fission_neutron_count: 3,
            thermal_neutron_speed: 3.0,
            fast_neutron_speed: 6.0,
            decay_chance: 0.01,
            water_absorption_chance: 0.02,

            xenon_decay_chance: 0.003,

            heat_dissipate: 10.0,
            water_flow: 30.0,
            heat_transfer: 15.0,

            rod_heights: [ROD_FULL_INSERTION; ROD_SETPOINTS],
            global_rods: false,
            rod_control: RodControl::Manual,

            seed: 0x5EED,
        }
    }
}

impl ReactorSettings {
    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let mut settings: Self = serde_json::from_str(&json)?;
        settings.validate()?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let path = path.as_ref();
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// Reject negative or non-finite tuning values; clamp rod setpoints
    pub fn validate(&mut self) -> Result<(), SettingsError> {
        let rates = [
            ("thermal_neutron_speed", self.thermal_neutron_speed),
            ("fast_neutron_speed", self.fast_neutron_speed),
            ("decay_chance", self.decay_chance),
            ("water_absorption_chance", self.water_absorption_chance),
            ("xenon_decay_chance", self.xenon_decay_chance),
            ("heat_dissipate", self.heat_dissipate),
            ("water_flow", self.water_flow),
            ("heat_transfer", self.heat_transfer),
        ];
        for (name, value) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::Invalid(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }

        for (i, height) in self.rod_heights.iter_mut().enumerate() {
            let clamped = clamp_rod_height(*height);
            if clamped != *height {
                log::warn!("Rod {} setpoint {} clamped to {}", i + 1, height, clamped);
                *height = clamped;
            }
        }

        self.rod_control.validate()
    }

    /// Speed for a neutron of the given class
    pub fn neutron_speed(&self, fast: bool) -> f32 {
        if fast {
            self.fast_neutron_speed
        } else {
            self.thermal_neutron_speed
        }
    }
}

/// Clamp a rod height into the valid insertion range (NaN maps to withdrawn)
pub fn clamp_rod_height(height: f32) -> f32 {
    if height.is_nan() {
        0.0
    } else {
        height.clamp(0.0, ROD_FULL_INSERTION)
    }
}

/// Startup geometry handed to the world builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldLayout {
    /// Lattice width in cells
    pub width: u32,
    /// Lattice height in cells
    pub height: u32,
    /// Probability that a cell starts fissile
    pub enrichment: f32,
    /// Evenly spaced control rods
    pub rod_count: u32,
    /// Rods carry a moderating tip above the absorber
    pub moderated_rods: bool,
}

impl Default for WorldLayout {
    fn default() -> Self {
        Self {
            width: 48,
            height: 24,
            enrichment: 0.1,
            rod_count: ROD_SETPOINTS as u32,
            moderated_rods: true,
        }
    }
}
