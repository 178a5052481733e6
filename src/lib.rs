//! Fission Sim - a discrete-time neutron chain reaction model
//!
//! Core modules:
//! - `sim`: Deterministic engine (neutrons, material, coolant, rods, control)
//! - `stats`: Rolling trend history sampled from the engine
//! - `renderer`: Snapshot export into flat shape lists
//! - `runtime`: Locked engine handle and fixed-rate tick thread
//! - `settings`: Live tuning and startup layout

pub mod error;
pub mod renderer;
pub mod runtime;
pub mod settings;
pub mod sim;
pub mod stats;

pub use error::{SettingsError, SimError, SimResult};
pub use runtime::{Command, Driver, SharedReactor};
pub use settings::{ReactorSettings, RodControl, WorldLayout};
pub use stats::ReactorStatistics;

/// Simulation configuration constants
pub mod consts {
    /// Target tick rate
    pub const TARGET_TICK_RATE: u32 = 60;
    /// Fixed simulation timestep
    pub const SIM_DT: f32 = 1.0 / TARGET_TICK_RATE as f32;

    /// Neutron-material capture distance (lattice units)
    pub const CAPTURE_RADIUS: f32 = 0.5;
    /// Containment bounds are inflated by this margin
    pub const CONTAINMENT_MARGIN: f32 = 0.5;
    /// Probes before falling back to a scan when re-enriching fuel
    pub const REGEN_PROBE_ATTEMPTS: u32 = 64;

    /// Neutron-water heating distance (lattice units)
    pub const WATER_RANGE: f32 = 1.0;
    /// Bottom-row coolant temperature
    pub const WATER_INLET_TEMPERATURE: f32 = 0.0;
    /// Added to coolant temperatures for reporting
    pub const WATER_TEMP_OFFSET: f32 = 20.0;
    /// Water stops absorbing neutrons at this temperature
    pub const BOILING_POINT: f32 = 100.0;

    /// Rod setpoints exposed to the presentation layer
    pub const ROD_SETPOINTS: usize = 5;
    /// Setpoint driven by the automatic controllers
    pub const MASTER_ROD: usize = 0;
    pub const ROD_FULL_INSERTION: f32 = 100.0;
    /// Half the width of a rod channel (lattice units)
    pub const ROD_HALF_WIDTH: f32 = 0.5;

    /// Ticks between statistics samples
    pub const STATS_INTERVAL_TICKS: u32 = TARGET_TICK_RATE;
    /// Samples kept per statistics window
    pub const STATS_WINDOW: usize = 60;

    /// Render scale: pixels per lattice cell
    pub const CELL_PX: f32 = 14.0;
    pub const ATOM_PADDING: f32 = 2.0;
    pub const WATER_PADDING: f32 = 0.5;
    pub const ROD_WIDTH_PX: f32 = CELL_PX / 2.0;
    pub const RAIL_WIDTH_PX: f32 = 2.0;
}
