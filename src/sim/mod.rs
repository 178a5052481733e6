//! Deterministic reactor simulation
//!
//! All physics lives here. This module must stay pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (neutrons by id, water by column)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod pid;
pub mod rods;
pub mod state;
pub mod thermal;
pub mod tick;
pub mod vector;
pub mod world;

pub use collision::{Interaction, find_interaction};
pub use pid::{PidController, PidGains};
pub use rods::RodController;
pub use state::{
    ControlRod, Element, ElementCounts, Lattice, MaterialCell, Neutron, NeutronId, ReactorState,
    WaterCell,
};
pub use tick::{TickEvents, TickInput, tick};
pub use world::build_world;
