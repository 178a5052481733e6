//! Neutron interaction detection
//!
//! Pure lookups: given a neutron and the static structures, decide which
//! single interaction (if any) applies this tick. Material is checked before
//! rods and the first match wins.

use std::collections::HashMap;

use glam::{IVec2, Vec2};

use super::state::{ControlRod, Element, MaterialCell, Neutron};
use super::vector::{lattice_distance, nearest_site, with_magnitude};
use crate::consts::CAPTURE_RADIUS;

/// The interaction a neutron undergoes this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// Thermal neutron split a fissile cell
    Fission { cell: usize },
    /// Thermal neutron captured by xenon
    XenonCapture { cell: usize },
    /// Absorbed by a rod's inserted section
    RodAbsorbed { rod: usize },
    /// Fast neutron slowed by a rod's moderating tip
    Moderated { rod: usize },
}

/// Check a thermal neutron against the material lattice
///
/// Only the site nearest the neutron can be closer than the capture radius,
/// so a single lookup replaces a scan of every cell.
pub fn material_interaction(
    neutron: &Neutron,
    materials: &[MaterialCell],
    sites: &HashMap<IVec2, usize>,
) -> Option<Interaction> {
    if neutron.fast {
        return None;
    }

    let &cell = sites.get(&nearest_site(neutron.pos))?;
    if lattice_distance(materials[cell].site(), neutron.pos) >= CAPTURE_RADIUS {
        return None;
    }

    match materials[cell].element {
        Element::Fissile => Some(Interaction::Fission { cell }),
        Element::Xenon => Some(Interaction::XenonCapture { cell }),
        Element::Inert => None,
    }
}

/// Check a neutron against every rod channel
pub fn rod_interaction(
    neutron: &Neutron,
    rods: &[ControlRod],
    lattice_height: f32,
) -> Option<Interaction> {
    for (i, rod) in rods.iter().enumerate() {
        if !rod.in_channel(neutron.pos.x) {
            continue;
        }
        if neutron.pos.y < rod.insertion_line(lattice_height) {
            return Some(Interaction::RodAbsorbed { rod: i });
        }
        if rod.moderator && neutron.fast {
            return Some(Interaction::Moderated { rod: i });
        }
    }
    None
}

/// First interaction for a neutron, material before rods
pub fn find_interaction(
    neutron: &Neutron,
    materials: &[MaterialCell],
    sites: &HashMap<IVec2, usize>,
    rods: &[ControlRod],
    lattice_height: f32,
) -> Option<Interaction> {
    material_interaction(neutron, materials, sites)
        .or_else(|| rod_interaction(neutron, rods, lattice_height))
}

/// Velocity after moderation: x reflected, rescaled to thermal speed
///
/// A neutron at rest keeps a zero velocity rather than producing NaN.
pub fn moderate_velocity(vel: Vec2, thermal_speed: f32) -> Vec2 {
    let reflected = Vec2::new(-vel.x, vel.y);
    with_magnitude(reflected, thermal_speed).unwrap_or(Vec2::ZERO)
}
