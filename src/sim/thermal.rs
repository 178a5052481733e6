//! Coolant heat model
//!
//! Each tick every water cell cools, is heated by nearby neutrons (which it
//! may absorb while below boiling), the bottom row is pinned to the inlet
//! temperature, and heat flows up each column.

use std::collections::HashMap;

use glam::IVec2;
use rand::Rng;

use super::state::{Neutron, NeutronId, ReactorState};
use super::vector::lattice_distance;
use crate::consts::{BOILING_POINT, WATER_INLET_TEMPERATURE, WATER_RANGE};

/// Neutrons bucketed by nearest lattice site for proximity queries
struct NeutronGrid {
    buckets: HashMap<IVec2, Vec<NeutronId>>,
    reach: i32,
}

impl NeutronGrid {
    fn build<'a>(neutrons: impl Iterator<Item = &'a Neutron>, range: f32) -> Self {
        let mut buckets: HashMap<IVec2, Vec<NeutronId>> = HashMap::new();
        for n in neutrons {
            buckets
                .entry(n.pos.round().as_ivec2())
                .or_default()
                .push(n.id);
        }
        Self {
            buckets,
            reach: range.ceil() as i32 + 1,
        }
    }

    /// Candidate ids near a site, in a fixed visiting order
    fn near(&self, site: IVec2) -> impl Iterator<Item = NeutronId> + '_ {
        let reach = self.reach;
        (-reach..=reach)
            .flat_map(move |dy| (-reach..=reach).map(move |dx| site + IVec2::new(dx, dy)))
            .filter_map(|s| self.buckets.get(&s))
            .flatten()
            .copied()
    }
}

/// Full coolant pass; returns the number of neutrons the water absorbed
pub fn water_pass(state: &mut ReactorState, dt: f32) -> u32 {
    let absorbed = heat_exchange(state, dt);
    pin_boundary(state);
    column_flow(state, dt);
    absorbed
}

/// Dissipation plus neutron heating and absorption
fn heat_exchange(state: &mut ReactorState, dt: f32) -> u32 {
    let dissipate = state.settings.heat_dissipate * dt;
    let heat = state.settings.heat_transfer * dt;
    let absorb_chance = state.settings.water_absorption_chance * dt;

    let grid = NeutronGrid::build(state.neutrons.values(), WATER_RANGE);
    let mut absorbed = 0;
    let mut captured = Vec::new();

    for cell in state.water.iter_mut() {
        cell.temperature = (cell.temperature - dissipate).max(0.0);

        for id in grid.near(cell.site()) {
            // Already taken by an earlier cell this pass
            let Some(n) = state.neutrons.get(&id) else {
                continue;
            };
            if lattice_distance(cell.site(), n.pos) >= WATER_RANGE {
                continue;
            }
            cell.temperature += heat;
            if cell.temperature < BOILING_POINT && state.rng.random::<f32>() < absorb_chance {
                captured.push(id);
            }
        }

        for id in captured.drain(..) {
            if state.neutrons.remove(&id).is_some() {
                absorbed += 1;
            }
        }
    }

    if absorbed > 0 {
        log::trace!("water absorbed {} neutrons", absorbed);
    }
    absorbed
}

/// Hold bottom-row cells at the inlet temperature
fn pin_boundary(state: &mut ReactorState) {
    for cell in state.water.iter_mut().filter(|c| c.is_boundary()) {
        cell.temperature = WATER_INLET_TEMPERATURE;
    }
}

/// Move heat from each cell to the cell above it
///
/// Columns are walked bottom to top and each transfer sees the result of the
/// one below it, so heat can climb several cells in a single pass.
pub fn column_flow(state: &mut ReactorState, dt: f32) {
    // Above one half the pair would overshoot equilibrium
    let factor = (state.settings.water_flow * dt).clamp(0.0, 0.5);
    if factor == 0.0 {
        return;
    }

    for &lower in &state.water_order {
        let above = state.water[lower].site() + IVec2::Y;
        let Some(&upper) = state.water_sites.get(&above) else {
            continue;
        };
        let amount = (state.water[lower].temperature - state.water[upper].temperature) * factor;
        state.water[lower].temperature -= amount;
        state.water[upper].temperature += amount;
    }
}
