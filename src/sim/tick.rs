//! Fixed timestep simulation tick
//!
//! Advances the reactor one step. Boundary input is applied first, then the
//! rod policy, then the passes in order: collision, containment, motion,
//! decay, coolant, statistics.

use rand::Rng;

use super::collision::{Interaction, find_interaction, moderate_velocity};
use super::rods::apply_setpoints;
use super::state::{Element, NeutronId, ReactorState};
use super::thermal::water_pass;
use crate::consts::{CONTAINMENT_MARGIN, STATS_INTERVAL_TICKS};
use crate::error::{SimError, SimResult};

/// Boundary requests sampled once per tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Spawn this many thermal neutrons at random lattice positions
    pub spawn_neutrons: u32,
    /// Remove every neutron before the passes run
    pub clear_neutrons: bool,
}

/// One-shot notifications produced by a tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Fission events this tick (drives the audio cue)
    pub fissions: u32,
    /// Neutrons created this tick (fission, decay, spawn requests)
    pub emitted: u32,
    /// Neutrons destroyed this tick (capture, escape, absorption, clear)
    pub destroyed: u32,
    /// Neutron collection changed structurally; render lists must be trimmed
    pub neutrons_changed: bool,
    /// A statistics sample was taken this tick
    pub sampled: bool,
}

impl TickEvents {
    pub fn fission_occurred(&self) -> bool {
        self.fissions > 0
    }
}

/// Advance the reactor by one fixed timestep
pub fn tick(state: &mut ReactorState, input: &TickInput, dt: f32) -> SimResult<TickEvents> {
    if !(dt > 0.0) || !dt.is_finite() {
        return Err(SimError::NonPositiveTimestep(dt));
    }

    let mut events = TickEvents {
        neutrons_changed: std::mem::take(&mut state.neutrons_dirty),
        ..Default::default()
    };

    if input.clear_neutrons {
        events.destroyed += state.neutron_count() as u32;
        state.clear_neutrons();
        state.neutrons_dirty = false;
        events.neutrons_changed = true;
    }
    if input.spawn_neutrons > 0 {
        state.spawn_random_neutrons(input.spawn_neutrons);
        events.emitted += input.spawn_neutrons;
    }

    let live = state.neutron_count();
    if let Err(e) = state.rod_controller.update(&mut state.settings, live, dt) {
        log::warn!("Rod controller skipped this tick: {}", e);
    }
    apply_setpoints(&state.settings, &mut state.rods);

    collision_pass(state, &mut events);
    containment_pass(state, &mut events);
    position_pass(state, dt);
    decay_pass(state, dt, &mut events);
    events.destroyed += water_pass(state, dt);
    events.sampled = sample_stats(state);

    if events.destroyed > 0 {
        events.neutrons_changed = true;
    }
    state.time_ticks += 1;
    Ok(events)
}

/// Resolve the first interaction for every neutron alive at pass start
///
/// Neutrons emitted during the pass are not scanned until the next tick.
fn collision_pass(state: &mut ReactorState, events: &mut TickEvents) {
    let lattice_height = state.lattice.size().y;
    let ids: Vec<NeutronId> = state.neutrons.keys().copied().collect();

    for id in ids {
        let Some(neutron) = state.neutrons.get(&id) else {
            continue;
        };
        let Some(interaction) = find_interaction(
            neutron,
            &state.materials,
            &state.material_sites,
            &state.rods,
            lattice_height,
        ) else {
            continue;
        };

        match interaction {
            Interaction::Fission { cell } => {
                fission(state, id, cell, events);
            }
            Interaction::XenonCapture { cell } => {
                state.materials[cell].element = Element::Inert;
                state.neutrons.remove(&id);
                events.destroyed += 1;
            }
            Interaction::RodAbsorbed { rod } => {
                log::trace!("neutron {} absorbed by rod {}", id, rod);
                state.neutrons.remove(&id);
                events.destroyed += 1;
            }
            Interaction::Moderated { .. } => {
                let thermal = state.settings.thermal_neutron_speed;
                if let Some(n) = state.neutrons.get_mut(&id) {
                    n.vel = moderate_velocity(n.vel, thermal);
                    n.fast = false;
                }
            }
        }
    }
}

/// Split a fissile cell: consume the neutron, refuel elsewhere, emit fast neutrons
fn fission(state: &mut ReactorState, id: NeutronId, cell: usize, events: &mut TickEvents) {
    state.materials[cell].element = Element::Inert;
    state.neutrons.remove(&id);
    events.destroyed += 1;

    if let Err(e) = state.regenerate_inert(Some(cell)) {
        log::warn!("Fuel not replenished after fission: {}", e);
    }

    let site = state.materials[cell].site().as_vec2();
    for _ in 0..state.settings.fission_neutron_count {
        state.add_neutron(site, true);
    }
    events.emitted += state.settings.fission_neutron_count;
    events.fissions += 1;
}

/// Remove neutrons that left the lattice
fn containment_pass(state: &mut ReactorState, events: &mut TickEvents) {
    let lattice = state.lattice;
    let before = state.neutrons.len();
    state
        .neutrons
        .retain(|_, n| lattice.contains(n.pos, CONTAINMENT_MARGIN));
    events.destroyed += (before - state.neutrons.len()) as u32;
}

/// Ballistic motion, explicit Euler
fn position_pass(state: &mut ReactorState, dt: f32) {
    for n in state.neutrons.values_mut() {
        n.pos += n.vel * dt;
    }
}

/// Background emission and xenon build-up in inert cells
fn decay_pass(state: &mut ReactorState, dt: f32, events: &mut TickEvents) {
    let emit_chance = state.settings.decay_chance * dt;
    let xenon_chance = state.settings.xenon_decay_chance * dt;

    for i in 0..state.materials.len() {
        if state.materials[i].element != Element::Inert {
            continue;
        }
        if state.rng.random::<f32>() < emit_chance {
            let site = state.materials[i].site().as_vec2();
            state.add_neutron(site, true);
            events.emitted += 1;
        }
        if state.rng.random::<f32>() < xenon_chance {
            state.materials[i].element = Element::Xenon;
        }
    }
}

/// Push a statistics sample once per interval; returns whether one was taken
fn sample_stats(state: &mut ReactorState) -> bool {
    if state.stats_countdown > 0 {
        state.stats_countdown -= 1;
        return false;
    }
    state.stats_countdown = STATS_INTERVAL_TICKS;

    let xenon = state.xenon_count() as u32;
    let neutrons = state.neutron_count() as u32;
    state.stats.push_xenon(xenon);
    state.stats.push_reactivity(neutrons);
    match state.average_temperature() {
        Ok(avg) => state.stats.push_temperature(avg),
        Err(e) => log::debug!("Temperature sample skipped: {}", e),
    }
    log::debug!("stats: neutrons={} xenon={}", neutrons, xenon);
    true
}
