//! Startup world generation
//!
//! Seeds a reactor from a `WorldLayout` using only the public mutation
//! operations: one material and one water cell per lattice site, plus an
//! evenly spaced rod bank.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::state::{Element, Lattice, ReactorState};
use crate::consts::ROD_FULL_INSERTION;
use crate::error::SimResult;
use crate::settings::{ReactorSettings, WorldLayout};

/// Build a populated reactor
///
/// Enrichment is rolled from its own stream derived from the settings seed so
/// the engine RNG starts from the same state for a given seed.
pub fn build_world(layout: &WorldLayout, settings: ReactorSettings) -> SimResult<ReactorState> {
    let mut layout_rng = Pcg32::seed_from_u64(settings.seed ^ 0x9E37_79B9_7F4A_7C15);
    let enrichment = layout.enrichment.clamp(0.0, 1.0);
    let mut state = ReactorState::new(Lattice::new(layout.width, layout.height), settings);

    for x in 0..layout.width as i32 {
        for y in 0..layout.height as i32 {
            let element = if layout_rng.random::<f32>() < enrichment {
                Element::Fissile
            } else {
                Element::Inert
            };
            state.add_material(x, y, element)?;
            state.add_water(x, y)?;
        }
    }

    for (i, x) in rod_positions(layout.width, layout.rod_count).into_iter().enumerate() {
        let height = state
            .settings
            .rod_heights
            .get(i)
            .copied()
            .unwrap_or(ROD_FULL_INSERTION);
        state.add_control_rod(x, height, layout.moderated_rods);
    }

    let counts = state.element_counts();
    log::info!(
        "World built: {}x{} lattice, {} fissile, {} rods",
        layout.width,
        layout.height,
        counts.fissile,
        state.rods().len()
    );
    Ok(state)
}

/// Rod x-positions spaced evenly across the lattice, centred between cells
pub fn rod_positions(width: u32, count: u32) -> Vec<f32> {
    let spacing = width as f32 / (count + 1) as f32;
    (1..=count)
        .map(|i| (i as f32 * spacing).floor() - 0.5)
        .collect()
}
