//! Shape generation from reactor state
//!
//! Lattice coordinates map to pixels as `p * CELL_PX + CELL_PX / 2`, so site
//! (0, 0) is centred in the first cell. Output vectors are reused slot by
//! slot; only the neutron list is ever truncated.

use glam::Vec2;
use serde::Serialize;

use super::instance::{CircleShape, RectShape, category};
use crate::consts::{
    ATOM_PADDING, BOILING_POINT, CELL_PX, RAIL_WIDTH_PX, ROD_WIDTH_PX, WATER_PADDING,
};
use crate::sim::{ControlRod, ReactorState, WaterCell};

/// Lattice point to pixel centre
#[inline]
fn to_px(p: Vec2) -> Vec2 {
    p * CELL_PX + Vec2::splat(CELL_PX / 2.0)
}

/// Overwrite existing slots, push past the end; never shrinks
fn write_slots<T>(out: &mut Vec<T>, items: impl Iterator<Item = T>) -> usize {
    let mut n = 0;
    for item in items {
        if let Some(slot) = out.get_mut(n) {
            *slot = item;
        } else {
            out.push(item);
        }
        n += 1;
    }
    n
}

/// One circle per material cell, coloured by element
pub fn export_materials(state: &ReactorState, out: &mut Vec<CircleShape>) {
    let radius = CELL_PX / 2.0 - ATOM_PADDING;
    write_slots(
        out,
        state
            .materials()
            .iter()
            .map(|m| CircleShape::new(to_px(m.site().as_vec2()), radius, m.element.code())),
    );
}

/// One circle per live neutron
///
/// Stale trailing entries are dropped only when `neutrons_changed` is set.
pub fn export_neutrons(state: &ReactorState, out: &mut Vec<CircleShape>, neutrons_changed: bool) {
    let radius = CELL_PX / 4.0;
    let written = write_slots(
        out,
        state.neutrons().map(|n| {
            let code = if n.fast {
                category::NEUTRON_FAST
            } else {
                category::NEUTRON_THERMAL
            };
            CircleShape::new(to_px(n.pos), radius, code)
        }),
    );
    if neutrons_changed {
        out.truncate(written);
    }
}

/// One rectangle per water cell, coloured on a heat ramp
pub fn export_water(state: &ReactorState, out: &mut Vec<RectShape>) {
    let size = Vec2::splat(CELL_PX - 2.0 * WATER_PADDING);
    write_slots(
        out,
        state
            .water()
            .iter()
            .map(|w| RectShape::new(to_px(w.site().as_vec2()), size, water_code(w))),
    );
}

/// Heat ramp: below zero is 0, above boiling is `WATER_BOILING`
pub fn water_code(cell: &WaterCell) -> i32 {
    if cell.temperature < 0.0 {
        0
    } else if cell.temperature > BOILING_POINT {
        category::WATER_BOILING
    } else {
        (cell.temperature * 2.55) as i32
    }
}

/// Three rectangles per rod: inserted absorber, withdrawn section, guide rail
pub fn export_rods(state: &ReactorState, out: &mut Vec<RectShape>) {
    let lattice_height = state.lattice().size().y;
    write_slots(
        out,
        state
            .rods()
            .iter()
            .flat_map(|rod| rod_segments(rod, lattice_height)),
    );
}

/// Visual segments for a rod, all derived from its height
pub fn rod_segments(rod: &ControlRod, lattice_height: f32) -> [RectShape; 3] {
    let line = rod.insertion_line(lattice_height);
    let withdrawn = if rod.moderator {
        category::ROD_MODERATOR
    } else {
        category::ROD_CHANNEL
    };
    [
        span(rod.x, 0.0, line, ROD_WIDTH_PX, category::ROD_ABSORBER),
        span(rod.x, line, lattice_height, ROD_WIDTH_PX, withdrawn),
        span(rod.x, 0.0, lattice_height, RAIL_WIDTH_PX, category::ROD_RAIL),
    ]
}

/// Vertical bar covering lattice y in [y0, y1]
fn span(x: f32, y0: f32, y1: f32, width_px: f32, code: i32) -> RectShape {
    let center = to_px(Vec2::new(x, (y0 + y1) / 2.0));
    RectShape::new(center, Vec2::new(width_px, (y1 - y0).max(0.0) * CELL_PX), code)
}

/// Everything the presentation layer draws for one frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub materials: Vec<CircleShape>,
    pub neutrons: Vec<CircleShape>,
    pub water: Vec<RectShape>,
    pub rods: Vec<RectShape>,
    pub neutron_count: usize,
    /// Set when a fission happened since the last capture; cleared by `take_fission_cue`
    fission_cue: bool,
}

impl Snapshot {
    /// Refresh every list from the current state
    pub fn capture(&mut self, state: &ReactorState, neutrons_changed: bool, fission: bool) {
        export_materials(state, &mut self.materials);
        export_neutrons(state, &mut self.neutrons, neutrons_changed);
        export_water(state, &mut self.water);
        export_rods(state, &mut self.rods);
        self.neutron_count = state.neutron_count();
        self.fission_cue |= fission;
    }

    /// Consume the one-shot fission cue
    pub fn take_fission_cue(&mut self) -> bool {
        std::mem::take(&mut self.fission_cue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::ReactorSettings;
    use crate::sim::{Element, Lattice};

    fn small_state() -> ReactorState {
        let mut state = ReactorState::new(Lattice::new(4, 4), ReactorSettings::default());
        state.add_material(0, 0, Element::Inert).unwrap();
        state.add_material(1, 0, Element::Fissile).unwrap();
        state.add_water(0, 0).unwrap();
        state
    }

    #[test]
    fn test_material_circles() {
        let state = small_state();
        let mut out = Vec::new();
        export_materials(&state, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].center, Vec2::splat(CELL_PX / 2.0));
        assert_eq!(out[1].category, Element::Fissile.code());
    }

    #[test]
    fn test_neutron_slots_reused_until_change() {
        let mut state = small_state();
        let a = state.add_neutron(Vec2::new(1.0, 1.0), false);
        state.add_neutron(Vec2::new(2.0, 2.0), true);

        let mut out = Vec::new();
        export_neutrons(&state, &mut out, false);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].category, category::NEUTRON_FAST);
        let capacity = out.capacity();

        state.destroy_neutron(a);
        export_neutrons(&state, &mut out, false);
        assert_eq!(out.len(), 2);

        export_neutrons(&state, &mut out, true);
        assert_eq!(out.len(), 1);
        assert_eq!(out.capacity(), capacity);
    }

    #[test]
    fn test_water_heat_ramp() {
        let mut cell = WaterCell::new(glam::IVec2::ZERO);
        assert_eq!(water_code(&cell), 0);
        cell.temperature = 50.0;
        assert_eq!(water_code(&cell), 127);
        cell.temperature = 101.0;
        assert_eq!(water_code(&cell), category::WATER_BOILING);
        cell.temperature = -3.0;
        assert_eq!(water_code(&cell), 0);
    }

    #[test]
    fn test_rod_segments_from_height() {
        let rod = ControlRod {
            x: 2.0,
            height: 25.0,
            moderator: true,
        };
        let [inserted, withdrawn, rail] = rod_segments(&rod, 8.0);
        assert_eq!(inserted.category, category::ROD_ABSORBER);
        assert_eq!(inserted.size.y, 2.0 * CELL_PX);
        assert_eq!(withdrawn.category, category::ROD_MODERATOR);
        assert_eq!(withdrawn.size.y, 6.0 * CELL_PX);
        assert_eq!(rail.size.y, 8.0 * CELL_PX);
        assert_eq!(inserted.center.x, rail.center.x);
    }

    #[test]
    fn test_snapshot_fission_cue_one_shot() {
        let mut state = small_state();
        state.add_control_rod(1.5, 50.0, false);
        let mut snapshot = Snapshot::default();
        snapshot.capture(&state, false, true);
        assert_eq!(snapshot.rods.len(), 3);
        assert_eq!(snapshot.water.len(), 1);
        assert!(snapshot.take_fission_cue());
        assert!(!snapshot.take_fission_cue());
    }
}
