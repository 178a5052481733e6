//! Reactor state and core simulation types
//!
//! The engine context: every particle and material collection, the seeded
//! RNG and the live configuration. Passes in `tick` mutate it in place.

use std::collections::{BTreeMap, HashMap};

use glam::{IVec2, Vec2};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::rods::RodController;
use super::vector::random_unit_vector;
use crate::consts::*;
use crate::error::{SettingsError, SimError, SimResult};
use crate::settings::{ReactorSettings, clamp_rod_height};
use crate::stats::ReactorStatistics;

/// Neutron identity, used only for targeted removal
pub type NeutronId = u64;

/// Material element tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Element {
    #[default]
    Inert,
    Fissile,
    Xenon,
}

impl Element {
    /// Render category code
    pub fn code(self) -> i32 {
        match self {
            Element::Inert => 0,
            Element::Fissile => 1,
            Element::Xenon => 2,
        }
    }
}

/// One lattice cell of reactor material
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialCell {
    site: IVec2,
    pub element: Element,
}

impl MaterialCell {
    pub fn new(site: IVec2, element: Element) -> Self {
        Self { site, element }
    }

    /// Lattice coordinates (fixed at creation)
    pub fn site(&self) -> IVec2 {
        self.site
    }
}

/// A free neutron
#[derive(Debug, Clone, PartialEq)]
pub struct Neutron {
    pub id: NeutronId,
    pub pos: Vec2,
    pub vel: Vec2,
    /// Freshly emitted and not yet moderated
    pub fast: bool,
}

/// One lattice cell of coolant
#[derive(Debug, Clone, PartialEq)]
pub struct WaterCell {
    site: IVec2,
    pub temperature: f32,
}

impl WaterCell {
    pub fn new(site: IVec2) -> Self {
        Self {
            site,
            temperature: 0.0,
        }
    }

    pub fn site(&self) -> IVec2 {
        self.site
    }

    /// Bottom-row cells hold the inlet boundary temperature
    pub fn is_boundary(&self) -> bool {
        self.site.y == 0
    }
}

/// A vertical control rod entering from the bottom of the lattice
#[derive(Debug, Clone, PartialEq)]
pub struct ControlRod {
    pub x: f32,
    /// Insertion percentage (0 = withdrawn, 100 = full lattice height)
    pub height: f32,
    /// Carries a moderating tip above the absorber section
    pub moderator: bool,
}

impl ControlRod {
    /// Lattice y below which the absorber occupies the core
    pub fn insertion_line(&self, lattice_height: f32) -> f32 {
        self.height / ROD_FULL_INSERTION * lattice_height
    }

    /// Whether an x coordinate falls inside the rod's channel
    pub fn in_channel(&self, x: f32) -> bool {
        (x - self.x).abs() <= ROD_HALF_WIDTH
    }
}

/// Lattice bounds in cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lattice {
    pub width: u32,
    pub height: u32,
}

impl Lattice {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// Whether a point lies inside the bounds inflated by `margin`
    pub fn contains(&self, pos: Vec2, margin: f32) -> bool {
        let size = self.size();
        pos.x >= -margin && pos.x <= size.x + margin && pos.y >= -margin && pos.y <= size.y + margin
    }
}

/// Counts of each element across the lattice
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementCounts {
    pub inert: usize,
    pub fissile: usize,
    pub xenon: usize,
}

impl ElementCounts {
    pub fn total(&self) -> usize {
        self.inert + self.fissile + self.xenon
    }
}

/// Complete engine state
#[derive(Debug, Clone)]
pub struct ReactorState {
    /// Live-tunable configuration
    pub settings: ReactorSettings,
    /// Sampled trend data
    pub stats: ReactorStatistics,
    /// Simulation tick counter
    pub time_ticks: u64,
    pub(crate) lattice: Lattice,
    pub(crate) materials: Vec<MaterialCell>,
    pub(crate) material_sites: HashMap<IVec2, usize>,
    /// Keyed by id so removal never shifts or invalidates other entries
    pub(crate) neutrons: BTreeMap<NeutronId, Neutron>,
    pub(crate) water: Vec<WaterCell>,
    pub(crate) water_sites: HashMap<IVec2, usize>,
    /// Water indices sorted by (x, y): columns bottom to top
    pub(crate) water_order: Vec<usize>,
    pub(crate) rods: Vec<ControlRod>,
    pub(crate) rod_controller: RodController,
    pub(crate) rng: Pcg32,
    /// Ticks until the next statistics sample
    pub(crate) stats_countdown: u32,
    /// Neutron collection changed outside of tick (reported by the next tick)
    pub(crate) neutrons_dirty: bool,
    next_id: NeutronId,
}

impl ReactorState {
    /// Create an empty reactor; populate it with the `add_*` operations
    pub fn new(lattice: Lattice, settings: ReactorSettings) -> Self {
        let rng = Pcg32::seed_from_u64(settings.seed);
        log::info!(
            "Reactor engine initialised ({}x{}, seed {})",
            lattice.width,
            lattice.height,
            settings.seed
        );
        Self {
            settings,
            stats: ReactorStatistics::default(),
            time_ticks: 0,
            lattice,
            materials: Vec::new(),
            material_sites: HashMap::new(),
            neutrons: BTreeMap::new(),
            water: Vec::new(),
            water_sites: HashMap::new(),
            water_order: Vec::new(),
            rods: Vec::new(),
            rod_controller: RodController::default(),
            rng,
            stats_countdown: STATS_INTERVAL_TICKS,
            neutrons_dirty: false,
            next_id: 0,
        }
    }

    // === Mutation operations ===

    /// Add a material cell at a free lattice site
    pub fn add_material(&mut self, x: i32, y: i32, element: Element) -> SimResult<()> {
        let site = IVec2::new(x, y);
        if self.material_sites.contains_key(&site) {
            return Err(SimError::SiteOccupied { x, y });
        }
        self.material_sites.insert(site, self.materials.len());
        self.materials.push(MaterialCell::new(site, element));
        Ok(())
    }

    /// Add a water cell at a free lattice site
    pub fn add_water(&mut self, x: i32, y: i32) -> SimResult<()> {
        let site = IVec2::new(x, y);
        if self.water_sites.contains_key(&site) {
            return Err(SimError::SiteOccupied { x, y });
        }
        let index = self.water.len();
        self.water_sites.insert(site, index);
        self.water.push(WaterCell::new(site));

        let water = &self.water;
        let pos = self
            .water_order
            .partition_point(|&i| (water[i].site.x, water[i].site.y) < (x, y));
        self.water_order.insert(pos, index);
        Ok(())
    }

    /// Add a control rod, returning its index
    ///
    /// Rods with a setpoint slot take `height` as their setpoint too, so the
    /// next tick keeps it.
    pub fn add_control_rod(&mut self, x: f32, height: f32, moderator: bool) -> usize {
        let height = clamp_rod_height(height);
        self.rods.push(ControlRod {
            x,
            height,
            moderator,
        });
        let index = self.rods.len() - 1;
        if let Some(setpoint) = self.settings.rod_heights.get_mut(index) {
            *setpoint = height;
        }
        index
    }

    /// Add a neutron with a random direction at the speed of its class
    pub fn add_neutron(&mut self, pos: Vec2, fast: bool) -> NeutronId {
        let vel = random_unit_vector(&mut self.rng) * self.settings.neutron_speed(fast);
        self.insert_neutron(pos, vel, fast)
    }

    /// Add a neutron with an explicit velocity
    pub fn insert_neutron(&mut self, pos: Vec2, vel: Vec2, fast: bool) -> NeutronId {
        let id = self.next_id;
        self.next_id += 1;
        self.neutrons.insert(id, Neutron { id, pos, vel, fast });
        log::trace!("neutron {} spawned at ({:.2}, {:.2}) fast={}", id, pos.x, pos.y, fast);
        id
    }

    /// Spawn thermal neutrons at uniformly random positions in the lattice
    pub fn spawn_random_neutrons(&mut self, count: u32) {
        let size = self.lattice.size();
        for _ in 0..count {
            let pos = Vec2::new(
                self.rng.random_range(0.0..=size.x),
                self.rng.random_range(0.0..=size.y),
            );
            self.add_neutron(pos, false);
        }
    }

    /// Set a rod's height (and its setpoint when it has one)
    ///
    /// Unknown rod indices are a no-op and return `false`.
    pub fn set_rod_height(&mut self, index: usize, height: f32) -> bool {
        let height = clamp_rod_height(height);
        let Some(rod) = self.rods.get_mut(index) else {
            return false;
        };
        rod.height = height;
        if let Some(setpoint) = self.settings.rod_heights.get_mut(index) {
            *setpoint = height;
        }
        true
    }

    /// Remove a neutron by identity
    ///
    /// Unknown ids are a no-op and return `false`.
    pub fn destroy_neutron(&mut self, id: NeutronId) -> bool {
        let removed = self.neutrons.remove(&id).is_some();
        if removed {
            self.neutrons_dirty = true;
        }
        removed
    }

    /// Remove every neutron
    pub fn clear_neutrons(&mut self) {
        if !self.neutrons.is_empty() {
            log::debug!("Clearing {} neutrons", self.neutrons.len());
        }
        self.neutrons.clear();
        self.neutrons_dirty = true;
    }

    /// Replace the live configuration after validating it
    ///
    /// A changed seed restarts the engine RNG from that seed. Invalid
    /// settings are rejected and the current ones stay in force.
    pub fn update_settings(&mut self, mut settings: ReactorSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        if settings.seed != self.settings.seed {
            log::info!("Engine RNG reseeded ({})", settings.seed);
            self.rng = Pcg32::seed_from_u64(settings.seed);
        }
        self.settings = settings;
        Ok(())
    }

    /// Re-enrich one uniformly random inert cell, never the excluded index
    ///
    /// Probes a bounded number of random cells, then falls back to a scan of
    /// the remaining inert cells. Fails only when no candidate exists.
    pub fn regenerate_inert(&mut self, exclude: Option<usize>) -> SimResult<usize> {
        let n = self.materials.len();
        if n == 0 {
            return Err(SimError::EmptyCollection("material cells"));
        }

        let attempts = REGEN_PROBE_ATTEMPTS.min(n as u32 * 4);
        for _ in 0..attempts {
            let i = self.rng.random_range(0..n);
            if Some(i) != exclude && self.materials[i].element == Element::Inert {
                self.materials[i].element = Element::Fissile;
                return Ok(i);
            }
        }

        let candidates: Vec<usize> = (0..n)
            .filter(|&i| Some(i) != exclude && self.materials[i].element == Element::Inert)
            .collect();
        if candidates.is_empty() {
            return Err(SimError::NoInertCell { attempts });
        }
        let i = candidates[self.rng.random_range(0..candidates.len())];
        self.materials[i].element = Element::Fissile;
        Ok(i)
    }

    // === Queries ===

    pub fn lattice(&self) -> Lattice {
        self.lattice
    }

    pub fn materials(&self) -> &[MaterialCell] {
        &self.materials
    }

    /// Material cell at a lattice site
    pub fn material_at(&self, x: i32, y: i32) -> Option<&MaterialCell> {
        self.material_sites
            .get(&IVec2::new(x, y))
            .map(|&i| &self.materials[i])
    }

    pub fn water(&self) -> &[WaterCell] {
        &self.water
    }

    /// Water cell at a lattice site
    pub fn water_at(&self, x: i32, y: i32) -> Option<&WaterCell> {
        self.water_sites
            .get(&IVec2::new(x, y))
            .map(|&i| &self.water[i])
    }

    pub(crate) fn water_at_mut(&mut self, x: i32, y: i32) -> Option<&mut WaterCell> {
        self.water_sites
            .get(&IVec2::new(x, y))
            .map(|&i| &mut self.water[i])
    }

    pub fn rods(&self) -> &[ControlRod] {
        &self.rods
    }

    /// Live neutrons in identity order
    pub fn neutrons(&self) -> impl ExactSizeIterator<Item = &Neutron> {
        self.neutrons.values()
    }

    pub fn neutron(&self, id: NeutronId) -> Option<&Neutron> {
        self.neutrons.get(&id)
    }

    pub fn neutron_count(&self) -> usize {
        self.neutrons.len()
    }

    pub fn xenon_count(&self) -> usize {
        self.element_counts().xenon
    }

    pub fn element_counts(&self) -> ElementCounts {
        let mut counts = ElementCounts::default();
        for cell in &self.materials {
            match cell.element {
                Element::Inert => counts.inert += 1,
                Element::Fissile => counts.fissile += 1,
                Element::Xenon => counts.xenon += 1,
            }
        }
        counts
    }

    /// Mean coolant temperature including the display offset
    pub fn average_temperature(&self) -> SimResult<f32> {
        if self.water.is_empty() {
            return Err(SimError::EmptyCollection("water cells"));
        }
        let sum: f32 = self
            .water
            .iter()
            .map(|w| w.temperature + WATER_TEMP_OFFSET)
            .sum();
        Ok(sum / self.water.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_state() -> ReactorState {
        ReactorState::new(Lattice::new(10, 10), ReactorSettings::default())
    }

    #[test]
    fn test_add_material_rejects_duplicate_site() {
        let mut state = empty_state();
        state.add_material(2, 3, Element::Fissile).unwrap();
        assert_eq!(
            state.add_material(2, 3, Element::Inert),
            Err(SimError::SiteOccupied { x: 2, y: 3 })
        );
        assert_eq!(state.material_at(2, 3).unwrap().element, Element::Fissile);
    }

    #[test]
    fn test_add_neutron_speed_by_class() {
        let mut state = empty_state();
        let fast = state.add_neutron(Vec2::new(1.0, 1.0), true);
        let slow = state.add_neutron(Vec2::new(1.0, 1.0), false);
        assert!((state.neutron(fast).unwrap().vel.length() - 6.0).abs() < 1e-4);
        assert!((state.neutron(slow).unwrap().vel.length() - 3.0).abs() < 1e-4);
        assert_ne!(fast, slow);
    }

    #[test]
    fn test_destroy_unknown_neutron_is_noop() {
        let mut state = empty_state();
        let id = state.add_neutron(Vec2::ZERO, false);
        assert!(!state.destroy_neutron(id + 100));
        assert_eq!(state.neutron_count(), 1);
        assert!(state.destroy_neutron(id));
        assert_eq!(state.neutron_count(), 0);
        assert!(state.neutrons_dirty);
    }

    #[test]
    fn test_set_rod_height() {
        let mut state = empty_state();
        let rod = state.add_control_rod(3.0, 100.0, false);
        assert!(state.set_rod_height(rod, 40.0));
        assert_eq!(state.rods()[rod].height, 40.0);
        assert_eq!(state.settings.rod_heights[rod], 40.0);
        assert!(!state.set_rod_height(7, 10.0));
        assert!(state.set_rod_height(rod, 250.0));
        assert_eq!(state.rods()[rod].height, 100.0);
    }

    #[test]
    fn test_add_control_rod_sets_setpoint() {
        let mut state = empty_state();
        let rod = state.add_control_rod(3.0, 30.0, false);
        assert_eq!(state.settings.rod_heights[rod], 30.0);
        let clamped = state.add_control_rod(5.0, -12.0, false);
        assert_eq!(state.rods()[clamped].height, 0.0);
        assert_eq!(state.settings.rod_heights[clamped], 0.0);
    }

    #[test]
    fn test_regenerate_inert_excludes_site() {
        let mut state = empty_state();
        state.add_material(0, 0, Element::Inert).unwrap();
        state.add_material(1, 0, Element::Inert).unwrap();
        for _ in 0..20 {
            state.materials[1].element = Element::Inert;
            assert_eq!(state.regenerate_inert(Some(0)), Ok(1));
        }
    }

    #[test]
    fn test_regenerate_inert_terminates_without_candidates() {
        let mut state = empty_state();
        assert_eq!(
            state.regenerate_inert(None),
            Err(SimError::EmptyCollection("material cells"))
        );
        state.add_material(0, 0, Element::Fissile).unwrap();
        state.add_material(1, 0, Element::Xenon).unwrap();
        assert!(matches!(
            state.regenerate_inert(None),
            Err(SimError::NoInertCell { .. })
        ));
    }

    #[test]
    fn test_update_settings_validates_and_reseeds() {
        let mut state = empty_state();
        let bad = ReactorSettings {
            decay_chance: f32::NAN,
            seed: 1,
            ..Default::default()
        };
        assert!(state.update_settings(bad).is_err());
        assert_eq!(state.settings.seed, ReactorSettings::default().seed);

        let reseeded = ReactorSettings {
            seed: 77,
            ..Default::default()
        };
        state.update_settings(reseeded.clone()).unwrap();
        let mut fresh = ReactorState::new(Lattice::new(10, 10), reseeded);
        let a = state.add_neutron(Vec2::ZERO, false);
        let b = fresh.add_neutron(Vec2::ZERO, false);
        assert_eq!(state.neutron(a).unwrap().vel, fresh.neutron(b).unwrap().vel);
    }

    #[test]
    fn test_average_temperature() {
        let mut state = empty_state();
        assert!(state.average_temperature().is_err());
        state.add_water(0, 1).unwrap();
        state.add_water(0, 2).unwrap();
        state.water_at_mut(0, 1).unwrap().temperature = 10.0;
        state.water_at_mut(0, 2).unwrap().temperature = 30.0;
        let avg = state.average_temperature().unwrap();
        assert!((avg - (20.0 + WATER_TEMP_OFFSET)).abs() < 1e-4);
    }

    #[test]
    fn test_water_order_is_column_major() {
        let mut state = empty_state();
        state.add_water(1, 1).unwrap();
        state.add_water(0, 2).unwrap();
        state.add_water(1, 0).unwrap();
        state.add_water(0, 0).unwrap();
        let order: Vec<IVec2> = state
            .water_order
            .iter()
            .map(|&i| state.water[i].site())
            .collect();
        assert_eq!(
            order,
            vec![
                IVec2::new(0, 0),
                IVec2::new(0, 2),
                IVec2::new(1, 0),
                IVec2::new(1, 1)
            ]
        );
    }

    #[test]
    fn test_lattice_contains_with_margin() {
        let lattice = Lattice::new(10, 10);
        assert!(lattice.contains(Vec2::new(-0.4, 10.4), 0.5));
        assert!(!lattice.contains(Vec2::new(-0.6, 5.0), 0.5));
        assert!(!lattice.contains(Vec2::new(5.0, 10.6), 0.5));
    }
}
