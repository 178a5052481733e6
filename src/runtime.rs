//! Threaded driver around the engine
//!
//! `SharedReactor` puts the engine, the pending boundary commands and the
//! per-tick input behind one mutex. A tick holds the lock for its whole
//! pipeline; commands are applied at the start of the next tick and
//! snapshot export takes the same lock, so passes never interleave with
//! either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec2;

use crate::consts::SIM_DT;
use crate::error::SimResult;
use crate::renderer::Snapshot;
use crate::settings::ReactorSettings;
use crate::sim::{NeutronId, ReactorState, TickEvents, TickInput, tick};

/// Mutation requests from the boundary, applied at the next tick boundary
#[derive(Debug, Clone)]
pub enum Command {
    AddNeutron { pos: Vec2, fast: bool },
    DestroyNeutron(NeutronId),
    SetRodHeight { rod: usize, height: f32 },
    /// Replace the live configuration
    UpdateSettings(Box<ReactorSettings>),
}

struct Inner {
    state: ReactorState,
    input: TickInput,
    commands: Vec<Command>,
    /// Sticky until the next export
    neutrons_changed: bool,
    fission_pending: bool,
}

/// Engine handle shared between the tick thread and the presentation side
#[derive(Clone)]
pub struct SharedReactor {
    inner: Arc<Mutex<Inner>>,
}

impl SharedReactor {
    pub fn new(state: ReactorState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state,
                input: TickInput::default(),
                commands: Vec::new(),
                neutrons_changed: true,
                fission_pending: false,
            })),
        }
    }

    /// A poisoned lock only means a panicking holder; the state is still usable
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queue a mutation for the next tick
    pub fn submit(&self, command: Command) {
        self.lock().commands.push(command);
    }

    /// Request random neutrons for the next tick (accumulates)
    pub fn request_spawn(&self, count: u32) {
        let mut inner = self.lock();
        inner.input.spawn_neutrons = inner.input.spawn_neutrons.saturating_add(count);
    }

    /// Request that all neutrons be cleared on the next tick
    pub fn request_clear(&self) {
        self.lock().input.clear_neutrons = true;
    }

    /// Apply pending commands and input, then run one tick
    pub fn step(&self, dt: f32) -> SimResult<TickEvents> {
        let mut guard = self.lock();
        let inner = &mut *guard;

        for command in inner.commands.drain(..) {
            apply_command(&mut inner.state, command);
        }
        let input = std::mem::take(&mut inner.input);
        let events = tick(&mut inner.state, &input, dt)?;

        inner.neutrons_changed |= events.neutrons_changed;
        inner.fission_pending |= events.fission_occurred();
        Ok(events)
    }

    /// Export the current state into a reusable snapshot
    pub fn export(&self, snapshot: &mut Snapshot) {
        let mut inner = self.lock();
        let changed = std::mem::take(&mut inner.neutrons_changed);
        let fission = std::mem::take(&mut inner.fission_pending);
        snapshot.capture(&inner.state, changed, fission);
    }

    /// Run a closure against the locked state (queries, stats, tuning)
    pub fn with_state<R>(&self, f: impl FnOnce(&mut ReactorState) -> R) -> R {
        f(&mut self.lock().state)
    }
}

fn apply_command(state: &mut ReactorState, command: Command) {
    match command {
        Command::AddNeutron { pos, fast } => {
            state.add_neutron(pos, fast);
        }
        Command::DestroyNeutron(id) => {
            if !state.destroy_neutron(id) {
                log::debug!("Destroy ignored: neutron {} not found", id);
            }
        }
        Command::SetRodHeight { rod, height } => {
            if !state.set_rod_height(rod, height) {
                log::debug!("Rod height ignored: rod {} not found", rod);
            }
        }
        Command::UpdateSettings(settings) => {
            if let Err(e) = state.update_settings(*settings) {
                log::warn!("Settings update rejected: {}", e);
            }
        }
    }
}

/// Fixed-rate tick loop on a background thread
///
/// Ticks that overrun the budget are reported and the loop carries on with
/// the next tick immediately; lost time is never made up.
pub struct Driver {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<DriverReport>>,
}

/// Totals gathered by the tick loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverReport {
    pub ticks: u64,
    pub fissions: u64,
    pub behind: u64,
}

impl Driver {
    /// Start ticking `reactor` at `rate_hz`; `on_fission` fires on the tick
    /// thread for every tick that had at least one fission
    pub fn start(
        reactor: SharedReactor,
        rate_hz: u32,
        mut on_fission: impl FnMut(u32) + Send + 'static,
    ) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let budget = Duration::from_secs_f64(1.0 / rate_hz.max(1) as f64);

        let handle = thread::spawn(move || {
            log::info!("Tick loop started at {} Hz", rate_hz);
            let mut report = DriverReport::default();
            while flag.load(Ordering::Acquire) {
                let frame_start = Instant::now();

                match reactor.step(SIM_DT) {
                    Ok(events) => {
                        report.ticks += 1;
                        if events.fission_occurred() {
                            report.fissions += events.fissions as u64;
                            on_fission(events.fissions);
                        }
                    }
                    Err(e) => log::warn!("Tick failed: {}", e),
                }

                let elapsed = frame_start.elapsed();
                if let Some(remaining) = budget.checked_sub(elapsed) {
                    thread::sleep(remaining);
                } else {
                    report.behind += 1;
                    log::warn!(
                        "Tickrate lagging: {}ms behind!",
                        (elapsed - budget).as_millis()
                    );
                }
            }
            log::info!("Tick loop stopped after {} ticks", report.ticks);
            report
        });

        Self {
            running,
            handle: Some(handle),
        }
    }

    /// Stop the loop after the current tick and collect its report
    pub fn stop(mut self) -> DriverReport {
        self.shutdown()
    }

    fn shutdown(&mut self) -> DriverReport {
        self.running.store(false, Ordering::Release);
        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(report)) => report,
            Some(Err(_)) => {
                log::error!("Tick thread panicked");
                DriverReport::default()
            }
            None => DriverReport::default(),
        }
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Element, Lattice};

    fn reactor() -> SharedReactor {
        let settings = ReactorSettings {
            decay_chance: 0.0,
            xenon_decay_chance: 0.0,
            water_absorption_chance: 0.0,
            rod_heights: [0.0; 5],
            ..Default::default()
        };
        let mut state = ReactorState::new(Lattice::new(8, 8), settings);
        state.add_material(4, 4, Element::Inert).unwrap();
        // Withdrawn and without a moderating tip: never touches a neutron
        state.add_control_rod(1.5, 0.0, false);
        SharedReactor::new(state)
    }

    #[test]
    fn test_commands_applied_at_tick_boundary() {
        let shared = reactor();
        shared.submit(Command::AddNeutron {
            pos: Vec2::new(4.0, 4.0),
            fast: false,
        });
        shared.submit(Command::SetRodHeight {
            rod: 0,
            height: 30.0,
        });
        assert_eq!(shared.with_state(|s| s.neutron_count()), 0);

        shared.step(SIM_DT).unwrap();
        assert_eq!(shared.with_state(|s| s.neutron_count()), 1);
        assert_eq!(shared.with_state(|s| s.rods()[0].height), 30.0);
    }

    #[test]
    fn test_unknown_targets_are_noops() {
        let shared = reactor();
        shared.submit(Command::DestroyNeutron(12345));
        shared.submit(Command::SetRodHeight {
            rod: 9,
            height: 0.0,
        });
        assert!(shared.step(SIM_DT).is_ok());
    }

    #[test]
    fn test_invalid_settings_update_dropped() {
        let shared = reactor();
        shared.with_state(|s| s.add_neutron(Vec2::new(4.0, 4.0), false));
        let settings = ReactorSettings {
            rod_control: crate::settings::RodControl::FeedbackControlled {
                target_neutrons: 10.0,
                gains: crate::sim::PidGains::default(),
                integral_limit: f32::NAN,
                min_height: 0.0,
            },
            ..Default::default()
        };
        shared.submit(Command::UpdateSettings(Box::new(settings)));

        assert!(shared.step(SIM_DT).is_ok());
        assert!(shared.step(SIM_DT).is_ok());
        let mode = shared.with_state(|s| s.settings.rod_control);
        assert_eq!(mode, crate::settings::RodControl::Manual);
    }

    #[test]
    fn test_spawn_and_clear_requests() {
        let shared = reactor();
        shared.request_spawn(3);
        shared.request_spawn(2);
        shared.step(SIM_DT).unwrap();
        assert_eq!(shared.with_state(|s| s.neutron_count()), 5);

        shared.request_clear();
        let events = shared.step(SIM_DT).unwrap();
        assert!(events.neutrons_changed);
        assert_eq!(shared.with_state(|s| s.neutron_count()), 0);
    }

    #[test]
    fn test_export_truncates_after_change() {
        let shared = reactor();
        shared.request_spawn(4);
        shared.step(SIM_DT).unwrap();

        let mut snapshot = Snapshot::default();
        shared.export(&mut snapshot);
        assert_eq!(snapshot.neutrons.len(), 4);
        assert_eq!(snapshot.rods.len(), 3);

        shared.request_clear();
        shared.step(SIM_DT).unwrap();
        shared.step(SIM_DT).unwrap();
        shared.export(&mut snapshot);
        assert!(snapshot.neutrons.is_empty());
        assert_eq!(snapshot.neutron_count, 0);
    }

    #[test]
    fn test_driver_runs_and_stops() {
        let shared = reactor();
        let driver = Driver::start(shared.clone(), 240, |_| {});
        thread::sleep(Duration::from_millis(50));
        let report = driver.stop();
        assert!(report.ticks > 0);
        assert_eq!(shared.with_state(|s| s.time_ticks), report.ticks);
    }
}
