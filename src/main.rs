//! Fission Sim entry point
//!
//! Headless host: builds the default world, ticks it on a background thread
//! and plays the presentation role on the main thread (snapshot export,
//! status line, fission cue). Usage: `fission-sim [settings.json] [seconds]`

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use fission_sim::consts::TARGET_TICK_RATE;
use fission_sim::renderer::Snapshot;
use fission_sim::sim::build_world;
use fission_sim::{Driver, ReactorSettings, SharedReactor, WorldLayout};

/// Default run length when none is given
const DEFAULT_RUN_SECONDS: u64 = 10;
/// Neutrons injected at startup to kick off the chain
const STARTUP_NEUTRONS: u32 = 20;

/// Presentation-side state
struct Host {
    reactor: SharedReactor,
    snapshot: Snapshot,
    cues: Arc<AtomicU64>,
    frames: u64,
    last_status: Instant,
}

impl Host {
    fn new(reactor: SharedReactor) -> Self {
        Self {
            reactor,
            snapshot: Snapshot::default(),
            cues: Arc::new(AtomicU64::new(0)),
            frames: 0,
            last_status: Instant::now(),
        }
    }

    /// One presentation frame: pull a snapshot and report once per second
    fn frame(&mut self) {
        self.reactor.export(&mut self.snapshot);
        self.frames += 1;

        if self.snapshot.take_fission_cue() {
            log::trace!("fission cue");
        }

        if self.last_status.elapsed() >= Duration::from_secs(1) {
            self.last_status = Instant::now();
            let (xenon, temp) = self.reactor.with_state(|s| {
                (s.xenon_count(), s.stats.latest_temperature().unwrap_or(0.0))
            });
            log::info!(
                "neutrons={} xenon={} avg_temp={:.1} cues={} frames={}",
                self.snapshot.neutron_count,
                xenon,
                temp,
                self.cues.load(Ordering::Relaxed),
                self.frames
            );
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Fission Sim starting...");

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => match ReactorSettings::load(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::error!("Could not load settings from {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => ReactorSettings::default(),
    };
    let run_for = args
        .next()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(DEFAULT_RUN_SECONDS));

    let mut state = match build_world(&WorldLayout::default(), settings) {
        Ok(state) => state,
        Err(e) => {
            log::error!("World build failed: {}", e);
            std::process::exit(1);
        }
    };
    state.stats.zero_fill();

    let reactor = SharedReactor::new(state);
    reactor.request_spawn(STARTUP_NEUTRONS);

    let mut host = Host::new(reactor.clone());
    let cues = Arc::clone(&host.cues);
    let driver = Driver::start(reactor.clone(), TARGET_TICK_RATE, move |fissions| {
        cues.fetch_add(fissions as u64, Ordering::Relaxed);
    });

    let frame_budget = Duration::from_secs_f64(1.0 / TARGET_TICK_RATE as f64);
    let started = Instant::now();
    while started.elapsed() < run_for {
        let frame_start = Instant::now();
        host.frame();
        if let Some(remaining) = frame_budget.checked_sub(frame_start.elapsed()) {
            thread::sleep(remaining);
        }
    }

    let report = driver.stop();
    log::info!(
        "Ran {} ticks ({} fissions, {} behind schedule)",
        report.ticks,
        report.fissions,
        report.behind
    );

    let stats = reactor.with_state(|s| s.stats.clone());
    match serde_json::to_string_pretty(&stats) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("Could not serialise statistics: {}", e),
    }
}
