//! Rolling reactor statistics for trend charts
//!
//! Three independent FIFO windows sampled on a fixed interval: live neutron
//! count (reactivity), xenon count and average coolant temperature.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::consts::STATS_WINDOW;

/// Fixed-capacity rolling history of sampled series
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "StoredStatistics")]
pub struct ReactorStatistics {
    reactivity: VecDeque<u32>,
    xenon: VecDeque<u32>,
    temperature: VecDeque<f32>,
    max: usize,
}

impl Default for ReactorStatistics {
    fn default() -> Self {
        Self::new(STATS_WINDOW)
    }
}

impl ReactorStatistics {
    /// Create empty windows holding at most `max` samples each
    pub fn new(max: usize) -> Self {
        Self {
            reactivity: VecDeque::with_capacity(max + 1),
            xenon: VecDeque::with_capacity(max + 1),
            temperature: VecDeque::with_capacity(max + 1),
            max,
        }
    }

    /// Maximum samples per window
    pub fn max(&self) -> usize {
        self.max
    }

    pub fn push_reactivity(&mut self, neutrons: u32) {
        push_capped(&mut self.reactivity, neutrons, self.max);
    }

    pub fn push_xenon(&mut self, xenon: u32) {
        push_capped(&mut self.xenon, xenon, self.max);
    }

    pub fn push_temperature(&mut self, temperature: f32) {
        push_capped(&mut self.temperature, temperature, self.max);
    }

    /// Fill every window with `max` zero samples so charts start full width
    pub fn zero_fill(&mut self) {
        for _ in 0..self.max {
            self.push_reactivity(0);
            self.push_xenon(0);
            self.push_temperature(0.0);
        }
    }

    pub fn reactivity(&self) -> &VecDeque<u32> {
        &self.reactivity
    }

    pub fn xenon(&self) -> &VecDeque<u32> {
        &self.xenon
    }

    pub fn temperature(&self) -> &VecDeque<f32> {
        &self.temperature
    }

    /// Most recent reactivity sample (if any)
    pub fn latest_reactivity(&self) -> Option<u32> {
        self.reactivity.back().copied()
    }

    /// Most recent temperature sample (if any)
    pub fn latest_temperature(&self) -> Option<f32> {
        self.temperature.back().copied()
    }
}

/// On-disk form; windows are re-capped on load
#[derive(Deserialize)]
struct StoredStatistics {
    reactivity: VecDeque<u32>,
    xenon: VecDeque<u32>,
    temperature: VecDeque<f32>,
    max: usize,
}

impl From<StoredStatistics> for ReactorStatistics {
    fn from(stored: StoredStatistics) -> Self {
        let mut stats = Self {
            reactivity: stored.reactivity,
            xenon: stored.xenon,
            temperature: stored.temperature,
            max: stored.max,
        };
        trim(&mut stats.reactivity, stats.max);
        trim(&mut stats.xenon, stats.max);
        trim(&mut stats.temperature, stats.max);
        stats
    }
}

fn trim<T>(window: &mut VecDeque<T>, max: usize) {
    while window.len() > max {
        window.pop_front();
    }
}

/// Append, evicting the oldest sample once over capacity
fn push_capped<T>(window: &mut VecDeque<T>, sample: T, max: usize) {
    window.push_back(sample);
    trim(window, max);
}
