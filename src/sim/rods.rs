//! Automatic control rod policy
//!
//! Drives the master rod setpoint from the live neutron count, then copies
//! setpoints onto the rods. Runs once at the start of every tick.

use super::pid::{PidController, PidGains};
use super::state::ControlRod;
use crate::consts::{MASTER_ROD, ROD_FULL_INSERTION};
use crate::error::SimResult;
use crate::settings::{ReactorSettings, RodControl, clamp_rod_height};

/// Controller state carried between ticks
#[derive(Debug, Clone, Default)]
pub struct RodController {
    /// Present only while in feedback mode
    pid: Option<PidController>,
}

impl RodController {
    /// Update the master setpoint for this tick according to the active mode
    pub fn update(
        &mut self,
        settings: &mut ReactorSettings,
        live_neutrons: usize,
        dt: f32,
    ) -> SimResult<()> {
        let measured = live_neutrons as f32;
        let master = settings.rod_heights[MASTER_ROD];

        match settings.rod_control {
            RodControl::Manual => {
                self.pid = None;
            }
            RodControl::RampToTarget {
                target_neutrons,
                rate,
                min_height,
            } => {
                self.pid = None;
                let step = rate * dt;
                let next = if measured > target_neutrons {
                    master + step
                } else if measured < target_neutrons {
                    master - step
                } else {
                    master
                };
                settings.rod_heights[MASTER_ROD] = clamp_with_floor(next, min_height);
            }
            RodControl::FeedbackControlled {
                target_neutrons,
                gains,
                integral_limit,
                min_height,
            } => {
                let pid = self.feedback(target_neutrons, gains, integral_limit);
                let output = pid.calculate_with_gains(measured, dt, gains)?;
                // Positive output means too few neutrons: withdraw
                settings.rod_heights[MASTER_ROD] =
                    clamp_with_floor(ROD_FULL_INSERTION - output, min_height);
            }
        }

        if settings.global_rods {
            let master = settings.rod_heights[MASTER_ROD];
            settings.rod_heights.fill(master);
        }
        Ok(())
    }

    /// Feedback controller for the current target, rebuilt when it changes
    fn feedback(&mut self, target: f32, gains: PidGains, integral_limit: f32) -> &mut PidController {
        let limit = integral_limit.abs();
        let stale = self
            .pid
            .as_ref()
            .is_none_or(|pid| pid.setpoint != target || pid.integral_max != limit);
        if stale {
            log::debug!("Rod feedback controller targeting {} neutrons", target);
            self.pid = Some(PidController::new(gains, target).with_integral_limits(-limit, limit));
        }
        self.pid.get_or_insert_with(|| PidController::new(gains, target))
    }
}

/// Copy setpoints onto the rods; rods past the setpoint list follow the
/// master when the bank is global
pub fn apply_setpoints(settings: &ReactorSettings, rods: &mut [ControlRod]) {
    for (i, rod) in rods.iter_mut().enumerate() {
        if let Some(&height) = settings.rod_heights.get(i) {
            rod.height = clamp_rod_height(height);
        } else if settings.global_rods {
            rod.height = clamp_rod_height(settings.rod_heights[MASTER_ROD]);
        }
    }
}

fn clamp_with_floor(height: f32, min_height: f32) -> f32 {
    clamp_rod_height(height).max(clamp_rod_height(min_height))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ramp(target: f32) -> ReactorSettings {
        ReactorSettings {
            rod_control: RodControl::RampToTarget {
                target_neutrons: target,
                rate: 60.0,
                min_height: 20.0,
            },
            rod_heights: [50.0; 5],
            ..Default::default()
        }
    }

    #[test]
    fn test_manual_leaves_setpoints() {
        let mut settings = ReactorSettings::default();
        settings.rod_heights = [10.0, 20.0, 30.0, 40.0, 50.0];
        let mut controller = RodController::default();
        controller.update(&mut settings, 1000, DT).unwrap();
        assert_eq!(settings.rod_heights, [10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn test_ramp_inserts_when_over_target() {
        let mut settings = ramp(10.0);
        let mut controller = RodController::default();
        controller.update(&mut settings, 50, DT).unwrap();
        assert!((settings.rod_heights[MASTER_ROD] - 51.0).abs() < 1e-4);
        // Other rods untouched without the global flag
        assert_eq!(settings.rod_heights[1], 50.0);
    }

    #[test]
    fn test_ramp_respects_min_height() {
        let mut settings = ramp(1000.0);
        let mut controller = RodController::default();
        for _ in 0..200 {
            controller.update(&mut settings, 0, DT).unwrap();
        }
        assert_eq!(settings.rod_heights[MASTER_ROD], 20.0);
    }

    #[test]
    fn test_global_mirrors_master() {
        let mut settings = ramp(10.0);
        settings.global_rods = true;
        let mut controller = RodController::default();
        controller.update(&mut settings, 50, DT).unwrap();
        let master = settings.rod_heights[MASTER_ROD];
        assert!(settings.rod_heights.iter().all(|&h| h == master));
    }

    #[test]
    fn test_feedback_withdraws_when_starved() {
        let mut settings = ReactorSettings {
            rod_control: RodControl::FeedbackControlled {
                target_neutrons: 100.0,
                gains: PidGains::new(0.5, 0.0, 0.0),
                integral_limit: 50.0,
                min_height: 0.0,
            },
            ..Default::default()
        };
        let mut controller = RodController::default();
        controller.update(&mut settings, 0, DT).unwrap();
        // P-only: output 50 -> height 50
        assert!((settings.rod_heights[MASTER_ROD] - 50.0).abs() < 1e-3);

        controller.update(&mut settings, 200, DT).unwrap();
        assert_eq!(settings.rod_heights[MASTER_ROD], 100.0);
    }

    #[test]
    fn test_feedback_rejects_zero_dt() {
        let mut settings = ReactorSettings {
            rod_control: RodControl::FeedbackControlled {
                target_neutrons: 10.0,
                gains: PidGains::default(),
                integral_limit: 10.0,
                min_height: 0.0,
            },
            ..Default::default()
        };
        let mut controller = RodController::default();
        assert!(controller.update(&mut settings, 0, 0.0).is_err());
        assert_eq!(settings.rod_heights[MASTER_ROD], 100.0);
    }

    #[test]
    fn test_apply_setpoints_global_extends_to_extra_rods() {
        let mut settings = ReactorSettings::default();
        settings.rod_heights[MASTER_ROD] = 30.0;
        settings.global_rods = true;
        let mut rods: Vec<ControlRod> = (0..7)
            .map(|i| ControlRod {
                x: i as f32,
                height: 100.0,
                moderator: false,
            })
            .collect();
        apply_setpoints(&settings, &mut rods);
        assert_eq!(rods[0].height, 30.0);
        assert_eq!(rods[1].height, 100.0);
        assert_eq!(rods[6].height, 30.0);
    }
}
