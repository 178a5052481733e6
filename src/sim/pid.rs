//! Proportional-integral-derivative controller
//!
//! output = Kp * e + Ki * ∫e dt + Kd * de/dt, where e = setpoint - measured.
//! The integral accumulator is clamped to a configured band to stop windup.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Controller gains
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain
    pub kp: f32,
    /// Integral gain
    pub ki: f32,
    /// Derivative gain
    pub kd: f32,
}

impl PidGains {
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(0.5, 0.05, 0.01)
    }
}

/// PID controller with clamped integral
#[derive(Debug, Clone)]
pub struct PidController {
    pub gains: PidGains,
    pub setpoint: f32,
    /// Integral accumulator bounds
    pub integral_min: f32,
    pub integral_max: f32,
    integral: f32,
    prev_error: f32,
}

impl PidController {
    /// Create a controller with an unbounded integral
    pub fn new(gains: PidGains, setpoint: f32) -> Self {
        Self {
            gains,
            setpoint,
            integral_min: f32::NEG_INFINITY,
            integral_max: f32::INFINITY,
            integral: 0.0,
            prev_error: 0.0,
        }
    }

    /// Set integral accumulator limits
    ///
    /// A NaN bound leaves that side unbounded.
    pub fn with_integral_limits(mut self, min: f32, max: f32) -> Self {
        let min = if min.is_nan() { f32::NEG_INFINITY } else { min };
        let max = if max.is_nan() { f32::INFINITY } else { max };
        self.integral_min = min.min(max);
        self.integral_max = max.max(min);
        self
    }

    /// Compute the control output for one control tick
    ///
    /// `dt` is the time elapsed since the previous call and must be positive.
    pub fn calculate(&mut self, measured: f32, dt: f32) -> SimResult<f32> {
        if !(dt > 0.0) || !dt.is_finite() {
            return Err(SimError::NonPositiveTimestep(dt));
        }

        let error = self.setpoint - measured;

        let p = self.gains.kp * error;

        self.integral = (self.integral + error * dt).clamp(self.integral_min, self.integral_max);
        let i = self.gains.ki * self.integral;

        let d = self.gains.kd * (error - self.prev_error) / dt;
        self.prev_error = error;

        Ok(p + i + d)
    }

    /// Compute with gains overridden for this and subsequent calls
    pub fn calculate_with_gains(
        &mut self,
        measured: f32,
        dt: f32,
        gains: PidGains,
    ) -> SimResult<f32> {
        self.gains = gains;
        self.calculate(measured, dt)
    }

    /// Current integral accumulator
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Clear accumulated state
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_zero_gains_output_zero() {
        let mut pid = PidController::new(PidGains::new(0.0, 0.0, 0.0), 50.0);
        for measured in [0.0, 10.0, 75.0, -3.0] {
            assert_eq!(pid.calculate(measured, DT).unwrap(), 0.0);
        }
    }

    #[test]
    fn test_proportional_only() {
        let mut pid = PidController::new(PidGains::new(2.0, 0.0, 0.0), 10.0);
        let out = pid.calculate(4.0, DT).unwrap();
        assert!((out - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_integral_is_pd() {
        let gains = PidGains::new(1.5, 0.0, 0.2);
        let mut pid = PidController::new(gains, 10.0);

        // First call: derivative sees error jump from 0 to 6
        let first = pid.calculate(4.0, DT).unwrap();
        assert!((first - (1.5 * 6.0 + 0.2 * 6.0 / DT)).abs() < 1e-3);

        // Constant error afterwards: derivative vanishes, pure P
        let second = pid.calculate(4.0, DT).unwrap();
        assert!((second - 9.0).abs() < 1e-4);
    }

    #[test]
    fn test_integral_clamped() {
        let mut pid =
            PidController::new(PidGains::new(0.0, 1.0, 0.0), 100.0).with_integral_limits(-5.0, 5.0);
        for _ in 0..1000 {
            pid.calculate(0.0, DT).unwrap();
        }
        assert_eq!(pid.integral(), 5.0);
        let out = pid.calculate(0.0, DT).unwrap();
        assert!((out - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_nan_limits_unbounded() {
        let mut pid = PidController::new(PidGains::new(0.0, 1.0, 0.0), 10.0)
            .with_integral_limits(-f32::NAN, f32::NAN);
        assert_eq!(pid.integral_min, f32::NEG_INFINITY);
        assert_eq!(pid.integral_max, f32::INFINITY);
        let out = pid.calculate(0.0, 1.0).unwrap();
        assert!((out - 10.0).abs() < 1e-5);
    }

    #[test]
    fn test_zero_dt_rejected() {
        let mut pid = PidController::new(PidGains::default(), 1.0);
        assert_eq!(pid.calculate(0.0, 0.0), Err(SimError::NonPositiveTimestep(0.0)));
        assert!(pid.calculate(0.0, -1.0).is_err());
        // Rejected call leaves state untouched
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_gain_override_persists() {
        let mut pid = PidController::new(PidGains::new(1.0, 0.0, 0.0), 0.0);
        let out = pid
            .calculate_with_gains(-2.0, DT, PidGains::new(3.0, 0.0, 0.0))
            .unwrap();
        assert!((out - 6.0).abs() < 1e-5);
        assert_eq!(pid.gains.kp, 3.0);
    }
}
