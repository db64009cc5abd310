//! Discrete PID controller with anti-windup, derivative filtering,
//! oscillation detection and hysteresis.
//!
//! [`PidController`] owns all controller state and mutates it only through
//! [`compute`](PidController::compute), [`reset`](PidController::reset) and
//! [`tune`](PidController::tune). The standalone functions at the bottom of
//! the module ([`compute_pid_with_limits`], [`detect_oscillation`],
//! [`apply_deadband`]) expose the same numeric contracts without controller
//! lifecycle, for one-shot evaluation by callers and tests.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::models::PidConfig;

/// First-order low-pass coefficient for the filtered derivative.
const DERIVATIVE_ALPHA: f64 = 0.1;

/// PID gain triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// Read-only snapshot of controller state, for logging and inspection.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerState {
    pub error: f64,
    pub integral: f64,
    pub derivative: f64,
    pub control: f64,
    pub error_history: Vec<f64>,
    pub control_history: Vec<f64>,
}

/// Discrete PID controller.
///
/// Invariants held after every [`compute`](Self::compute) call:
///
/// - `control` is within `[control_min, control_max]`;
/// - `integral` is within `[integral_min, integral_max]`, no matter how
///   extreme or long-sustained the input error is (anti-windup).
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    dt: f64,

    integral_min: f64,
    integral_max: f64,
    control_min: f64,
    control_max: f64,

    oscillation_window: usize,
    oscillation_threshold: f64,

    integral: f64,
    prev_error: f64,
    error: f64,
    filtered_derivative: f64,
    control: f64,

    // Sliding windows used only for oscillation detection, never for the
    // control computation itself.
    error_history: VecDeque<f64>,
    control_history: VecDeque<f64>,
}

impl PidController {
    /// Build a controller from validated configuration.
    pub fn new(config: &PidConfig) -> Self {
        debug!(
            kp = config.kp,
            ki = config.ki,
            kd = config.kd,
            dt = config.dt,
            "PID controller initialized"
        );
        Self {
            gains: PidGains {
                kp: config.kp,
                ki: config.ki,
                kd: config.kd,
            },
            dt: config.dt,
            integral_min: config.integral_min,
            integral_max: config.integral_max,
            control_min: config.control_min,
            control_max: config.control_max,
            oscillation_window: config.oscillation_window,
            oscillation_threshold: config.oscillation_threshold,
            integral: 0.0,
            prev_error: 0.0,
            error: 0.0,
            filtered_derivative: 0.0,
            control: 0.0,
            error_history: VecDeque::with_capacity(config.oscillation_window),
            control_history: VecDeque::with_capacity(config.oscillation_window),
        }
    }

    /// Compute the control value for one (setpoint, process variable) pair.
    ///
    /// With `dt <= 0` the integral and derivative steps contribute nothing;
    /// this is a valid degraded mode, not an error.
    pub fn compute(&mut self, setpoint: f64, process_variable: f64) -> f64 {
        self.error = setpoint - process_variable;

        let p_term = self.gains.kp * self.error;

        // Integral with anti-windup: clamp before the term is computed, so a
        // saturated output stops inflating the accumulator.
        if self.dt > 0.0 {
            self.integral += self.error * self.dt;
        }
        self.integral = self.integral.clamp(self.integral_min, self.integral_max);
        let i_term = self.gains.ki * self.integral;

        // Low-pass filtered derivative: single noisy samples must not spike
        // the output.
        let raw_derivative = if self.dt > 0.0 {
            (self.error - self.prev_error) / self.dt
        } else {
            0.0
        };
        self.filtered_derivative =
            DERIVATIVE_ALPHA * raw_derivative + (1.0 - DERIVATIVE_ALPHA) * self.filtered_derivative;
        let d_term = self.gains.kd * self.filtered_derivative;

        self.control = (p_term + i_term + d_term).clamp(self.control_min, self.control_max);

        if self.error_history.len() == self.oscillation_window {
            self.error_history.pop_front();
            self.control_history.pop_front();
        }
        self.error_history.push_back(self.error);
        self.control_history.push_back(self.control);

        self.prev_error = self.error;

        debug!(
            error = self.error,
            p = p_term,
            i = i_term,
            d = d_term,
            control = self.control,
            "PID step"
        );

        self.control
    }

    /// Detect sustained oscillation in the error signal.
    ///
    /// Requires a full window of history; returns `false` on insufficient
    /// data. Flags oscillation only when the window shows at least
    /// `window / 2` zero crossings *and* an amplitude above the configured
    /// threshold. High-frequency ripple below the amplitude threshold is not
    /// oscillation, nor is a single large swing.
    pub fn is_oscillating(&self) -> bool {
        if self.error_history.len() < self.oscillation_window {
            return false;
        }

        let errors: Vec<f64> = self.error_history.iter().copied().collect();
        let crossings = zero_crossings(&errors);

        if crossings >= self.oscillation_window / 2 {
            let amplitude = amplitude(&errors);
            if amplitude > self.oscillation_threshold {
                warn!(
                    crossings,
                    amplitude, "oscillation detected in error signal"
                );
                return true;
            }
        }

        false
    }

    /// Zero the current control value if its magnitude is below `threshold`.
    ///
    /// Pure deadband over the last computed output; does not mutate state.
    pub fn apply_hysteresis(&self, threshold: f64) -> f64 {
        apply_deadband(self.control, threshold)
    }

    /// Clear all accumulated state. Gains are kept.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_error = 0.0;
        self.error = 0.0;
        self.filtered_derivative = 0.0;
        self.control = 0.0;
        self.error_history.clear();
        self.control_history.clear();
        debug!("PID controller reset");
    }

    /// Partially retune gains in place; `None` leaves a gain unchanged.
    pub fn tune(&mut self, kp: Option<f64>, ki: Option<f64>, kd: Option<f64>) {
        if let Some(kp) = kp {
            self.gains.kp = kp;
        }
        if let Some(ki) = ki {
            self.gains.ki = ki;
        }
        if let Some(kd) = kd {
            self.gains.kd = kd;
        }
        debug!(kp = self.gains.kp, ki = self.gains.ki, kd = self.gains.kd, "PID gains tuned");
    }

    /// Current gains.
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    /// Last computed, clamped control value.
    pub fn control(&self) -> f64 {
        self.control
    }

    /// Last error sample.
    pub fn error(&self) -> f64 {
        self.error
    }

    /// Current clamped integral accumulator.
    pub fn integral(&self) -> f64 {
        self.integral
    }

    /// Current filtered derivative.
    pub fn derivative(&self) -> f64 {
        self.filtered_derivative
    }

    /// Snapshot of all state fields for logging.
    pub fn state(&self) -> ControllerState {
        ControllerState {
            error: self.error,
            integral: self.integral,
            derivative: self.filtered_derivative,
            control: self.control,
            error_history: self.error_history.iter().copied().collect(),
            control_history: self.control_history.iter().copied().collect(),
        }
    }
}

fn zero_crossings(samples: &[f64]) -> usize {
    samples
        .windows(2)
        .filter(|pair| pair[0] * pair[1] < 0.0)
        .count()
}

fn amplitude(samples: &[f64]) -> f64 {
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}

/// One-shot PID step with explicit state, no smoothing carried across calls.
///
/// Returns `(control, new_integral, derivative)`. The derivative here is the
/// raw difference quotient -- filtering needs persistent state and belongs to
/// [`PidController`].
pub fn compute_pid_with_limits(
    error: f64,
    integral: f64,
    prev_error: f64,
    gains: PidGains,
    dt: f64,
    integral_limits: (f64, f64),
    control_limits: (f64, f64),
) -> (f64, f64, f64) {
    let new_integral = if dt > 0.0 {
        (integral + error * dt).clamp(integral_limits.0, integral_limits.1)
    } else {
        integral.clamp(integral_limits.0, integral_limits.1)
    };

    let derivative = if dt > 0.0 {
        (error - prev_error) / dt
    } else {
        0.0
    };

    let control = (gains.kp * error + gains.ki * new_integral + gains.kd * derivative)
        .clamp(control_limits.0, control_limits.1);

    (control, new_integral, derivative)
}

/// Standalone oscillation detector over an explicit error series.
///
/// Fewer than four samples never oscillate. Otherwise flags oscillation when
/// zero crossings reach half the series length and the amplitude exceeds
/// `threshold`.
pub fn detect_oscillation(error_history: &[f64], threshold: f64) -> bool {
    if error_history.len() < 4 {
        return false;
    }

    let crossings = zero_crossings(error_history);
    let amp = amplitude(error_history);

    crossings >= error_history.len() / 2 && amp > threshold
}

/// Zero `value` when its magnitude is below `deadband`, else pass it through.
pub fn apply_deadband(value: f64, deadband: f64) -> f64 {
    if value.abs() < deadband {
        0.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> PidConfig {
        PidConfig {
            kp: 1.0,
            ki: 0.1,
            kd: 0.05,
            dt: 1.0,
            setpoint: 0.85,
            integral_min: -10.0,
            integral_max: 10.0,
            control_min: -5.0,
            control_max: 5.0,
            oscillation_window: 5,
            oscillation_threshold: 0.15,
            deadband: 0.0,
        }
    }

    // -- compute -------------------------------------------------------------

    #[test]
    fn test_proportional_only_reduction() {
        let mut config = test_config();
        config.ki = 0.0;
        config.kd = 0.0;
        let mut pid = PidController::new(&config);

        let control = pid.compute(1.0, 0.0);
        assert!((control - 1.0).abs() < 1e-12);

        let control = pid.compute(1.0, 0.4);
        assert!((control - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_control_always_clamped() {
        let mut config = test_config();
        config.kp = 100.0;
        let mut pid = PidController::new(&config);

        for _ in 0..50 {
            let control = pid.compute(1.0, 0.0);
            assert!(control <= 5.0 && control >= -5.0);
        }
        for _ in 0..50 {
            let control = pid.compute(-1.0, 1.0);
            assert!(control <= 5.0 && control >= -5.0);
        }
    }

    #[test]
    fn test_integral_saturates_at_limit() {
        let mut pid = PidController::new(&test_config());

        // Sustained error of 10 for 200 steps: the accumulator must sit
        // exactly at the clamp, not overflow past it.
        for _ in 0..200 {
            pid.compute(10.0, 0.0);
            assert!(pid.integral() <= 10.0);
            assert!(pid.integral() >= -10.0);
        }
        assert!((pid.integral() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_anti_windup_recovers_on_sign_reversal() {
        let mut pid = PidController::new(&test_config());

        for _ in 0..100 {
            pid.compute(10.0, 0.0);
        }
        let saturated = pid.integral();
        assert!((saturated - 10.0).abs() < f64::EPSILON);

        // One reversed-error step must shrink the accumulator immediately.
        pid.compute(0.0, 10.0);
        assert!(pid.integral() < saturated);
        assert!((pid.integral() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_degenerate_dt_disables_integral_and_derivative() {
        let mut config = test_config();
        config.dt = 0.0;
        let mut pid = PidController::new(&config);

        let control = pid.compute(1.0, 0.0);
        // Only the proportional term survives.
        assert!((control - 1.0).abs() < 1e-12);
        assert!(pid.integral().abs() < f64::EPSILON);
        assert!(pid.derivative().abs() < f64::EPSILON);
    }

    #[test]
    fn test_derivative_is_filtered() {
        let mut config = test_config();
        config.kp = 0.0;
        config.ki = 0.0;
        config.kd = 1.0;
        let mut pid = PidController::new(&config);

        pid.compute(0.0, 0.0);
        // Error jumps from 0 to 10: raw derivative is 10, but the filter
        // passes only alpha of it on the first step.
        let control = pid.compute(10.0, 0.0);
        assert!((control - 1.0).abs() < 1e-9);
    }

    // -- is_oscillating ------------------------------------------------------

    #[test]
    fn test_oscillation_detected_on_alternating_error() {
        let mut pid = PidController::new(&test_config());
        for pv in [-0.2, 0.2, -0.2, 0.2, -0.2] {
            // setpoint 0 makes error = -pv, alternating +-0.2
            pid.compute(0.0, pv);
        }
        assert!(pid.is_oscillating());
    }

    #[test]
    fn test_no_oscillation_on_monotonic_error() {
        let mut pid = PidController::new(&test_config());
        for pv in [0.0, -0.2, -0.4, -0.6, -0.8] {
            pid.compute(0.0, pv);
        }
        assert!(!pid.is_oscillating());
    }

    #[test]
    fn test_no_oscillation_with_insufficient_history() {
        let mut pid = PidController::new(&test_config());
        pid.compute(0.0, 0.2);
        pid.compute(0.0, -0.2);
        assert!(!pid.is_oscillating());
    }

    #[test]
    fn test_no_oscillation_below_amplitude_threshold() {
        let mut pid = PidController::new(&test_config());
        // Alternating signs, amplitude 0.1 < threshold 0.15.
        for pv in [-0.05, 0.05, -0.05, 0.05, -0.05] {
            pid.compute(0.0, pv);
        }
        assert!(!pid.is_oscillating());
    }

    // -- hysteresis / reset / tune -------------------------------------------

    #[test]
    fn test_hysteresis_zeroes_small_control() {
        let mut config = test_config();
        config.ki = 0.0;
        config.kd = 0.0;
        let mut pid = PidController::new(&config);

        pid.compute(0.03, 0.0);
        assert!((pid.apply_hysteresis(0.05)).abs() < f64::EPSILON);

        pid.compute(1.0, 0.0);
        assert!((pid.apply_hysteresis(0.05) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_restores_fresh_behavior() {
        let config = test_config();
        let mut pid = PidController::new(&config);
        for _ in 0..20 {
            pid.compute(1.0, 0.2);
        }
        pid.reset();

        assert!(pid.integral().abs() < f64::EPSILON);
        assert!(pid.error().abs() < f64::EPSILON);
        assert!(pid.control().abs() < f64::EPSILON);
        assert!(pid.state().error_history.is_empty());

        // A fresh controller and the reset one agree on the next step.
        let mut fresh = PidController::new(&config);
        let a = pid.compute(1.0, 0.3);
        let b = fresh.compute(1.0, 0.3);
        assert!((a - b).abs() < f64::EPSILON);
    }

    #[test]
    fn test_tune_is_partial_and_idempotent() {
        let mut pid = PidController::new(&test_config());
        pid.tune(Some(2.0), None, None);
        assert!((pid.gains().kp - 2.0).abs() < f64::EPSILON);
        assert!((pid.gains().ki - 0.1).abs() < f64::EPSILON);

        pid.tune(Some(2.0), None, None);
        assert!((pid.gains().kp - 2.0).abs() < f64::EPSILON);

        pid.tune(None, Some(0.5), Some(0.2));
        assert!((pid.gains().ki - 0.5).abs() < f64::EPSILON);
        assert!((pid.gains().kd - 0.2).abs() < f64::EPSILON);
    }

    // -- standalone functions ------------------------------------------------

    #[test]
    fn test_compute_pid_with_limits_matches_terms() {
        let gains = PidGains {
            kp: 1.0,
            ki: 0.5,
            kd: 0.1,
        };
        let (control, integral, derivative) =
            compute_pid_with_limits(2.0, 0.0, 1.0, gains, 1.0, (-10.0, 10.0), (-5.0, 5.0));

        assert!((integral - 2.0).abs() < f64::EPSILON);
        assert!((derivative - 1.0).abs() < f64::EPSILON);
        // 1.0*2.0 + 0.5*2.0 + 0.1*1.0 = 3.1
        assert!((control - 3.1).abs() < 1e-12);
    }

    #[test]
    fn test_compute_pid_with_limits_clamps() {
        let gains = PidGains {
            kp: 10.0,
            ki: 10.0,
            kd: 0.0,
        };
        let (control, integral, _) =
            compute_pid_with_limits(100.0, 9.5, 0.0, gains, 1.0, (-10.0, 10.0), (-5.0, 5.0));
        assert!((integral - 10.0).abs() < f64::EPSILON);
        assert!((control - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_compute_pid_with_limits_degenerate_dt() {
        let gains = PidGains {
            kp: 1.0,
            ki: 1.0,
            kd: 1.0,
        };
        let (control, integral, derivative) =
            compute_pid_with_limits(2.0, 1.0, 0.0, gains, 0.0, (-10.0, 10.0), (-5.0, 5.0));
        assert!((integral - 1.0).abs() < f64::EPSILON);
        assert!(derivative.abs() < f64::EPSILON);
        assert!((control - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_detect_oscillation_alternating() {
        assert!(detect_oscillation(&[0.2, -0.2, 0.2, -0.2, 0.2], 0.15));
    }

    #[test]
    fn test_detect_oscillation_monotonic() {
        assert!(!detect_oscillation(&[0.0, 0.2, 0.4, 0.6, 0.8], 0.15));
    }

    #[test]
    fn test_detect_oscillation_short_series() {
        assert!(!detect_oscillation(&[0.2, -0.2, 0.2], 0.15));
    }

    #[test]
    fn test_detect_oscillation_low_amplitude() {
        assert!(!detect_oscillation(&[0.01, -0.01, 0.01, -0.01, 0.01], 0.15));
    }

    #[test]
    fn test_deadband_idempotent() {
        for value in [-3.0, -0.04, 0.0, 0.02, 0.05, 1.7] {
            let once = apply_deadband(value, 0.05);
            let twice = apply_deadband(once, 0.05);
            assert!((once - twice).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_deadband_boundary() {
        // Strictly-below semantics: a value exactly at the deadband passes.
        assert!((apply_deadband(0.05, 0.05) - 0.05).abs() < f64::EPSILON);
        assert!(apply_deadband(0.0499, 0.05).abs() < f64::EPSILON);
    }
}
