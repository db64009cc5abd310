//! Property tests for the controller's clamping invariants.

use proptest::prelude::*;

use cogpid::domain::models::PidConfig;
use cogpid::PidController;

fn config(kp: f64, ki: f64, kd: f64, dt: f64) -> PidConfig {
    PidConfig {
        kp,
        ki,
        kd,
        dt,
        setpoint: 0.85,
        integral_min: -10.0,
        integral_max: 10.0,
        control_min: -5.0,
        control_max: 5.0,
        oscillation_window: 10,
        oscillation_threshold: 0.15,
        deadband: 0.0,
    }
}

proptest! {
    /// No input sequence can push the control output or the integral
    /// accumulator outside their configured limits.
    #[test]
    fn control_and_integral_always_within_limits(
        kp in -20.0..20.0f64,
        ki in -20.0..20.0f64,
        kd in -20.0..20.0f64,
        dt in 0.0..10.0f64,
        inputs in prop::collection::vec((-100.0..100.0f64, -100.0..100.0f64), 1..200),
    ) {
        let mut pid = PidController::new(&config(kp, ki, kd, dt));
        for (setpoint, pv) in inputs {
            let control = pid.compute(setpoint, pv);
            prop_assert!((-5.0..=5.0).contains(&control));
            prop_assert!((-10.0..=10.0).contains(&pid.integral()));
        }
    }

    /// Reset always returns the controller to a state indistinguishable
    /// from a freshly constructed one.
    #[test]
    fn reset_equals_fresh_controller(
        inputs in prop::collection::vec((-10.0..10.0f64, -10.0..10.0f64), 1..50),
    ) {
        let cfg = config(1.0, 0.1, 0.05, 1.0);
        let mut used = PidController::new(&cfg);
        for (setpoint, pv) in &inputs {
            used.compute(*setpoint, *pv);
        }
        used.reset();

        let mut fresh = PidController::new(&cfg);
        let a = used.compute(0.85, 0.4);
        let b = fresh.compute(0.85, 0.4);
        prop_assert!((a - b).abs() < f64::EPSILON);
    }
}
