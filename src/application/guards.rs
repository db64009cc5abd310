//! Safety guards evaluated after every loop iteration.
//!
//! Three independent guards: a budget ceiling, a stagnation detector with a
//! consecutive-trigger requirement, and an oscillation check. Budget and
//! stagnation halt the loop; oscillation only warns, since the PID controller
//! is expected to damp it on its own.

use tracing::warn;

use crate::domain::control::detect_stagnation;
use crate::domain::models::SafetyConfig;

/// Number of consecutive stagnant windows before the stagnation guard halts.
const STAGNATION_STRIKES: u32 = 3;

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    /// All guards clear, keep iterating.
    Continue,
    /// A guard tripped; the reason is surfaced in the run summary.
    Halt(String),
}

impl GuardVerdict {
    pub fn is_halt(&self) -> bool {
        matches!(self, Self::Halt(_))
    }
}

/// Stateful guard evaluator.
///
/// Owns the stagnation strike counter; everything else is a pure function of
/// the inputs. Evaluated once per completed iteration, after the PV history
/// has been appended to.
#[derive(Debug)]
pub struct SafetyGuards {
    max_budget_usd: f64,
    stagnation_threshold: f64,
    stagnation_window: usize,
    stagnation_strikes: u32,
}

impl SafetyGuards {
    /// Build guards from the safety section of the configuration.
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            max_budget_usd: config.max_budget_usd,
            stagnation_threshold: config.stagnation_threshold,
            stagnation_window: config.stagnation_window,
            stagnation_strikes: 0,
        }
    }

    /// Evaluate all guards for the iteration that just completed.
    ///
    /// `total_cost_usd` is the cumulative agent spend, `pv_history` the full
    /// PV series including this iteration's sample, and `oscillating` the
    /// controller's own oscillation flag.
    pub fn evaluate(
        &mut self,
        total_cost_usd: f64,
        pv_history: &[f64],
        oscillating: bool,
    ) -> GuardVerdict {
        if total_cost_usd >= self.max_budget_usd {
            return GuardVerdict::Halt(format!(
                "budget exhausted: ${total_cost_usd:.2} >= ${:.2}",
                self.max_budget_usd
            ));
        }

        if detect_stagnation(pv_history, self.stagnation_threshold, self.stagnation_window) {
            self.stagnation_strikes += 1;
            warn!(
                strikes = self.stagnation_strikes,
                "progress stagnant over trailing window"
            );
            if self.stagnation_strikes >= STAGNATION_STRIKES {
                return GuardVerdict::Halt(format!(
                    "no progress for {} consecutive windows",
                    self.stagnation_strikes
                ));
            }
        } else {
            self.stagnation_strikes = 0;
        }

        if oscillating {
            warn!("controller oscillating, continuing under observation");
        }

        GuardVerdict::Continue
    }

    /// Current consecutive stagnation strike count.
    pub fn stagnation_strikes(&self) -> u32 {
        self.stagnation_strikes
    }
}
