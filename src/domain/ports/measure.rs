//! Port for process variable measurement.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::error::MeasureError;
use crate::domain::models::TestResults;

/// Black-box producer of the process variable.
///
/// The contract is purely numeric: the result is a scalar in `[0, 1]`
/// summarizing how close the workspace is to the setpoint. How it is
/// computed is the implementation's business.
#[async_trait]
pub trait ProcessMeasure: Send + Sync {
    /// Measure the current process variable.
    async fn measure(
        &self,
        setpoint: &str,
        workspace: &Path,
        test_results: &TestResults,
    ) -> Result<f64, MeasureError>;
}
