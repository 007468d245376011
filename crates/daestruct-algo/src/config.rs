//! Analysis configuration

use serde::{Deserialize, Serialize};

/// Tuning knobs shared by the assignment solver and the analysis drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sweeps of augmenting row reduction before the shortest-path phase
    pub row_reduction_sweeps: usize,
    /// Check feasibility of the final offsets (extra pass over all entries)
    pub verify_duals: bool,
    /// Emit phase timings at debug level
    pub log_timing: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            row_reduction_sweeps: 2,
            verify_duals: false,
            log_timing: true,
        }
    }
}

impl AnalysisConfig {
    pub fn with_row_reduction_sweeps(mut self, sweeps: usize) -> Self {
        self.row_reduction_sweeps = sweeps;
        self
    }

    pub fn with_verify_duals(mut self, verify: bool) -> Self {
        self.verify_duals = verify;
        self
    }

    pub fn with_log_timing(mut self, log: bool) -> Self {
        self.log_timing = log;
        self
    }
}
