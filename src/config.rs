use crate::error::{CashFlowError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.0;
pub const DEFAULT_RUNWAY_WINDOW_MONTHS: usize = 3;
pub const DEFAULT_RECENCY_WINDOW_MONTHS: usize = 3;

/// Business rules for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    #[schemars(
        description = "Weekly net-change cutoff. A week whose inflows minus outflows is below this value is a breach. May be negative (e.g. -5000)."
    )]
    pub threshold: f64,

    #[schemars(
        description = "How many of the most recent months the burn rate is averaged over. All months are used when fewer exist."
    )]
    pub runway_window_months: usize,

    #[schemars(
        description = "Negative months within this many calendar months of the latest month are flagged as risk; older negative months are concerning."
    )]
    pub recency_window_months: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            runway_window_months: DEFAULT_RUNWAY_WINDOW_MONTHS,
            recency_window_months: DEFAULT_RECENCY_WINDOW_MONTHS,
        }
    }
}

impl AnalysisConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_runway_window(mut self, months: usize) -> Self {
        self.runway_window_months = months;
        self
    }

    pub fn with_recency_window(mut self, months: usize) -> Self {
        self.recency_window_months = months;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.threshold.is_finite() {
            return Err(CashFlowError::InvalidConfig(format!(
                "threshold must be a finite number, got {}",
                self.threshold
            )));
        }

        if self.runway_window_months == 0 {
            return Err(CashFlowError::InvalidConfig(
                "runway_window_months must be at least 1".to_string(),
            ));
        }

        if self.recency_window_months == 0 {
            return Err(CashFlowError::InvalidConfig(
                "recency_window_months must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
