use crate::config::{DEFAULT_RECENCY_WINDOW_MONTHS, DEFAULT_THRESHOLD};
use crate::schema::{Callouts, MonthCallout, MonthlyBucket, WeeklyRecord, YearMonth};
use crate::utils::{months_between, round_cents};
use crate::weekly::find_breaches;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonthLabel {
    #[schemars(description = "Negative net change in one of the most recent months")]
    Risk,
    #[schemars(description = "Zero or positive net change")]
    Healthy,
    #[schemars(description = "Negative net change outside the recent window")]
    Concerning,
}

pub struct CalloutClassifier {
    recency_window_months: usize,
    threshold: f64,
}

impl Default for CalloutClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_RECENCY_WINDOW_MONTHS, DEFAULT_THRESHOLD)
    }
}

impl CalloutClassifier {
    pub fn new(recency_window_months: usize, threshold: f64) -> Self {
        Self {
            recency_window_months: recency_window_months.max(1),
            threshold,
        }
    }

    /// Whether `month` falls within the recency window ending at `latest`
    /// (inclusive). Distance is counted in calendar months, so gaps in the
    /// ledger do not pull old months into the window.
    pub fn is_recent(&self, month: YearMonth, latest: YearMonth) -> bool {
        let age = months_between(month, latest);
        age >= 0 && (age as usize) < self.recency_window_months
    }

    /// Sign is judged in whole cents, so float residue never makes a flat month negative.
    pub fn label(&self, bucket: &MonthlyBucket, latest: YearMonth) -> MonthLabel {
        if round_cents(bucket.net) >= 0.0 {
            MonthLabel::Healthy
        } else if self.is_recent(bucket.year_month, latest) {
            MonthLabel::Risk
        } else {
            MonthLabel::Concerning
        }
    }

    pub fn classify(&self, monthly: &[MonthlyBucket], records: &[WeeklyRecord]) -> Callouts {
        let mut callouts = Callouts {
            weekly_breaches: find_breaches(records, self.threshold),
            ..Callouts::default()
        };

        let latest = match monthly.iter().map(|b| b.year_month).max() {
            Some(latest) => latest,
            None => return callouts,
        };

        for bucket in monthly {
            let item = MonthCallout {
                month: bucket.year_month,
                net: bucket.net,
                end_balance: bucket.end_balance,
            };

            match self.label(bucket, latest) {
                MonthLabel::Risk => callouts.risk_months.push(item),
                MonthLabel::Healthy => callouts.healthy_months.push(item),
                MonthLabel::Concerning => callouts.concerning_months.push(item),
            }
        }

        callouts
    }
}
