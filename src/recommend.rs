//! Boundary to the external advice generator.
//!
//! The analytics never depend on this collaborator: its output is optional text,
//! and every failure mode (error, blank answer, timeout) degrades to `None`.

use crate::error::RecommendationError;
use crate::schema::{AnalysisResult, MonthCallout, Runway, YearMonth};
use crate::seasonality::inflow_weights;
use crate::utils::{format_currency, month_name};
use futures::future::BoxFuture;
use log::{info, warn};
use std::time::Duration;

pub const DEFAULT_RECOMMENDATION_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_RECOMMENDATION_ATTEMPTS: u32 = 2;

/// Anything that can turn an analysis summary into advisory text.
pub trait RecommendationProvider: Send + Sync {
    fn name(&self) -> &str;

    fn recommend<'a>(
        &'a self,
        summary: &'a AnalysisSummary,
    ) -> BoxFuture<'a, Result<String, RecommendationError>>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationPolicy {
    /// Applied to each attempt separately.
    pub timeout: Duration,
    /// Total attempts including the first; transient failures only are retried.
    pub max_attempts: u32,
}

impl Default for RecommendationPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RECOMMENDATION_TIMEOUT,
            max_attempts: DEFAULT_RECOMMENDATION_ATTEMPTS,
        }
    }
}

impl RecommendationPolicy {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthSummary {
    pub year_month: YearMonth,
    pub inflows: f64,
    pub outflows: f64,
    pub net: f64,
    pub end_balance: f64,
}

/// Compact view of an analysis handed to the recommendation provider.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSummary {
    pub months: Vec<MonthSummary>,
    pub risk_months: Vec<MonthCallout>,
    pub runway: Runway,
    pub weekly_breaches: usize,
    pub threshold: f64,
    /// Calendar month (1-12) that historically brings the most cash in.
    pub peak_inflow_month: Option<u32>,
}

impl AnalysisSummary {
    pub fn from_result(result: &AnalysisResult) -> Self {
        let months = result
            .monthly
            .iter()
            .map(|b| MonthSummary {
                year_month: b.year_month,
                inflows: b.inflows,
                outflows: b.outflows,
                net: b.net,
                end_balance: b.end_balance,
            })
            .collect();

        let weights = inflow_weights(&result.seasonality);
        let peak_inflow_month = weights
            .iter()
            .enumerate()
            .filter(|(_, w)| **w > 0.0)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(idx, _)| idx as u32 + 1);

        Self {
            months,
            risk_months: result.callouts.risk_months.clone(),
            runway: result.kpis.runway,
            weekly_breaches: result.callouts.weekly_breaches.len(),
            threshold: result.threshold,
            peak_inflow_month,
        }
    }

    /// Plain-language coaching prompt describing this summary.
    pub fn to_prompt(&self) -> String {
        let monthly_lines: Vec<String> = self
            .months
            .iter()
            .map(|m| {
                format!(
                    "{}: inflows={}, outflows={}, net={}, end_balance={}",
                    display_month(m.year_month),
                    format_currency(m.inflows),
                    format_currency(m.outflows),
                    format_currency(m.net),
                    format_currency(m.end_balance)
                )
            })
            .collect();

        let risk_line = if self.risk_months.is_empty() {
            "none".to_string()
        } else {
            self.risk_months
                .iter()
                .map(|r| {
                    format!(
                        "{} (net {}, end {})",
                        display_month(r.month),
                        format_currency(r.net),
                        format_currency(r.end_balance)
                    )
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let runway_line = match self.runway {
            Runway::Months(m) => format!("about {:.1} months of cash left at the recent pace", m),
            Runway::Indefinite => "cash is holding steady or growing".to_string(),
        };

        let mut prompt = String::from(
            "You are a friendly financial coach for small business owners. \
             Use plain, everyday words and avoid business jargon; assume the reader is new to managing cash. \
             Refer to months as 'next January', 'next June' and so on, without mentioning years.\n\n",
        );
        prompt.push_str(&format!(
            "Monthly summary:\n{}\n\n",
            monthly_lines.join("\n")
        ));
        prompt.push_str(&format!("Risk months: {}.\n", risk_line));
        prompt.push_str(&format!("Runway: {}.\n", runway_line));
        prompt.push_str(&format!(
            "Weeks with net change below {}: {}.\n",
            format_currency(self.threshold),
            self.weekly_breaches
        ));
        if let Some(name) = self.peak_inflow_month.and_then(month_name) {
            prompt.push_str(&format!("Strongest month for incoming cash: {}.\n", name));
        }
        prompt.push_str(
            "\nWrite 3 to 6 short, clear and encouraging tips. Each tip names the month it \
             applies to (for example 'In next June...'). Focus on simple ideas such as saving \
             during good months, watching spending, and setting cash aside before slow months.",
        );

        prompt
    }
}

fn display_month(ym: YearMonth) -> String {
    month_name(ym.month)
        .map(str::to_string)
        .unwrap_or_else(|| ym.to_string())
}

/// Asks `provider` for advice under `policy`. Never fails: any error, timeout or
/// blank answer is logged and reported as `None`.
pub async fn request_recommendation(
    provider: &dyn RecommendationProvider,
    summary: &AnalysisSummary,
    policy: &RecommendationPolicy,
) -> Option<String> {
    let attempts = policy.max_attempts.max(1);

    for attempt in 1..=attempts {
        let outcome = match tokio::time::timeout(policy.timeout, provider.recommend(summary)).await
        {
            Ok(result) => result,
            Err(_) => Err(RecommendationError::Timeout(policy.timeout)),
        };

        let error = match outcome {
            Ok(text) if !text.trim().is_empty() => {
                info!(
                    "Received recommendations from {} on attempt {}",
                    provider.name(),
                    attempt
                );
                return Some(text);
            }
            Ok(_) => RecommendationError::EmptyResponse,
            Err(e) => e,
        };

        if error.is_transient() && attempt < attempts {
            warn!(
                "Recommendation attempt {}/{} via {} failed, retrying: {}",
                attempt,
                attempts,
                provider.name(),
                error
            );
            continue;
        }

        warn!(
            "Recommendations omitted: {} failed on attempt {}: {}",
            provider.name(),
            attempt,
            error
        );
        return None;
    }

    None
}
