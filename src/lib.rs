//! # Cash Flow Insights
//!
//! Turns a weekly cash-flow ledger (date, inflows, outflows, running balance) into
//! the views a cash dashboard needs.
//!
//! ## Core Concepts
//!
//! - **Ledger**: validated weekly rows, strictly increasing by date
//! - **Monthly rollup**: each week counted wholly in the calendar month of its date
//! - **Seasonality**: average inflows/outflows per calendar month across years
//! - **Runway**: months until the latest balance hits zero at the trailing burn rate,
//!   or `"infinite"` when cash is not declining
//! - **Callouts**: every month labelled risk, healthy or concerning, plus the weeks
//!   whose net change fell below the threshold
//! - **Recommendations**: optional free text from an external provider; never
//!   required for the numbers above
//!
//! ## Example
//!
//! ```rust
//! use cashflow_insights::*;
//!
//! let csv = "Date,Cash Inflows,Cash Outflows,Balance\n\
//!            2024-01-05,1000,1200,9800\n\
//!            2024-01-12,1000,900,9900\n";
//!
//! let result = analyze_csv(csv.as_bytes(), &AnalysisConfig::default()).unwrap();
//! assert_eq!(result.monthly.len(), 1);
//! assert_eq!(result.callouts.weekly_breaches.len(), 1);
//! ```

pub mod callouts;
pub mod config;
pub mod error;
pub mod ingestion;
pub mod monthly;
pub mod recommend;
pub mod runway;
pub mod schema;
pub mod seasonality;
pub mod utils;
pub mod weekly;

#[cfg(feature = "llm")]
pub mod llm;

pub use callouts::{CalloutClassifier, MonthLabel};
pub use config::AnalysisConfig;
pub use error::{CashFlowError, RecommendationError, Result};
pub use ingestion::{parse_csv, parse_ledger, Ledger, RawLedger};
pub use monthly::aggregate_monthly;
pub use recommend::{
    request_recommendation, AnalysisSummary, RecommendationPolicy, RecommendationProvider,
};
pub use runway::{project_runway, RunwayEstimator};
pub use schema::*;
pub use seasonality::seasonal_profile;
pub use weekly::{find_breaches, is_breach, weekly_series};

use log::{debug, info};
use std::io::Read;

/// Runs the full ledger → analytics pipeline under one configuration.
pub struct CashFlowAnalyzer {
    config: AnalysisConfig,
}

impl CashFlowAnalyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, raw: &RawLedger) -> Result<AnalysisResult> {
        let ledger = parse_ledger(raw)?;
        Ok(self.analyze_validated(&ledger))
    }

    pub fn analyze_csv<R: Read>(&self, reader: R) -> Result<AnalysisResult> {
        let ledger = parse_csv(reader)?;
        Ok(self.analyze_validated(&ledger))
    }

    /// Numeric analytics for an already validated ledger. Cannot fail.
    pub fn analyze_validated(&self, ledger: &Ledger) -> AnalysisResult {
        let records = ledger.records();
        let threshold = self.config.threshold;

        info!(
            "Analyzing {} weeks ({} to {}) with threshold {}",
            ledger.len(),
            ledger.first().date,
            ledger.latest().date,
            threshold
        );

        let weekly = weekly_series(records, threshold);
        let monthly = aggregate_monthly(records);
        let seasonality = seasonal_profile(&monthly);
        let kpis = RunwayEstimator::new(self.config.runway_window_months).estimate(records, &monthly);
        let callouts = CalloutClassifier::new(self.config.recency_window_months, threshold)
            .classify(&monthly, records);

        debug!(
            "Callouts: {} risk, {} healthy, {} concerning months; {} weekly breaches",
            callouts.risk_months.len(),
            callouts.healthy_months.len(),
            callouts.concerning_months.len(),
            callouts.weekly_breaches.len()
        );
        info!(
            "Analysis complete: {} months, runway {}",
            monthly.len(),
            kpis.runway
        );

        AnalysisResult {
            weekly,
            monthly,
            seasonality,
            kpis,
            callouts,
            recs: None,
            threshold,
        }
    }

    /// Runs the analytics, then asks `provider` (if any) for advice. The numeric
    /// result is returned whether or not the provider answers.
    pub async fn analyze_with_recommendations(
        &self,
        raw: &RawLedger,
        provider: Option<&dyn RecommendationProvider>,
        policy: &RecommendationPolicy,
    ) -> Result<AnalysisResult> {
        let mut result = self.analyze(raw)?;
        attach_recommendations(&mut result, provider, policy).await;
        Ok(result)
    }
}

/// Fills `result.recs` from `provider`, leaving it empty on any failure.
pub async fn attach_recommendations(
    result: &mut AnalysisResult,
    provider: Option<&dyn RecommendationProvider>,
    policy: &RecommendationPolicy,
) {
    let Some(provider) = provider else {
        debug!("No recommendation provider configured; skipping recommendations");
        return;
    };

    let summary = AnalysisSummary::from_result(result);
    result.recs = request_recommendation(provider, &summary, policy).await;
}

pub fn analyze_ledger(raw: &RawLedger, config: &AnalysisConfig) -> Result<AnalysisResult> {
    CashFlowAnalyzer::new(config.clone())?.analyze(raw)
}

pub fn analyze_csv<R: Read>(reader: R, config: &AnalysisConfig) -> Result<AnalysisResult> {
    CashFlowAnalyzer::new(config.clone())?.analyze_csv(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn jan_feb_ledger() -> RawLedger {
        let mut raw = RawLedger::new(["Date", "Cash Inflows", "Cash Outflows", "Balance"]);
        let dates = [
            "2024-01-05",
            "2024-01-12",
            "2024-01-19",
            "2024-01-26",
            "2024-02-02",
            "2024-02-09",
            "2024-02-16",
            "2024-02-23",
        ];
        let mut balance = 10_000.0;
        for (i, d) in dates.iter().enumerate() {
            let outflow = if i == 5 { 900.0 } else { 1200.0 };
            balance += 1000.0 - outflow;
            raw.push_row([
                d.to_string(),
                "1000".to_string(),
                outflow.to_string(),
                balance.to_string(),
            ]);
        }
        raw
    }

    #[test]
    fn test_end_to_end_jan_feb() {
        let result = analyze_ledger(&jan_feb_ledger(), &AnalysisConfig::default()).unwrap();

        assert_eq!(result.weekly.len(), 8);
        assert_eq!(result.monthly.len(), 2);
        assert_eq!(result.monthly[0].year_month.to_string(), "2024-01");
        assert_eq!(result.monthly[0].net, -800.0);
        assert_eq!(result.monthly[1].net, -500.0);

        let breach_dates: Vec<NaiveDate> = result
            .callouts
            .weekly_breaches
            .iter()
            .map(|b| b.date)
            .collect();
        assert_eq!(breach_dates.len(), 7);
        assert!(!breach_dates.contains(&NaiveDate::from_ymd_opt(2024, 2, 9).unwrap()));

        // Both months are negative and within the last three months.
        assert_eq!(result.callouts.risk_months.len(), 2);
        assert!(result.recs.is_none());
    }

    #[test]
    fn test_runway_end_to_end() {
        let result = analyze_ledger(&jan_feb_ledger(), &AnalysisConfig::default()).unwrap();

        // Average net over Jan and Feb is -650; final balance is 8700.
        assert_eq!(result.kpis.last_balance, 8700.0);
        assert_eq!(result.kpis.avg_net, -650.0);
        let months = result.kpis.runway.months().unwrap();
        assert!((months - 8700.0 / 650.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnalysisConfig::default().with_recency_window(0);
        assert!(matches!(
            analyze_ledger(&jan_feb_ledger(), &config),
            Err(CashFlowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_result_serializes_to_dashboard_shape() {
        let result = analyze_ledger(&jan_feb_ledger(), &AnalysisConfig::default()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();

        assert_eq!(json["monthly"][0]["YM"], "2024-01");
        assert_eq!(json["weekly"][0]["Date"], "2024-01-05");
        assert_eq!(json["seasonality"][0]["Month"], 1);
        assert!(json["kpis"]["runway_months"].is_number());
        assert!(json["recs"].is_null());
        assert_eq!(json["callouts"]["risk_months"][0]["month"], "2024-01");
    }
}
