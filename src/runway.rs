use crate::config::DEFAULT_RUNWAY_WINDOW_MONTHS;
use crate::schema::{MonthlyBucket, Runway, RunwayEstimate, WeeklyRecord};
use crate::utils::{mean, round_cents};
use log::debug;

/// Projects the latest balance forward at the trailing average monthly net.
pub struct RunwayEstimator {
    window_months: usize,
}

impl Default for RunwayEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_RUNWAY_WINDOW_MONTHS)
    }
}

impl RunwayEstimator {
    pub fn new(window_months: usize) -> Self {
        Self {
            window_months: window_months.max(1),
        }
    }

    /// `records` supplies the latest balance, `monthly` the burn rate. Both are
    /// expected in chronological order.
    pub fn estimate(&self, records: &[WeeklyRecord], monthly: &[MonthlyBucket]) -> RunwayEstimate {
        let last_balance = records
            .iter()
            .max_by_key(|r| r.date)
            .map(|r| r.balance)
            .unwrap_or(0.0);

        let start = monthly.len().saturating_sub(self.window_months);
        let trailing: Vec<f64> = monthly[start..].iter().map(|b| b.net).collect();
        // A burn below half a cent a month is a flat balance.
        let avg_net = round_cents(mean(&trailing).unwrap_or(0.0));

        let runway = project_runway(last_balance, avg_net);

        debug!(
            "Runway from balance {:.2} at average net {:.2} over {} month(s): {}",
            last_balance,
            avg_net,
            trailing.len(),
            runway
        );

        RunwayEstimate {
            runway,
            avg_net,
            last_balance,
            window_months: trailing.len(),
        }
    }
}

/// Months until `balance` reaches zero at `avg_net` per month.
///
/// A flat or growing balance never runs out. An already empty or overdrawn
/// balance has zero months left. Any real burn gives a finite count.
pub fn project_runway(balance: f64, avg_net: f64) -> Runway {
    if avg_net >= 0.0 || avg_net.is_nan() {
        return Runway::Indefinite;
    }
    if balance <= 0.0 {
        return Runway::Months(0.0);
    }

    Runway::Months((balance / avg_net.abs()).min(f64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YearMonth;
    use chrono::NaiveDate;

    fn bucket(month: u32, net: f64) -> MonthlyBucket {
        MonthlyBucket {
            year_month: YearMonth::new(2024, month).unwrap(),
            year: 2024,
            month,
            inflows: net.max(0.0),
            outflows: (-net).max(0.0),
            net,
            end_balance: 0.0,
            weeks: 4,
        }
    }

    fn last_week(balance: f64) -> Vec<WeeklyRecord> {
        vec![WeeklyRecord::new(
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            0.0,
            0.0,
            balance,
        )]
    }

    #[test]
    fn test_project_runway_policy() {
        assert_eq!(project_runway(12000.0, -3000.0), Runway::Months(4.0));
        assert_eq!(project_runway(12000.0, 0.0), Runway::Indefinite);
        assert_eq!(project_runway(12000.0, 500.0), Runway::Indefinite);
        assert_eq!(project_runway(0.0, -100.0), Runway::Months(0.0));
        assert_eq!(project_runway(-500.0, -100.0), Runway::Months(0.0));
        assert_eq!(project_runway(-500.0, 100.0), Runway::Indefinite);
    }

    #[test]
    fn test_uses_trailing_window_only() {
        // Early months are strongly positive; the last three burn 1000 each.
        let monthly = vec![
            bucket(1, 50_000.0),
            bucket(2, 50_000.0),
            bucket(3, -1000.0),
            bucket(4, -1000.0),
            bucket(5, -1000.0),
        ];

        let estimate = RunwayEstimator::new(3).estimate(&last_week(6000.0), &monthly);
        assert_eq!(estimate.avg_net, -1000.0);
        assert_eq!(estimate.window_months, 3);
        assert_eq!(estimate.runway, Runway::Months(6.0));
        assert_eq!(estimate.last_balance, 6000.0);
    }

    #[test]
    fn test_short_history_uses_all_months() {
        let monthly = vec![bucket(1, -200.0), bucket(2, -400.0)];

        let estimate = RunwayEstimator::new(6).estimate(&last_week(900.0), &monthly);
        assert_eq!(estimate.window_months, 2);
        assert_eq!(estimate.avg_net, -300.0);
        assert_eq!(estimate.runway, Runway::Months(3.0));
    }

    #[test]
    fn test_tiny_burn_stays_finite() {
        let runway = project_runway(1e300, -1e-300);
        assert_eq!(runway, Runway::Months(f64::MAX));
    }

    #[test]
    fn test_cent_noise_in_trailing_months_is_flat() {
        // 0.1 + 0.2 - 0.3 leaves float residue; in money it is zero.
        let monthly = vec![bucket(1, 0.1), bucket(2, 0.2), bucket(3, -0.3)];

        let estimate = RunwayEstimator::new(3).estimate(&last_week(500.0), &monthly);
        assert_eq!(estimate.avg_net, 0.0);
        assert!(estimate.runway.is_indefinite());
    }

    #[test]
    fn test_no_months_is_indefinite() {
        let estimate = RunwayEstimator::default().estimate(&[], &[]);
        assert!(estimate.runway.is_indefinite());
        assert_eq!(estimate.window_months, 0);
    }
}
