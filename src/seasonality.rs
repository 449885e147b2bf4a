use crate::schema::{MonthlyBucket, SeasonalBucket};
use log::debug;
use std::collections::BTreeMap;

#[derive(Default)]
struct MonthTotals {
    inflows: f64,
    outflows: f64,
    count: usize,
}

/// Averages monthly totals by calendar month across every year present.
///
/// The result is ordered January to December whatever the input order, and a
/// calendar month with no data is left out rather than reported as zero.
pub fn seasonal_profile(monthly: &[MonthlyBucket]) -> Vec<SeasonalBucket> {
    let mut by_month: BTreeMap<u32, MonthTotals> = BTreeMap::new();

    for bucket in monthly {
        let totals = by_month.entry(bucket.month).or_default();
        totals.inflows += bucket.inflows;
        totals.outflows += bucket.outflows;
        totals.count += 1;
    }

    let profile: Vec<SeasonalBucket> = by_month
        .into_iter()
        .map(|(month, totals)| {
            let n = totals.count as f64;
            let avg_inflows = totals.inflows / n;
            let avg_outflows = totals.outflows / n;
            SeasonalBucket {
                month,
                avg_inflows,
                avg_outflows,
                avg_net: avg_inflows - avg_outflows,
                years: totals.count,
            }
        })
        .collect();

    debug!(
        "Seasonality covers {} of 12 calendar months",
        profile.len()
    );

    profile
}

/// Share of the average year's inflows that lands in each calendar month
/// (index 0 = January). Months without data get zero weight.
pub fn inflow_weights(profile: &[SeasonalBucket]) -> [f64; 12] {
    let mut weights = [0.0; 12];
    for bucket in profile {
        if let Some(slot) = bucket
            .month
            .checked_sub(1)
            .and_then(|idx| weights.get_mut(idx as usize))
        {
            *slot = bucket.avg_inflows;
        }
    }
    normalize_weights(&mut weights);
    weights
}

fn normalize_weights(weights: &mut [f64]) {
    let sum: f64 = weights.iter().sum();
    if sum == 0.0 {
        return;
    }
    for w in weights.iter_mut() {
        *w /= sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::YearMonth;

    fn bucket(year: i32, month: u32, inflows: f64, outflows: f64) -> MonthlyBucket {
        MonthlyBucket {
            year_month: YearMonth::new(year, month).unwrap(),
            year,
            month,
            inflows,
            outflows,
            net: inflows - outflows,
            end_balance: 0.0,
            weeks: 4,
        }
    }

    #[test]
    fn test_averages_across_years() {
        let monthly = vec![
            bucket(2023, 3, 1000.0, 500.0),
            bucket(2024, 3, 3000.0, 1500.0),
            bucket(2024, 4, 200.0, 400.0),
        ];

        let profile = seasonal_profile(&monthly);
        assert_eq!(profile.len(), 2);

        assert_eq!(profile[0].month, 3);
        assert_eq!(profile[0].avg_inflows, 2000.0);
        assert_eq!(profile[0].avg_outflows, 1000.0);
        assert_eq!(profile[0].avg_net, 1000.0);
        assert_eq!(profile[0].years, 2);

        assert_eq!(profile[1].month, 4);
        assert_eq!(profile[1].years, 1);
    }

    #[test]
    fn test_calendar_order_regardless_of_input() {
        let monthly = vec![
            bucket(2023, 11, 1.0, 1.0),
            bucket(2023, 12, 1.0, 1.0),
            bucket(2024, 1, 1.0, 1.0),
            bucket(2024, 2, 1.0, 1.0),
        ];

        let months: Vec<u32> = seasonal_profile(&monthly).iter().map(|s| s.month).collect();
        assert_eq!(months, vec![1, 2, 11, 12]);
    }

    #[test]
    fn test_inflow_weights() {
        let profile = seasonal_profile(&[
            bucket(2024, 1, 300.0, 0.0),
            bucket(2024, 12, 100.0, 0.0),
        ]);
        let weights = inflow_weights(&profile);

        assert!((weights[0] - 0.75).abs() < 1e-10);
        assert!((weights[11] - 0.25).abs() < 1e-10);
        assert_eq!(weights[5], 0.0);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_inflow_weights_all_zero() {
        let profile = seasonal_profile(&[bucket(2024, 6, 0.0, 10.0)]);
        assert_eq!(inflow_weights(&profile), [0.0; 12]);
    }
}
