use crate::schema::{WeeklyBreach, WeeklyPoint, WeeklyRecord};

/// A week breaches when its net change is strictly below the threshold.
pub fn is_breach(record: &WeeklyRecord, threshold: f64) -> bool {
    record.net() < threshold
}

pub fn weekly_series(records: &[WeeklyRecord], threshold: f64) -> Vec<WeeklyPoint> {
    records
        .iter()
        .map(|r| WeeklyPoint {
            date: r.date,
            inflows: r.inflow,
            outflows: r.outflow,
            net: r.net(),
            balance: r.balance,
            breach: is_breach(r, threshold),
        })
        .collect()
}

/// Breaching weeks in input order.
pub fn find_breaches(records: &[WeeklyRecord], threshold: f64) -> Vec<WeeklyBreach> {
    records
        .iter()
        .filter(|r| is_breach(r, threshold))
        .map(|r| WeeklyBreach {
            date: r.date,
            net: r.net(),
        })
        .collect()
}
