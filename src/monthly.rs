use crate::schema::{MonthlyBucket, WeeklyRecord, YearMonth};
use crate::utils::{months_between, round_cents};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

// Running totals for one month while weeks are folded in
struct MonthSlot {
    inflows: f64,
    outflows: f64,
    weeks: usize,
    last_date: NaiveDate,
    end_balance: f64,
}

impl MonthSlot {
    fn open(record: &WeeklyRecord) -> Self {
        Self {
            inflows: 0.0,
            outflows: 0.0,
            weeks: 0,
            last_date: record.date,
            end_balance: record.balance,
        }
    }

    fn absorb(&mut self, record: &WeeklyRecord) {
        self.inflows += record.inflow;
        self.outflows += record.outflow;
        self.weeks += 1;
        if record.date >= self.last_date {
            self.last_date = record.date;
            self.end_balance = record.balance;
        }
    }
}

/// Groups weeks into calendar months.
///
/// Each week is assigned wholly to the month of its own date, even when the seven
/// days it covers straddle a month boundary: the ledger carries one date per week,
/// so the other end of the interval is unknown and no proportional split is made.
/// Months with no weeks are not emitted. Totals are rounded to whole cents so a
/// month that nets to zero in money reports exactly zero.
pub fn aggregate_monthly(records: &[WeeklyRecord]) -> Vec<MonthlyBucket> {
    let mut grid: BTreeMap<YearMonth, MonthSlot> = BTreeMap::new();

    for record in records {
        grid.entry(YearMonth::from_date(record.date))
            .or_insert_with(|| MonthSlot::open(record))
            .absorb(record);
    }

    let buckets: Vec<MonthlyBucket> = grid
        .into_iter()
        .map(|(ym, slot)| {
            let inflows = round_cents(slot.inflows);
            let outflows = round_cents(slot.outflows);
            MonthlyBucket {
                year_month: ym,
                year: ym.year,
                month: ym.month,
                inflows,
                outflows,
                net: round_cents(inflows - outflows),
                end_balance: slot.end_balance,
                weeks: slot.weeks,
            }
        })
        .collect();

    for pair in buckets.windows(2) {
        let gap = months_between(pair[0].year_month, pair[1].year_month) - 1;
        if gap > 0 {
            debug!(
                "Ledger has no weeks for {} month(s) between {} and {}",
                gap, pair[0].year_month, pair[1].year_month
            );
        }
    }

    debug!(
        "Aggregated {} weeks into {} monthly buckets",
        records.len(),
        buckets.len()
    );

    buckets
}
