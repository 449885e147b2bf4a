use crate::error::{CashFlowError, Result};
use crate::schema::WeeklyRecord;
use chrono::NaiveDate;
use log::{debug, info};
use std::io::Read;

pub const DATE_COLUMN: &str = "Date";
pub const INFLOWS_COLUMN: &str = "Cash Inflows";
pub const OUTFLOWS_COLUMN: &str = "Cash Outflows";
pub const BALANCE_COLUMN: &str = "Balance";

pub const REQUIRED_COLUMNS: [&str; 4] = [
    DATE_COLUMN,
    INFLOWS_COLUMN,
    OUTFLOWS_COLUMN,
    BALANCE_COLUMN,
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Untyped ledger table: a header row plus text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawLedger {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawLedger {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row<I, S>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.push_row(cells);
        self
    }

    pub fn push_row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    /// Reads a headed CSV table. Rows must all have the header's width.
    pub fn from_csv<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }
}

/// A validated ledger: non-empty, strictly increasing dates, non-negative flows.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    records: Vec<WeeklyRecord>,
}

impl Ledger {
    /// Validates already-typed records. Input order does not matter.
    pub fn from_records(mut records: Vec<WeeklyRecord>) -> Result<Self> {
        for (idx, record) in records.iter().enumerate() {
            let row = idx + 1;
            check_flow(record.inflow, row, INFLOWS_COLUMN)?;
            check_flow(record.outflow, row, OUTFLOWS_COLUMN)?;
            if !record.balance.is_finite() {
                return Err(row_error(row, BALANCE_COLUMN, "balance must be finite"));
            }
        }

        if records.is_empty() {
            return Err(CashFlowError::EmptyLedgerError);
        }

        records.sort_by_key(|r| r.date);

        if let Some(pair) = records.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(CashFlowError::DuplicateDateError(pair[1].date));
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[WeeklyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn first(&self) -> &WeeklyRecord {
        &self.records[0]
    }

    /// The chronologically last week.
    pub fn latest(&self) -> &WeeklyRecord {
        &self.records[self.records.len() - 1]
    }
}

struct ColumnMap {
    date: usize,
    inflow: usize,
    outflow: usize,
    balance: usize,
}

fn normalize_header(header: &str) -> String {
    header.trim_start_matches('\u{feff}').trim().to_lowercase()
}

fn locate_columns(headers: &[String]) -> Result<ColumnMap> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    let find = |name: &str| {
        let wanted = name.to_lowercase();
        normalized.iter().position(|h| *h == wanted)
    };

    let positions: Vec<Option<usize>> = REQUIRED_COLUMNS.iter().map(|&c| find(c)).collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .zip(&positions)
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name.to_string())
        .collect();

    match positions.as_slice() {
        [Some(date), Some(inflow), Some(outflow), Some(balance)] => Ok(ColumnMap {
            date: *date,
            inflow: *inflow,
            outflow: *outflow,
            balance: *balance,
        }),
        _ => Err(CashFlowError::SchemaError { missing }),
    }
}

fn row_error(row: usize, column: &str, details: impl Into<String>) -> CashFlowError {
    CashFlowError::RowParseError {
        row,
        column: column.to_string(),
        details: details.into(),
    }
}

fn check_flow(value: f64, row: usize, column: &str) -> Result<()> {
    if !value.is_finite() {
        return Err(row_error(row, column, "amount must be finite"));
    }
    if value < 0.0 {
        return Err(row_error(
            row,
            column,
            format!(
                "negative amount {} (inflows and outflows must be non-negative)",
                value
            ),
        ));
    }
    Ok(())
}

pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Parses a monetary cell such as `"$15,000.00"`, `"-250"` or `"(500)"`.
/// A blank cell reads as zero.
pub fn parse_amount(text: &str) -> std::result::Result<f64, String> {
    let trimmed = text.trim();

    let (body, parenthesized) = match trimmed
        .strip_prefix('(')
        .and_then(|inner| inner.strip_suffix(')'))
    {
        Some(inner) => (inner, true),
        None => (trimmed, false),
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '$' | '€' | '£' | '¥' | ','))
        .collect();

    if cleaned.is_empty() {
        return Ok(0.0);
    }
    if parenthesized && cleaned.starts_with(['-', '+']) {
        return Err(format!("'{}' carries a sign inside parentheses", text.trim()));
    }

    let value: f64 = cleaned
        .parse()
        .map_err(|_| format!("'{}' is not a number", text.trim()))?;

    if !value.is_finite() {
        return Err(format!("'{}' is not a finite number", text.trim()));
    }

    Ok(if parenthesized { -value } else { value })
}

/// Validates a raw table into a [`Ledger`].
pub fn parse_ledger(raw: &RawLedger) -> Result<Ledger> {
    let columns = locate_columns(&raw.headers)?;
    let mut records = Vec::with_capacity(raw.rows.len());

    for (idx, row) in raw.rows.iter().enumerate() {
        let row_number = idx + 1;

        if row.iter().all(|cell| cell.trim().is_empty()) {
            debug!("Skipping blank ledger row {}", row_number);
            continue;
        }

        let cell = |col: usize| row.get(col).map(String::as_str).unwrap_or("");

        let date_text = cell(columns.date);
        let date = parse_date(date_text).ok_or_else(|| {
            row_error(
                row_number,
                DATE_COLUMN,
                format!("'{}' is not a valid date (expected YYYY-MM-DD)", date_text.trim()),
            )
        })?;

        let inflow = parse_amount(cell(columns.inflow))
            .map_err(|e| row_error(row_number, INFLOWS_COLUMN, e))?;
        check_flow(inflow, row_number, INFLOWS_COLUMN)?;

        let outflow = parse_amount(cell(columns.outflow))
            .map_err(|e| row_error(row_number, OUTFLOWS_COLUMN, e))?;
        check_flow(outflow, row_number, OUTFLOWS_COLUMN)?;

        let balance = parse_amount(cell(columns.balance))
            .map_err(|e| row_error(row_number, BALANCE_COLUMN, e))?;

        records.push(WeeklyRecord::new(date, inflow, outflow, balance));
    }

    let ledger = Ledger::from_records(records)?;

    info!(
        "Parsed ledger with {} weeks from {} to {}",
        ledger.len(),
        ledger.first().date,
        ledger.latest().date
    );

    Ok(ledger)
}

/// Reads and validates a CSV ledger in one step.
pub fn parse_csv<R: Read>(reader: R) -> Result<Ledger> {
    let raw = RawLedger::from_csv(reader)?;
    debug!(
        "Read CSV ledger with {} columns and {} rows",
        raw.headers.len(),
        raw.rows.len()
    );
    parse_ledger(&raw)
}
