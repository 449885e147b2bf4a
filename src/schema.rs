use crate::error::CashFlowError;
use crate::utils::{parse_year_month, round_cents};
use chrono::{Datelike, NaiveDate};
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject, SubschemaValidation};
use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Wire value used for a runway that never reaches zero.
pub const INFINITE_RUNWAY: &str = "infinite";

/// One validated row of the weekly ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyRecord {
    pub date: NaiveDate,
    pub inflow: f64,
    pub outflow: f64,
    /// Running balance as reported by the source ledger, never recomputed from flows.
    pub balance: f64,
}

impl WeeklyRecord {
    pub fn new(date: NaiveDate, inflow: f64, outflow: f64, balance: f64) -> Self {
        Self {
            date,
            inflow,
            outflow,
            balance,
        }
    }

    /// Inflow minus outflow, in whole cents.
    pub fn net(&self) -> f64 {
        round_cents(self.inflow - self.outflow)
    }
}

/// Calendar month key, rendered as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CashFlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_year_month(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CashFlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

impl JsonSchema for YearMonth {
    fn schema_name() -> String {
        "YearMonth".to_string()
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            string: Some(Box::new(schemars::schema::StringValidation {
                pattern: Some(r"^\d{4}-\d{2}$".to_string()),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}

/// A week of the output series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct WeeklyPoint {
    #[schemars(description = "Week date in YYYY-MM-DD format, as given in the ledger")]
    pub date: NaiveDate,
    pub inflows: f64,
    pub outflows: f64,
    #[schemars(description = "Inflows minus outflows for the week")]
    pub net: f64,
    pub balance: f64,
    #[schemars(description = "True when the week's net change is below the requested threshold")]
    pub breach: bool,
}

/// Totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct MonthlyBucket {
    #[serde(rename = "YM")]
    #[schemars(description = "Month key in YYYY-MM format")]
    pub year_month: YearMonth,
    pub year: i32,
    pub month: u32,
    pub inflows: f64,
    pub outflows: f64,
    pub net: f64,
    #[schemars(description = "Balance reported for the last week dated in this month")]
    pub end_balance: f64,
    #[schemars(description = "Number of ledger weeks dated in this month")]
    pub weeks: usize,
}

/// Long-run average for one calendar month across all years present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub struct SeasonalBucket {
    #[schemars(description = "Calendar month number (1 = January, 12 = December)")]
    pub month: u32,
    pub avg_inflows: f64,
    pub avg_outflows: f64,
    pub avg_net: f64,
    #[schemars(description = "How many years contributed data for this month")]
    pub years: usize,
}

/// Months of cash left at the trailing burn rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Runway {
    Months(f64),
    /// Cash is flat or growing; the balance is not being depleted.
    Indefinite,
}

impl Runway {
    pub fn is_indefinite(&self) -> bool {
        matches!(self, Runway::Indefinite)
    }

    pub fn months(&self) -> Option<f64> {
        match self {
            Runway::Months(m) => Some(*m),
            Runway::Indefinite => None,
        }
    }
}

impl fmt::Display for Runway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Runway::Months(m) => write!(f, "{:.1} months", m),
            Runway::Indefinite => write!(f, "indefinite (cash is not declining)"),
        }
    }
}

impl Serialize for Runway {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Runway::Months(m) => serializer.serialize_f64(*m),
            Runway::Indefinite => serializer.serialize_str(INFINITE_RUNWAY),
        }
    }
}

impl<'de> Deserialize<'de> for Runway {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Months(f64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Months(m) => Ok(Runway::Months(m)),
            Repr::Text(t) if t.eq_ignore_ascii_case(INFINITE_RUNWAY) => Ok(Runway::Indefinite),
            Repr::Text(t) => Err(de::Error::custom(format!(
                "expected a number of months or \"{}\", got \"{}\"",
                INFINITE_RUNWAY, t
            ))),
        }
    }
}

impl JsonSchema for Runway {
    fn schema_name() -> String {
        "Runway".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        let months = gen.subschema_for::<f64>();
        let sentinel: Schema = SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            enum_values: Some(vec![serde_json::Value::from(INFINITE_RUNWAY)]),
            ..Default::default()
        }
        .into();

        SchemaObject {
            metadata: Some(Box::new(schemars::schema::Metadata {
                description: Some(format!(
                    "Months of remaining cash, or \"{}\" when cash is not declining",
                    INFINITE_RUNWAY
                )),
                ..Default::default()
            })),
            subschemas: Some(Box::new(SubschemaValidation {
                any_of: Some(vec![months, sentinel]),
                ..Default::default()
            })),
            ..Default::default()
        }
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunwayEstimate {
    #[serde(rename = "runway_months")]
    pub runway: Runway,
    #[serde(rename = "avg_net_trailing")]
    #[schemars(description = "Mean monthly net over the trailing window")]
    pub avg_net: f64,
    #[schemars(description = "Balance of the most recent week in the ledger")]
    pub last_balance: f64,
    #[schemars(description = "Number of months the trailing average was taken over")]
    pub window_months: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MonthCallout {
    pub month: YearMonth,
    pub net: f64,
    pub end_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyBreach {
    pub date: NaiveDate,
    pub net: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Callouts {
    #[schemars(description = "Recent months with negative net change")]
    pub risk_months: Vec<MonthCallout>,
    #[schemars(description = "Months with zero or positive net change")]
    pub healthy_months: Vec<MonthCallout>,
    #[schemars(description = "Older months with negative net change")]
    pub concerning_months: Vec<MonthCallout>,
    #[schemars(description = "Weeks whose net change fell below the threshold")]
    pub weekly_breaches: Vec<WeeklyBreach>,
}

/// Everything the dashboard needs for one uploaded ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub weekly: Vec<WeeklyPoint>,
    pub monthly: Vec<MonthlyBucket>,
    pub seasonality: Vec<SeasonalBucket>,
    pub kpis: RunwayEstimate,
    pub callouts: Callouts,
    #[serde(default)]
    #[schemars(
        description = "Free-text advice from the recommendation service, or null when it is not configured or failed"
    )]
    pub recs: Option<String>,
    #[schemars(description = "Weekly net-change threshold used for breach detection")]
    pub threshold: f64,
}

impl AnalysisResult {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AnalysisResult)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_year_month_display_and_order() {
        let a = YearMonth::new(2023, 12).unwrap();
        let b = YearMonth::new(2024, 1).unwrap();
        assert_eq!(a.to_string(), "2023-12");
        assert!(a < b);
        assert_eq!("2024-01".parse::<YearMonth>().unwrap(), b);
        assert!(YearMonth::new(2024, 0).is_none());
    }

    #[test]
    fn test_year_month_from_date() {
        let feb = YearMonth::from_date(date(2024, 2, 14));
        assert_eq!(feb, YearMonth::new(2024, 2).unwrap());
    }

    #[test]
    fn test_weekly_net_is_whole_cents() {
        let record = WeeklyRecord::new(date(2024, 3, 1), 0.30, 0.10, 0.0);
        assert_eq!(record.net(), 0.2);
        let flat = WeeklyRecord::new(date(2024, 3, 8), 0.10, 0.10, 0.0);
        assert!(flat.net().is_sign_positive());
    }

    #[test]
    fn test_runway_serialization() {
        assert_eq!(serde_json::to_string(&Runway::Indefinite).unwrap(), "\"infinite\"");
        assert_eq!(serde_json::to_string(&Runway::Months(2.5)).unwrap(), "2.5");

        let back: Runway = serde_json::from_str("\"infinite\"").unwrap();
        assert!(back.is_indefinite());
        let back: Runway = serde_json::from_str("4.0").unwrap();
        assert_eq!(back.months(), Some(4.0));
        assert!(serde_json::from_str::<Runway>("\"forever\"").is_err());
    }

    #[test]
    fn test_monthly_bucket_field_names() {
        let bucket = MonthlyBucket {
            year_month: YearMonth::new(2024, 3).unwrap(),
            year: 2024,
            month: 3,
            inflows: 4000.0,
            outflows: 3000.0,
            net: 1000.0,
            end_balance: 12000.0,
            weeks: 4,
        };

        let json = serde_json::to_value(&bucket).unwrap();
        assert_eq!(json["YM"], "2024-03");
        assert_eq!(json["Inflows"], 4000.0);
        assert_eq!(json["EndBalance"], 12000.0);
        assert_eq!(json["Weeks"], 4);

        let back: MonthlyBucket = serde_json::from_value(json).unwrap();
        assert_eq!(back, bucket);
    }

    #[test]
    fn test_weekly_point_field_names() {
        let point = WeeklyPoint {
            date: date(2024, 1, 5),
            inflows: 1000.0,
            outflows: 1200.0,
            net: -200.0,
            balance: 5000.0,
            breach: true,
        };

        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json["Date"], "2024-01-05");
        assert_eq!(json["Net"], -200.0);
        assert_eq!(json["Breach"], true);
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = AnalysisResult::schema_as_json().unwrap();
        assert!(schema_json.contains("weekly"));
        assert!(schema_json.contains("seasonality"));
        assert!(schema_json.contains("runway_months"));
        assert!(schema_json.contains(INFINITE_RUNWAY));
    }
}
