use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use tabled::Tabled;

/// A single typed cell.
///
/// Equality, ordering and hashing are total: decimals compare with
/// `f64::total_cmp`, and values of different variants order as
/// `Int < Num < Text`. That makes a `Vec<Value>` usable as a grouping key.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Num(f64),
    Text(String),
}

pub type Row = Vec<Value>;

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Num(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Int(_) => 0,
            Value::Num(_) => 1,
            Value::Text(_) => 2,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Num(a), Value::Num(b)) => a.total_cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Int(i) => i.hash(state),
            Value::Num(n) => n.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Num(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Num(n)
    }
}

/// (year, quarter), ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PeriodKey {
    pub year: i32,
    pub quarter: u8,
}

impl PeriodKey {
    pub fn new(year: i32, quarter: u8) -> Self {
        PeriodKey { year, quarter }
    }

    /// Same quarter, one year earlier. `None` when that year is not an `i32`.
    pub fn year_before(self) -> Option<Self> {
        let year = self.year.checked_sub(1)?;
        Some(PeriodKey { year, quarter: self.quarter })
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q{}", self.year, self.quarter)
    }
}

/// One group's value in a period set against its reference period.
///
/// `growth_pct` is `None` whenever `reference` is zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub key: Vec<Value>,
    pub period: PeriodKey,
    pub reference_period: Option<PeriodKey>,
    pub current: f64,
    pub reference: f64,
    pub delta: f64,
    pub growth_pct: Option<f64>,
}

// Report rows. Numbers are pre-formatted strings so the CSV export and the
// console preview show the same thing.

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StateYoyRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "CurrentAmount")]
    #[tabled(rename = "CurrentAmount")]
    pub current_amount: String,
    #[serde(rename = "PreviousYearAmount")]
    #[tabled(rename = "PreviousYearAmount")]
    pub previous_amount: String,
    #[serde(rename = "YoYGrowth")]
    #[tabled(rename = "YoYGrowth")]
    pub yoy_growth: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MarketShareRow {
    #[serde(rename = "TransactionType")]
    #[tabled(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "TotalCount")]
    #[tabled(rename = "TotalCount")]
    pub total_count: String,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
    #[serde(rename = "CountShare")]
    #[tabled(rename = "CountShare")]
    pub count_share: String,
    #[serde(rename = "AmountShare")]
    #[tabled(rename = "AmountShare")]
    pub amount_share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AverageValueRow {
    #[serde(rename = "TransactionType")]
    #[tabled(rename = "TransactionType")]
    pub transaction_type: String,
    #[serde(rename = "AvgTransactionValue")]
    #[tabled(rename = "AvgTransactionValue")]
    pub avg_value: String,
    #[serde(rename = "TotalCount")]
    #[tabled(rename = "TotalCount")]
    pub total_count: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct InsuranceTrendRow {
    #[serde(rename = "Year")]
    #[tabled(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Quarter")]
    #[tabled(rename = "Quarter")]
    pub quarter: u8,
    #[serde(rename = "TotalPolicies")]
    #[tabled(rename = "TotalPolicies")]
    pub total_policies: String,
    #[serde(rename = "PreviousYearPolicies")]
    #[tabled(rename = "PreviousYearPolicies")]
    pub previous_year_policies: String,
    #[serde(rename = "YoYGrowth")]
    #[tabled(rename = "YoYGrowth")]
    pub yoy_growth: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PincodeRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "Pincode")]
    #[tabled(rename = "Pincode")]
    pub pincode: String,
    #[serde(rename = "TransactionCount")]
    #[tabled(rename = "TransactionCount")]
    pub transaction_count: String,
    #[serde(rename = "TransactionAmount")]
    #[tabled(rename = "TransactionAmount")]
    pub transaction_amount: String,
    #[serde(rename = "AvgTransactionValue")]
    #[tabled(rename = "AvgTransactionValue")]
    pub avg_value: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct AppOpenRateRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "RegisteredUsers")]
    #[tabled(rename = "RegisteredUsers")]
    pub registered_users: String,
    #[serde(rename = "AppOpens")]
    #[tabled(rename = "AppOpens")]
    pub app_opens: String,
    #[serde(rename = "AppOpenRate")]
    #[tabled(rename = "AppOpenRate")]
    pub app_open_rate: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistrictGrowthRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "Current")]
    #[tabled(rename = "Current")]
    pub current: String,
    #[serde(rename = "PreviousPeriod")]
    #[tabled(rename = "PreviousPeriod")]
    pub previous: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "QoQGrowth")]
    #[tabled(rename = "QoQGrowth")]
    pub qoq_growth: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct StateSummaryRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "State")]
    #[tabled(rename = "State")]
    pub state: String,
    #[serde(rename = "TotalCount")]
    #[tabled(rename = "TotalCount")]
    pub total_count: String,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct BrandShareRow {
    #[serde(rename = "Brand")]
    #[tabled(rename = "Brand")]
    pub brand: String,
    #[serde(rename = "UserCount")]
    #[tabled(rename = "UserCount")]
    pub user_count: String,
    #[serde(rename = "Share")]
    #[tabled(rename = "Share")]
    pub share: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct UserPincodeRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Pincode")]
    #[tabled(rename = "Pincode")]
    pub pincode: String,
    #[serde(rename = "RegisteredUsers")]
    #[tabled(rename = "RegisteredUsers")]
    pub registered_users: String,
}

/// One district's total of a single measure.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DistrictTotalRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "District")]
    #[tabled(rename = "District")]
    pub district: String,
    #[serde(rename = "Total")]
    #[tabled(rename = "Total")]
    pub total: String,
}

/// What the loader ended up with for one table.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TableStatusRow {
    #[serde(rename = "Table")]
    #[tabled(rename = "Table")]
    pub table: String,
    #[serde(rename = "Domain")]
    #[tabled(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "Granularity")]
    #[tabled(rename = "Granularity")]
    pub granularity: String,
    #[serde(rename = "Rows")]
    #[tabled(rename = "Rows")]
    pub rows: usize,
    #[serde(rename = "Years")]
    #[tabled(rename = "Years")]
    pub years: String,
    #[serde(rename = "Quarters")]
    #[tabled(rename = "Quarters")]
    pub quarters: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub period: PeriodKey,
    pub tables_loaded: usize,
    pub empty_tables: Vec<String>,
    pub states: usize,
    pub total_transaction_count: i64,
    pub total_transaction_amount: f64,
    pub registered_users: i64,
    pub insurance_policies: i64,
    pub states_with_prior_year: usize,
}
