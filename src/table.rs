// In-memory fact tables and the summaries derived from them.
//
// A `FactTable` is validated once at load time and never mutated afterwards:
// filters and engines always hand back new values.
use std::collections::{BTreeSet, HashSet};

use crate::config::NormalizeConfig;
use crate::error::{LoadWarning, TableError, TableResult};
use crate::schema::{ColumnRole, ColumnType, TableKind, QUARTER, STATES, YEARS};
use crate::types::{PeriodKey, Row, Value};
use crate::util::{parse_f64_safe, parse_i64_safe};

/// Rows as they arrive from storage: a header line plus text cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<H, S>(headers: H, rows: Vec<Vec<S>>) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        S: Into<String>,
    {
        RawTable {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// Read access shared by fact tables and summaries, so engines accept either.
pub trait Tabular {
    fn columns(&self) -> &[String];
    fn rows(&self) -> &[Row];

    /// Number of leading columns that identify a row; the rest are measures.
    fn key_len(&self) -> usize;

    fn len(&self) -> usize {
        self.rows().len()
    }

    fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    fn column_index(&self, name: &str) -> TableResult<usize> {
        self.columns()
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::ColumnNotFound {
                column: name.to_string(),
                available: self.columns().join(", "),
            })
    }

    fn column_indices(&self, names: &[&str]) -> TableResult<Vec<usize>> {
        names.iter().map(|n| self.column_index(n)).collect()
    }
}

/// Positions of the Years and Quarter columns, required by the period engines.
pub(crate) fn period_indices<T: Tabular + ?Sized>(table: &T) -> TableResult<(usize, usize)> {
    let find = |name: &str| {
        table
            .columns()
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| TableError::MissingPeriod { column: name.to_string() })
    };
    Ok((find(YEARS)?, find(QUARTER)?))
}

pub(crate) fn period_of(row: &Row, year_idx: usize, quarter_idx: usize) -> Option<PeriodKey> {
    let year = i32::try_from(row.get(year_idx)?.as_i64()?).ok()?;
    let quarter = u8::try_from(row.get(quarter_idx)?.as_i64()?).ok()?;
    Some(PeriodKey::new(year, quarter))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactTable {
    kind: TableKind,
    columns: Vec<String>,
    rows: Vec<Row>,
}

/// A successfully loaded table plus anything worth telling the caller about.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub table: FactTable,
    pub warnings: Vec<LoadWarning>,
}

/// Build a validated table from raw rows.
///
/// Headers are resolved through the config's alias map. Headers outside the
/// declared set are dropped with an `UnknownColumn` warning; anything else
/// that does not fit the schema fails the whole load.
pub fn load_table(raw: &RawTable, kind: TableKind, config: &NormalizeConfig) -> TableResult<Loaded> {
    let defs = kind.columns();
    let mut source_of: Vec<Option<usize>> = vec![None; defs.len()];
    let mut warnings = Vec::new();

    for (i, header) in raw.headers.iter().enumerate() {
        let canonical = config.canonical_column(header);
        match defs.iter().position(|d| d.name == canonical) {
            Some(slot) if source_of[slot].is_some() => {
                return Err(TableError::mismatch(kind, format!("column '{}' appears twice", canonical)));
            }
            Some(slot) => source_of[slot] = Some(i),
            None => {
                log::warn!("{}: unknown column '{}' dropped", kind, header.trim());
                warnings.push(LoadWarning::UnknownColumn {
                    table: kind,
                    column: header.trim().to_string(),
                });
            }
        }
    }

    let mut mapping = Vec::with_capacity(defs.len());
    for (def, src) in defs.iter().zip(&source_of) {
        match src {
            Some(i) => mapping.push(*i),
            None => return Err(TableError::mismatch(kind, format!("missing column '{}'", def.name))),
        }
    }

    let mut rows = Vec::with_capacity(raw.rows.len());
    for (line, cells) in raw.rows.iter().enumerate() {
        if cells.len() != raw.headers.len() {
            return Err(TableError::mismatch(
                kind,
                format!("row {} has {} fields, expected {}", line + 1, cells.len(), raw.headers.len()),
            ));
        }
        let mut row = Vec::with_capacity(defs.len());
        for (def, &src) in defs.iter().zip(&mapping) {
            let cell = cells[src].as_str();
            let value = match def.ty {
                ColumnType::Text if def.name == STATES => Value::Text(config.normalize_state(cell.trim())),
                ColumnType::Text => Value::Text(cell.trim().to_string()),
                ColumnType::Integer => parse_i64_safe(Some(cell)).map(Value::Int).ok_or_else(|| {
                    TableError::mismatch(kind, format!("row {}: '{}' is not an integer {}", line + 1, cell, def.name))
                })?,
                ColumnType::Decimal => parse_f64_safe(Some(cell)).map(Value::Num).ok_or_else(|| {
                    TableError::mismatch(kind, format!("row {}: '{}' is not a number {}", line + 1, cell, def.name))
                })?,
            };
            row.push(value);
        }
        rows.push(row);
    }

    let table = FactTable::from_rows(kind, rows)?;
    log::info!("{}: loaded {} rows ({} warnings)", kind, table.len(), warnings.len());
    Ok(Loaded { table, warnings })
}

impl FactTable {
    /// Validate typed rows given in the schema's declared column order.
    pub fn from_rows(kind: TableKind, rows: Vec<Row>) -> TableResult<Self> {
        let defs = kind.columns();
        let key_idx = kind.key_indices();
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(rows.len());

        for (line, row) in rows.iter().enumerate() {
            let line = line + 1;
            if row.len() != defs.len() {
                return Err(TableError::mismatch(
                    kind,
                    format!("row {} has {} fields, expected {}", line, row.len(), defs.len()),
                ));
            }
            for (def, value) in defs.iter().zip(row) {
                let ok = matches!(
                    (def.ty, value),
                    (ColumnType::Text, Value::Text(_))
                        | (ColumnType::Integer, Value::Int(_))
                        | (ColumnType::Decimal, Value::Num(_))
                );
                if !ok {
                    return Err(TableError::mismatch(
                        kind,
                        format!("row {}: {} has the wrong type ({:?})", line, def.name, value),
                    ));
                }
                if def.role == ColumnRole::Measure {
                    let v = value.as_f64().unwrap_or(0.0);
                    if !v.is_finite() || v < 0.0 {
                        return Err(TableError::mismatch(kind, format!("row {}: {} is negative ({})", line, def.name, v)));
                    }
                }
            }
            let year = row[1].as_i64().unwrap_or_default();
            if i32::try_from(year).is_err() {
                return Err(TableError::mismatch(kind, format!("row {}: year {} out of range", line, year)));
            }
            let quarter = row[2].as_i64().unwrap_or_default();
            if !(1..=4).contains(&quarter) {
                return Err(TableError::mismatch(kind, format!("row {}: quarter {} not in 1..=4", line, quarter)));
            }
            let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
            if !seen.insert(key) {
                let shown: Vec<String> = key_idx.iter().map(|&i| row[i].to_string()).collect();
                return Err(TableError::mismatch(kind, format!("row {}: duplicate key ({})", line, shown.join(", "))));
            }
        }

        Ok(FactTable {
            kind,
            columns: kind.column_names().into_iter().map(str::to_string).collect(),
            rows,
        })
    }

    /// The stand-in a caller publishes when a load fails.
    pub fn empty(kind: TableKind) -> Self {
        FactTable {
            kind,
            columns: kind.column_names().into_iter().map(str::to_string).collect(),
            rows: Vec::new(),
        }
    }

    pub fn kind(&self) -> TableKind {
        self.kind
    }

    /// A new table holding only the rows that match `selection`.
    pub fn select(&self, selection: &Selection) -> FactTable {
        let rows = self
            .rows
            .iter()
            .filter(|row| selection.matches(row))
            .cloned()
            .collect();
        FactTable {
            kind: self.kind,
            columns: self.columns.clone(),
            rows,
        }
    }

    pub fn years(&self) -> Vec<i32> {
        self.periods().into_iter().map(|p| p.year).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn quarters(&self) -> Vec<u8> {
        self.periods().into_iter().map(|p| p.quarter).collect::<BTreeSet<_>>().into_iter().collect()
    }

    pub fn states(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|r| r[0].as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Distinct periods present, oldest first.
    pub fn periods(&self) -> Vec<PeriodKey> {
        self.rows
            .iter()
            .filter_map(|r| period_of(r, 1, 2))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn latest_period(&self) -> Option<PeriodKey> {
        self.periods().last().copied()
    }
}

impl Tabular for FactTable {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn key_len(&self) -> usize {
        self.kind.key_indices().len()
    }
}

/// Row filter on the shared dimensions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub state: Option<String>,
}

impl Selection {
    pub fn period(period: PeriodKey) -> Self {
        Selection {
            year: Some(period.year),
            quarter: Some(period.quarter),
            state: None,
        }
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    fn matches(&self, row: &Row) -> bool {
        if let Some(y) = self.year {
            if row[1].as_i64() != Some(i64::from(y)) {
                return false;
            }
        }
        if let Some(q) = self.quarter {
            if row[2].as_i64() != Some(i64::from(q)) {
                return false;
            }
        }
        if let Some(s) = &self.state {
            if row[0].as_str() != Some(s.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Grouped output: key columns first, then one column per measure.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTable {
    columns: Vec<String>,
    key_len: usize,
    rows: Vec<Row>,
}

impl SummaryTable {
    pub(crate) fn new(columns: Vec<String>, key_len: usize, rows: Vec<Row>) -> Self {
        SummaryTable { columns, key_len, rows }
    }

    /// A measure cell as a number, for rows of this table.
    pub fn measure(&self, row: &Row, column: &str) -> TableResult<f64> {
        let idx = self.column_index(column)?;
        row[idx]
            .as_f64()
            .ok_or_else(|| TableError::NotNumeric { column: column.to_string() })
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, usize, Vec<Row>) {
        (self.columns, self.key_len, self.rows)
    }
}

impl Tabular for SummaryTable {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn rows(&self) -> &[Row] {
        &self.rows
    }

    fn key_len(&self) -> usize {
        self.key_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_agg(rows: Vec<Vec<&str>>) -> RawTable {
        RawTable::new(
            ["states", "years", "quarter", "transaction_type", "transaction_count", "transaction_amount"],
            rows,
        )
    }

    #[test]
    fn loads_and_canonicalizes_headers_and_states() {
        let raw = raw_agg(vec![
            vec!["andaman-&-nicobar-islands", "2022", "1", "Recharge & bill payments", "10", "1,500.5"],
            vec!["orissa", "2022", "1", "Peer-to-peer payments", "3", "900"],
        ]);
        let loaded = load_table(&raw, TableKind::AggregatedTransaction, &NormalizeConfig::default()).unwrap();
        assert!(loaded.warnings.is_empty());
        let t = loaded.table;
        assert_eq!(t.columns()[0], "States");
        assert_eq!(t.columns()[5], "Transaction_amount");
        assert_eq!(t.rows()[0][0], Value::from("Andaman & Nicobar Islands"));
        assert_eq!(t.rows()[0][5], Value::Num(1500.5));
        assert_eq!(t.rows()[1][0], Value::from("Odisha"));
        assert_eq!(t.rows()[1][4], Value::Int(3));
    }

    #[test]
    fn unknown_header_is_dropped_with_warning() {
        let raw = RawTable::new(
            ["States", "Years", "Quarter", "Pincodes", "RegisteredUsers", "Source"],
            vec![vec!["goa", "2023", "2", "403001", "120", "pulse"]],
        );
        let loaded = load_table(&raw, TableKind::TopUser, &NormalizeConfig::default()).unwrap();
        assert_eq!(
            loaded.warnings,
            vec![LoadWarning::UnknownColumn { table: TableKind::TopUser, column: "Source".into() }]
        );
        assert_eq!(loaded.table.columns().len(), 5);
        assert_eq!(loaded.table.rows()[0][3], Value::from("403001"));
    }

    #[test]
    fn reorders_columns_into_declared_order() {
        let raw = RawTable::new(
            ["AppOpens", "Districts", "States", "Quarter", "Years", "RegisteredUsers"],
            vec![vec!["50", "north goa district", "goa", "1", "2021", "400"]],
        );
        let t = load_table(&raw, TableKind::MapUser, &NormalizeConfig::default()).unwrap().table;
        assert_eq!(
            t.rows()[0],
            vec![
                Value::from("Goa"),
                Value::Int(2021),
                Value::Int(1),
                Value::from("north goa district"),
                Value::Int(400),
                Value::Int(50),
            ]
        );
    }

    #[test]
    fn arity_mismatch_fails_whole_load() {
        let raw = raw_agg(vec![
            vec!["goa", "2022", "1", "Merchant payments", "1", "2"],
            vec!["goa", "2022", "2", "Merchant payments", "1"],
        ]);
        let err = load_table(&raw, TableKind::AggregatedTransaction, &NormalizeConfig::default()).unwrap_err();
        assert!(matches!(err, TableError::SchemaMismatch { table: TableKind::AggregatedTransaction, .. }));
    }

    #[test]
    fn missing_declared_column_is_a_mismatch() {
        let raw = RawTable::new(["States", "Years", "Quarter", "Pincodes"], vec![vec!["goa", "2022", "1", "1"]]);
        let err = load_table(&raw, TableKind::TopUser, &NormalizeConfig::default()).unwrap_err();
        assert!(err.to_string().contains("RegisteredUsers"));
    }

    #[test]
    fn rejects_bad_cells_quarters_and_duplicates() {
        let cfg = NormalizeConfig::default();
        let bad_number = raw_agg(vec![vec!["goa", "2022", "1", "Others", "ten", "2"]]);
        assert!(load_table(&bad_number, TableKind::AggregatedTransaction, &cfg).is_err());

        let bad_quarter = raw_agg(vec![vec!["goa", "2022", "5", "Others", "1", "2"]]);
        assert!(load_table(&bad_quarter, TableKind::AggregatedTransaction, &cfg).is_err());

        let negative = raw_agg(vec![vec!["goa", "2022", "1", "Others", "1", "-2"]]);
        assert!(load_table(&negative, TableKind::AggregatedTransaction, &cfg).is_err());

        let duplicate = raw_agg(vec![
            vec!["goa", "2022", "1", "Others", "1", "2"],
            vec!["Goa", "2022", "1", "Others", "4", "5"],
        ]);
        let err = load_table(&duplicate, TableKind::AggregatedTransaction, &cfg).unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[test]
    fn select_and_period_helpers() {
        let t = FactTable::from_rows(
            TableKind::TopUser,
            vec![
                vec!["Goa".into(), Value::Int(2022), Value::Int(4), "403001".into(), Value::Int(5)],
                vec!["Kerala".into(), Value::Int(2023), Value::Int(1), "682001".into(), Value::Int(7)],
                vec!["Goa".into(), Value::Int(2023), Value::Int(1), "403001".into(), Value::Int(9)],
            ],
        )
        .unwrap();
        assert_eq!(t.years(), vec![2022, 2023]);
        assert_eq!(t.quarters(), vec![1, 4]);
        assert_eq!(t.states(), vec!["Goa".to_string(), "Kerala".to_string()]);
        assert_eq!(t.latest_period(), Some(PeriodKey::new(2023, 1)));

        let goa_2023 = t.select(&Selection::default().year(2023).state("Goa"));
        assert_eq!(goa_2023.len(), 1);
        assert_eq!(goa_2023.rows()[0][4], Value::Int(9));
        assert_eq!(t.len(), 3);
        assert!(FactTable::empty(TableKind::MapUser).is_empty());
    }
}
