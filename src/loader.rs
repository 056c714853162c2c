use crate::config::NormalizeConfig;
use crate::error::{LoadWarning, TableError, TableResult};
use crate::schema::TableKind;
use crate::table::{load_table, FactTable, RawTable, Tabular};
use crate::types::TableStatusRow;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub total_rows: usize,
    pub tables_loaded: usize,
    /// Tables replaced by an empty stand-in, with the reason.
    pub substituted: Vec<(TableKind, String)>,
    pub warnings: Vec<LoadWarning>,
}

/// All nine tables. A table that failed to load is present but empty.
#[derive(Debug, Clone)]
pub struct Dataset {
    tables: BTreeMap<TableKind, FactTable>,
}

impl Dataset {
    pub fn new(tables: impl IntoIterator<Item = FactTable>) -> Self {
        let mut map: BTreeMap<TableKind, FactTable> =
            TableKind::ALL.into_iter().map(|k| (k, FactTable::empty(k))).collect();
        for t in tables {
            map.insert(t.kind(), t);
        }
        Dataset { tables: map }
    }

    pub fn get(&self, kind: TableKind) -> &FactTable {
        // Every kind is inserted in `new`.
        &self.tables[&kind]
    }

    pub fn empty_tables(&self) -> Vec<TableKind> {
        self.tables.values().filter(|t| t.is_empty()).map(FactTable::kind).collect()
    }

    /// One status line per table: its shape, row count and period coverage.
    pub fn overview(&self) -> Vec<TableStatusRow> {
        self.tables
            .values()
            .map(|t| {
                let years = t.years();
                let span = match (years.first(), years.last()) {
                    (Some(a), Some(b)) if a == b => a.to_string(),
                    (Some(a), Some(b)) => format!("{}-{}", a, b),
                    _ => "-".to_string(),
                };
                let quarters: Vec<String> = t.quarters().iter().map(|q| format!("Q{}", q)).collect();
                TableStatusRow {
                    table: t.kind().to_string(),
                    domain: t.kind().domain().to_string(),
                    granularity: t.kind().granularity().to_string(),
                    rows: t.len(),
                    years: span,
                    quarters: if quarters.is_empty() { "-".to_string() } else { quarters.join(" ") },
                }
            })
            .collect()
    }
}

/// Read a CSV file into a raw table. Rows may have any length here; arity is
/// checked against the schema by `load_table`.
pub fn read_raw_csv(path: &Path) -> TableResult<RawTable> {
    let read_err = |e: csv::Error| TableError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    };
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path).map_err(read_err)?;
    let headers = rdr.headers().map_err(read_err)?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(read_err)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(RawTable { headers, rows })
}

/// Load `<dir>/<table_name>.csv` for every table.
///
/// A table that cannot be read or does not match its schema is logged and
/// replaced with an empty one, so the reports still run on what is there.
pub fn load_dataset(dir: &Path, config: &NormalizeConfig) -> (Dataset, LoadReport) {
    let mut report = LoadReport::default();
    let mut tables = Vec::with_capacity(TableKind::ALL.len());

    for kind in TableKind::ALL {
        let path = dir.join(format!("{}.csv", kind.table_name()));
        let loaded = read_raw_csv(&path).and_then(|raw| {
            report.total_rows += raw.rows.len();
            load_table(&raw, kind, config)
        });
        match loaded {
            Ok(l) => {
                report.tables_loaded += 1;
                report.warnings.extend(l.warnings);
                tables.push(l.table);
            }
            Err(e) => {
                log::warn!("{}: using an empty table ({})", kind, e);
                report.substituted.push((kind, e.to_string()));
                tables.push(FactTable::empty(kind));
            }
        }
    }

    (Dataset::new(tables), report)
}
