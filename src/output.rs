use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

use crate::error::{TableError, TableResult};

fn write_err(path: &Path, e: impl std::fmt::Display) -> TableError {
    TableError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> TableResult<()> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| write_err(path, e))?;
    for r in rows {
        wtr.serialize(r).map_err(|e| write_err(path, e))?;
    }
    wtr.flush().map_err(|e| write_err(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> TableResult<()> {
    let s = serde_json::to_string_pretty(value).map_err(|e| write_err(path, e))?;
    std::fs::write(path, s).map_err(|e| write_err(path, e))?;
    Ok(())
}

/// Markdown rendering of the first `max_rows` rows.
pub fn render_rows<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table<T>(report_no: usize, title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("Report {}: {}", report_no, title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    println!("{}\n", render_rows(rows, max_rows));
}
