// Group-by reductions over any `Tabular` input.
//
// Groups appear in the order their key was first seen unless a sort is
// requested. Groups only exist for keys that have rows, so no reduction ever
// runs over an empty group.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{TableError, TableResult};
use crate::table::{SummaryTable, Tabular};
use crate::types::{Row, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Sum,
    Mean,
    Count,
}

/// One output column: `output = reduction(source)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasureSpec {
    pub output: String,
    pub source: String,
    pub reduction: Reduction,
}

impl MeasureSpec {
    pub fn new(output: &str, source: &str, reduction: Reduction) -> Self {
        MeasureSpec {
            output: output.to_string(),
            source: source.to_string(),
            reduction,
        }
    }

    pub fn sum(output: &str, source: &str) -> Self {
        Self::new(output, source, Reduction::Sum)
    }

    pub fn mean(output: &str, source: &str) -> Self {
        Self::new(output, source, Reduction::Mean)
    }

    pub fn count(output: &str, source: &str) -> Self {
        Self::new(output, source, Reduction::Count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub by: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn desc(by: &str) -> Self {
        SortSpec { by: by.to_string(), descending: true }
    }

    pub fn asc(by: &str) -> Self {
        SortSpec { by: by.to_string(), descending: false }
    }
}

struct Acc {
    sums: Vec<f64>,
    int_sums: Vec<i128>,
    rows: usize,
}

pub fn aggregate<T>(table: &T, group_by: &[&str], measures: &[MeasureSpec]) -> TableResult<SummaryTable>
where
    T: Tabular + ?Sized,
{
    let key_idx = table.column_indices(group_by)?;
    let mut src_idx = Vec::with_capacity(measures.len());
    let mut int_source = Vec::with_capacity(measures.len());
    for m in measures {
        let idx = table.column_index(&m.source)?;
        if m.reduction != Reduction::Count
            && table.rows().iter().any(|r| r[idx].as_f64().is_none())
        {
            return Err(TableError::NotNumeric { column: m.source.clone() });
        }
        src_idx.push(idx);
        int_source.push(table.rows().iter().all(|r| matches!(r[idx], Value::Int(_))));
    }

    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<Value>, Acc)> = Vec::new();
    for row in table.rows() {
        let key: Vec<Value> = key_idx.iter().map(|&i| row[i].clone()).collect();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            groups.push((
                key,
                Acc {
                    sums: vec![0.0; measures.len()],
                    int_sums: vec![0; measures.len()],
                    rows: 0,
                },
            ));
            groups.len() - 1
        });
        let acc = &mut groups[slot].1;
        acc.rows += 1;
        for (m, &idx) in src_idx.iter().enumerate() {
            match &row[idx] {
                Value::Int(i) => {
                    acc.int_sums[m] += i128::from(*i);
                    acc.sums[m] += *i as f64;
                }
                Value::Num(n) => acc.sums[m] += n,
                Value::Text(_) => {}
            }
        }
    }

    let rows: Vec<Row> = groups
        .into_iter()
        .map(|(mut key, acc)| {
            for (m, spec) in measures.iter().enumerate() {
                let value = match spec.reduction {
                    Reduction::Sum if int_source[m] => i64::try_from(acc.int_sums[m])
                        .map(Value::Int)
                        .unwrap_or(Value::Num(acc.sums[m])),
                    Reduction::Sum => Value::Num(acc.sums[m]),
                    Reduction::Mean => Value::Num(acc.sums[m] / acc.rows as f64),
                    Reduction::Count => Value::Int(acc.rows as i64),
                };
                key.push(value);
            }
            key
        })
        .collect();

    let columns: Vec<String> = group_by
        .iter()
        .map(|s| s.to_string())
        .chain(measures.iter().map(|m| m.output.clone()))
        .collect();
    log::debug!(
        "aggregate by [{}]: {} rows -> {} groups",
        group_by.join(", "),
        table.len(),
        rows.len()
    );
    Ok(SummaryTable::new(columns, group_by.len(), rows))
}

/// `aggregate` followed by `sort_summary`.
pub fn aggregate_sorted<T>(
    table: &T,
    group_by: &[&str],
    measures: &[MeasureSpec],
    sort: &SortSpec,
) -> TableResult<SummaryTable>
where
    T: Tabular + ?Sized,
{
    sort_summary(aggregate(table, group_by, measures)?, sort)
}

/// Order rows by a measure; ties fall back to the key tuple, ascending.
pub fn sort_summary(summary: SummaryTable, sort: &SortSpec) -> TableResult<SummaryTable> {
    let idx = summary.column_index(&sort.by)?;
    let (columns, key_len, mut rows) = summary.into_parts();
    if rows.iter().any(|r| r[idx].as_f64().is_none()) {
        return Err(TableError::NotNumeric { column: sort.by.clone() });
    }
    rows.sort_by(|a, b| {
        let (x, y) = (a[idx].as_f64().unwrap_or(0.0), b[idx].as_f64().unwrap_or(0.0));
        let by_measure = if sort.descending { y.total_cmp(&x) } else { x.total_cmp(&y) };
        by_measure.then_with(|| a[..key_len].cmp(&b[..key_len]))
    });
    Ok(SummaryTable::new(columns, key_len, rows))
}

/// Append `output` holding each row's percentage of the column total.
///
/// A zero total gives every row a share of 0.
pub fn shares(summary: &SummaryTable, measure: &str, output: &str) -> TableResult<SummaryTable> {
    let idx = summary.column_index(measure)?;
    let values: Vec<f64> = summary
        .rows()
        .iter()
        .map(|r| r[idx].as_f64().ok_or_else(|| TableError::NotNumeric { column: measure.to_string() }))
        .collect::<TableResult<_>>()?;
    let total: f64 = values.iter().sum();

    let mut columns = summary.columns().to_vec();
    columns.push(output.to_string());
    let rows = summary
        .rows()
        .iter()
        .zip(values)
        .map(|(row, v)| {
            let share = if total == 0.0 { 0.0 } else { v * 100.0 / total };
            let mut row = row.clone();
            row.push(Value::Num(share));
            row
        })
        .collect();
    Ok(SummaryTable::new(columns, summary.key_len(), rows))
}

/// Append `output = numerator / denominator * scale` to every row.
///
/// Rows with a zero denominator are removed first; they never receive a
/// synthetic ratio.
pub fn ratio_column<T>(
    table: &T,
    numerator: &str,
    denominator: &str,
    output: &str,
    scale: f64,
) -> TableResult<SummaryTable>
where
    T: Tabular + ?Sized,
{
    let num_idx = table.column_index(numerator)?;
    let den_idx = table.column_index(denominator)?;
    let mut rows = Vec::with_capacity(table.len());
    let mut dropped = 0usize;
    for row in table.rows() {
        let num = row[num_idx]
            .as_f64()
            .ok_or_else(|| TableError::NotNumeric { column: numerator.to_string() })?;
        let den = row[den_idx]
            .as_f64()
            .ok_or_else(|| TableError::NotNumeric { column: denominator.to_string() })?;
        if den == 0.0 {
            dropped += 1;
            continue;
        }
        let mut out = row.clone();
        out.push(Value::Num(num / den * scale));
        rows.push(out);
    }
    if dropped > 0 {
        log::debug!("ratio {}/{}: skipped {} rows with zero {}", numerator, denominator, dropped, denominator);
    }

    let mut columns = table.columns().to_vec();
    columns.push(output.to_string());
    Ok(SummaryTable::new(columns, table.key_len(), rows))
}

/// Column total, for conservation checks and headline figures.
pub fn column_total<T>(table: &T, column: &str) -> TableResult<f64>
where
    T: Tabular + ?Sized,
{
    let idx = table.column_index(column)?;
    table.rows().iter().try_fold(0.0, |acc, r| {
        r[idx]
            .as_f64()
            .map(|v| acc + v)
            .ok_or_else(|| TableError::NotNumeric { column: column.to_string() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TableKind;
    use crate::table::FactTable;

    fn agg_rows() -> FactTable {
        let row = |state: &str, q: i64, kind: &str, count: i64, amount: f64| -> Row {
            vec![state.into(), Value::Int(2023), Value::Int(q), kind.into(), Value::Int(count), Value::Num(amount)]
        };
        FactTable::from_rows(
            TableKind::AggregatedTransaction,
            vec![
                row("Kerala", 1, "Merchant payments", 10, 100.0),
                row("Goa", 1, "Merchant payments", 4, 40.0),
                row("Kerala", 1, "Recharge & bill payments", 6, 30.0),
                row("Goa", 2, "Merchant payments", 2, 80.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn groups_in_first_seen_order() {
        let s = aggregate(
            &agg_rows(),
            &["States"],
            &[
                MeasureSpec::sum("Total_Count", "Transaction_count"),
                MeasureSpec::sum("Total_Amount", "Transaction_amount"),
                MeasureSpec::mean("Avg_Amount", "Transaction_amount"),
                MeasureSpec::count("Rows", "Transaction_type"),
            ],
        )
        .unwrap();
        assert_eq!(&s.columns()[..s.key_len()], &["States".to_string()]);
        assert_eq!(
            s.rows()[0],
            vec!["Kerala".into(), Value::Int(16), Value::Num(130.0), Value::Num(65.0), Value::Int(2)]
        );
        assert_eq!(
            s.rows()[1],
            vec!["Goa".into(), Value::Int(6), Value::Num(120.0), Value::Num(60.0), Value::Int(2)]
        );
    }

    #[test]
    fn sorted_descending_with_key_tiebreak() {
        let s = aggregate_sorted(
            &agg_rows(),
            &["Quarter", "States"],
            &[MeasureSpec::sum("Total_Amount", "Transaction_amount")],
            &SortSpec::desc("Total_Amount"),
        )
        .unwrap();
        let keys: Vec<String> = s.rows().iter().map(|r| format!("{}-{}", r[0], r[1])).collect();
        assert_eq!(keys, vec!["1-Kerala", "2-Goa", "1-Goa"]);

        let tied = SummaryTable::new(
            vec!["k".into(), "v".into()],
            1,
            vec![vec!["b".into(), Value::Int(1)], vec!["a".into(), Value::Int(1)]],
        );
        let sorted = sort_summary(tied, &SortSpec::asc("v")).unwrap();
        assert_eq!(sorted.rows()[0][0], Value::from("a"));
    }

    #[test]
    fn unknown_and_text_columns_are_errors() {
        let t = agg_rows();
        let err = aggregate(&t, &["Region"], &[]).unwrap_err();
        assert!(matches!(err, TableError::ColumnNotFound { .. }));
        let err = aggregate(&t, &["States"], &[MeasureSpec::sum("x", "Transaction_type")]).unwrap_err();
        assert_eq!(err, TableError::NotNumeric { column: "Transaction_type".into() });
    }

    #[test]
    fn shares_sum_to_hundred_and_zero_total_gives_zero() {
        let s = aggregate(&agg_rows(), &["Transaction_type"], &[MeasureSpec::sum("Amount", "Transaction_amount")]).unwrap();
        let with_share = shares(&s, "Amount", "Share").unwrap();
        let total: f64 = with_share.rows().iter().map(|r| r[2].as_f64().unwrap()).sum();
        assert!((total - 100.0).abs() < 1e-9);
        assert_eq!(with_share.rows()[1][2], Value::Num(12.0));

        let zero = SummaryTable::new(vec!["k".into(), "v".into()], 1, vec![vec!["a".into(), Value::Int(0)]]);
        assert_eq!(shares(&zero, "v", "pct").unwrap().rows()[0][2], Value::Num(0.0));
    }

    #[test]
    fn ratio_drops_zero_denominators() {
        let t = FactTable::from_rows(
            TableKind::TopTransaction,
            vec![
                vec!["Goa".into(), Value::Int(2023), Value::Int(1), "403001".into(), Value::Int(0), Value::Num(0.0)],
                vec!["Goa".into(), Value::Int(2023), Value::Int(1), "403002".into(), Value::Int(4), Value::Num(10.0)],
            ],
        )
        .unwrap();
        let r = ratio_column(&t, "Transaction_amount", "Transaction_count", "Avg", 1.0).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r.rows()[0][6], Value::Num(2.5));
        assert_eq!(r.key_len(), 4);
        assert_eq!(r.columns().last().map(String::as_str), Some("Avg"));
    }

    #[test]
    fn column_total_sums_everything() {
        assert_eq!(column_total(&agg_rows(), "Transaction_amount").unwrap(), 250.0);
    }
}
