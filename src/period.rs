// Period-over-period comparisons.
//
// Every comparison first sums the measure per (group key, year, quarter) and
// then lines each period up against its reference. A missing reference counts
// as 0 and leaves the growth percentage undefined.
use std::collections::HashMap;

use crate::aggregate::{aggregate, MeasureSpec};
use crate::error::{TableError, TableResult};
use crate::schema::{QUARTER, YEARS};
use crate::table::{period_indices, period_of, Tabular};
use crate::types::{ComparisonResult, PeriodKey, Value};

const VALUE: &str = "__value";

/// `(current - reference) / reference * 100`, or `None` when the reference is
/// zero or the quotient is not finite.
pub fn growth_pct(current: f64, reference: f64) -> Option<f64> {
    if reference == 0.0 {
        return None;
    }
    let g = (current - reference) / reference * 100.0;
    g.is_finite().then_some(g)
}

fn compare(
    key: Vec<Value>,
    period: PeriodKey,
    reference_period: Option<PeriodKey>,
    current: f64,
    reference: f64,
) -> ComparisonResult {
    ComparisonResult {
        key,
        period,
        reference_period,
        current,
        reference,
        delta: current - reference,
        growth_pct: growth_pct(current, reference),
    }
}

/// Per-key time series, keys in first-seen order, each series unsorted.
type Series = Vec<(Vec<Value>, Vec<(PeriodKey, f64)>)>;

fn period_series<T>(table: &T, group_by: &[&str], measure: &str) -> TableResult<Series>
where
    T: Tabular + ?Sized,
{
    period_indices(table)?;
    let mut keys: Vec<&str> = group_by.to_vec();
    keys.extend([YEARS, QUARTER]);
    let summary = aggregate(table, &keys, &[MeasureSpec::sum(VALUE, measure)])?;

    let g = group_by.len();
    let mut slots: HashMap<Vec<Value>, usize> = HashMap::new();
    let mut series: Series = Vec::new();
    for row in summary.rows() {
        let period = period_of(row, g, g + 1).ok_or_else(|| TableError::MissingPeriod {
            column: format!("{}/{} (not integer)", YEARS, QUARTER),
        })?;
        let value = row[g + 2].as_f64().unwrap_or(0.0);
        let key = row[..g].to_vec();
        let slot = *slots.entry(key.clone()).or_insert_with(|| {
            series.push((key, Vec::new()));
            series.len() - 1
        });
        series[slot].1.push((period, value));
    }
    Ok(series)
}

/// Year-over-year: each group present at `(year, quarter)` against the same
/// quarter of the previous year.
///
/// Groups absent from the current period are not reported. On the earliest
/// year of a table every reference is 0; callers detect thin history from
/// that rather than from an error.
pub fn yoy<T>(table: &T, group_by: &[&str], measure: &str, year: i32, quarter: u8) -> TableResult<Vec<ComparisonResult>>
where
    T: Tabular + ?Sized,
{
    let current = PeriodKey::new(year, quarter);
    let reference = current.year_before();
    let out: Vec<ComparisonResult> = period_series(table, group_by, measure)?
        .into_iter()
        .filter_map(|(key, points)| {
            let cur = points.iter().find(|(p, _)| *p == current)?.1;
            let prev = points
                .iter()
                .find(|(p, _)| Some(*p) == reference)
                .map_or(0.0, |(_, v)| *v);
            Some(compare(key, current, reference, cur, prev))
        })
        .collect();
    log::debug!(
        "yoy {} vs {:?} on [{}]: {} groups, {} with history",
        current,
        reference,
        group_by.join(", "),
        out.len(),
        out.iter().filter(|c| c.reference != 0.0).count()
    );
    Ok(out)
}

/// Year-over-year for every (group, period) in the table, each against the
/// same key's value exactly one year earlier.
///
/// A period with no representable prior year has no reference period and a
/// reference of 0.
pub fn yoy_series<T>(table: &T, group_by: &[&str], measure: &str) -> TableResult<Vec<ComparisonResult>>
where
    T: Tabular + ?Sized,
{
    let mut out = Vec::new();
    for (key, mut points) in period_series(table, group_by, measure)? {
        points.sort_by_key(|(p, _)| *p);
        let lookup: HashMap<PeriodKey, f64> = points.iter().copied().collect();
        for (period, value) in &points {
            let reference = period.year_before();
            let prev = reference.and_then(|r| lookup.get(&r).copied()).unwrap_or(0.0);
            out.push(compare(key.clone(), *period, reference, *value, prev));
        }
    }
    Ok(out)
}

/// Quarter-over-quarter: every (group, period) against the group's own
/// previous period.
///
/// The predecessor is the next-smaller period the group actually has data
/// for, so gaps in a group's history are skipped rather than filled. The
/// first period of each group has no predecessor and a reference of 0.
/// Output is grouped by key (first-seen order), periods ascending.
pub fn qoq<T>(table: &T, group_by: &[&str], measure: &str) -> TableResult<Vec<ComparisonResult>>
where
    T: Tabular + ?Sized,
{
    let mut out = Vec::new();
    for (key, mut points) in period_series(table, group_by, measure)? {
        points.sort_by_key(|(p, _)| *p);
        let mut previous: Option<(PeriodKey, f64)> = None;
        for (period, value) in points {
            let (ref_period, ref_value) = match previous {
                Some((p, v)) => (Some(p), v),
                None => (None, 0.0),
            };
            out.push(compare(key.clone(), period, ref_period, value, ref_value));
            previous = Some((period, value));
        }
    }
    log::debug!("qoq on [{}]: {} comparisons", group_by.join(", "), out.len());
    Ok(out)
}

/// Only the comparisons for one period, e.g. the latest quarter of a `qoq` run.
pub fn at_period(results: &[ComparisonResult], period: PeriodKey) -> Vec<ComparisonResult> {
    results.iter().filter(|c| c.period == period).cloned().collect()
}
