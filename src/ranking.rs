// Top-N selection.
//
// The sort is stable, so rows that tie keep their source order and the cut
// at `n` is exact even when several rows share the boundary value.
use crate::aggregate::ratio_column;
use crate::error::{TableError, TableResult};
use crate::table::Tabular;
use crate::types::Row;

/// At most `n` items ordered by `measure`. `n <= 0` yields nothing.
pub fn top_n_by<I, F>(mut items: Vec<I>, n: i64, descending: bool, measure: F) -> Vec<I>
where
    F: Fn(&I) -> f64,
{
    if n <= 0 {
        return Vec::new();
    }
    items.sort_by(|a, b| {
        let (x, y) = (measure(a), measure(b));
        if descending { y.total_cmp(&x) } else { x.total_cmp(&y) }
    });
    items.truncate(usize::try_from(n).unwrap_or(usize::MAX));
    items
}

/// At most `n` rows ordered by `by_measure`.
pub fn top_n<T>(table: &T, by_measure: &str, n: i64, descending: bool) -> TableResult<Vec<Row>>
where
    T: Tabular + ?Sized,
{
    let idx = table.column_index(by_measure)?;
    let keyed: Vec<(f64, &Row)> = table
        .rows()
        .iter()
        .map(|r| {
            r[idx]
                .as_f64()
                .map(|v| (v, r))
                .ok_or_else(|| TableError::NotNumeric { column: by_measure.to_string() })
        })
        .collect::<TableResult<_>>()?;
    Ok(top_n_by(keyed, n, descending, |(v, _)| *v)
        .into_iter()
        .map(|(_, r)| r.clone())
        .collect())
}

/// Rank by `numerator / denominator`, appended to each row as the last
/// column. Rows with a zero denominator never take part.
pub fn top_n_by_ratio<T>(
    table: &T,
    numerator: &str,
    denominator: &str,
    n: i64,
    descending: bool,
) -> TableResult<Vec<Row>>
where
    T: Tabular + ?Sized,
{
    const RATIO: &str = "__ratio";
    let derived = ratio_column(table, numerator, denominator, RATIO, 1.0)?;
    top_n(&derived, RATIO, n, descending)
}
