use pulse_report::{
    aggregate, qoq, top_n, top_n_by_ratio, yoy, FactTable, MeasureSpec, PeriodKey, Row, TableKind, Tabular, Value,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn agg_row(state: &str, year: i64, quarter: i64, kind: &str, count: i64, amount: f64) -> Row {
    vec![
        state.into(),
        Value::Int(year),
        Value::Int(quarter),
        kind.into(),
        Value::Int(count),
        Value::Num(amount),
    ]
}

fn transactions() -> FactTable {
    FactTable::from_rows(
        TableKind::AggregatedTransaction,
        vec![
            agg_row("Goa", 2022, 1, "Merchant payments", 5, 60.0),
            agg_row("Goa", 2022, 1, "Peer-to-peer payments", 3, 40.0),
            agg_row("Kerala", 2022, 1, "Merchant payments", 8, 200.0),
            agg_row("Goa", 2023, 1, "Merchant payments", 9, 100.0),
            agg_row("Goa", 2023, 1, "Peer-to-peer payments", 2, 50.0),
            agg_row("Kerala", 2023, 1, "Merchant payments", 4, 150.0),
            agg_row("Punjab", 2023, 1, "Merchant payments", 1, 70.0),
            agg_row("Goa", 2023, 2, "Merchant payments", 6, 80.0),
        ],
    )
    .unwrap()
}

fn amount_sum() -> Vec<MeasureSpec> {
    vec![MeasureSpec::sum("Transaction_amount", "Transaction_amount")]
}

// ── Aggregation ──────────────────────────────────────────────────────────────

/// Re-aggregating an already reduced summary on the same key changes nothing.
#[test]
fn aggregation_is_idempotent_on_its_own_key() {
    let t = transactions();
    let once = aggregate(&t, &["States"], &amount_sum()).unwrap();
    let twice = aggregate(&once, &["States"], &amount_sum()).unwrap();
    assert_eq!(once, twice);
}

/// Grouping redistributes a measure; it never creates or loses any of it.
#[test]
fn aggregation_conserves_totals() {
    let t = transactions();
    let raw_total: f64 = t.rows().iter().map(|r| r[5].as_f64().unwrap()).sum();
    let raw_count: i64 = t.rows().iter().map(|r| r[4].as_i64().unwrap()).sum();
    for keys in [vec!["States"], vec!["Years", "Quarter"], vec!["Transaction_type", "States"]] {
        let s = aggregate(
            &t,
            &keys,
            &[
                MeasureSpec::sum("Amount", "Transaction_amount"),
                MeasureSpec::sum("Count", "Transaction_count"),
            ],
        )
        .unwrap();
        let amount: f64 = s.rows().iter().map(|r| r[keys.len()].as_f64().unwrap()).sum();
        let count: i64 = s.rows().iter().map(|r| r[keys.len() + 1].as_i64().unwrap()).sum();
        assert!((amount - raw_total).abs() < 1e-9, "keys {keys:?}");
        assert_eq!(count, raw_count, "keys {keys:?}");
    }
}

#[test]
fn aggregating_an_empty_table_is_empty_not_an_error() {
    let empty = FactTable::empty(TableKind::MapTransaction);
    let s = aggregate(&empty, &["Districts"], &[MeasureSpec::sum("Amount", "Transaction_amount")]).unwrap();
    assert!(s.is_empty());
    assert_eq!(s.columns(), &["Districts".to_string(), "Amount".to_string()]);
}

// ── Period comparison ────────────────────────────────────────────────────────

/// Goa 100 -> 150 between 2022 Q1 and 2023 Q1 is +50 and +50%.
#[test]
fn yoy_concrete_scenario() {
    let t = FactTable::from_rows(
        TableKind::AggregatedTransaction,
        vec![
            agg_row("Goa", 2022, 1, "Merchant payments", 1, 100.0),
            agg_row("Goa", 2023, 1, "Merchant payments", 1, 150.0),
        ],
    )
    .unwrap();
    let out = yoy(&t, &["States"], "Transaction_amount", 2023, 1).unwrap();
    assert_eq!(out.len(), 1);
    let goa = &out[0];
    assert_eq!(goa.key, vec![Value::from("Goa")]);
    assert_eq!(goa.current, 150.0);
    assert_eq!(goa.reference, 100.0);
    assert_eq!(goa.delta, 50.0);
    assert_eq!(goa.growth_pct, Some(50.0));
}

/// A state new in the current year is reported with reference 0 and no growth.
#[test]
fn yoy_reports_groups_without_history() {
    let out = yoy(&transactions(), &["States"], "Transaction_amount", 2023, 1).unwrap();
    let states: Vec<String> = out.iter().map(|c| c.key[0].to_string()).collect();
    assert_eq!(states, vec!["Goa", "Kerala", "Punjab"]);

    let punjab = &out[2];
    assert_eq!(punjab.reference, 0.0);
    assert_eq!(punjab.delta, 70.0);
    assert_eq!(punjab.growth_pct, None);

    let kerala = &out[1];
    assert_eq!(kerala.growth_pct, Some(-25.0));
}

/// On the earliest year every reference is 0 and no growth value is produced.
#[test]
fn yoy_on_earliest_year_has_zero_references() {
    let out = yoy(&transactions(), &["States"], "Transaction_amount", 2022, 1).unwrap();
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|c| c.reference == 0.0 && c.growth_pct.is_none()));
    assert!(out.iter().all(|c| c.delta.is_finite() && c.current.is_finite()));
}

#[test]
fn yoy_for_absent_period_is_empty() {
    let out = yoy(&transactions(), &["States"], "Transaction_amount", 2030, 4).unwrap();
    assert!(out.is_empty());
}

/// Q2 and Q3 are missing for district X: Q4 compares against Q1.
#[test]
fn qoq_skips_gaps_in_a_groups_history() {
    let row = |q: i64, amount: f64| -> Row {
        vec!["Goa".into(), Value::Int(2021), Value::Int(q), "X".into(), Value::Int(1), Value::Num(amount)]
    };
    let t = FactTable::from_rows(TableKind::MapTransaction, vec![row(4, 80.0), row(1, 20.0)]).unwrap();
    let out = qoq(&t, &["Districts"], "Transaction_amount").unwrap();
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].period, PeriodKey::new(2021, 1));
    assert_eq!(out[0].reference, 0.0);
    assert_eq!(out[0].growth_pct, None);
    assert_eq!(out[1].period, PeriodKey::new(2021, 4));
    assert_eq!(out[1].reference_period, Some(PeriodKey::new(2021, 1)));
    assert_eq!(out[1].reference, 20.0);
    assert_eq!(out[1].growth_pct, Some(300.0));
}

/// The lag runs within each group: another group's rows never act as the
/// previous period.
#[test]
fn qoq_lag_does_not_cross_groups() {
    let out = qoq(&transactions(), &["States"], "Transaction_amount").unwrap();
    let kerala: Vec<_> = out.iter().filter(|c| c.key[0] == Value::from("Kerala")).collect();
    assert_eq!(kerala.len(), 2);
    assert_eq!(kerala[1].period, PeriodKey::new(2023, 1));
    assert_eq!(kerala[1].reference, 200.0);

    let punjab: Vec<_> = out.iter().filter(|c| c.key[0] == Value::from("Punjab")).collect();
    assert_eq!(punjab.len(), 1);
    assert_eq!(punjab[0].reference_period, None);

    let goa_q2 = out
        .iter()
        .find(|c| c.key[0] == Value::from("Goa") && c.period == PeriodKey::new(2023, 2))
        .unwrap();
    assert_eq!(goa_q2.reference, 150.0);
}

// ── Ranking ──────────────────────────────────────────────────────────────────

/// Values [10, 10, 9, 8] with n = 2 give exactly the two 10s, in source order.
#[test]
fn top_n_truncates_ties_deterministically() {
    let rows = [10.0, 10.0, 9.0, 8.0]
        .iter()
        .enumerate()
        .map(|(i, v)| -> Row {
            vec!["Goa".into(), Value::Int(2023), Value::Int(1), format!("P{i}").into(), Value::Int(1), Value::Num(*v)]
        })
        .collect();
    let t = FactTable::from_rows(TableKind::TopTransaction, rows).unwrap();
    let top = top_n(&t, "Transaction_amount", 2, true).unwrap();
    let ids: Vec<String> = top.iter().map(|r| r[3].to_string()).collect();
    assert_eq!(ids, vec!["P0", "P1"]);

    assert_eq!(top_n(&t, "Transaction_amount", 100, true).unwrap().len(), 4);
    assert!(top_n(&t, "Transaction_amount", 0, true).unwrap().is_empty());
}

/// A zero-count row never shows up in an average-based ranking.
#[test]
fn average_ranking_excludes_zero_denominators() {
    let t = FactTable::from_rows(
        TableKind::AggregatedTransaction,
        vec![
            agg_row("Goa", 2023, 1, "Others", 0, 0.0),
            agg_row("Goa", 2023, 1, "Merchant payments", 10, 50.0),
        ],
    )
    .unwrap();
    let ascending = top_n_by_ratio(&t, "Transaction_amount", "Transaction_count", 10, false).unwrap();
    assert_eq!(ascending.len(), 1);
    assert_eq!(ascending[0][3], Value::from("Merchant payments"));
    assert_eq!(ascending[0][6], Value::Num(5.0));
}
