// The fixed menu of analytical reports, built on the aggregation, period and
// ranking engines. Each report returns display rows; writing them out is the
// caller's business.
use crate::aggregate::{
    aggregate, aggregate_sorted, column_total, ratio_column, shares, sort_summary, MeasureSpec, SortSpec,
};
use crate::error::TableResult;
use crate::loader::Dataset;
use crate::period::{at_period, qoq, yoy, yoy_series};
use crate::ranking::{top_n, top_n_by, top_n_by_ratio};
use crate::schema::{
    TableKind, APP_OPENS, BRANDS, DISTRICTS, PINCODES, REGISTERED_USERS, STATES, TRANSACTION_AMOUNT,
    TRANSACTION_COUNT, TRANSACTION_TYPE,
};
use crate::table::{FactTable, Selection, SummaryTable, Tabular};
use crate::types::{
    AppOpenRateRow, AverageValueRow, BrandShareRow, ComparisonResult, DistrictGrowthRow, DistrictTotalRow,
    InsuranceTrendRow, MarketShareRow, PeriodKey, PincodeRow, Row, StateSummaryRow, StateYoyRow, SummaryStats,
    UserPincodeRow, Value,
};
use crate::util::{format_number, format_pct};

pub const TOP_STATES: i64 = 5;
pub const TOP_PINCODES: i64 = 10;
pub const TOP_DISTRICTS: i64 = 10;
pub const TOP_GROWTH_DISTRICTS: i64 = 5;

fn key_text(key: &[Value]) -> String {
    key.first().map(|v| v.to_string()).unwrap_or_default()
}

fn cell(row: &Row, idx: usize) -> f64 {
    row[idx].as_f64().unwrap_or(0.0)
}

/// The period reports default to: the latest one in the transaction table.
pub fn default_period(data: &Dataset) -> Option<PeriodKey> {
    data.get(TableKind::AggregatedTransaction).latest_period()
}

/// The state with the largest transaction amount in `period`; the district
/// reports focus on it unless the user picks another.
pub fn top_state(data: &Dataset, period: PeriodKey) -> TableResult<Option<String>> {
    let filtered = data.get(TableKind::AggregatedTransaction).select(&Selection::period(period));
    let top = top_n(
        &aggregate(&filtered, &[STATES], &[MeasureSpec::sum("Total_Amount", TRANSACTION_AMOUNT)])?,
        "Total_Amount",
        1,
        true,
    )?;
    Ok(top.first().map(|r| r[0].to_string()))
}

/// Report 1: top states by amount in `period`, with the same quarter a year
/// earlier alongside.
pub fn state_yoy(data: &Dataset, period: PeriodKey) -> TableResult<Vec<StateYoyRow>> {
    let comparisons = yoy(
        data.get(TableKind::AggregatedTransaction),
        &[STATES],
        TRANSACTION_AMOUNT,
        period.year,
        period.quarter,
    )?;
    let top = top_n_by(comparisons, TOP_STATES, true, |c| c.current);
    Ok(top
        .into_iter()
        .enumerate()
        .map(|(i, c)| StateYoyRow {
            rank: i + 1,
            state: key_text(&c.key),
            current_amount: format_number(c.current, 2),
            previous_amount: format_number(c.reference, 2),
            yoy_growth: format_pct(c.growth_pct),
        })
        .collect())
}

/// Report 2: each transaction type's share of count and amount in `period`.
pub fn market_share(data: &Dataset, period: PeriodKey) -> TableResult<Vec<MarketShareRow>> {
    let filtered = data.get(TableKind::AggregatedTransaction).select(&Selection::period(period));
    let by_type = aggregate(
        &filtered,
        &[TRANSACTION_TYPE],
        &[
            MeasureSpec::sum("Total_Count", TRANSACTION_COUNT),
            MeasureSpec::sum("Total_Amount", TRANSACTION_AMOUNT),
        ],
    )?;
    let with_shares = shares(&shares(&by_type, "Total_Count", "Count_Share")?, "Total_Amount", "Amount_Share")?;
    let sorted = sort_summary(with_shares, &SortSpec::desc("Amount_Share"))?;

    sorted
        .rows()
        .iter()
        .map(|r| -> TableResult<MarketShareRow> {
            Ok(MarketShareRow {
                transaction_type: r[0].to_string(),
                total_count: format_number(sorted.measure(r, "Total_Count")?, 0),
                total_amount: format_number(sorted.measure(r, "Total_Amount")?, 2),
                count_share: format_pct(Some(sorted.measure(r, "Count_Share")?)),
                amount_share: format_pct(Some(sorted.measure(r, "Amount_Share")?)),
            })
        })
        .collect()
}

/// Mean of the per-row average value, by type, for `AggregatedTransaction`
/// (report 3) or `AggregatedInsurance` (average premium, report 11). Rows
/// with no transactions carry no average and are left out.
pub fn average_value(data: &Dataset, period: PeriodKey, kind: TableKind) -> TableResult<Vec<AverageValueRow>> {
    let filtered = data.get(kind).select(&Selection::period(period));
    let per_row = ratio_column(&filtered, TRANSACTION_AMOUNT, TRANSACTION_COUNT, "Average_Value", 1.0)?;
    let summary = aggregate_sorted(
        &per_row,
        &[TRANSACTION_TYPE],
        &[
            MeasureSpec::mean("Avg_Value", "Average_Value"),
            MeasureSpec::sum("Total_Count", TRANSACTION_COUNT),
        ],
        &SortSpec::desc("Avg_Value"),
    )?;
    summary
        .rows()
        .iter()
        .map(|r| -> TableResult<AverageValueRow> {
            Ok(AverageValueRow {
                transaction_type: r[0].to_string(),
                avg_value: format_number(summary.measure(r, "Avg_Value")?, 2),
                total_count: format_number(summary.measure(r, "Total_Count")?, 0),
            })
        })
        .collect()
}

/// Report 4: nationwide insurance policy counts per quarter against the same
/// quarter of the previous year.
pub fn insurance_trend(data: &Dataset) -> TableResult<Vec<InsuranceTrendRow>> {
    let series = yoy_series(data.get(TableKind::AggregatedInsurance), &[], TRANSACTION_COUNT)?;
    Ok(series
        .into_iter()
        .map(|c| InsuranceTrendRow {
            year: c.period.year,
            quarter: c.period.quarter,
            total_policies: format_number(c.current, 0),
            previous_year_policies: format_number(c.reference, 0),
            yoy_growth: format_pct(c.growth_pct),
        })
        .collect())
}

fn pincode_rows(rows: Vec<Row>) -> Vec<PincodeRow> {
    // Top transaction/insurance layout: States, Years, Quarter, Pincodes, count, amount[, ratio].
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| {
            let (count, amount) = (cell(&r, 4), cell(&r, 5));
            let avg = if count > 0.0 { format_number(amount / count, 2) } else { "n/a".to_string() };
            PincodeRow {
                rank: i + 1,
                state: r[0].to_string(),
                pincode: r[3].to_string(),
                transaction_count: format_number(count, 0),
                transaction_amount: format_number(amount, 2),
                avg_value: avg,
            }
        })
        .collect()
}

fn in_state(data: &Dataset, kind: TableKind, state: &str, period: PeriodKey) -> FactTable {
    data.get(kind).select(&Selection::period(period).state(state))
}

/// Top pincodes of `state` by amount in `period`: report 5 on
/// `TopTransaction`, report 15 on `TopInsurance`.
pub fn top_pincodes(data: &Dataset, kind: TableKind, state: &str, period: PeriodKey) -> TableResult<Vec<PincodeRow>> {
    let filtered = in_state(data, kind, state, period);
    Ok(pincode_rows(top_n(&filtered, TRANSACTION_AMOUNT, TOP_PINCODES, true)?))
}

/// Top pincodes of `state` by transaction (or policy) count in `period`.
pub fn top_pincodes_by_count(
    data: &Dataset,
    kind: TableKind,
    state: &str,
    period: PeriodKey,
) -> TableResult<Vec<PincodeRow>> {
    let filtered = in_state(data, kind, state, period);
    Ok(pincode_rows(top_n(&filtered, TRANSACTION_COUNT, TOP_PINCODES, true)?))
}

/// Top pincodes of `state` by average transaction value in `period`.
pub fn top_pincodes_by_average(
    data: &Dataset,
    kind: TableKind,
    state: &str,
    period: PeriodKey,
) -> TableResult<Vec<PincodeRow>> {
    let filtered = in_state(data, kind, state, period);
    let ranked = top_n_by_ratio(&filtered, TRANSACTION_AMOUNT, TRANSACTION_COUNT, TOP_PINCODES, true)?;
    Ok(pincode_rows(ranked))
}

/// Report 13: top pincodes of `state` by registered users in `period`.
pub fn top_user_pincodes(data: &Dataset, state: &str, period: PeriodKey) -> TableResult<Vec<UserPincodeRow>> {
    let filtered = in_state(data, TableKind::TopUser, state, period);
    let users = filtered.column_index(REGISTERED_USERS)?;
    let pincode = filtered.column_index(PINCODES)?;
    Ok(top_n(&filtered, REGISTERED_USERS, TOP_PINCODES, true)?
        .into_iter()
        .enumerate()
        .map(|(i, r)| UserPincodeRow {
            rank: i + 1,
            pincode: r[pincode].to_string(),
            registered_users: format_number(cell(&r, users), 0),
        })
        .collect())
}

/// Districts of `state` ranked by the total of `measure` in `period`.
///
/// Used for app opens (report 14), insurance policies (report 16) and
/// transaction count (report 17).
pub fn top_districts(
    data: &Dataset,
    kind: TableKind,
    measure: &str,
    state: &str,
    period: PeriodKey,
) -> TableResult<Vec<DistrictTotalRow>> {
    let filtered = in_state(data, kind, state, period);
    let by_district = aggregate(&filtered, &[DISTRICTS], &[MeasureSpec::sum("Total", measure)])?;
    Ok(top_n(&by_district, "Total", TOP_DISTRICTS, true)?
        .into_iter()
        .enumerate()
        .map(|(i, r)| DistrictTotalRow {
            rank: i + 1,
            district: r[0].to_string(),
            total: format_number(cell(&r, 1), 0),
        })
        .collect())
}

/// Report 6: districts of `state` with the most app opens per registered
/// user over `year`.
pub fn app_open_rate(data: &Dataset, state: &str, year: i32) -> TableResult<Vec<AppOpenRateRow>> {
    let filtered = data.get(TableKind::MapUser).select(&Selection::default().year(year).state(state));
    let by_district = aggregate(
        &filtered,
        &[DISTRICTS],
        &[
            MeasureSpec::sum("Total_Registered_Users", REGISTERED_USERS),
            MeasureSpec::sum("Total_App_Opens", APP_OPENS),
        ],
    )?;
    let rated: SummaryTable = ratio_column(
        &by_district,
        "Total_App_Opens",
        "Total_Registered_Users",
        "App_Open_Rate",
        100.0,
    )?;
    let top = top_n(&rated, "App_Open_Rate", TOP_DISTRICTS, true)?;
    Ok(top
        .into_iter()
        .enumerate()
        .map(|(i, r)| AppOpenRateRow {
            rank: i + 1,
            district: r[0].to_string(),
            registered_users: format_number(cell(&r, 1), 0),
            app_opens: format_number(cell(&r, 2), 0),
            app_open_rate: format_pct(Some(cell(&r, 3))),
        })
        .collect())
}

fn growth_rows(top: Vec<ComparisonResult>, decimals: usize) -> Vec<DistrictGrowthRow> {
    top.into_iter()
        .enumerate()
        .map(|(i, c)| DistrictGrowthRow {
            rank: i + 1,
            district: key_text(&c.key),
            current: format_number(c.current, decimals),
            previous: format_number(c.reference, decimals),
            change: format_number(c.delta, decimals),
            qoq_growth: format_pct(c.growth_pct),
        })
        .collect()
}

/// Report 7: the largest districts of `state` in `period`, with growth over
/// each district's previous quarter on record.
pub fn district_qoq(data: &Dataset, state: &str, period: PeriodKey) -> TableResult<Vec<DistrictGrowthRow>> {
    let filtered = data.get(TableKind::MapTransaction).select(&Selection::default().state(state));
    let all = qoq(&filtered, &[DISTRICTS], TRANSACTION_AMOUNT)?;
    let top = top_n_by(at_period(&all, period), TOP_GROWTH_DISTRICTS, true, |c| c.current);
    Ok(growth_rows(top, 2))
}

/// Report 8: districts of `state` gaining the most registered users in
/// `period` relative to their previous quarter on record.
pub fn new_users(data: &Dataset, state: &str, period: PeriodKey) -> TableResult<Vec<DistrictGrowthRow>> {
    let filtered = data.get(TableKind::MapUser).select(&Selection::default().state(state));
    let all = qoq(&filtered, &[DISTRICTS], REGISTERED_USERS)?;
    let top = top_n_by(at_period(&all, period), TOP_GROWTH_DISTRICTS, true, |c| c.delta);
    Ok(growth_rows(top, 0))
}

/// Count and amount per state in `period`, largest amount first: report 9
/// on `AggregatedTransaction`, report 10 on `AggregatedInsurance`.
pub fn state_summary(data: &Dataset, period: PeriodKey, kind: TableKind) -> TableResult<Vec<StateSummaryRow>> {
    let filtered = data.get(kind).select(&Selection::period(period));
    let summary = aggregate_sorted(
        &filtered,
        &[STATES],
        &[
            MeasureSpec::sum("Total_Count", TRANSACTION_COUNT),
            MeasureSpec::sum("Total_Amount", TRANSACTION_AMOUNT),
        ],
        &SortSpec::desc("Total_Amount"),
    )?;
    summary
        .rows()
        .iter()
        .enumerate()
        .map(|(i, r)| -> TableResult<StateSummaryRow> {
            Ok(StateSummaryRow {
                rank: i + 1,
                state: r[0].to_string(),
                total_count: format_number(summary.measure(r, "Total_Count")?, 0),
                total_amount: format_number(summary.measure(r, "Total_Amount")?, 2),
            })
        })
        .collect()
}

/// Report 12: registered users per device brand across all states in
/// `period`, with each brand's share.
pub fn brand_share(data: &Dataset, period: PeriodKey) -> TableResult<Vec<BrandShareRow>> {
    let filtered = data.get(TableKind::AggregatedUser).select(&Selection::period(period));
    let by_brand = aggregate(&filtered, &[BRANDS], &[MeasureSpec::sum("Users", TRANSACTION_COUNT)])?;
    let sorted = sort_summary(shares(&by_brand, "Users", "Share")?, &SortSpec::desc("Users"))?;
    sorted
        .rows()
        .iter()
        .map(|r| -> TableResult<BrandShareRow> {
            Ok(BrandShareRow {
                brand: r[0].to_string(),
                user_count: format_number(sorted.measure(r, "Users")?, 0),
                share: format_pct(Some(sorted.measure(r, "Share")?)),
            })
        })
        .collect()
}

/// Headline figures for `period`.
pub fn generate_summary(data: &Dataset, period: PeriodKey) -> TableResult<SummaryStats> {
    let selection = Selection::period(period);
    let trans = data.get(TableKind::AggregatedTransaction).select(&selection);
    let users = data.get(TableKind::MapUser).select(&selection);
    let insurance = data.get(TableKind::AggregatedInsurance).select(&selection);

    let with_history = yoy(
        data.get(TableKind::AggregatedTransaction),
        &[STATES],
        TRANSACTION_AMOUNT,
        period.year,
        period.quarter,
    )?
    .iter()
    .filter(|c| c.reference != 0.0)
    .count();

    Ok(SummaryStats {
        period,
        tables_loaded: TableKind::ALL.len() - data.empty_tables().len(),
        empty_tables: data.empty_tables().iter().map(|k| k.table_name().to_string()).collect(),
        states: trans.states().len(),
        total_transaction_count: column_total(&trans, TRANSACTION_COUNT)? as i64,
        total_transaction_amount: column_total(&trans, TRANSACTION_AMOUNT)?,
        registered_users: column_total(&users, REGISTERED_USERS)? as i64,
        insurance_policies: column_total(&insurance, TRANSACTION_COUNT)? as i64,
        states_with_prior_year: with_history,
    })
}
