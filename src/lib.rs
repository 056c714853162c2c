//! Analytical reporting over payments/usage fact tables.
//!
//! Nine pre-aggregated tables (transactions, users, insurance at category,
//! district and pincode granularity) are loaded into validated in-memory
//! tables and queried through three engines:
//!
//! - [`aggregate()`]: group-by `sum` / `mean` / `count`.
//! - [`yoy()`] and [`qoq()`]: period-over-period comparisons, lag computed
//!   per group over the periods it actually has.
//! - [`top_n()`]: stable top-N ranking.
//!
//! Every call is a pure function of its inputs and returns a fresh value.
pub mod aggregate;
pub mod cache;
pub mod config;
pub mod error;
pub mod loader;
pub mod output;
pub mod period;
pub mod ranking;
pub mod reports;
pub mod schema;
pub mod table;
pub mod types;
pub mod util;

pub use aggregate::{aggregate, MeasureSpec, Reduction, SortSpec};
pub use cache::QueryCache;
pub use config::{NormalizeConfig, StateRule};
pub use error::{LoadWarning, TableError, TableResult};
pub use period::{qoq, yoy, yoy_series};
pub use ranking::{top_n, top_n_by_ratio};
pub use schema::TableKind;
pub use table::{load_table, FactTable, RawTable, Selection, SummaryTable, Tabular};
pub use types::{ComparisonResult, PeriodKey, Row, Value};
