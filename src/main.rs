// Entry point and console menu.
//
// - Option [1] loads the nine CSV exports from the data directory and prints
//   load diagnostics.
// - Option [2] generates every report for a period and a state, exports them,
//   and previews each one as a markdown table.
// After generating reports the user can go back to the menu or exit. Closing
// stdin exits as well.
use anyhow::{Context, Result};
use chrono::Utc;
use pulse_report::cache::QueryCache;
use pulse_report::config::NormalizeConfig;
use pulse_report::loader::{load_dataset, Dataset};
use pulse_report::output;
use pulse_report::reports;
use pulse_report::types::PeriodKey;
use pulse_report::util;
use pulse_report::schema::{APP_OPENS, TRANSACTION_COUNT};
use pulse_report::TableKind;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const CONFIG_ENV: &str = "PULSE_NORMALIZE_CONFIG";

/// Owns the loaded dataset snapshots. Reloading inserts a new snapshot
/// instead of mutating the one reports may be reading.
struct App {
    data_dir: PathBuf,
    out_dir: PathBuf,
    config: NormalizeConfig,
    datasets: QueryCache<PathBuf, Dataset>,
    loaded: bool,
}

/// Print `label` and read one trimmed line from `input`. `None` at end of
/// input.
fn prompt_from<R: BufRead>(input: &mut R, label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            log::error!("reading input: {}", e);
            None
        }
    }
}

fn prompt(label: &str) -> Option<String> {
    prompt_from(&mut io::stdin().lock(), label)
}

fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N` or the
/// input ended.
fn ask_back_to_menu<R: BufRead>(input: &mut R) -> bool {
    loop {
        let Some(answer) = prompt_from(input, "Back to Report Selection (Y/N): ") else {
            return false;
        };
        match answer.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn prompt_back_to_menu() -> bool {
    ask_back_to_menu(&mut io::stdin().lock())
}

/// Parse `2023 Q1`, `2023-1` or `2023 1`.
fn parse_period(s: &str) -> Option<PeriodKey> {
    let cleaned = s.to_uppercase().replace(['Q', '-', '/'], " ");
    let mut parts = cleaned.split_whitespace();
    let year = util::parse_i64_safe(parts.next()).and_then(|y| i32::try_from(y).ok())?;
    let quarter = util::parse_i64_safe(parts.next()).and_then(|q| u8::try_from(q).ok())?;
    (1..=4).contains(&quarter).then(|| PeriodKey::new(year, quarter))
}

impl App {
    fn handle_load(&mut self) -> Arc<Dataset> {
        self.datasets.invalidate(&self.data_dir);
        let (data, report) = load_dataset(&self.data_dir, &self.config);
        println!(
            "Processing dataset... ({} rows read, {} of 9 tables loaded)",
            util::format_int(report.total_rows as i64),
            report.tables_loaded
        );
        for (kind, reason) in &report.substituted {
            println!("Note: {} replaced by an empty table: {}", kind, reason);
        }
        for w in &report.warnings {
            println!("Warning: {}", w);
        }
        println!();
        println!("{}\n", output::render_rows(&data.overview(), TableKind::ALL.len()));
        self.loaded = true;
        self.datasets.insert(self.data_dir.clone(), data, Utc::now())
    }

    /// The cached snapshot; an expired one is reloaded transparently.
    fn dataset(&mut self) -> Option<Arc<Dataset>> {
        let now = Utc::now();
        if self.datasets.evict_expired(now) > 0 {
            log::info!(
                "dataset snapshot older than {} minutes dropped, reloading {}",
                self.datasets.ttl().num_minutes(),
                self.data_dir.display()
            );
        }
        match self.datasets.get(&self.data_dir, now) {
            Some(d) => Some(d),
            None if self.loaded => Some(self.handle_load()),
            None => None,
        }
    }

    fn handle_generate_reports(&mut self) -> Result<()> {
        let data = match self.dataset() {
            Some(d) => d,
            None => {
                println!("Error: No data loaded. Please load the data first (option 1).\n");
                return Ok(());
            }
        };
        let Some(latest) = reports::default_period(&data) else {
            println!("Error: The transaction table is empty; nothing to report.\n");
            return Ok(());
        };

        let entered = prompt(&format!("Period (e.g. 2023 Q1, blank for {}): ", latest)).unwrap_or_default();
        let period = if entered.is_empty() {
            latest
        } else {
            match parse_period(&entered) {
                Some(p) => p,
                None => {
                    println!("Invalid period '{}'. Using {}.", entered, latest);
                    latest
                }
            }
        };
        let default_state = reports::top_state(&data, period)?.unwrap_or_default();
        let entered =
            prompt(&format!("State for state-level reports (blank for {}): ", default_state)).unwrap_or_default();
        let state = if entered.is_empty() { default_state } else { entered };

        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("creating {}", self.out_dir.display()))?;
        println!("\nGenerating reports for {}...", period);
        println!("Outputs saved to {}\n", self.out_dir.display());
        let note_period = period.to_string();
        let note_state = format!("{}, {}", state, period);

        let r1 = reports::state_yoy(&data, period)?;
        self.export("report1_state_yoy.csv", &r1);
        output::preview_table(1, "Top States: Current vs. Previous Year", Some(&note_period), &r1, 5);

        let r2 = reports::market_share(&data, period)?;
        self.export("report2_market_share.csv", &r2);
        output::preview_table(2, "Market Share of Transaction Types", None, &r2, 10);

        let r3 = reports::average_value(&data, period, TableKind::AggregatedTransaction)?;
        self.export("report3_average_value.csv", &r3);
        output::preview_table(3, "Average Transaction Value by Type", None, &r3, 10);

        let r4 = reports::insurance_trend(&data)?;
        self.export("report4_insurance_trend.csv", &r4);
        output::preview_table(4, "Insurance Policies: Year-over-Year by Quarter", None, &r4, 8);

        let r5 = reports::top_pincodes(&data, TableKind::TopTransaction, &state, period)?;
        self.export("report5_top_pincodes.csv", &r5);
        output::preview_table(5, "Top Pincodes by Transaction Amount", Some(&note_state), &r5, 10);

        let r5b = reports::top_pincodes_by_average(&data, TableKind::TopTransaction, &state, period)?;
        self.export("report5b_top_pincodes_by_average.csv", &r5b);
        output::preview_table(5, "Top Pincodes by Average Transaction Value", Some(&note_state), &r5b, 10);

        let r6 = reports::app_open_rate(&data, &state, period.year)?;
        self.export("report6_app_open_rate.csv", &r6);
        let note6 = format!("{}, {}", state, period.year);
        output::preview_table(6, "Top Districts by App Open Rate", Some(&note6), &r6, 10);

        let r7 = reports::district_qoq(&data, &state, period)?;
        self.export("report7_district_qoq.csv", &r7);
        output::preview_table(7, "Top Districts by Amount with QoQ Growth", Some(&note_state), &r7, 5);

        let r8 = reports::new_users(&data, &state, period)?;
        self.export("report8_new_users.csv", &r8);
        output::preview_table(8, "Top Districts by New Registered Users (QoQ)", Some(&note_state), &r8, 5);

        let r9 = reports::state_summary(&data, period, TableKind::AggregatedTransaction)?;
        self.export("report9_state_transactions.csv", &r9);
        output::preview_table(9, "State-wise Transaction Summary", Some(&note_period), &r9, 10);

        let r10 = reports::state_summary(&data, period, TableKind::AggregatedInsurance)?;
        self.export("report10_state_insurance.csv", &r10);
        output::preview_table(10, "State-wise Insurance Summary", Some(&note_period), &r10, 10);

        let r11 = reports::average_value(&data, period, TableKind::AggregatedInsurance)?;
        self.export("report11_average_premium.csv", &r11);
        output::preview_table(11, "Average Premium Value by Insurance Type", Some(&note_period), &r11, 10);

        let r12 = reports::brand_share(&data, period)?;
        self.export("report12_brand_share.csv", &r12);
        output::preview_table(12, "Registered Users by Device Brand", Some(&note_period), &r12, 10);

        let r13 = reports::top_user_pincodes(&data, &state, period)?;
        self.export("report13_top_user_pincodes.csv", &r13);
        output::preview_table(13, "Top Pincodes by Registered Users", Some(&note_state), &r13, 10);

        let r14 = reports::top_districts(&data, TableKind::MapUser, APP_OPENS, &state, period)?;
        self.export("report14_top_districts_app_opens.csv", &r14);
        output::preview_table(14, "Top Districts by App Opens", Some(&note_state), &r14, 10);

        let r15 = reports::top_pincodes(&data, TableKind::TopInsurance, &state, period)?;
        self.export("report15_top_insurance_pincodes.csv", &r15);
        output::preview_table(15, "Top Pincodes by Insurance Amount", Some(&note_state), &r15, 10);

        let r15b = reports::top_pincodes_by_count(&data, TableKind::TopInsurance, &state, period)?;
        self.export("report15b_top_insurance_pincodes_by_count.csv", &r15b);
        output::preview_table(15, "Top Pincodes by Insurance Policies", Some(&note_state), &r15b, 10);

        let r16 = reports::top_districts(&data, TableKind::MapInsurance, TRANSACTION_COUNT, &state, period)?;
        self.export("report16_top_districts_insurance.csv", &r16);
        output::preview_table(16, "Top Districts by Insurance Policies", Some(&note_state), &r16, 10);

        let r17 = reports::top_districts(&data, TableKind::MapTransaction, TRANSACTION_COUNT, &state, period)?;
        self.export("report17_top_districts_transactions.csv", &r17);
        output::preview_table(17, "Top Districts by Transaction Count", Some(&note_state), &r17, 10);

        let summary = reports::generate_summary(&data, period)?;
        if summary.states_with_prior_year == 0 {
            println!("Info: no state has data a year before {}; growth figures are unavailable.\n", period);
        }
        if let Err(e) = output::write_json(&self.out_dir.join("summary.json"), &summary) {
            log::error!("{}", e);
        }
        println!("Summary Stats (summary.json):");
        println!(
            "{{\"total_transaction_amount\": {}, \"total_transaction_count\": {}, \"states\": {}}}\n",
            util::format_number(summary.total_transaction_amount, 2),
            util::format_int(summary.total_transaction_count),
            summary.states
        );
        Ok(())
    }

    fn export<T: serde::Serialize>(&self, file: &str, rows: &[T]) {
        if let Err(e) = output::write_csv(&self.out_dir.join(file), rows) {
            log::error!("{}", e);
        }
    }
}

fn load_config() -> Result<NormalizeConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => NormalizeConfig::from_json_file(Path::new(&path))
            .with_context(|| format!("loading {} from {}", CONFIG_ENV, path.to_string_lossy())),
        None => Ok(NormalizeConfig::default()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let data_dir = PathBuf::from(args.next().unwrap_or_else(|| "data".to_string()));
    let out_dir = PathBuf::from(args.next().unwrap_or_else(|| "reports".to_string()));
    let mut app = App {
        data_dir,
        out_dir,
        config: load_config()?,
        datasets: QueryCache::default(),
        loaded: false,
    };

    loop {
        println!("PhonePe Pulse Reports ({})", app.data_dir.display());
        println!("[1] Load the data");
        println!("[2] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("\nExiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => {
                app.handle_load();
            }
            "2" => {
                println!();
                if let Err(e) = app.handle_generate_reports() {
                    eprintln!("Report generation failed: {:#}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1 or 2.\n");
            }
        }
    }
    Ok(())
}
