use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use sot_data::query::remarks::{classify_row, rows_for_onzs, rows_with_status, RemarkStatus};
use sot_data::query::schedule::{final_inspections, schedule_entries, upcoming};
use sot_data::{Config, DataService, StatusColumn, Table};

#[derive(Parser, Debug)]
#[command(name = "sot-data", about = "Inspect the schedule and remarks workbooks")]
struct Cli {
    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Schedule summary or upcoming visits
    Schedule {
        /// Show the next N visits from today
        #[arg(long)]
        upcoming: Option<usize>,

        /// Only final inspections
        #[arg(long, requires = "upcoming")]
        finals: bool,
    },
    /// Sync if stale, then print per-sheet counts or matching rows
    Remarks {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,

        /// ONzS identifier
        #[arg(long)]
        onzs: Option<String>,

        /// Inclusive lower date bound (YYYY-MM-DD)
        #[arg(long, requires = "onzs")]
        from: Option<NaiveDate>,

        /// Inclusive upper date bound (YYYY-MM-DD)
        #[arg(long, requires = "onzs")]
        to: Option<NaiveDate>,
    },
    /// Fetch the remote remarks workbook now
    Refresh,
    /// Write a "да"/"нет" mark into a remarks row and record it
    Mark {
        /// Remarks sheet name
        sheet: String,

        /// 1-based sheet row
        row: u32,

        #[arg(value_enum)]
        column: ColumnArg,

        #[arg(value_enum)]
        mark: MarkArg,

        /// Who made the change
        #[arg(long, default_value = "")]
        user: String,
    },
    /// Recorded marks for one remarks row
    History { sheet: String, row: u32 },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ColumnArg {
    Pb,
    PbZk,
    Ar,
    Eom,
}

impl From<ColumnArg> for StatusColumn {
    fn from(arg: ColumnArg) -> Self {
        match arg {
            ColumnArg::Pb => StatusColumn::Pb,
            ColumnArg::PbZk => StatusColumn::PbZk,
            ColumnArg::Ar => StatusColumn::Ar,
            ColumnArg::Eom => StatusColumn::Eom,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MarkArg {
    Yes,
    No,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Resolved,
    NotResolved,
    NotRequired,
    Unclassified,
}

impl From<StatusArg> for RemarkStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Resolved => RemarkStatus::Resolved,
            StatusArg::NotResolved => RemarkStatus::NotResolved,
            StatusArg::NotRequired => RemarkStatus::NotRequired,
            StatusArg::Unclassified => RemarkStatus::Unclassified,
        }
    }
}

fn main() -> ExitCode {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "bad configuration");
            return ExitCode::FAILURE;
        }
    };
    let mut service = DataService::new(config);

    let ok = match cli.command {
        Command::Schedule { upcoming: limit, finals } => show_schedule(&mut service, limit, finals, cli.json),
        Command::Remarks { status, onzs, from, to } => {
            show_remarks(&mut service, status.map(Into::into), onzs.as_deref(), from, to, cli.json)
        }
        Command::Refresh => {
            let fetched = service.force_refresh_remarks();
            let status = service.remarks_sync_status();
            print(cli.json, &status, || format!("{:?}", status));
            fetched
        }
        Command::Mark { sheet, row, column, mark, user } => {
            service.set_remark_status(&sheet, row, column.into(), matches!(mark, MarkArg::Yes), &user)
        }
        Command::History { sheet, row } => {
            let records = service.remark_status_history(&sheet, row);
            print(cli.json, &records, || {
                records
                    .iter()
                    .map(|r| format!("{}{}  {} -> {}  {}", r.column, r.row, r.previous, r.value, r.updated_by))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            true
        }
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => error!(error = %e, "failed to encode output"),
        }
    } else {
        println!("{}", text());
    }
}

fn show_schedule(service: &mut DataService, limit: Option<usize>, finals: bool, json: bool) -> bool {
    let Some(table) = service.get_schedule_table() else {
        error!(path = %service.config().schedule_path.display(), "schedule not available");
        return false;
    };

    let Some(limit) = limit else {
        print(json, &table.columns, || {
            format!("{} rows\ncolumns: {}", table.len(), table.columns.join(" | "))
        });
        return true;
    };

    let entries = schedule_entries(&table);
    let today = Local::now().date_naive();
    let picked = if finals {
        final_inspections(&entries, today, limit)
    } else {
        upcoming(&entries, today, limit)
    };

    print(json, &picked, || {
        picked
            .iter()
            .map(|e| {
                let date = e.date.map(|d| d.format("%d.%m.%Y").to_string()).unwrap_or_default();
                format!("{}  ОНзС {}  {}  {}  {}", date, e.onzs, e.object, e.inspection_type, e.inspector)
            })
            .collect::<Vec<_>>()
            .join("\n")
    });
    true
}

fn show_remarks(
    service: &mut DataService,
    status: Option<RemarkStatus>,
    onzs: Option<&str>,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    json: bool,
) -> bool {
    let Some(table) = service.get_remarks_table() else {
        error!(path = %service.config().remarks_path.display(), "remarks not available");
        return false;
    };

    if status.is_none() && onzs.is_none() {
        let counts = table.sheet_counts();
        print(json, &counts, || {
            counts
                .iter()
                .map(|(sheet, n)| format!("{}: {}", sheet, n))
                .collect::<Vec<_>>()
                .join("\n")
        });
        return true;
    }

    let mut rows: Vec<usize> = match onzs {
        Some(id) => rows_for_onzs(&table, id, from, to),
        None => (0..table.len()).collect(),
    };
    if let Some(status) = status {
        let matching = rows_with_status(&table, status);
        rows.retain(|r| matching.contains(r));
    }

    let picked: Vec<_> = rows.iter().filter_map(|&r| table.rows.get(r)).collect();
    print(json, &picked, || render_rows(&table, &rows));
    true
}

fn render_rows(table: &Table, rows: &[usize]) -> String {
    rows.iter()
        .map(|&r| {
            let cells: Vec<String> = (0..table.columns.len()).map(|c| table.text(r, c)).collect();
            let line = table.sheet_row(r).map(|l| l.to_string()).unwrap_or_default();
            format!(
                "[{}:{}] ({}) {}",
                table.sheet_of(r).unwrap_or("-"),
                line,
                classify_row(table, r).label(),
                cells.join(" | ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
