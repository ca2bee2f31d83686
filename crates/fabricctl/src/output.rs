//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one line per item.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use fabricctl_core::{LedgerReport, OperationRecord};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> Result<String, CliError>,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Print to stderr. Used for the ledger of a failed task.
pub fn print_error_output(output: &str) {
    if output.is_empty() {
        return;
    }
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "{output}");
}

// ── Ledger ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct LedgerRow {
    #[tabled(rename = "#")]
    seq: u64,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Check")]
    check_mode: bool,
    #[tabled(rename = "Success")]
    success: bool,
    #[tabled(rename = "Changed")]
    changed: bool,
    #[tabled(rename = "Found")]
    found: bool,
    #[tabled(rename = "Response")]
    response: String,
    #[tabled(rename = "Diff")]
    diff: String,
}

impl From<&OperationRecord> for LedgerRow {
    fn from(r: &OperationRecord) -> Self {
        let code = r.response.get("RETURN_CODE").map_or_else(|| "-".into(), ToString::to_string);
        let message = r
            .response
            .get("MESSAGE")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("-");
        Self {
            seq: r.sequence_number,
            action: r.action.clone(),
            state: r.state.to_string(),
            check_mode: r.check_mode,
            success: r.result.success,
            changed: r.result.changed,
            found: r.result.found,
            response: format!("{code} {message}"),
            diff: if r.diff.is_empty() {
                "-".into()
            } else {
                serde_json::Value::Object(r.diff.clone()).to_string()
            },
        }
    }
}

/// Render the task's audit ledger.
pub fn render_ledger(
    format: &OutputFormat,
    records: &[OperationRecord],
    report: &LedgerReport,
    color: bool,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let rows: Vec<LedgerRow> = records.iter().map(LedgerRow::from).collect();
            Ok(format!("{}\n{}", render_table(&rows), summary(report, color)))
        }
        OutputFormat::Json => render_json(report, false),
        OutputFormat::JsonCompact => render_json(report, true),
        OutputFormat::Yaml => render_yaml(report),
        OutputFormat::Plain => Ok(format!("changed={} failed={}", report.changed, report.failed)),
    }
}

fn summary(report: &LedgerReport, color: bool) -> String {
    let changed = format!("changed: {}", report.changed);
    let failed = format!("failed: {}", report.failed);
    if !color {
        return format!("{changed}  {failed}");
    }
    let changed = if report.changed {
        changed.yellow().to_string()
    } else {
        changed.green().to_string()
    };
    let failed = if report.failed {
        failed.red().bold().to_string()
    } else {
        failed.green().to_string()
    };
    format!("{changed}  {failed}")
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json<T: Serialize + ?Sized>(data: &T, compact: bool) -> Result<String, CliError> {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.map_err(|e| CliError::Render(e.to_string()))
}

pub(crate) fn render_yaml<T: Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(|e| CliError::Render(e.to_string()))
}
