//! Text rendering of summary statistics.

use std::fmt::Write;

use linkview_core::{ColumnStats, ColumnSummary, SummaryResult};

/// Shown instead of a table when the effective row set is empty.
pub const NO_DATA: &str = "no data for this combination";

const STAT_NAMES: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

fn stat_values(stats: &ColumnStats) -> [f64; 8] {
    [
        stats.count as f64,
        stats.mean,
        stats.std,
        stats.min,
        stats.q25,
        stats.q50,
        stats.q75,
        stats.max,
    ]
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.6}")
    }
}

/// Render a describe-style table: one row per statistic, one column per
/// summarized column.
pub fn describe(summary: &SummaryResult) -> String {
    if summary.is_empty() {
        return NO_DATA.to_string();
    }

    let cells: Vec<Vec<String>> = summary
        .columns
        .iter()
        .map(|(_, column)| match column {
            ColumnSummary::Stats(stats) => stat_values(stats).map(format_cell).to_vec(),
            ColumnSummary::Empty => vec!["-".to_string(); STAT_NAMES.len()],
        })
        .collect();

    let widths: Vec<usize> = summary
        .columns
        .iter()
        .zip(&cells)
        .map(|((name, _), values)| {
            values
                .iter()
                .map(String::len)
                .chain(std::iter::once(name.len()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let label_width = STAT_NAMES.iter().map(|s| s.len()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = write!(out, "{:label_width$}", "");
    for ((name, _), width) in summary.columns.iter().zip(&widths) {
        let _ = write!(out, "  {name:>width$}");
    }
    for (row, stat) in STAT_NAMES.iter().enumerate() {
        let _ = write!(out, "\n{stat:<label_width$}");
        for (values, width) in cells.iter().zip(&widths) {
            let _ = write!(out, "  {:>width$}", values[row]);
        }
    }
    out
}
