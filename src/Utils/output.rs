//! # Output sink
//!
//! Writes the rows of a [`SimulationResult`] as CSV and turns the cumulative gas
//! accumulators into production rates.
//!
//! Raw rows are written as `run_no, time, <state columns>, ph`. The rate table has
//! the same columns with the four gas accumulators replaced by
//! `(y[n] - y[n-1]) / (t[n] - t[n-1]) / 1000`; the first row has no predecessor
//! and is dropped.
//!
//! Two diagnostic tables go next to them: the growth rates of every row and the
//! constants of every interval that was started, so a failed run still shows
//! what it was integrated with.
use crate::ReactorsIVP::manager::{IntervalRecord, OutputRow, RunStatus, SimulationResult};
use crate::ReactorsIVP::state_vector::{GAS, STATE_HEADERS, VOLUME};
use prettytable::{Table, row};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Scale of the gas production rates.
pub const GAS_RATE_DIVISOR: f64 = 1000.0;

const GAS_NAMES: [&str; 4] = ["NH3", "CH4", "CO2", "H2S"];
const DEGRADER_NAMES: [&str; 8] = [
    "carb", "amino", "lipid", "lcfa", "hprop", "butyr", "valer", "acet",
];

/// Rows `1..` of `rows` with the gas columns replaced by production rates.
pub fn gas_rates(rows: &[OutputRow]) -> Vec<OutputRow> {
    rows.windows(2)
        .map(|pair| {
            let (prev, cur) = (&pair[0], &pair[1]);
            let dt = cur.t - prev.t;
            let mut rated = cur.clone();
            for idx in GAS {
                rated.y[idx] = (cur.y[idx] - prev.y[idx]) / dt / GAS_RATE_DIVISOR;
            }
            rated
        })
        .collect()
}

fn header_line() -> String {
    let mut columns = vec!["run_no", "time"];
    columns.extend(STATE_HEADERS.iter());
    columns.push("ph");
    columns.join(",")
}

/// Header plus one line per row.
pub fn write_rows<W: Write>(writer: &mut W, rows: &[OutputRow]) -> io::Result<()> {
    writeln!(writer, "{}", header_line())?;
    for row in rows {
        let values: Vec<String> = row.y.iter().map(|v| v.to_string()).collect();
        writeln!(
            writer,
            "{},{},{},{}",
            row.interval,
            row.t,
            values.join(","),
            row.ph
        )?;
    }
    Ok(())
}

fn join<T: ToString>(values: impl IntoIterator<Item = T>) -> String {
    values
        .into_iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// `run_no, time, mu_<degrader> ..` per row.
pub fn write_growth_rates<W: Write>(writer: &mut W, rows: &[OutputRow]) -> io::Result<()> {
    let header = DEGRADER_NAMES.iter().map(|name| format!("mu_{}", name));
    writeln!(writer, "run_no,time,{}", join(header))?;
    for row in rows {
        writeln!(writer, "{},{},{}", row.interval, row.t, join(row.mu))?;
    }
    Ok(())
}

/// One line per interval: span, temperature, growth and Henry/Ka constants.
pub fn write_intervals<W: Write>(writer: &mut W, intervals: &[IntervalRecord]) -> io::Result<()> {
    let mut header: Vec<String> = ["run_no", "t_start", "t_end", "temperature"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(DEGRADER_NAMES.iter().map(|name| format!("mu_max_{}", name)));
    header.extend(["k0_carbon", "k0_prot"].iter().map(|s| s.to_string()));
    header.extend(GAS_NAMES.iter().map(|name| format!("kh_{}", name.to_lowercase())));
    header.extend(
        [
            "ka1_lcfa", "ka_nh4", "ka_hac", "ka_hpr", "ka_hbut", "ka_hval", "ka1_co2", "ka2_co2",
            "ka_h2s", "ka_h2po4", "kw",
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    writeln!(writer, "{}", header.join(","))?;
    for record in intervals {
        let (r, k) = (&record.rates, &record.henry);
        let mut values = vec![record.t_start, record.t_end, r.temperature];
        values.extend(r.mu_max);
        values.extend([r.k0_carbon, r.k0_prot]);
        values.extend(k.k_h);
        values.extend([
            k.ka1_lcfa, k.ka_nh4, k.ka_hac, k.ka_hpr, k.ka_hbut, k.ka_hval, k.ka1_co2, k.ka2_co2,
            k.ka_h2s, k.ka_h2po4, k.kw,
        ]);
        writeln!(writer, "{},{}", record.interval, join(values))?;
    }
    Ok(())
}

/// Files written by [`save_csv`].
#[derive(Debug, Clone, PartialEq)]
pub struct OutputFiles {
    pub raw: PathBuf,
    pub rates: PathBuf,
    pub growth: PathBuf,
    pub intervals: PathBuf,
}

/// `result.csv` -> `result_<suffix>.csv`
pub fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "result".to_string());
    path.with_file_name(format!("{}_{}.csv", stem, suffix))
}

fn write_file<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()
}

/// Write the raw rows to `path`; gas rates, growth rates and interval constants
/// go next to it.
pub fn save_csv(path: &Path, result: &SimulationResult) -> io::Result<OutputFiles> {
    let files = OutputFiles {
        raw: path.to_path_buf(),
        rates: sibling_path(path, "gasrate"),
        growth: sibling_path(path, "growth"),
        intervals: sibling_path(path, "internals"),
    };
    write_file(&files.raw, |w| write_rows(w, &result.rows))?;
    write_file(&files.rates, |w| write_rows(w, &gas_rates(&result.rows)))?;
    write_file(&files.growth, |w| write_growth_rates(w, &result.rows))?;
    write_file(&files.intervals, |w| write_intervals(w, &result.intervals))?;
    Ok(files)
}

fn status_text(status: &RunStatus) -> String {
    match status {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Cancelled { interval } => format!("cancelled before interval {}", interval),
        RunStatus::Failed {
            interval,
            time,
            reason,
        } => format!("failed in interval {} at t = {}: {}", interval, time, reason),
    }
}

pub fn summary_table(result: &SimulationResult) -> Table {
    let mut table = Table::new();
    table.add_row(row!["Quantity", "Value"]);
    table.add_row(row!["status", status_text(&result.status)]);
    table.add_row(row!["rows", result.rows.len()]);
    table.add_row(row!["intervals started", result.intervals.len()]);
    if let Some(last) = result.rows.last() {
        table.add_row(row!["final time, h", format!("{:.3}", last.t)]);
        table.add_row(row!["final pH", format!("{:.3}", last.ph)]);
        table.add_row(row!["volume", format!("{:.4}", last.y[VOLUME])]);
        for (name, idx) in GAS_NAMES.iter().zip(GAS) {
            table.add_row(row![
                format!("cumulative {}", name),
                format!("{:.4e}", last.y[idx])
            ]);
        }
    }
    table
}

pub fn print_summary(result: &SimulationResult) {
    summary_table(result).printstd();
}
