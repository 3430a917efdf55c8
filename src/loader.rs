// Ingestion: turn a CSV, an Excel workbook or a published Google Sheet into a
// `Table`. All parsing is delegated to `csv` and `calamine`; this module only
// normalizes their output into header + aligned rows.
use crate::error::{ReportError, Result};
use crate::types::{CellValue, Table};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::Timelike;
use csv::ReaderBuilder;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Read;
use std::path::Path;

pub const SHEETS_SOURCE_NAME: &str = "google-sheets.csv";

static SHEET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/d/([a-zA-Z0-9_-]+)").expect("valid sheet id regex"));
static SHEET_GID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?#&]gid=(\d+)").expect("valid gid regex"));

/// Load any supported file, picking the parser from the extension.
pub fn load_file(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    match extension.as_deref() {
        Some("csv") => load_csv(path),
        Some("xlsx") | Some("xls") | Some("xlsm") | Some("ods") => load_excel(path),
        _ => Err(ReportError::UnsupportedFile(path.display().to_string())),
    }
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = parse_csv(file)?;
    info!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        table.row_count(),
        table.columns().len()
    );
    Ok(table)
}

/// Parse CSV text with a mandatory header row. Cells stay as text.
pub fn parse_csv<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ReportError::EmptyCsv);
    }

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(CellValue::text).collect());
    }
    if rows.is_empty() {
        return Err(ReportError::EmptyCsv);
    }

    Ok(Table::new(headers, rows))
}

/// Read the first worksheet; the first row supplies the headers.
pub fn load_excel(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReportError::EmptySheet)??;

    let table = sheet_to_table(range.rows())?;
    info!(
        "Loaded {} ({} rows, {} columns)",
        path.display(),
        table.row_count(),
        table.columns().len()
    );
    Ok(table)
}

// Header row first; rows with nothing but blanks are dropped.
fn sheet_to_table<'a, I>(mut sheet_rows: I) -> Result<Table>
where
    I: Iterator<Item = &'a [Data]>,
{
    let headers: Vec<String> = match sheet_rows.next() {
        Some(first) => first.iter().map(|c| excel_cell(c).to_string()).collect(),
        None => return Err(ReportError::EmptySheet),
    };
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ReportError::EmptySheet);
    }

    let rows: Vec<Vec<CellValue>> = sheet_rows
        .map(|row| row.iter().map(excel_cell).collect::<Vec<_>>())
        .filter(|cells| !cells.iter().all(CellValue::is_empty))
        .collect();
    if rows.is_empty() {
        return Err(ReportError::EmptySheet);
    }

    Ok(Table::new(headers, rows))
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(ndt) if ndt.num_seconds_from_midnight() == 0 => {
                CellValue::Text(ndt.format("%Y-%m-%d").to_string())
            }
            Some(ndt) => CellValue::Text(ndt.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Empty,
    }
}

/// Turn a pasted Google Sheets link (or bare spreadsheet id) into its CSV
/// export URL. Returns `None` when no id can be found.
pub fn sheets_csv_url(input: &str) -> Option<String> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if s.contains("export?format=csv") {
        return Some(s.to_string());
    }

    let id = match SHEET_ID.captures(s) {
        Some(caps) => caps[1].to_string(),
        None if !s.contains('/') => s.to_string(),
        None => return None,
    };
    let gid = SHEET_GID
        .captures(s)
        .map(|caps| caps[1].to_string())
        .unwrap_or_else(|| "0".to_string());

    Some(format!(
        "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
        id, gid
    ))
}

/// Download a published sheet as CSV and parse it.
///
/// One blocking request; any transport failure or non-success status is
/// reported as `SheetFetch` and nothing is retried.
pub fn fetch_sheet(input: &str) -> Result<Table> {
    fetch_sheet_with(&reqwest::blocking::Client::new(), input)
}

pub fn fetch_sheet_with(client: &reqwest::blocking::Client, input: &str) -> Result<Table> {
    let url = sheets_csv_url(input).ok_or(ReportError::InvalidSheetUrl)?;
    info!("Fetching sheet export: {}", url);

    let response = client
        .get(&url)
        .send()
        .map_err(|e| ReportError::SheetFetch(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ReportError::SheetFetch(format!("HTTP {}", status)));
    }
    let body = response
        .text()
        .map_err(|e| ReportError::SheetFetch(e.to_string()))?;
    debug!("Sheet export returned {} bytes", body.len());

    parse_csv(body.as_bytes()).map_err(|e| match e {
        ReportError::EmptyCsv => ReportError::EmptySheet,
        other => other,
    })
}
