use calamine::{open_workbook_auto, Data, Range, Reader, Sheets};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::types::*;

pub type Workbook = Sheets<BufReader<File>>;

/// Open a workbook of any supported format (xlsx, xls, xlsb, ods)
pub fn open_workbook(path: &Path) -> Result<Workbook, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    open_workbook_auto(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))
}

/// Read a sheet as a raw grid with no header assumption.
///
/// The grid starts at the sheet's row 1 / column A, so leading blank rows
/// and columns come back as empty cells and indices match the sheet.
pub fn read_raw_grid(workbook: &mut Workbook, sheet: &str) -> Result<Vec<Vec<CellValue>>, ExcelError> {
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|e| ExcelError::read_error(format!("Failed to read sheet '{}': {}", sheet, e)))?;

    Ok(range_to_grid(&range))
}

fn range_to_grid(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let (_, col_count) = range.get_size();
    let width = start_col as usize + col_count;

    let mut grid: Vec<Vec<CellValue>> = (0..start_row)
        .map(|_| vec![CellValue::Empty; width])
        .collect();

    for row in range.rows() {
        let mut cells = vec![CellValue::Empty; start_col as usize];
        cells.extend(row.iter().map(|cell| convert_cell_value(Some(cell))));
        grid.push(cells);
    }

    grid
}

/// Build a table from a raw grid using `header_row` as the header.
///
/// Blank headers become `Unnamed: <idx>` and repeated headers get a `.N`
/// suffix so every column name is unique. Rows above the header are
/// discarded, fully-empty rows below it are dropped. Each kept row records
/// its 1-based sheet row.
pub fn build_table(grid: Vec<Vec<CellValue>>, header_row: usize) -> Table {
    let width = grid.iter().map(|r| r.len()).max().unwrap_or(0);
    let header_cells = grid.get(header_row).cloned().unwrap_or_default();

    let headers = (0..width).map(|idx| {
        header_cells
            .get(idx)
            .map(|c| c.to_string().trim().to_string())
            .unwrap_or_default()
    });
    let mut table = Table::new(unique_column_names(headers));

    for (idx, mut cells) in grid.into_iter().enumerate().skip(header_row + 1) {
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        cells.resize(width, CellValue::Empty);
        table.rows.push(Row {
            sheet: None,
            line: u32::try_from(idx + 1).ok(),
            cells,
        });
    }

    table
}

/// Name headers uniquely: blanks become `Unnamed: <idx>`, repeats take the
/// next free `.N` suffix. A suffixed name that is itself taken is suffixed
/// again, so `["a", "a", "a.1"]` gives `["a", "a.1", "a.1.1"]`.
fn unique_column_names(headers: impl Iterator<Item = String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (idx, text) in headers.enumerate() {
        let base = if text.is_empty() {
            format!("Unnamed: {}", idx)
        } else {
            text
        };

        let mut name = base.clone();
        while taken.contains(&name) {
            let count = counts.entry(name.clone()).or_insert(0);
            *count += 1;
            name = format!("{}.{}", name, count);
        }

        taken.insert(name.clone());
        names.push(name);
    }

    names
}

/// Convert calamine Data to our CellValue
fn convert_cell_value(cell: Option<&Data>) -> CellValue {
    match cell {
        None => CellValue::Empty,
        Some(data) => match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::String(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Boolean(*b),
            Data::DateTime(dt) => {
                let f = dt.as_f64();
                match format_excel_datetime(f) {
                    Some(iso) => CellValue::DateTime(iso),
                    None => CellValue::Number(f),
                }
            }
            Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
            Data::DurationIso(s) => CellValue::String(s.clone()),
            Data::Error(e) => CellValue::Error(format!("{:?}", e)),
        },
    }
}

/// Format Excel datetime (days since 1899-12-30) to ISO 8601
pub fn format_excel_datetime(value: f64) -> Option<String> {
    let days = value.floor() as i64;
    let time_fraction = value.fract();

    // Excel epoch is December 30, 1899
    let epoch = chrono::NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(chrono::Duration::try_days(days)?)?;

    let total_seconds = (time_fraction * 86400.0).round() as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let time = chrono::NaiveTime::from_hms_opt(hours, minutes, seconds).unwrap_or_default();
    let datetime = chrono::NaiveDateTime::new(date, time);

    Some(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Compute SHA-256 checksum of a file
pub fn compute_checksum(path: &Path) -> Result<String, ExcelError> {
    let mut file = File::open(path)
        .map_err(|e| ExcelError::read_error(format!("Failed to open file for checksum: {}", e)))?;

    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ExcelError::read_error(format!("Failed to read file for checksum: {}", e)))?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 of an in-memory buffer, formatted like `compute_checksum`
pub fn checksum_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
