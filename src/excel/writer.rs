use std::path::{Path, PathBuf};
use tracing::{error, info};
use umya_spreadsheet::{reader, writer, Spreadsheet, Worksheet};

use super::columns::{column_index_to_letter, column_letter_to_index};
use super::types::{AppendReceipt, ExcelError, ExcelErrorType, InspectorFormInput, StatusChange, StatusColumn};
use crate::cache::{Purpose, TabularCache};

// 1-based columns of the inspector sheet
pub const COL_DATE: u32 = 2; // B
pub const COL_AREA_FLOORS: u32 = 4; // D
pub const COL_ONZS: u32 = 5; // E
pub const COL_DEVELOPER: u32 = 6; // F
pub const COL_OBJECT: u32 = 7; // G
pub const COL_ADDRESS: u32 = 8; // H
pub const COL_CASE_NO: u32 = 9; // I
pub const COL_CHECK_TYPE: u32 = 10; // J

/// First data row; row 1 holds the headers
const FIRST_DATA_ROW: u32 = 2;

/// Appends inspector visits to a sheet of the remarks workbook
#[derive(Debug, Clone)]
pub struct InspectorRowAppender {
    path: PathBuf,
    sheet: String,
}

impl InspectorRowAppender {
    pub fn new(path: impl Into<PathBuf>, sheet: impl Into<String>) -> Self {
        InspectorRowAppender {
            path: path.into(),
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Append `form` and invalidate the remarks cache. Failures are logged
    /// and reported as `false`.
    pub fn append(&self, form: &InspectorFormInput, cache: &mut TabularCache) -> bool {
        match self.try_append(form) {
            Ok(receipt) => {
                cache.invalidate(Purpose::Remarks);
                info!(
                    sheet = %receipt.sheet,
                    row = receipt.row,
                    first_cell = %cell_address(COL_DATE, receipt.row),
                    "inspector visit appended"
                );
                true
            }
            Err(e) => {
                error!(path = %self.path.display(), error = %e, "failed to append inspector visit");
                false
            }
        }
    }

    /// Append `form` without touching any cache
    pub fn try_append(&self, form: &InspectorFormInput) -> Result<AppendReceipt, ExcelError> {
        let mut book = open_for_edit(&self.path)?;

        // Find or create the sheet
        if book.get_sheet_by_name(&self.sheet).is_none() {
            book.new_sheet(self.sheet.as_str())
                .map_err(|e| ExcelError::write_error(format!("Failed to add sheet '{}': {}", self.sheet, e)))?;
        }
        let worksheet = book
            .get_sheet_by_name_mut(&self.sheet)
            .ok_or_else(|| ExcelError::sheet_not_found(&self.sheet))?;

        let row = next_append_row(worksheet, COL_DATE);
        write_form(worksheet, row, form);

        save_atomically(&book, &self.path)?;

        Ok(AppendReceipt {
            sheet: self.sheet.clone(),
            row,
        })
    }
}

/// Writes "да"/"нет" resolution marks into existing remarks rows
#[derive(Debug, Clone)]
pub struct RemarkStatusWriter {
    path: PathBuf,
}

impl RemarkStatusWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RemarkStatusWriter { path: path.into() }
    }

    /// Write the mark and invalidate the remarks cache. Failures are logged
    /// and reported as `None`.
    pub fn set_mark(
        &self,
        sheet: &str,
        row: u32,
        column: StatusColumn,
        resolved: bool,
        cache: &mut TabularCache,
    ) -> Option<StatusChange> {
        match self.try_set_mark(sheet, row, column, resolved) {
            Ok(change) => {
                cache.invalidate(Purpose::Remarks);
                info!(
                    sheet = %change.sheet,
                    cell = %format!("{}{}", column.letter(), change.row),
                    value = %change.value,
                    previous = %change.previous,
                    "remark status written"
                );
                Some(change)
            }
            Err(e) => {
                error!(path = %self.path.display(), sheet, row, error = %e, "failed to write remark status");
                None
            }
        }
    }

    /// Write the mark into `sheet` at 1-based `row`. The sheet must exist
    /// and the row must be below the header.
    pub fn try_set_mark(
        &self,
        sheet: &str,
        row: u32,
        column: StatusColumn,
        resolved: bool,
    ) -> Result<StatusChange, ExcelError> {
        if row < FIRST_DATA_ROW {
            return Err(ExcelError::invalid_format(format!(
                "Row {} is not a data row of '{}'",
                row, sheet
            )));
        }
        let col = column_letter_to_index(column.letter())
            .and_then(|idx| u32::try_from(idx + 1).ok())
            .ok_or_else(|| ExcelError::invalid_format(format!("Bad column {}", column.letter())))?;

        let mut book = open_for_edit(&self.path)?;
        let worksheet = book
            .get_sheet_by_name_mut(sheet)
            .ok_or_else(|| ExcelError::sheet_not_found(sheet))?;

        let previous = worksheet.get_value((col, row));
        let value = if resolved { "да" } else { "нет" };
        worksheet.get_cell_mut((col, row)).set_value_string(value);

        save_atomically(&book, &self.path)?;

        Ok(StatusChange {
            sheet: sheet.to_string(),
            row,
            column,
            value: value.to_string(),
            previous,
        })
    }
}

/// Read an existing workbook for structural edits; never creates one
fn open_for_edit(path: &Path) -> Result<Spreadsheet, ExcelError> {
    if !path.exists() {
        return Err(ExcelError::file_not_found(&path.display().to_string()));
    }

    reader::xlsx::read(path).map_err(|e| ExcelError::read_error(format!("Failed to open workbook: {}", e)))
}

/// One past the last row with a value in `column`, never above row 2.
///
/// Only `column` is consulted: a row with data elsewhere but a blank cell
/// there is treated as free and gets overwritten.
pub fn next_append_row(worksheet: &Worksheet, column: u32) -> u32 {
    let highest = worksheet.get_highest_row();

    let last = (1..=highest)
        .rev()
        .find(|row| !worksheet.get_value((column, *row)).trim().is_empty());

    match last {
        Some(row) => (row + 1).max(FIRST_DATA_ROW),
        None => FIRST_DATA_ROW,
    }
}

/// Write the fixed inspector layout into `row`
fn write_form(worksheet: &mut Worksheet, row: u32, form: &InspectorFormInput) {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    let date = form
        .date
        .as_ref()
        .map(|d| d.to_cell_text())
        .unwrap_or_default();
    let area_floors = format!(
        "Площадь (кв.м): {}\nКоличество этажей: {}",
        text(&form.area),
        text(&form.floors)
    );

    let values = [
        (COL_DATE, date),
        (COL_AREA_FLOORS, area_floors),
        (COL_ONZS, text(&form.onzs)),
        (COL_DEVELOPER, text(&form.developer)),
        (COL_OBJECT, text(&form.object)),
        (COL_ADDRESS, text(&form.address)),
        (COL_CASE_NO, text(&form.case_no)),
        (COL_CHECK_TYPE, text(&form.check_type)),
    ];

    for (col, value) in values {
        worksheet.get_cell_mut((col, row)).set_value_string(value);
    }
}

/// Save next to the original and rename over it. If the save or rename
/// fails the original workbook is left as it was.
fn save_atomically(book: &Spreadsheet, path: &Path) -> Result<(), ExcelError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let staging = tempfile::Builder::new()
        .prefix(".inspector-")
        .suffix(".xlsx")
        .tempfile_in(dir)
        .map_err(|e| ExcelError::write_error(format!("Failed to create staging file: {}", e)))?
        .into_temp_path();

    writer::xlsx::write(book, &staging)
        .map_err(|e| ExcelError::write_error(format!("Failed to save workbook: {}", e)))?;

    staging.persist(path).map_err(|e| {
        let kind = if e.error.kind() == std::io::ErrorKind::PermissionDenied {
            ExcelErrorType::FileLocked
        } else {
            ExcelErrorType::WriteError
        };
        ExcelError::new(format!("Failed to replace {}: {}", path.display(), e.error), kind)
    })?;

    Ok(())
}

/// Spreadsheet address of a 1-based (column, row), e.g. (2, 5) -> "B5"
pub fn cell_address(column: u32, row: u32) -> String {
    format!("{}{}", column_index_to_letter(column.saturating_sub(1)), row)
}
