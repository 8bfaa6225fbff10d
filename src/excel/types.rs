use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::columns::{resolve_column, ColumnSpec};

/// Represents a cell value with type information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    #[default]
    Empty,
    String(String),
    Number(f64),
    Boolean(bool),
    DateTime(String), // ISO 8601 format
    Error(String),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    /// True for blank cells and whitespace-only strings
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::String(s) => write!(f, "{}", s),
            // Whole numbers print without a trailing ".0" so ids like ОНзС "5" compare as text
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::Error(e) => write!(f, "#{}", e),
        }
    }
}

/// One table row. `sheet` is the provenance tag set by the remarks loader,
/// `line` the 1-based row in that sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub sheet: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
    pub cells: Vec<CellValue>,
}

/// A parsed sheet: named columns over ordered rows.
///
/// Tables handed out by the cache are shared; never mutate one in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Resolve a column by header hints or letter address
    pub fn column(&self, spec: &ColumnSpec) -> Option<usize> {
        resolve_column(&self.columns, spec)
    }

    /// Cell at (row, col); out-of-range positions read as empty
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.cells.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Trimmed text of a cell, empty for missing cells
    pub fn text(&self, row: usize, col: usize) -> String {
        self.cell(row, col).to_string().trim().to_string()
    }

    /// Provenance sheet of a row
    pub fn sheet_of(&self, row: usize) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.sheet.as_deref())
    }

    /// 1-based sheet row a table row was read from
    pub fn sheet_row(&self, row: usize) -> Option<u32> {
        self.rows.get(row).and_then(|r| r.line)
    }

    /// Row counts per provenance sheet, in first-seen order
    pub fn sheet_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for row in &self.rows {
            let name = row.sheet.clone().unwrap_or_default();
            match counts.iter_mut().find(|(n, _)| *n == name) {
                Some((_, c)) => *c += 1,
                None => counts.push((name, 1)),
            }
        }
        counts
    }
}

/// Summary of one sheet that made it into a load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub index: u32,
    pub header_row: u32,
    pub row_count: u32,
    pub col_count: u32,
}

/// Visit date as submitted by the wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisitDate {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
    Text(String),
}

impl VisitDate {
    /// `DD.MM.YYYY` for dates, the raw text otherwise
    pub fn to_cell_text(&self) -> String {
        match self {
            VisitDate::DateTime(dt) => dt.format("%d.%m.%Y").to_string(),
            VisitDate::Date(d) => d.format("%d.%m.%Y").to_string(),
            VisitDate::Text(s) => s.clone(),
        }
    }
}

/// An inspector site visit to append to the remarks workbook.
/// Missing fields are written as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectorFormInput {
    pub date: Option<VisitDate>,
    pub area: Option<String>,
    pub floors: Option<String>,
    pub onzs: Option<String>,
    pub developer: Option<String>,
    pub object: Option<String>,
    pub address: Option<String>,
    pub case_no: Option<String>,
    pub check_type: Option<String>,
}

impl InspectorFormInput {
    /// Build from the wizard's raw field map. A `date` in `DD.MM.YYYY`
    /// becomes a real date, anything else is kept as text.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let get = |key: &str| fields.get(key).cloned();

        let date = fields.get("date").map(|raw| {
            let raw = raw.trim();
            match NaiveDate::parse_from_str(raw, "%d.%m.%Y") {
                Ok(d) => VisitDate::Date(d),
                Err(_) => VisitDate::Text(raw.to_string()),
            }
        });

        InspectorFormInput {
            date,
            area: get("area"),
            floors: get("floors"),
            onzs: get("onzs"),
            developer: get("developer"),
            object: get("object"),
            address: get("address"),
            case_no: get("case_no"),
            check_type: get("check_type"),
        }
    }
}

/// The four resolution-mark columns of the remarks sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColumn {
    /// ПБ, column Q
    Pb,
    /// ПБ в ЗК КНД, column R
    PbZk,
    /// АР, ММГН, АГО, column Y
    Ar,
    /// ЭОМ, column AD
    Eom,
}

impl StatusColumn {
    pub const ALL: [StatusColumn; 4] = [
        StatusColumn::Pb,
        StatusColumn::PbZk,
        StatusColumn::Ar,
        StatusColumn::Eom,
    ];

    pub fn letter(&self) -> &'static str {
        match self {
            StatusColumn::Pb => "Q",
            StatusColumn::PbZk => "R",
            StatusColumn::Ar => "Y",
            StatusColumn::Eom => "AD",
        }
    }
}

/// A status mark written into the remarks workbook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub sheet: String,
    /// 1-based spreadsheet row
    pub row: u32,
    pub column: StatusColumn,
    /// "да" or "нет"
    pub value: String,
    /// Cell text before the write
    pub previous: String,
}

/// Where an inspector row landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendReceipt {
    pub sheet: String,
    /// 1-based spreadsheet row
    pub row: u32,
}

/// Excel-specific errors
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ExcelError {
    pub message: String,
    pub error_type: ExcelErrorType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcelErrorType {
    FileNotFound,
    InvalidFormat,
    SheetNotFound,
    ReadError,
    WriteError,
    FileLocked,
    FetchError,
}

impl ExcelError {
    pub fn new(message: impl Into<String>, error_type: ExcelErrorType) -> Self {
        ExcelError {
            message: message.into(),
            error_type,
        }
    }

    pub fn file_not_found(path: &str) -> Self {
        ExcelError::new(format!("File not found: {}", path), ExcelErrorType::FileNotFound)
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::InvalidFormat)
    }

    pub fn sheet_not_found(sheet: &str) -> Self {
        ExcelError::new(format!("Sheet not found: {}", sheet), ExcelErrorType::SheetNotFound)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::ReadError)
    }

    pub fn write_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::WriteError)
    }

    pub fn fetch_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::FetchError)
    }
}
