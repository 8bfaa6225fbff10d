use calamine::Reader;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::read_sheet_table;
use crate::cache::{Purpose, TabularCache};
use crate::excel::{
    open_workbook, CellValue, ExcelError, HeaderStrategy, MarkerHeaderDetector, Row, SheetInfo, Table,
};

/// A sheet left out of a remarks load
#[derive(Debug, Clone, Serialize)]
pub struct SkippedSheet {
    pub name: String,
    pub error: ExcelError,
}

/// Outcome of parsing every sheet of the remarks workbook
#[derive(Debug, Clone)]
pub struct RemarksLoad {
    pub table: Table,
    pub sheets: Vec<SheetInfo>,
    pub skipped: Vec<SkippedSheet>,
}

/// Loads all sheets of the remarks workbook into one provenance-tagged table
pub struct RemarksLoader {
    header: Box<dyn HeaderStrategy>,
}

impl Default for RemarksLoader {
    fn default() -> Self {
        RemarksLoader::new()
    }
}

impl RemarksLoader {
    pub fn new() -> Self {
        RemarksLoader::with_header_strategy(MarkerHeaderDetector::default())
    }

    pub fn with_header_strategy(header: impl HeaderStrategy + 'static) -> Self {
        RemarksLoader {
            header: Box::new(header),
        }
    }

    /// Cached remarks table, or `None` when nothing could be parsed
    pub fn load(&self, cache: &mut TabularCache, path: &Path) -> Option<Arc<Table>> {
        cache.get_or_load(path, Purpose::Remarks, |p| match self.parse(p) {
            Ok(load) => Some(load.table),
            Err(e) => {
                warn!(path = %p.display(), error = %e, "remarks workbook not loaded");
                None
            }
        })
    }

    /// Parse every sheet. Broken sheets are skipped and reported; the load
    /// fails only when no sheet survives.
    pub fn parse(&self, path: &Path) -> Result<RemarksLoad, ExcelError> {
        let mut workbook = open_workbook(path)?;
        let names = workbook.sheet_names();

        let results: Vec<(String, Result<(Table, SheetInfo), ExcelError>)> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let result = read_sheet_table(&mut workbook, name, index, self.header.as_ref());
                (name.clone(), result)
            })
            .collect();

        let mut parsed = Vec::new();
        let mut sheets = Vec::new();
        let mut skipped = Vec::new();

        for (name, result) in results {
            match result {
                Ok((table, info)) => {
                    sheets.push(info);
                    parsed.push((name, table));
                }
                Err(error) => {
                    warn!(sheet = %name, error = %error, "skipping remarks sheet");
                    skipped.push(SkippedSheet { name, error });
                }
            }
        }

        if parsed.is_empty() {
            return Err(ExcelError::invalid_format(format!(
                "No readable sheets in {} ({} skipped)",
                path.display(),
                skipped.len()
            )));
        }

        let table = concat_sheets(parsed);
        info!(
            path = %path.display(),
            sheets = sheets.len(),
            skipped = skipped.len(),
            rows = table.len(),
            "remarks loaded"
        );

        Ok(RemarksLoad {
            table,
            sheets,
            skipped,
        })
    }
}

/// Concatenate sheet tables in order, tagging each row with its sheet.
/// Columns are the union of all headers in first-seen order.
pub fn concat_sheets(sheets: Vec<(String, Table)>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (_, table) in &sheets {
        for name in &table.columns {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
    }

    let width = columns.len();
    let mut out = Table::new(columns);

    for (sheet, table) in sheets {
        let targets: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();

        for row in table.rows {
            let mut cells = vec![CellValue::Empty; width];
            for (value, target) in row.cells.into_iter().zip(&targets) {
                cells[*target] = value;
            }
            out.rows.push(Row {
                sheet: Some(sheet.clone()),
                line: row.line,
                cells,
            });
        }
    }

    out
}
