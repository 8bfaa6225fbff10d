//! Workbook loaders: raw read, header detection and table build, behind the cache.

pub mod remarks;
pub mod schedule;

pub use remarks::{RemarksLoad, RemarksLoader, SkippedSheet};
pub use schedule::ScheduleLoader;

use crate::excel::{build_table, read_raw_grid, ExcelError, HeaderStrategy, SheetInfo, Table, Workbook};

/// Read one sheet into a table using `header` to place the header row
pub(crate) fn read_sheet_table(
    workbook: &mut Workbook,
    sheet: &str,
    index: usize,
    header: &dyn HeaderStrategy,
) -> Result<(Table, SheetInfo), ExcelError> {
    let grid = read_raw_grid(workbook, sheet)?;
    if grid.is_empty() {
        return Err(ExcelError::invalid_format(format!("Sheet '{}' has no cells", sheet)));
    }

    let header_row = header.detect(&grid);
    let table = build_table(grid, header_row);

    let info = SheetInfo {
        name: sheet.to_string(),
        index: index as u32,
        header_row: header_row as u32,
        row_count: table.len() as u32,
        col_count: table.columns.len() as u32,
    };

    Ok((table, info))
}
