use calamine::Reader;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::read_sheet_table;
use crate::cache::{Purpose, TabularCache};
use crate::excel::{open_workbook, ExcelError, HeaderStrategy, MarkerHeaderDetector, Table};

/// Loads the first sheet of the schedule workbook
pub struct ScheduleLoader {
    header: Box<dyn HeaderStrategy>,
}

impl Default for ScheduleLoader {
    fn default() -> Self {
        ScheduleLoader::new()
    }
}

impl ScheduleLoader {
    pub fn new() -> Self {
        ScheduleLoader::with_header_strategy(MarkerHeaderDetector::default())
    }

    pub fn with_header_strategy(header: impl HeaderStrategy + 'static) -> Self {
        ScheduleLoader {
            header: Box::new(header),
        }
    }

    /// Cached schedule table, or `None` when the file is missing or unreadable
    pub fn load(&self, cache: &mut TabularCache, path: &Path) -> Option<Arc<Table>> {
        cache.get_or_load(path, Purpose::Schedule, |p| match self.parse(p) {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(path = %p.display(), error = %e, "schedule workbook not loaded");
                None
            }
        })
    }

    /// Parse the first sheet without touching the cache
    pub fn parse(&self, path: &Path) -> Result<Table, ExcelError> {
        let mut workbook = open_workbook(path)?;

        let first = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ExcelError::invalid_format("Workbook has no sheets"))?;

        let (table, sheet) = read_sheet_table(&mut workbook, &first, 0, self.header.as_ref())?;
        info!(
            path = %path.display(),
            sheet = %sheet.name,
            header_row = sheet.header_row,
            rows = sheet.row_count,
            "schedule loaded"
        );

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;
    use crate::test_support::write_workbook;

    #[test]
    fn test_loads_first_sheet_with_detected_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.xlsx");
        write_workbook(
            &path,
            &[
                (
                    "График",
                    vec![
                        vec!["График выездов УПКиСОТ"],
                        vec![],
                        vec!["№ п/п", "Дата выезда", "Площадь. Этажность", "ОНзС"],
                        vec!["1", "05.03.2025", "", "2"],
                        vec![],
                        vec!["2", "06.03.2025", "", "11"],
                    ],
                ),
                ("Архив", vec![vec!["Дата выезда"], vec!["01.01.2020"]]),
            ],
        );

        let mut cache = TabularCache::new();
        let table = ScheduleLoader::new().load(&mut cache, &path).unwrap();

        assert_eq!(table.columns[1], "Дата выезда");
        assert_eq!(table.len(), 2);
        assert_eq!(table.text(1, 3), "11");
        assert_eq!(table.sheet_of(0), None);
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TabularCache::new();
        let loaded = ScheduleLoader::new().load(&mut cache, &dir.path().join("nope.xlsx"));
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();

        let mut cache = TabularCache::new();
        assert!(ScheduleLoader::new().load(&mut cache, &path).is_none());
    }

    #[test]
    fn test_custom_header_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schedule.xlsx");
        write_workbook(
            &path,
            &[("Sheet", vec![vec!["junk"], vec!["Visit", "Area"], vec!["x", "y"]])],
        );

        let loader = ScheduleLoader::with_header_strategy(|_: &[Vec<CellValue>]| 1usize);
        let table = loader.parse(&path).unwrap();
        assert_eq!(table.columns, vec!["Visit", "Area"]);
        assert_eq!(table.len(), 1);
    }
}
