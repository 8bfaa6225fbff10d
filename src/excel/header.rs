//! Header-row detection for sheets whose header position varies.
//!
//! Workbooks from different years put a varying number of title rows above
//! the real header. The detector looks for a marker phrase instead of
//! trusting row 0.

use super::types::CellValue;

/// Marker phrase ("visit date") present in every real header row
pub const VISIT_DATE_MARKER: &str = "дата выезда";

/// Rows examined before falling back to row 0
pub const HEADER_SCAN_ROWS: usize = 30;

/// Strategy mapping a raw, headerless grid to the header row index
pub trait HeaderStrategy {
    fn detect(&self, grid: &[Vec<CellValue>]) -> usize;
}

impl<F> HeaderStrategy for F
where
    F: Fn(&[Vec<CellValue>]) -> usize,
{
    fn detect(&self, grid: &[Vec<CellValue>]) -> usize {
        self(grid)
    }
}

/// Picks the first row with a cell containing `marker`, case-insensitively
#[derive(Debug, Clone)]
pub struct MarkerHeaderDetector {
    marker: String,
    scan_rows: usize,
}

impl MarkerHeaderDetector {
    pub fn new(marker: &str, scan_rows: usize) -> Self {
        MarkerHeaderDetector {
            marker: marker.to_lowercase(),
            scan_rows,
        }
    }
}

impl Default for MarkerHeaderDetector {
    fn default() -> Self {
        MarkerHeaderDetector::new(VISIT_DATE_MARKER, HEADER_SCAN_ROWS)
    }
}

impl HeaderStrategy for MarkerHeaderDetector {
    fn detect(&self, grid: &[Vec<CellValue>]) -> usize {
        grid.iter()
            .take(self.scan_rows)
            .position(|row| {
                row.iter()
                    .any(|cell| cell.to_string().to_lowercase().contains(&self.marker))
            })
            .unwrap_or(0)
    }
}

/// Detect with the default visit-date marker
pub fn detect_header_row(grid: &[Vec<CellValue>]) -> usize {
    MarkerHeaderDetector::default().detect(grid)
}
