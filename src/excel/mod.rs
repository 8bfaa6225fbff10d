//! Excel module for reading sheets into tables and appending inspector rows.
//!
//! This module provides:
//! - Raw sheet reads addressed from A1, for header detection
//! - Header-row detection and table building
//! - Column lookup by header hints or letter address
//! - Row append and status marks that keep other sheets and formatting intact

pub mod columns;
pub mod header;
pub mod reader;
pub mod types;
pub mod writer;

// Re-export commonly used types and functions
pub use columns::{column_index_to_letter, column_letter_to_index, resolve_column, ColumnSpec};
pub use header::{detect_header_row, HeaderStrategy, MarkerHeaderDetector, VISIT_DATE_MARKER};
pub use reader::{build_table, checksum_bytes, compute_checksum, open_workbook, read_raw_grid, Workbook};
pub use types::*;
pub use writer::{InspectorRowAppender, RemarkStatusWriter};
