//! Spreadsheet data access for the SOT inspection bot: the visit schedule
//! and the ONzS remarks registry.
//!
//! Workbooks are parsed with a header-row detector, cached against file
//! modification times, and the remarks workbook is refreshed from a remote
//! URL on a TTL. Inspector visits and remark status marks are written back to
//! the remarks workbook; status marks are also kept in a SQLite history.

pub mod cache;
pub mod config;
pub mod excel;
pub mod history;
pub mod loader;
pub mod query;
pub mod service;
pub mod sync;

#[cfg(test)]
mod test_support;

pub use cache::{Purpose, TabularCache};
pub use config::{Config, ConfigError};
pub use excel::{
    CellValue, ExcelError, ExcelErrorType, InspectorFormInput, Row, StatusChange, StatusColumn, Table, VisitDate,
};
pub use history::{StatusHistory, StatusRecord};
pub use service::DataService;
pub use sync::{RemoteSource, RemoteSyncManager, SyncOutcome};
