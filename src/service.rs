//! The data-access boundary handed to the command layer.
//!
//! Every operation here reports failure as `None` or `false` after logging;
//! nothing propagates to the caller.

use std::sync::Arc;
use tracing::{info, warn};

use crate::cache::TabularCache;
use crate::config::Config;
use crate::excel::{InspectorFormInput, InspectorRowAppender, RemarkStatusWriter, StatusColumn, Table};
use crate::history::{StatusHistory, StatusRecord};
use crate::loader::{RemarksLoader, ScheduleLoader};
use crate::sync::{Clock, RemoteSource, RemoteSyncManager, SyncOutcome};

pub struct DataService {
    config: Config,
    cache: TabularCache,
    schedule: ScheduleLoader,
    remarks: RemarksLoader,
    sync: RemoteSyncManager,
    appender: InspectorRowAppender,
    status_writer: RemarkStatusWriter,
    history: Option<StatusHistory>,
    last_sync: Option<SyncOutcome>,
}

impl DataService {
    pub fn new(config: Config) -> Self {
        let sync = RemoteSyncManager::new(
            config.remarks_url.clone(),
            config.remarks_path.clone(),
            config.sync_ttl(),
        );
        let appender = InspectorRowAppender::new(config.remarks_path.clone(), config.inspector_sheet.clone());
        let status_writer = RemarkStatusWriter::new(config.remarks_path.clone());

        DataService {
            config,
            cache: TabularCache::new(),
            schedule: ScheduleLoader::new(),
            remarks: RemarksLoader::new(),
            sync,
            appender,
            status_writer,
            history: None,
            last_sync: None,
        }
    }

    pub fn with_remote_source(mut self, source: impl RemoteSource + 'static) -> Self {
        self.sync = self.sync.with_source(source);
        self
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.sync = self.sync.with_clock(clock);
        self
    }

    pub fn with_cache(mut self, cache: TabularCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Schedule table, `None` when the workbook is missing or unreadable
    pub fn get_schedule_table(&mut self) -> Option<Arc<Table>> {
        self.schedule.load(&mut self.cache, &self.config.schedule_path)
    }

    /// Remarks table after a best-effort sync of the local copy
    pub fn get_remarks_table(&mut self) -> Option<Arc<Table>> {
        let outcome = self.sync.sync_if_stale(&mut self.cache);
        self.last_sync = Some(outcome);
        self.remarks.load(&mut self.cache, &self.config.remarks_path)
    }

    /// Outcome of the most recent sync attempt, if any
    pub fn remarks_sync_status(&self) -> Option<&SyncOutcome> {
        self.last_sync.as_ref()
    }

    /// Fetch the remote workbook now; `true` only when a fresh copy landed
    pub fn force_refresh_remarks(&mut self) -> bool {
        let outcome = self.sync.force(&mut self.cache);
        let fetched = outcome.fetched();
        info!(fetched, "forced remarks refresh");
        self.last_sync = Some(outcome);
        fetched
    }

    pub fn append_inspector_visit(&mut self, form: &InspectorFormInput) -> bool {
        self.appender.append(form, &mut self.cache)
    }

    /// Mark a remarks row as resolved ("да") or not ("нет") and record who
    /// did it. `row` is the 1-based sheet row, as in `Table::sheet_row`.
    ///
    /// Returns `true` once the workbook is saved; a history failure is only
    /// logged.
    pub fn set_remark_status(
        &mut self,
        sheet: &str,
        row: u32,
        column: StatusColumn,
        resolved: bool,
        user: &str,
    ) -> bool {
        let Some(change) = self.status_writer.set_mark(sheet, row, column, resolved, &mut self.cache) else {
            return false;
        };

        if let Some(history) = self.history() {
            if let Err(e) = history.record(&change, user) {
                warn!(sheet, row, error = %e, "status written but not recorded in history");
            }
        }
        true
    }

    /// Recorded status marks for one sheet row, oldest first
    pub fn remark_status_history(&mut self, sheet: &str, row: u32) -> Vec<StatusRecord> {
        let Some(history) = self.history() else {
            return Vec::new();
        };

        history.for_row(sheet, row).unwrap_or_else(|e| {
            warn!(sheet, row, error = %e, "failed to read status history");
            Vec::new()
        })
    }

    /// Open the history database on first use
    fn history(&mut self) -> Option<&StatusHistory> {
        if self.history.is_none() {
            match StatusHistory::open(&self.config.history_path) {
                Ok(history) => self.history = Some(history),
                Err(e) => {
                    warn!(path = %self.config.history_path.display(), error = %e, "status history unavailable");
                }
            }
        }
        self.history.as_ref()
    }
}
