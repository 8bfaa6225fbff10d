//! Modification-time aware table cache.
//!
//! One slot per (path, purpose). A slot is served only while the file's
//! modification time equals the time recorded when it was parsed; a missing
//! file or any other timestamp forces the caller to reparse.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

use crate::excel::Table;

/// Which logical dataset a cache slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purpose {
    Schedule,
    Remarks,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Schedule => write!(f, "schedule"),
            Purpose::Remarks => write!(f, "remarks"),
        }
    }
}

/// Source of file modification times
pub trait ModifiedTime {
    fn modified(&self, path: &Path) -> Option<SystemTime>;
}

/// Reads modification times from the filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct FsModifiedTime;

impl ModifiedTime for FsModifiedTime {
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|m| m.modified()).ok()
    }
}

impl<F> ModifiedTime for F
where
    F: Fn(&Path) -> Option<SystemTime>,
{
    fn modified(&self, path: &Path) -> Option<SystemTime> {
        self(path)
    }
}

struct CacheEntry {
    modified: SystemTime,
    table: Arc<Table>,
}

pub struct TabularCache {
    entries: HashMap<(PathBuf, Purpose), CacheEntry>,
    mtime: Box<dyn ModifiedTime>,
}

impl Default for TabularCache {
    fn default() -> Self {
        TabularCache::new()
    }
}

impl TabularCache {
    pub fn new() -> Self {
        TabularCache::with_modified_time(FsModifiedTime)
    }

    pub fn with_modified_time(source: impl ModifiedTime + 'static) -> Self {
        TabularCache {
            entries: HashMap::new(),
            mtime: Box::new(source),
        }
    }

    /// Current modification time of `path`, `None` if it cannot be read
    pub fn modified(&self, path: &Path) -> Option<SystemTime> {
        self.mtime.modified(path)
    }

    /// Cached table if the file still carries the recorded modification time
    pub fn get(&self, path: &Path, purpose: Purpose) -> Option<Arc<Table>> {
        let entry = self.entries.get(&(path.to_path_buf(), purpose))?;
        let current = self.modified(path)?;

        if current == entry.modified {
            Some(Arc::clone(&entry.table))
        } else {
            None
        }
    }

    pub fn put(&mut self, path: &Path, purpose: Purpose, modified: SystemTime, table: Table) -> Arc<Table> {
        let table = Arc::new(table);
        self.entries.insert(
            (path.to_path_buf(), purpose),
            CacheEntry {
                modified,
                table: Arc::clone(&table),
            },
        );
        table
    }

    /// Drop every slot for `purpose` so the next read reparses
    pub fn invalidate(&mut self, purpose: Purpose) {
        self.entries.retain(|(_, p), _| *p != purpose);
        debug!(%purpose, "cache invalidated");
    }

    /// Serve from cache or parse with `load`.
    ///
    /// Returns `None` without calling `load` when the file is absent. The
    /// timestamp is taken before parsing, so an edit that lands mid-parse
    /// triggers another reload on the next call.
    pub fn get_or_load<F>(&mut self, path: &Path, purpose: Purpose, load: F) -> Option<Arc<Table>>
    where
        F: FnOnce(&Path) -> Option<Table>,
    {
        let modified = match self.modified(path) {
            Some(m) => m,
            None => {
                debug!(path = %path.display(), %purpose, "file absent, nothing to load");
                return None;
            }
        };

        if let Some(table) = self.get(path, purpose) {
            debug!(path = %path.display(), %purpose, "cache hit");
            return Some(table);
        }

        debug!(path = %path.display(), %purpose, "cache miss, parsing");
        let table = load(path)?;
        Some(self.put(path, purpose, modified, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::{CellValue, Row};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    type Times = Rc<RefCell<HashMap<PathBuf, SystemTime>>>;

    fn fake_cache() -> (TabularCache, Times) {
        let times: Times = Rc::new(RefCell::new(HashMap::new()));
        let source = Rc::clone(&times);
        let cache = TabularCache::with_modified_time(move |p: &Path| source.borrow().get(p).copied());
        (cache, times)
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn table_with(value: &str) -> Table {
        let mut table = Table::new(vec!["v".into()]);
        table.rows.push(Row {
            sheet: None,
            line: None,
            cells: vec![CellValue::String(value.into())],
        });
        table
    }

    #[test]
    fn test_unchanged_mtime_is_a_hit() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/schedule.xlsx");
        times.borrow_mut().insert(path.to_path_buf(), at(100));

        let parses = Cell::new(0);
        let load = |_: &Path| {
            parses.set(parses.get() + 1);
            Some(table_with("a"))
        };

        let first = cache.get_or_load(path, Purpose::Schedule, load).unwrap();
        let second = cache
            .get_or_load(path, Purpose::Schedule, |_: &Path| {
                parses.set(parses.get() + 1);
                Some(table_with("b"))
            })
            .unwrap();

        assert_eq!(parses.get(), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_changed_mtime_reparses() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/schedule.xlsx");
        times.borrow_mut().insert(path.to_path_buf(), at(100));

        let first = cache
            .get_or_load(path, Purpose::Schedule, |_: &Path| Some(table_with("old")))
            .unwrap();
        assert_eq!(first.text(0, 0), "old");

        times.borrow_mut().insert(path.to_path_buf(), at(200));
        assert!(cache.get(path, Purpose::Schedule).is_none());

        let second = cache
            .get_or_load(path, Purpose::Schedule, |_: &Path| Some(table_with("new")))
            .unwrap();
        assert_eq!(second.text(0, 0), "new");
    }

    #[test]
    fn test_absent_then_present() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/remarks.xlsx");

        let called = Cell::new(false);
        let missing = cache.get_or_load(path, Purpose::Remarks, |_: &Path| {
            called.set(true);
            Some(table_with("x"))
        });
        assert!(missing.is_none());
        assert!(!called.get());

        times.borrow_mut().insert(path.to_path_buf(), at(5));
        let loaded = cache
            .get_or_load(path, Purpose::Remarks, |_: &Path| Some(table_with("x")))
            .unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[test]
    fn test_file_removed_after_load_is_stale() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/remarks.xlsx");
        times.borrow_mut().insert(path.to_path_buf(), at(5));
        cache.get_or_load(path, Purpose::Remarks, |_: &Path| Some(table_with("x")));

        times.borrow_mut().clear();
        assert!(cache.get(path, Purpose::Remarks).is_none());
    }

    #[test]
    fn test_purposes_are_independent_slots() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/shared.xlsx");
        times.borrow_mut().insert(path.to_path_buf(), at(1));

        cache.get_or_load(path, Purpose::Schedule, |_: &Path| Some(table_with("s")));
        cache.get_or_load(path, Purpose::Remarks, |_: &Path| Some(table_with("r")));

        assert_eq!(cache.get(path, Purpose::Schedule).unwrap().text(0, 0), "s");
        assert_eq!(cache.get(path, Purpose::Remarks).unwrap().text(0, 0), "r");

        cache.invalidate(Purpose::Remarks);
        assert!(cache.get(path, Purpose::Remarks).is_none());
        assert!(cache.get(path, Purpose::Schedule).is_some());
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let (mut cache, times) = fake_cache();
        let path = Path::new("/data/broken.xlsx");
        times.borrow_mut().insert(path.to_path_buf(), at(1));

        assert!(cache.get_or_load(path, Purpose::Schedule, |_: &Path| None).is_none());
        let loaded = cache.get_or_load(path, Purpose::Schedule, |_: &Path| Some(table_with("ok")));
        assert!(loaded.is_some());
    }
}
