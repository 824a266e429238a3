use crate::database::column::ColumnSchema;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::debug;

/// Identifies one table: a sheet of one spreadsheet document.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct TableKey {
    pub(crate) spreadsheet: String,
    pub(crate) sheet: String,
}

impl TableKey {
    pub(crate) fn new(spreadsheet: &str, sheet: &str) -> Self {
        Self {
            spreadsheet: spreadsheet.to_owned(),
            sheet: sheet.to_owned(),
        }
    }
}

/// Resolved schema of a table; `None` when the sheet has no usable header.
pub(crate) type CachedSchema = Option<Arc<ColumnSchema>>;

/// Session-scoped cache of resolved column schemas.
///
/// Every key is computed at most once, even under concurrent lookups; lookups for
/// different keys never wait on each other. A failed computation is not cached. Nothing
/// is ever invalidated: a changed spreadsheet needs a new registry.
#[derive(Default)]
pub(crate) struct SchemaRegistry {
    slots: Mutex<HashMap<TableKey, Arc<OnceCell<CachedSchema>>>>,
}

impl SchemaRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns the cached schema for `key`, or runs `compute` to produce it.
    pub(crate) fn get_or_compute<F, E>(&self, key: &TableKey, compute: F) -> Result<CachedSchema, E>
    where
        F: FnOnce() -> Result<Option<ColumnSchema>, E>,
    {
        let slot = self.slot(key);
        slot.get_or_try_init(|| {
            debug!(spreadsheet = key.spreadsheet.as_str(), sheet = key.sheet.as_str(), "computing schema");
            compute().map(|schema| schema.map(Arc::new))
        })
        .cloned()
    }

    fn slot(&self, key: &TableKey) -> Arc<OnceCell<CachedSchema>> {
        let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.entry(key.to_owned()).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::cell::CellValue;
    use crate::spreadsheet::header::HeaderResolver;
    use crate::spreadsheet::merge::MergeIndex;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    impl SchemaRegistry {
        fn get(&self, key: &TableKey) -> Option<CachedSchema> {
            let slots = self.slots.lock().unwrap();
            slots.get(key).and_then(|slot| slot.get().cloned())
        }
    }

    fn schema(values: &[&str]) -> ColumnSchema {
        let header: Vec<CellValue> = values.iter().map(|value| CellValue::text(value)).collect();
        HeaderResolver::new(&MergeIndex::default()).resolve(&header, values.len())
    }

    #[test]
    fn computes_once_and_reuses() {
        let registry = SchemaRegistry::new();
        let key = TableKey::new("book.json", "Sheet1");
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            let cached = registry
                .get_or_compute::<_, ()>(&key, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(schema(&["ID", "Name"])))
                })
                .unwrap();
            assert_eq!(cached.unwrap().names(), ["ID", "Name"]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.get(&key).is_some());
        assert!(registry.get(&TableKey::new("book.json", "Sheet2")).is_none());
    }

    #[test]
    fn no_table_is_cached_too() {
        let registry = SchemaRegistry::new();
        let key = TableKey::new("book.json", "Empty");
        let cached = registry.get_or_compute::<_, ()>(&key, || Ok(None)).unwrap();
        assert!(cached.is_none());
        let cached = registry
            .get_or_compute::<_, ()>(&key, || Ok(Some(schema(&["late"]))))
            .unwrap();
        assert!(cached.is_none());
    }

    #[test]
    fn failures_are_not_cached() {
        let registry = SchemaRegistry::new();
        let key = TableKey::new("book.json", "Sheet1");
        let failed = registry.get_or_compute(&key, || Err("quota exceeded"));
        assert_eq!(failed.unwrap_err(), "quota exceeded");
        assert!(registry.get(&key).is_none());
        let cached = registry
            .get_or_compute::<_, &str>(&key, || Ok(Some(schema(&["ID"]))))
            .unwrap();
        assert_eq!(cached.unwrap().names(), ["ID"]);
    }

    #[test]
    fn concurrent_lookups_compute_once_per_sheet() {
        let registry = Arc::new(SchemaRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|index| {
                let registry = registry.clone();
                let calls = calls.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let key = TableKey::new("book.json", if index % 2 == 0 { "Even" } else { "Odd" });
                    barrier.wait();
                    registry
                        .get_or_compute::<_, ()>(&key, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(Duration::from_millis(20));
                            Ok(Some(schema(&[key.sheet.as_str()])))
                        })
                        .unwrap()
                        .unwrap()
                        .names()
                        .to_vec()
                })
            })
            .collect();
        for handle in handles {
            let names = handle.join().unwrap();
            assert!(names == ["Even"] || names == ["Odd"]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
