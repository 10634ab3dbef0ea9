//! Scoped activation of the sheet being written

use ng_data::{DataError, TabularStore};

/// Makes a sheet active for the lifetime of the guard.
///
/// Some hosts corrupt the on-screen selection when a table on an inactive
/// sheet is written. The previously active sheet is restored when the guard
/// drops, on every exit path.
pub struct ActiveSheetGuard<'a> {
    store: &'a dyn TabularStore,
    previous: Option<String>,
}

impl<'a> ActiveSheetGuard<'a> {
    /// Activate `sheet` unless it already is
    pub fn activate(store: &'a dyn TabularStore, sheet: &str) -> Result<Self, DataError> {
        let current = store.active_sheet();
        if current == sheet {
            return Ok(Self {
                store,
                previous: None,
            });
        }

        store.activate_sheet(sheet)?;
        tracing::trace!("Activated sheet '{}' (was '{}')", sheet, current);
        Ok(Self {
            store,
            previous: Some(current),
        })
    }

    /// Whether the guard changed the active sheet
    pub fn switched(&self) -> bool {
        self.previous.is_some()
    }
}

impl Drop for ActiveSheetGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            if let Err(e) = self.store.activate_sheet(&previous) {
                tracing::warn!("Could not reactivate sheet '{}': {}", previous, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ng_data::MemoryStore;

    #[test]
    fn test_guard_restores_previous_sheet() {
        let store = MemoryStore::new();
        store.add_table("Edges", "Edges", &["ID"]);
        store.add_table("Vertices", "Vertices", &["ID"]);
        assert_eq!(store.active_sheet(), "Edges");

        {
            let guard = ActiveSheetGuard::activate(&store, "Vertices").unwrap();
            assert!(guard.switched());
            assert_eq!(store.active_sheet(), "Vertices");
        }
        assert_eq!(store.active_sheet(), "Edges");
    }

    #[test]
    fn test_guard_on_active_sheet_is_a_no_op() {
        let store = MemoryStore::new();
        store.add_table("Edges", "Edges", &["ID"]);

        let guard = ActiveSheetGuard::activate(&store, "Edges").unwrap();
        assert!(!guard.switched());
        drop(guard);
        assert_eq!(store.active_sheet(), "Edges");
    }

    #[test]
    fn test_unknown_sheet_is_an_error() {
        let store = MemoryStore::new();
        store.add_table("Edges", "Edges", &["ID"]);
        assert!(ActiveSheetGuard::activate(&store, "Nope").is_err());
        assert_eq!(store.active_sheet(), "Edges");
    }
}
