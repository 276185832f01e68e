//! Local persistence of the annotation store
//!
//! The whole store is written as JSON under one storage key. Saves are
//! debounced: every request restarts a short quiet window and only the last
//! one writes, so a burst of strokes costs a single write.
//!
//! Nothing here is allowed to take the session down. Unreadable or malformed
//! data loads as "nothing stored" and failed writes are logged.

use crate::config::MarkupConfig;
use crate::error::MarkupResult;
use crate::session::SessionMode;
use crate::store::AnnotationStore;
use pdf_markup_scheduler::Debouncer;
use pdf_markup_storage::LocalStorage;
use std::time::Instant;

pub struct PersistenceManager<S: LocalStorage> {
    storage: S,

    /// Storage key holding the serialized store
    key: String,

    /// Single pending save
    debouncer: Debouncer<()>,

    /// Completed writes, for diagnostics
    writes: u64,
}

impl<S: LocalStorage> PersistenceManager<S> {
    pub fn new(storage: S, config: &MarkupConfig) -> Self {
        Self {
            storage,
            key: config.storage_key.clone(),
            debouncer: Debouncer::new(config.save_debounce()),
            writes: 0,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn write_count(&self) -> u64 {
        self.writes
    }

    /// Load the stored set into `store`
    ///
    /// Returns `true` if `store` was replaced. Missing or malformed data
    /// leaves `store` as it was.
    pub fn load(&self, store: &mut AnnotationStore) -> bool {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %self.key, "no stored annotations");
                return false;
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to read stored annotations");
                return false;
            }
        };

        match AnnotationStore::from_json(&raw) {
            Ok(loaded) => {
                tracing::debug!(strokes = loaded.stroke_count(), "loaded stored annotations");
                store.replace_with(loaded);
                true
            }
            Err(err) => {
                tracing::warn!(
                    key = %self.key,
                    error = %err,
                    "ignoring malformed stored annotations"
                );
                false
            }
        }
    }

    /// Ask for a save after the quiet window
    ///
    /// No-op in shared mode: a shared set must never overwrite the user's own
    /// annotations.
    pub fn request_save(&mut self, now: Instant, mode: SessionMode) {
        if mode == SessionMode::Shared {
            tracing::trace!("save suppressed in shared mode");
            return;
        }
        self.debouncer.schedule(now, ());
    }

    /// Drop the pending save, if any
    pub fn cancel_pending(&mut self) -> bool {
        self.debouncer.cancel_pending().is_some()
    }

    pub fn has_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// When the pending save is due
    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }

    /// Write if the pending save is due; returns `true` if a write happened
    pub fn poll(&mut self, now: Instant, store: &AnnotationStore, mode: SessionMode) -> bool {
        match self.debouncer.poll(now) {
            Some(()) => self.write_guarded(store, mode),
            None => false,
        }
    }

    /// Write any pending save immediately
    pub fn flush(&mut self, store: &AnnotationStore, mode: SessionMode) -> bool {
        match self.debouncer.fire_now() {
            Some(()) => self.write_guarded(store, mode),
            None => false,
        }
    }

    /// Unconditional write, bypassing the debounce and the mode check
    ///
    /// A store without any page entry loads the same as a missing key, so
    /// the key is removed instead of holding `{}`.
    pub fn save_now(&mut self, store: &AnnotationStore) -> MarkupResult<()> {
        if store.pages().next().is_none() {
            self.storage.remove_item(&self.key)?;
            self.writes += 1;
            tracing::debug!(key = %self.key, "removed empty annotations");
            return Ok(());
        }

        let json = store.to_json()?;
        self.storage.set_item(&self.key, &json)?;
        self.writes += 1;
        tracing::debug!(bytes = json.len(), strokes = store.stroke_count(), "saved annotations");
        Ok(())
    }

    fn write_guarded(&mut self, store: &AnnotationStore, mode: SessionMode) -> bool {
        // The mode may have flipped while the save was pending
        if mode == SessionMode::Shared {
            return false;
        }
        match self.save_now(store) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to save annotations");
                false
            }
        }
    }
}
