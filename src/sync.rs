use futures::lock::Mutex;

use crate::config::{SHEETS_KEY, TAGS_KEY};
use crate::library::Library;
use crate::model::{Sheet, Tag};
use crate::storage::StorageAdapter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved,
    /// A snapshot at least this new was already written.
    Stale,
    Failed,
}

/// Keeps a `Library` and extension storage in step: load once, then write
/// full snapshots of both records after every change.
pub struct LibrarySync {
    storage: StorageAdapter,
    /// Last revision written successfully. Holding the lock for the whole
    /// save keeps writes in order.
    saved_revision: Mutex<u64>,
}

impl LibrarySync {
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            saved_revision: Mutex::new(0),
        }
    }

    pub fn storage(&self) -> &StorageAdapter {
        &self.storage
    }

    /// A record that fails to load starts out empty.
    pub async fn hydrate(&self) -> Library {
        let (sheets, tags) = futures::join!(
            self.storage.load::<Sheet>(SHEETS_KEY),
            self.storage.load::<Tag>(TAGS_KEY)
        );
        let sheets = sheets.unwrap_or_else(|err| {
            log::error!("Error loading sheets from storage: {err}");
            Vec::new()
        });
        let tags = tags.unwrap_or_else(|err| {
            log::error!("Error loading tags from storage: {err}");
            Vec::new()
        });
        log::info!(
            "Loaded {} sheets and {} tags from storage",
            sheets.len(),
            tags.len()
        );
        Library::from_parts(sheets, tags)
    }

    pub async fn persist(&self, snapshot: &Library) -> PersistOutcome {
        let mut saved = self.saved_revision.lock().await;
        if snapshot.revision() <= *saved {
            log::debug!(
                "Skipping save of revision {} (revision {} already stored)",
                snapshot.revision(),
                *saved
            );
            return PersistOutcome::Stale;
        }

        let mut failed = false;
        if let Err(err) = self.storage.save(SHEETS_KEY, snapshot.sheets()).await {
            log::error!("Error saving sheets to storage: {err}");
            failed = true;
        }
        if let Err(err) = self.storage.save(TAGS_KEY, snapshot.tags()).await {
            log::error!("Error saving tags to storage: {err}");
            failed = true;
        }
        if failed {
            return PersistOutcome::Failed;
        }

        *saved = snapshot.revision();
        log::info!(
            "Data saved to storage: {} sheets, {} tags (revision {})",
            snapshot.sheets().len(),
            snapshot.tags().len(),
            snapshot.revision()
        );
        PersistOutcome::Saved
    }
}
