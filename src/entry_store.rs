//! Live, per-user collection of diary entries.
//!
//! Writes are never answered with the new state. Callers observe them
//! through an [`EntrySubscription`], which always carries a full snapshot
//! ordered oldest first.

use crate::diary_entry::{DiaryEntry, EntryId, EntryPatch, UserId};
use crate::error::{StoreError, StoreResult};
use chrono::{DateTime, Duration, Utc};
use futures::future::BoxFuture;
use futures::Stream;
use log::{debug, info};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

pub type EntryList = Arc<Vec<DiaryEntry>>;

pub trait EntryStore: Send + Sync {
    fn subscribe(&self, user: UserId) -> BoxFuture<'_, StoreResult<EntrySubscription>>;

    fn create(&self, user: UserId) -> BoxFuture<'_, StoreResult<EntryId>>;

    /// Merges `patch` onto the stored entry. Fails with
    /// [`StoreError::NotFound`] when the entry is gone.
    fn update(&self, user: UserId, id: EntryId, patch: EntryPatch)
        -> BoxFuture<'_, StoreResult<()>>;

    /// Removing an entry that does not exist succeeds without effect.
    fn delete(&self, user: UserId, id: EntryId) -> BoxFuture<'_, StoreResult<()>>;
}

/// Receiving end of a live entry feed. Dropping it unsubscribes.
pub struct EntrySubscription {
    rx: watch::Receiver<EntryList>,
    primed: bool,
}

impl EntrySubscription {
    fn new(rx: watch::Receiver<EntryList>) -> Self {
        EntrySubscription { rx, primed: false }
    }

    /// The current snapshot on the first call, then each later snapshot as
    /// it is published. `None` once the store goes away.
    pub async fn next(&mut self) -> Option<EntryList> {
        if !self.primed {
            self.primed = true;
            return Some(self.rx.borrow_and_update().clone());
        }
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn into_stream(self) -> impl Stream<Item = EntryList> + Send {
        futures::stream::unfold(self, |mut sub| async move {
            let list = sub.next().await?;
            Some((list, sub))
        })
    }
}

struct Collection {
    entries: Vec<DiaryEntry>,
    feed: watch::Sender<EntryList>,
}

impl Collection {
    fn new(mut entries: Vec<DiaryEntry>) -> Self {
        sort_entries(&mut entries);
        let (feed, _) = watch::channel(Arc::new(entries.clone()));
        Collection { entries, feed }
    }

    fn publish(&self) {
        self.feed.send_replace(Arc::new(self.entries.clone()));
    }

    /// Creation time for a new entry, strictly after every existing one.
    fn next_timestamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        match self.entries.last() {
            Some(last) if last.timestamp >= now => last.timestamp + Duration::microseconds(1),
            _ => now,
        }
    }
}

fn sort_entries(entries: &mut [DiaryEntry]) {
    entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
}

/// Entry store backed by one JSON file per user, or by memory alone.
pub struct LocalEntryStore {
    root: Option<PathBuf>,
    collections: Mutex<HashMap<UserId, Collection>>,
}

impl LocalEntryStore {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        LocalEntryStore {
            root: Some(root.into()),
            collections: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub fn in_memory() -> Self {
        LocalEntryStore {
            root: None,
            collections: Mutex::new(HashMap::new()),
        }
    }

    fn file_for(&self, user: &UserId) -> Option<PathBuf> {
        self.root.as_ref().map(|root| {
            root.join("users")
                .join(user.as_str())
                .join("entries.json")
        })
    }

    async fn load(&self, user: &UserId) -> StoreResult<Vec<DiaryEntry>> {
        let Some(path) = self.file_for(user) else {
            return Ok(Vec::new());
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(serialized) => {
                let entries: Vec<DiaryEntry> = serde_json::from_str(&serialized)?;
                info!("Loaded {} entries for {}", entries.len(), user);
                Ok(entries)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No entry file for {}, starting empty", user);
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, user: &UserId, entries: &[DiaryEntry]) -> StoreResult<()> {
        let Some(path) = self.file_for(user) else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(entries)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serialized).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn collection_mut<'a>(
        &self,
        collections: &'a mut HashMap<UserId, Collection>,
        user: &UserId,
    ) -> StoreResult<&'a mut Collection> {
        match collections.entry(user.clone()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let entries = self.load(user).await?;
                Ok(slot.insert(Collection::new(entries)))
            }
        }
    }

    /// Applies `change` to the user's entries, then persists and publishes
    /// them when it reports a change. Nothing is published when `change`
    /// fails or persisting does.
    async fn write(
        &self,
        user: &UserId,
        change: impl FnOnce(&mut Collection) -> StoreResult<bool>,
    ) -> StoreResult<bool> {
        let mut collections = self.collections.lock().await;
        let collection = self.collection_mut(&mut collections, user).await?;

        let previous = collection.entries.clone();
        if !change(collection)? {
            return Ok(false);
        }
        sort_entries(&mut collection.entries);
        if let Err(e) = self.save(user, &collection.entries).await {
            collection.entries = previous;
            return Err(e);
        }
        collection.publish();
        Ok(true)
    }
}

impl EntryStore for LocalEntryStore {
    fn subscribe(&self, user: UserId) -> BoxFuture<'_, StoreResult<EntrySubscription>> {
        Box::pin(async move {
            let mut collections = self.collections.lock().await;
            let rx = self
                .collection_mut(&mut collections, &user)
                .await?
                .feed
                .subscribe();
            debug!("Subscribed to entries of {}", user);
            Ok(EntrySubscription::new(rx))
        })
    }

    fn create(&self, user: UserId) -> BoxFuture<'_, StoreResult<EntryId>> {
        Box::pin(async move {
            let id = EntryId::new(Uuid::new_v4().simple().to_string());
            self.write(&user, |c| {
                let entry = DiaryEntry::new(id.clone(), c.next_timestamp());
                c.entries.push(entry);
                Ok(true)
            })
            .await?;
            info!("Created entry {} for {}", id, user);
            Ok(id)
        })
    }

    fn update(
        &self,
        user: UserId,
        id: EntryId,
        patch: EntryPatch,
    ) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.write(&user, |c| {
                let entry = c
                    .entries
                    .iter_mut()
                    .find(|e| e.id == id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?;
                patch.apply_to(entry);
                Ok(true)
            })
            .await?;
            debug!("Updated entry {} for {}", id, user);
            Ok(())
        })
    }

    fn delete(&self, user: UserId, id: EntryId) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let removed = self
                .write(&user, |c| {
                    let before = c.entries.len();
                    c.entries.retain(|e| e.id != id);
                    Ok(c.entries.len() != before)
                })
                .await?;
            if removed {
                info!("Deleted entry {} for {}", id, user);
            } else {
                debug!("Entry {} for {} already gone", id, user);
            }
            Ok(())
        })
    }
}
