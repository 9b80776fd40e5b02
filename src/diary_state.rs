//! Store snapshots with local, not yet confirmed edits laid over them.
//!
//! An edited entry gets a shadow copy. Committing a shadow stamps it with a
//! fresh [`WriteToken`]; the shadow is dropped once a snapshot arrives whose
//! entry carries that same token and nothing was edited since. Matching on
//! the token rather than on field values keeps a later external change from
//! being hidden behind a stale shadow.

use crate::diary_entry::{DiaryEntry, EntryId, EntryPatch, WriteToken};
use crate::entry_store::EntryList;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Shadow {
    entry: DiaryEntry,
    dirty: bool,
    in_flight: Option<WriteToken>,
}

#[derive(Default)]
pub struct DiaryState {
    snapshot: EntryList,
    shadows: HashMap<EntryId, Shadow>,
}

impl DiaryState {
    pub fn new() -> Self {
        DiaryState {
            snapshot: Arc::new(Vec::new()),
            shadows: HashMap::new(),
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: EntryList) {
        self.shadows.retain(|id, shadow| {
            let Some(stored) = snapshot.iter().find(|e| e.id == *id) else {
                debug!("Dropping shadow of removed entry {}", id);
                return false;
            };
            match shadow.in_flight {
                Some(token) if stored.write_token == Some(token) => {
                    shadow.in_flight = None;
                    if shadow.dirty {
                        true
                    } else {
                        debug!("Write to {} confirmed", id);
                        false
                    }
                }
                _ => true,
            }
        });
        self.snapshot = snapshot;
    }

    /// The snapshot with every shadow copy in place of its stored entry.
    pub fn entries(&self) -> Vec<DiaryEntry> {
        self.snapshot
            .iter()
            .map(|stored| match self.shadows.get(&stored.id) {
                Some(shadow) => shadow.entry.clone(),
                None => stored.clone(),
            })
            .collect()
    }

    pub fn entry(&self, id: &EntryId) -> Option<&DiaryEntry> {
        if let Some(shadow) = self.shadows.get(id) {
            return Some(&shadow.entry);
        }
        self.snapshot.iter().find(|e| e.id == *id)
    }

    pub fn has_local_changes(&self, id: &EntryId) -> bool {
        self.shadows.get(id).is_some_and(|s| s.dirty)
    }

    fn shadow_mut(&mut self, id: &EntryId) -> Option<&mut Shadow> {
        if !self.shadows.contains_key(id) {
            let stored = self.snapshot.iter().find(|e| e.id == *id)?.clone();
            self.shadows.insert(
                id.clone(),
                Shadow {
                    entry: stored,
                    dirty: false,
                    in_flight: None,
                },
            );
        }
        self.shadows.get_mut(id)
    }

    /// Applies a local edit. Returns false when the entry is unknown.
    pub fn edit(&mut self, id: &EntryId, f: impl FnOnce(&mut DiaryEntry)) -> bool {
        let Some(shadow) = self.shadow_mut(id) else {
            return false;
        };
        f(&mut shadow.entry);
        shadow.dirty = true;
        true
    }

    /// Stamps the entry's local state with a new token and returns the patch
    /// to persist.
    pub fn commit(&mut self, id: &EntryId) -> Option<EntryPatch> {
        let shadow = self.shadow_mut(id)?;
        let token = WriteToken::generate();
        shadow.in_flight = Some(token);
        shadow.dirty = false;
        shadow.entry.write_token = Some(token);
        Some(shadow.entry.to_patch(token))
    }

    /// Keeps the local copy after a failed write and marks it for the next
    /// save. Nothing is rolled back.
    pub fn write_failed(&mut self, id: &EntryId, token: WriteToken) {
        if let Some(shadow) = self.shadows.get_mut(id) {
            if shadow.in_flight == Some(token) {
                shadow.in_flight = None;
                shadow.dirty = true;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stored(id: &str, title: &str, token: Option<WriteToken>) -> DiaryEntry {
        let mut entry = DiaryEntry::new(
            EntryId::new(id),
            Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        );
        entry.title = title.to_string();
        entry.write_token = token;
        entry
    }

    fn snapshot(entries: Vec<DiaryEntry>) -> EntryList {
        Arc::new(entries)
    }

    fn id() -> EntryId {
        EntryId::new("a")
    }

    #[test]
    fn local_edit_overlays_snapshot() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));

        assert!(state.edit(&id(), |e| e.title = "new".into()));
        assert_eq!(state.entries()[0].title, "new");
        assert!(state.has_local_changes(&id()));
    }

    #[test]
    fn edit_of_unknown_entry_is_refused() {
        let mut state = DiaryState::new();
        assert!(!state.edit(&id(), |e| e.title = "x".into()));
        assert!(state.commit(&id()).is_none());
    }

    #[test]
    fn snapshot_mid_edit_does_not_clobber_shadow() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.content = "typing".into());

        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        assert_eq!(state.entries()[0].content, "typing");
    }

    #[test]
    fn matching_token_clears_shadow() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.title = "T".into());
        let patch = state.commit(&id()).unwrap();
        assert_eq!(patch.title.as_deref(), Some("T"));

        state.apply_snapshot(snapshot(vec![stored("a", "T", patch.write_token)]));
        assert!(!state.has_local_changes(&id()));

        // With the shadow gone the next snapshot is shown as is.
        state.apply_snapshot(snapshot(vec![stored("a", "from elsewhere", None)]));
        assert_eq!(state.entries()[0].title, "from elsewhere");
    }

    #[test]
    fn equal_value_without_token_keeps_shadow() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.title = "T".into());
        state.commit(&id()).unwrap();

        let other = WriteToken::generate();
        state.apply_snapshot(snapshot(vec![stored("a", "T", Some(other))]));
        state.apply_snapshot(snapshot(vec![stored("a", "later", Some(other))]));
        assert_eq!(state.entries()[0].title, "T");
    }

    #[test]
    fn edits_after_commit_survive_confirmation() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.title = "first".into());
        let patch = state.commit(&id()).unwrap();
        state.edit(&id(), |e| e.title = "second".into());

        state.apply_snapshot(snapshot(vec![stored("a", "first", patch.write_token)]));
        assert_eq!(state.entries()[0].title, "second");
        assert!(state.has_local_changes(&id()));
    }

    #[test]
    fn removed_entry_drops_its_shadow() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.title = "new".into());

        state.apply_snapshot(snapshot(Vec::new()));
        assert!(state.entries().is_empty());
        assert!(state.entry(&id()).is_none());
    }

    #[test]
    fn failed_write_keeps_local_copy_for_retry() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![stored("a", "old", None)]));
        state.edit(&id(), |e| e.title = "new".into());
        let token = state.commit(&id()).unwrap().write_token.unwrap();

        state.write_failed(&id(), token);
        assert!(state.has_local_changes(&id()));
        assert_eq!(state.entries()[0].title, "new");
    }

    #[test]
    fn merged_order_follows_snapshot() {
        let mut state = DiaryState::new();
        state.apply_snapshot(snapshot(vec![
            stored("a", "1", None),
            stored("b", "2", None),
        ]));
        state.edit(&EntryId::new("b"), |e| e.title = "two".into());
        let titles: Vec<_> = state.entries().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["1", "two"]);
    }
}
