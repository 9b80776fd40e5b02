use crate::diary_entry::EntryId;
use crate::pagination::PaginationController;
use log::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Entry(EntryId),
    Image { entry: EntryId, image: Uuid },
}

/// Two-step confirmation in front of every destructive action. Only one
/// target can be pending; a new request replaces it.
#[derive(Debug, Default, PartialEq, Eq)]
pub enum DeleteConfirmation {
    #[default]
    Idle,
    Confirming(DeleteTarget),
}

impl DeleteConfirmation {
    pub fn request(&mut self, target: DeleteTarget) {
        debug!("Confirming deletion of {:?}", target);
        *self = DeleteConfirmation::Confirming(target);
    }

    pub fn pending(&self) -> Option<&DeleteTarget> {
        match self {
            DeleteConfirmation::Idle => None,
            DeleteConfirmation::Confirming(target) => Some(target),
        }
    }

    /// Returns the target to delete and goes back to idle. Deleting an
    /// entry moves the page index back if it sat on the trailing spread.
    pub fn confirm(&mut self, pagination: &mut PaginationController) -> Option<DeleteTarget> {
        let DeleteConfirmation::Confirming(target) = std::mem::take(self) else {
            return None;
        };
        if let DeleteTarget::Entry(id) = &target {
            pagination.on_entry_deleted(id.clone());
        }
        Some(target)
    }

    pub fn cancel(&mut self) {
        *self = DeleteConfirmation::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary_entry::DiaryEntry;
    use crate::pagination::FlipDirection;
    use chrono::{TimeZone, Utc};
    use std::time::{Duration, Instant};

    fn pages_at(len: usize, flips: usize) -> PaginationController {
        let mut now = Instant::now();
        let mut pages = PaginationController::new(Duration::ZERO);
        let entries = (0..len)
            .map(|n| {
                DiaryEntry::new(
                    EntryId::new(format!("e{n}")),
                    Utc.timestamp_opt(1_700_000_000 + n as i64, 0).unwrap(),
                )
            })
            .collect();
        pages.on_entries_changed(entries, now);
        for _ in 0..flips {
            pages.flip(FlipDirection::Forward, now);
            now += Duration::from_millis(1);
            pages.tick(now);
        }
        pages
    }

    #[test]
    fn confirm_returns_target_and_resets() {
        let mut pages = pages_at(2, 0);
        let mut flow = DeleteConfirmation::default();
        flow.request(DeleteTarget::Entry(EntryId::new("e1")));

        assert_eq!(
            flow.confirm(&mut pages),
            Some(DeleteTarget::Entry(EntryId::new("e1")))
        );
        assert_eq!(flow, DeleteConfirmation::Idle);
        assert_eq!(flow.confirm(&mut pages), None);
    }

    #[test]
    fn cancel_has_no_side_effects() {
        let mut pages = pages_at(3, 1);
        let mut flow = DeleteConfirmation::default();
        flow.request(DeleteTarget::Entry(EntryId::new("e2")));
        flow.cancel();

        assert!(flow.pending().is_none());
        assert_eq!(pages.current_index(), 2);
        assert_eq!(flow.confirm(&mut pages), None);
    }

    #[test]
    fn last_request_wins() {
        let mut pages = pages_at(2, 0);
        let mut flow = DeleteConfirmation::default();
        flow.request(DeleteTarget::Entry(EntryId::new("e0")));
        flow.request(DeleteTarget::Entry(EntryId::new("e1")));
        assert_eq!(
            flow.confirm(&mut pages),
            Some(DeleteTarget::Entry(EntryId::new("e1")))
        );
    }

    #[test]
    fn deleting_last_page_of_trailing_spread_clamps() {
        let mut pages = pages_at(3, 1);
        assert_eq!(pages.current_index(), 2);

        let mut flow = DeleteConfirmation::default();
        flow.request(DeleteTarget::Entry(EntryId::new("e2")));
        flow.confirm(&mut pages);
        assert_eq!(pages.current_index(), 0);
    }

    #[test]
    fn image_deletion_leaves_index_alone() {
        let mut pages = pages_at(3, 1);
        let mut flow = DeleteConfirmation::default();
        flow.request(DeleteTarget::Image {
            entry: EntryId::new("e2"),
            image: Uuid::new_v4(),
        });
        assert!(matches!(
            flow.confirm(&mut pages),
            Some(DeleteTarget::Image { .. })
        ));
        assert_eq!(pages.current_index(), 2);
    }
}
