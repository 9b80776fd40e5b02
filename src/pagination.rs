//! Two-up (or one-up) paging over the ordered entry list.
//!
//! `current_index` is the index of the entry on the left page. A flip is a
//! timed transition: it is accepted immediately, but the index only moves
//! once [`PaginationController::tick`] observes that the flip delay has
//! passed. While a flip is in flight every other flip request is dropped.

use crate::diary_entry::{DiaryEntry, EntryId};
use log::debug;
use std::collections::HashSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStride {
    Single,
    Double,
}

impl PageStride {
    pub fn get(self) -> usize {
        match self {
            PageStride::Single => 1,
            PageStride::Double => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    target: usize,
    started: Instant,
}

pub struct PaginationController {
    entries: Vec<DiaryEntry>,
    current_index: usize,
    stride: PageStride,
    flip_delay: Duration,
    in_flight: Option<InFlight>,
    flip_direction: FlipDirection,
    /// Entry created locally whose spread we still have to navigate to.
    pending_created: Option<EntryId>,
    /// Entries whose deletion was already accounted for in the index.
    locally_removed: HashSet<EntryId>,
}

impl PaginationController {
    pub fn new(flip_delay: Duration) -> Self {
        PaginationController {
            entries: Vec::new(),
            current_index: 0,
            stride: PageStride::Double,
            flip_delay,
            in_flight: None,
            flip_direction: FlipDirection::Forward,
            pending_created: None,
            locally_removed: HashSet::new(),
        }
    }

    pub fn entries(&self) -> &[DiaryEntry] {
        &self.entries
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn stride(&self) -> PageStride {
        self.stride
    }

    pub fn is_flipping(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn flip_direction(&self) -> FlipDirection {
        self.flip_direction
    }

    /// Fraction of the running flip animation that has elapsed.
    pub fn flip_progress(&self, now: Instant) -> Option<f64> {
        let flight = self.in_flight?;
        if self.flip_delay.is_zero() {
            return Some(1.0);
        }
        let elapsed = now.saturating_duration_since(flight.started);
        Some((elapsed.as_secs_f64() / self.flip_delay.as_secs_f64()).min(1.0))
    }

    /// One slot per page of the spread; `None` is a blank page.
    pub fn visible_pages(&self) -> Vec<Option<&DiaryEntry>> {
        (0..self.stride.get())
            .map(|offset| self.entries.get(self.current_index + offset))
            .collect()
    }

    pub fn can_flip_back(&self) -> bool {
        !self.is_flipping() && self.current_index != 0
    }

    pub fn can_flip_forward(&self) -> bool {
        let last = self.entries.len() as isize - self.stride.get() as isize;
        !self.is_flipping() && (self.current_index as isize) < last
    }

    /// Starts a flip one stride in `direction`. Returns whether it was
    /// accepted; requests during a running flip are dropped.
    pub fn flip(&mut self, direction: FlipDirection, now: Instant) -> bool {
        if self.is_flipping() {
            return false;
        }
        let stride = self.stride.get();
        let target = match direction {
            FlipDirection::Forward => self.current_index + stride,
            FlipDirection::Backward => match self.current_index.checked_sub(stride) {
                Some(target) => target,
                None => return false,
            },
        };
        if target > self.entries.len() {
            return false;
        }
        self.start_flip(target, now);
        true
    }

    fn start_flip(&mut self, target: usize, now: Instant) {
        self.flip_direction = if target >= self.current_index {
            FlipDirection::Forward
        } else {
            FlipDirection::Backward
        };
        debug!(
            "Flipping {:?} from {} to {}",
            self.flip_direction, self.current_index, target
        );
        self.in_flight = Some(InFlight {
            target,
            started: now,
        });
    }

    /// Commits a running flip once its delay has passed. Returns whether the
    /// index moved.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(flight) = self.in_flight else {
            return false;
        };
        if now.saturating_duration_since(flight.started) < self.flip_delay {
            return false;
        }
        self.in_flight = None;
        // The list may have shrunk mid-flip; land on a whole spread.
        let stride = self.stride.get();
        self.current_index = flight.target.min(self.entries.len()) / stride * stride;
        self.navigate_to_created(now);
        true
    }

    /// Replaces the entry list with a new snapshot, keeping the current
    /// page unless the list shrank past it.
    pub fn on_entries_changed(&mut self, entries: Vec<DiaryEntry>, now: Instant) {
        let shrank = entries.len() < self.entries.len();
        let removed: Vec<EntryId> = self
            .entries
            .iter()
            .filter(|old| !entries.iter().any(|e| e.id == old.id))
            .map(|old| old.id.clone())
            .collect();
        let accounted_for = !removed.is_empty()
            && removed.iter().all(|id| self.locally_removed.contains(id));
        self.locally_removed
            .retain(|id| entries.iter().any(|e| e.id == *id));

        self.entries = entries;
        if shrank && !accounted_for {
            self.clamp_after_removal(self.entries.len());
        }
        self.navigate_to_created(now);
    }

    /// Records that `id` was just created; the controller moves to the
    /// spread holding it as soon as a snapshot containing it is seen.
    pub fn on_entry_created(&mut self, id: EntryId, now: Instant) {
        self.pending_created = Some(id);
        self.navigate_to_created(now);
    }

    /// Adjusts the index for a confirmed local deletion before the store
    /// reflects it, using the length the list has now.
    pub fn on_entry_deleted(&mut self, id: EntryId) {
        if !self.entries.iter().any(|e| e.id == id) {
            return;
        }
        self.clamp_after_removal(self.entries.len());
        self.locally_removed.insert(id);
    }

    /// Forgets a local deletion the store rejected, so a later removal of
    /// the same entry clamps normally. The earlier clamp is not undone.
    pub fn on_delete_failed(&mut self, id: &EntryId) {
        self.locally_removed.remove(id);
    }

    pub fn set_stride(&mut self, stride: PageStride) {
        if self.stride == stride {
            return;
        }
        debug!("Page stride now {:?}", stride);
        self.stride = stride;
        if stride == PageStride::Double {
            self.current_index -= self.current_index % 2;
            if let Some(flight) = self.in_flight.as_mut() {
                flight.target -= flight.target % 2;
            }
        }
    }

    /// Steps back one stride when the index sits on or past the trailing
    /// spread of a list of `len` entries.
    fn clamp_after_removal(&mut self, len: usize) {
        let stride = self.stride.get();
        if self.current_index > 0 && self.current_index as isize >= len as isize - stride as isize
        {
            let clamped = self.current_index.saturating_sub(stride);
            debug!("Clamping page index {} -> {}", self.current_index, clamped);
            self.current_index = clamped;
        }
    }

    fn navigate_to_created(&mut self, now: Instant) {
        if self.is_flipping() {
            return;
        }
        let Some(id) = &self.pending_created else {
            return;
        };
        let Some(pos) = self.entries.iter().position(|e| e.id == *id) else {
            return;
        };
        self.pending_created = None;
        let stride = self.stride.get();
        let target = pos / stride * stride;
        if target != self.current_index {
            self.start_flip(target, now);
        }
    }
}
