//! Drag and resize gestures for images pinned to a page.
//!
//! The controller is fed every pointer event of the terminal, not only
//! those over the image, so a gesture lasts until the button is released
//! wherever the pointer wanders. Only one gesture runs at a time.

use crate::diary_entry::{DiaryImage, EntryId, EntryPatch, Point, MIN_IMAGE_SIZE};
use crate::diary_state::DiaryState;
use log::debug;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    Dragging {
        entry: EntryId,
        image: DiaryImage,
        /// Pointer position minus the image's top-left at grab time.
        offset: Point,
    },
    Resizing {
        entry: EntryId,
        image: DiaryImage,
        /// Origin of the page the image belongs to, in pointer coordinates.
        origin: Point,
    },
}

#[derive(Debug)]
pub struct ImagePlacementController {
    gesture: Gesture,
}

impl Default for ImagePlacementController {
    fn default() -> Self {
        ImagePlacementController {
            gesture: Gesture::Idle,
        }
    }
}

impl ImagePlacementController {
    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    pub fn active_image(&self) -> Option<Uuid> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::Dragging { image, .. } | Gesture::Resizing { image, .. } => Some(image.id),
        }
    }

    pub fn begin_drag(&mut self, entry: EntryId, image: &DiaryImage, pointer: Point) -> bool {
        if !self.is_idle() {
            return false;
        }
        debug!("Dragging image {}", image.id);
        self.gesture = Gesture::Dragging {
            entry,
            offset: pointer - image.position(),
            image: image.clone(),
        };
        true
    }

    pub fn begin_resize(&mut self, entry: EntryId, image: &DiaryImage, page_origin: Point) -> bool {
        if !self.is_idle() {
            return false;
        }
        debug!("Resizing image {}", image.id);
        self.gesture = Gesture::Resizing {
            entry,
            image: image.clone(),
            origin: page_origin,
        };
        true
    }

    /// Moves or resizes the active image and mirrors it into the entry's
    /// local copy. Ignored while idle.
    pub fn pointer_moved(&mut self, pointer: Point, state: &mut DiaryState) -> bool {
        let (entry, image) = match &mut self.gesture {
            Gesture::Idle => return false,
            Gesture::Dragging {
                entry,
                image,
                offset,
            } => {
                let position = pointer - *offset;
                image.x = position.x;
                image.y = position.y;
                (entry, image)
            }
            Gesture::Resizing {
                entry,
                image,
                origin,
            } => {
                image.width = (pointer.x - origin.x - image.x).max(MIN_IMAGE_SIZE);
                image.height = (pointer.y - origin.y - image.y).max(MIN_IMAGE_SIZE);
                (entry, image)
            }
        };
        let updated = image.clone();
        state.edit(entry, |e| e.replace_image(updated))
    }

    /// Ends the gesture and commits the final placement once. Ignored while
    /// idle.
    pub fn pointer_released(&mut self, state: &mut DiaryState) -> Option<(EntryId, EntryPatch)> {
        let (entry, image) = match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => return None,
            Gesture::Dragging { entry, image, .. } | Gesture::Resizing { entry, image, .. } => {
                (entry, image)
            }
        };
        debug!(
            "Placed image {} at ({}, {}) size {}x{}",
            image.id, image.x, image.y, image.width, image.height
        );
        state.edit(&entry, |e| e.replace_image(image));
        let patch = state.commit(&entry)?;
        Some((entry, patch))
    }

    /// Takes the image off its entry and commits. The caller owns releasing
    /// the returned image's blob.
    pub fn delete(
        &mut self,
        entry: &EntryId,
        image: Uuid,
        state: &mut DiaryState,
    ) -> Option<(EntryPatch, DiaryImage)> {
        if self.active_image() == Some(image) {
            self.gesture = Gesture::Idle;
        }
        let removed = state.entry(entry)?.image(image)?.clone();
        state.edit(entry, |e| {
            e.remove_image(image);
        });
        let patch = state.commit(entry)?;
        Some((patch, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diary_entry::DiaryEntry;
    use chrono::Utc;
    use std::sync::Arc;

    fn setup() -> (DiaryState, EntryId, DiaryImage) {
        let id = EntryId::new("a");
        let mut entry = DiaryEntry::new(id.clone(), Utc::now());
        let image = DiaryImage::new("file:///img.png".into());
        entry.images.push(image.clone());
        let mut state = DiaryState::new();
        state.apply_snapshot(Arc::new(vec![entry]));
        (state, id, image)
    }

    fn image_in(state: &DiaryState, entry: &EntryId, image: Uuid) -> DiaryImage {
        state.entry(entry).unwrap().image(image).unwrap().clone()
    }

    #[test]
    fn drag_follows_pointer_offset() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();

        assert!(placement.begin_drag(entry.clone(), &image, Point::new(100, 100)));
        placement.pointer_moved(Point::new(140, 130), &mut state);

        let moved = image_in(&state, &entry, image.id);
        assert_eq!(moved.position(), Point::new(90, 80));
        assert_eq!((moved.width, moved.height), (200, 150));
    }

    #[test]
    fn drag_is_not_clamped_to_page() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        placement.begin_drag(entry.clone(), &image, Point::new(60, 60));
        placement.pointer_moved(Point::new(-500, 2000), &mut state);
        assert_eq!(
            image_in(&state, &entry, image.id).position(),
            Point::new(-510, 1990)
        );
    }

    #[test]
    fn resize_snaps_corner_to_pointer() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        let origin = Point::new(10, 20);

        placement.begin_resize(entry.clone(), &image, origin);
        placement.pointer_moved(Point::new(10 + 50 + 300, 20 + 50 + 120), &mut state);

        let resized = image_in(&state, &entry, image.id);
        assert_eq!((resized.width, resized.height), (300, 120));
        assert_eq!(resized.position(), Point::new(50, 50));
    }

    #[test]
    fn resize_never_goes_below_minimum() {
        let (mut state, entry, image) = setup();
        for (px, py) in [(0, 0), (-1000, 40), (60, -3), (99, 99), (110, 110)] {
            let mut placement = ImagePlacementController::default();
            placement.begin_resize(entry.clone(), &image, Point::new(0, 0));
            placement.pointer_moved(Point::new(px, py), &mut state);
            let (_, patch) = placement.pointer_released(&mut state).unwrap();
            let committed = &patch.images.unwrap()[0];
            assert!(committed.width >= 50 && committed.height >= 50);
        }
    }

    #[test]
    fn release_commits_exactly_once() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        placement.begin_drag(entry.clone(), &image, Point::new(100, 100));
        placement.pointer_moved(Point::new(110, 100), &mut state);

        let (committed_entry, patch) = placement.pointer_released(&mut state).unwrap();
        assert_eq!(committed_entry, entry);
        assert_eq!(patch.images.unwrap()[0].position(), Point::new(60, 50));
        assert!(patch.write_token.is_some());

        assert!(placement.is_idle());
        assert!(placement.pointer_released(&mut state).is_none());
    }

    #[test]
    fn moves_while_idle_are_ignored() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        assert!(!placement.pointer_moved(Point::new(500, 500), &mut state));
        assert_eq!(image_in(&state, &entry, image.id), image);
        assert!(!state.has_local_changes(&entry));
    }

    #[test]
    fn gestures_are_exclusive() {
        let (_, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        assert!(placement.begin_drag(entry.clone(), &image, Point::new(0, 0)));
        assert!(!placement.begin_resize(entry.clone(), &image, Point::new(0, 0)));
        assert!(matches!(placement.gesture(), Gesture::Dragging { .. }));
    }

    #[test]
    fn delete_removes_image_and_commits() {
        let (mut state, entry, image) = setup();
        let mut placement = ImagePlacementController::default();
        placement.begin_drag(entry.clone(), &image, Point::new(0, 0));

        let (patch, removed) = placement.delete(&entry, image.id, &mut state).unwrap();
        assert_eq!(removed.id, image.id);
        assert!(patch.images.unwrap().is_empty());
        assert!(placement.is_idle());
        assert!(state.entry(&entry).unwrap().images.is_empty());
    }

    #[test]
    fn deleting_unknown_image_does_nothing() {
        let (mut state, entry, _) = setup();
        let mut placement = ImagePlacementController::default();
        assert!(placement.delete(&entry, Uuid::new_v4(), &mut state).is_none());
    }
}
