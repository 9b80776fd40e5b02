//! Screen geometry of the open book and the mapping between terminal cells
//! and page units.

use crate::diary_entry::{DiaryImage, Point};
use crate::pagination::PageStride;
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Page units covered by one terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellScale {
    pub width: i32,
    pub height: i32,
}

impl CellScale {
    pub fn new(width: i32, height: i32) -> Self {
        CellScale {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Pointer position of a cell, taken at the cell's centre.
    pub fn pointer(&self, column: u16, row: u16) -> Point {
        Point::new(
            column as i32 * self.width + self.width / 2,
            row as i32 * self.height + self.height / 2,
        )
    }

    pub fn origin(&self, page: Rect) -> Point {
        Point::new(page.x as i32 * self.width, page.y as i32 * self.height)
    }

    /// Cells covered by `image` on a page whose content starts at `page`.
    pub fn image_cells(&self, page: Rect, image: &DiaryImage) -> CellBox {
        let left = page.x as i32 + image.x.div_euclid(self.width);
        let top = page.y as i32 + image.y.div_euclid(self.height);
        let right = page.x as i32 + ceil_div(image.x + image.width, self.width);
        let bottom = page.y as i32 + ceil_div(image.y + image.height, self.height);
        CellBox {
            left,
            top,
            right: right.max(left + 1),
            bottom: bottom.max(top + 1),
        }
    }
}

fn ceil_div(a: i32, b: i32) -> i32 {
    -((-a).div_euclid(b))
}

/// Half-open box of cells; may extend past the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImagePart {
    Body,
    ResizeHandle,
    DeleteHandle,
}

impl CellBox {
    pub fn contains(&self, column: u16, row: u16) -> bool {
        let (c, r) = (column as i32, row as i32);
        c >= self.left && c < self.right && r >= self.top && r < self.bottom
    }

    pub fn part_at(&self, column: u16, row: u16) -> Option<ImagePart> {
        if !self.contains(column, row) {
            return None;
        }
        let (c, r) = (column as i32, row as i32);
        let last_column = c == self.right - 1;
        if last_column && r == self.bottom - 1 {
            Some(ImagePart::ResizeHandle)
        } else if last_column && r == self.top {
            Some(ImagePart::DeleteHandle)
        } else {
            Some(ImagePart::Body)
        }
    }

    /// The visible part of the box within `clip`.
    pub fn clip(&self, clip: Rect) -> Option<Rect> {
        let left = self.left.max(clip.x as i32);
        let top = self.top.max(clip.y as i32);
        let right = self.right.min(clip.x as i32 + clip.width as i32);
        let bottom = self.bottom.min(clip.y as i32 + clip.height as i32);
        if left >= right || top >= bottom {
            return None;
        }
        Some(Rect::new(
            left as u16,
            top as u16,
            (right - left) as u16,
            (bottom - top) as u16,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookLayout {
    pub header: Rect,
    /// Outer rectangle of each page, left to right.
    pub pages: Vec<Rect>,
    pub footer: Rect,
}

impl BookLayout {
    pub fn compute(area: Rect, stride: PageStride) -> Self {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(area);

        let pages = match stride {
            PageStride::Single => vec![rows[1]],
            PageStride::Double => Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[1])
                .to_vec(),
        };

        BookLayout {
            header: rows[0],
            pages,
            footer: rows[2],
        }
    }

    /// Drawable area inside the border of page `slot`; its top-left corner is
    /// the page origin.
    pub fn page_inner(&self, slot: usize) -> Option<Rect> {
        let outer = self.pages.get(slot)?;
        Some(Rect::new(
            outer.x.saturating_add(1),
            outer.y.saturating_add(1),
            outer.width.saturating_sub(2),
            outer.height.saturating_sub(2),
        ))
    }

    pub fn slot_at(&self, column: u16, row: u16) -> Option<usize> {
        self.pages.iter().position(|page| {
            column >= page.x
                && column < page.x + page.width
                && row >= page.y
                && row < page.y + page.height
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> CellScale {
        CellScale::new(10, 20)
    }

    fn page() -> Rect {
        Rect::new(3, 4, 60, 30)
    }

    #[test]
    fn default_image_covers_expected_cells() {
        let image = DiaryImage::new("file:///a.png".into());
        let cells = scale().image_cells(page(), &image);
        assert_eq!(
            cells,
            CellBox {
                left: 8,
                top: 6,
                right: 28,
                bottom: 14
            }
        );
    }

    #[test]
    fn handles_sit_on_right_corners() {
        let image = DiaryImage::new("file:///a.png".into());
        let cells = scale().image_cells(page(), &image);
        assert_eq!(cells.part_at(27, 13), Some(ImagePart::ResizeHandle));
        assert_eq!(cells.part_at(27, 6), Some(ImagePart::DeleteHandle));
        assert_eq!(cells.part_at(8, 6), Some(ImagePart::Body));
        assert_eq!(cells.part_at(28, 6), None);
    }

    #[test]
    fn grabbing_resize_handle_keeps_size() {
        let scale = scale();
        let image = DiaryImage::new("file:///a.png".into());
        let pointer = scale.pointer(27, 13);
        let origin = scale.origin(page());
        let width = pointer.x - origin.x - image.x;
        let height = pointer.y - origin.y - image.y;
        let resized = DiaryImage {
            width,
            height,
            ..image.clone()
        };
        assert_eq!(
            scale.image_cells(page(), &resized),
            scale.image_cells(page(), &image)
        );
    }

    #[test]
    fn negative_positions_round_down() {
        let mut image = DiaryImage::new("file:///a.png".into());
        image.x = -5;
        let cells = scale().image_cells(page(), &image);
        assert_eq!(cells.left, 2);
    }

    #[test]
    fn clip_drops_offscreen_boxes() {
        let cells = CellBox {
            left: -10,
            top: 0,
            right: -2,
            bottom: 3,
        };
        assert_eq!(cells.clip(page()), None);

        let cells = CellBox {
            left: 50,
            top: 30,
            right: 80,
            bottom: 40,
        };
        assert_eq!(cells.clip(page()), Some(Rect::new(50, 30, 13, 4)));
    }

    #[test]
    fn two_up_layout_has_two_pages() {
        let layout = BookLayout::compute(Rect::new(0, 0, 120, 40), PageStride::Double);
        assert_eq!(layout.pages.len(), 2);
        assert_eq!(layout.slot_at(1, 10), Some(0));
        assert_eq!(layout.slot_at(118, 10), Some(1));
        assert_eq!(layout.slot_at(119, 10), None);
        assert_eq!(layout.slot_at(1, 1), None);

        let single = BookLayout::compute(Rect::new(0, 0, 80, 40), PageStride::Single);
        assert_eq!(single.pages.len(), 1);
    }
}
