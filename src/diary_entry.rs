use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub const DEFAULT_TITLE: &str = "A New Chapter";
pub const DEFAULT_CONTENT: &str = "Once upon a time...";

pub const MIN_IMAGE_SIZE: i32 = 50;
pub const DEFAULT_IMAGE_WIDTH: i32 = 200;
pub const DEFAULT_IMAGE_HEIGHT: i32 = 150;
pub const DEFAULT_IMAGE_POSITION: Point = Point { x: 50, y: 50 };

/// Store-assigned identifier of a diary entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Attached to every commit and echoed back by the stored entry, so a
/// snapshot can be matched to the write that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteToken(Uuid);

impl WriteToken {
    pub fn generate() -> Self {
        WriteToken(Uuid::new_v4())
    }
}

/// A position in page units, relative to a page's origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Point { x, y }
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryImage {
    pub id: Uuid,
    pub src: String,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl DiaryImage {
    pub fn new(src: String) -> Self {
        DiaryImage {
            id: Uuid::new_v4(),
            src,
            x: DEFAULT_IMAGE_POSITION.x,
            y: DEFAULT_IMAGE_POSITION.y,
            width: DEFAULT_IMAGE_WIDTH,
            height: DEFAULT_IMAGE_HEIGHT,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaryEntry {
    pub id: EntryId,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub images: Vec<DiaryImage>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_token: Option<WriteToken>,
}

impl DiaryEntry {
    /// A fresh entry with the default title and content.
    pub fn new(id: EntryId, timestamp: DateTime<Utc>) -> Self {
        DiaryEntry {
            id,
            title: DEFAULT_TITLE.to_string(),
            content: DEFAULT_CONTENT.to_string(),
            images: Vec::new(),
            tags: Vec::new(),
            timestamp,
            write_token: None,
        }
    }

    /// Adds `tag` unless it is already present. Returns whether it was added.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        if self.tags.iter().any(|t| t == tag) {
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn image(&self, id: Uuid) -> Option<&DiaryImage> {
        self.images.iter().find(|img| img.id == id)
    }

    pub fn replace_image(&mut self, updated: DiaryImage) {
        if let Some(img) = self.images.iter_mut().find(|img| img.id == updated.id) {
            *img = updated;
        }
    }

    pub fn remove_image(&mut self, id: Uuid) -> Option<DiaryImage> {
        let pos = self.images.iter().position(|img| img.id == id)?;
        Some(self.images.remove(pos))
    }

    /// Patch carrying every editable field of this entry.
    pub fn to_patch(&self, token: WriteToken) -> EntryPatch {
        EntryPatch {
            title: Some(self.title.clone()),
            content: Some(self.content.clone()),
            images: Some(self.images.clone()),
            tags: Some(self.tags.clone()),
            write_token: Some(token),
        }
    }
}

/// Partial update merged onto a stored entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<DiaryImage>>,
    pub tags: Option<Vec<String>>,
    pub write_token: Option<WriteToken>,
}

impl EntryPatch {
    #[cfg(test)]
    pub fn title(title: impl Into<String>) -> Self {
        EntryPatch {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(self, entry: &mut DiaryEntry) {
        if let Some(title) = self.title {
            entry.title = title;
        }
        if let Some(content) = self.content {
            entry.content = content;
        }
        if let Some(images) = self.images {
            entry.images = images;
        }
        if let Some(tags) = self.tags {
            entry.tags = tags;
        }
        if self.write_token.is_some() {
            entry.write_token = self.write_token;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_has_placeholder_fields() {
        let entry = DiaryEntry::new(EntryId::new("a"), Utc::now());
        assert_eq!(entry.title, "A New Chapter");
        assert_eq!(entry.content, "Once upon a time...");
        assert!(entry.images.is_empty());
        assert!(entry.tags.is_empty());
    }

    #[test]
    fn add_tag_rejects_duplicates() {
        let mut entry = DiaryEntry::new(EntryId::new("a"), Utc::now());
        assert!(entry.add_tag("travel"));
        assert!(!entry.add_tag("travel"));
        assert_eq!(entry.tags, vec!["travel".to_string()]);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let mut entry = DiaryEntry::new(EntryId::new("a"), Utc::now());
        entry.tags.push("keep".into());
        EntryPatch::title("Rainy day").apply_to(&mut entry);
        assert_eq!(entry.title, "Rainy day");
        assert_eq!(entry.content, DEFAULT_CONTENT);
        assert_eq!(entry.tags, vec!["keep".to_string()]);
        assert!(entry.write_token.is_none());
    }

    #[test]
    fn new_image_uses_default_placement() {
        let img = DiaryImage::new("file:///tmp/cat.png".into());
        assert_eq!(img.position(), Point::new(50, 50));
        assert_eq!((img.width, img.height), (200, 150));
    }

    #[test]
    fn stored_entry_round_trips_through_json() {
        let mut entry = DiaryEntry::new(EntryId::new("a"), Utc::now());
        entry.images.push(DiaryImage::new("file:///x.png".into()));
        let json = serde_json::to_string(&entry).unwrap();
        let back: DiaryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
