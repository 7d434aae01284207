use crate::ui::GalleryError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// URL suffixes treated as video when a playlist entry does not state its type.
static VIDEO_URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(mp4|webm|ogv|ogg|mov|m4v|mkv)(\?[^#]*)?(#.*)?$")
        .expect("Invalid video URL regex")
});

/// Kind of a displayable media item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guess the media kind from a URL's file extension.
    ///
    /// Query strings and fragments are ignored. Anything that does not look
    /// like a video container is treated as an image.
    pub fn infer_from_url(url: &str) -> Self {
        if VIDEO_URL_PATTERN.is_match(url) {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn is_video(self) -> bool {
        self == MediaKind::Video
    }
}

/// A single displayable unit (image or video).
///
/// Descriptors are owned by the caller and only read by the slideshow core.
/// The `_id` alias accepts payloads exported from the admin backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    #[serde(alias = "_id")]
    pub id: String,

    pub url: String,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    #[serde(default)]
    pub name: String,
}

impl MediaDescriptor {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        kind: MediaKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            kind,
            name: name.into(),
        }
    }

    pub fn image(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), url, MediaKind::Image, id)
    }

    pub fn video(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self::new(id.clone(), url, MediaKind::Video, id)
    }

    pub fn is_video(&self) -> bool {
        self.kind.is_video()
    }

    /// Name for display, falling back to the id when the name is blank
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Ordered, non-empty, cyclic collection of media for one viewing session.
///
/// Index arithmetic wraps modulo the length, so a sequence of one item is
/// valid and navigating it always lands on index 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSequence {
    items: Vec<MediaDescriptor>,
}

impl MediaSequence {
    /// Build a sequence, rejecting empty input.
    pub fn new(items: Vec<MediaDescriptor>) -> Result<Self, GalleryError> {
        if items.is_empty() {
            return Err(GalleryError::EmptySequence);
        }
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false; kept for API symmetry with slices.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaDescriptor> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[MediaDescriptor] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MediaDescriptor> {
        self.items.iter()
    }

    /// Clamp an arbitrary index into `[0, len - 1]`
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.items.len() - 1)
    }

    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.items.len()
    }

    pub fn previous_index(&self, index: usize) -> usize {
        let len = self.items.len();
        (index + len - 1) % len
    }

    pub fn position_of(&self, media_id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == media_id)
    }

    pub fn has_videos(&self) -> bool {
        self.items.iter().any(MediaDescriptor::is_video)
    }
}

impl TryFrom<Vec<MediaDescriptor>> for MediaSequence {
    type Error = GalleryError;

    fn try_from(items: Vec<MediaDescriptor>) -> Result<Self, Self::Error> {
        Self::new(items)
    }
}

impl<'a> IntoIterator for &'a MediaSequence {
    type Item = &'a MediaDescriptor;
    type IntoIter = std::slice::Iter<'a, MediaDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Position within a sequence, owned by the slideshow engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackPosition {
    pub current_index: usize,

    /// Set when the current video finished; cleared on every position change
    pub media_ended: bool,
}

/// One entry of a playlist file.
///
/// Unlike [`MediaDescriptor`], the type and name are optional here; they are
/// filled in when the playlist is turned into a sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(alias = "_id")]
    pub id: String,

    pub url: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<PlaylistEntry> for MediaDescriptor {
    fn from(entry: PlaylistEntry) -> Self {
        let kind = entry
            .kind
            .unwrap_or_else(|| MediaKind::infer_from_url(&entry.url));
        let name = entry.name.unwrap_or_else(|| entry.id.clone());
        MediaDescriptor {
            id: entry.id,
            url: entry.url,
            kind,
            name,
        }
    }
}

/// Playlist file contents: either a bare list of entries or a mapping with a
/// start index.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Playlist {
    Detailed {
        items: Vec<PlaylistEntry>,
        #[serde(default)]
        start: usize,
    },
    Items(Vec<PlaylistEntry>),
}

impl Playlist {
    pub fn start_index(&self) -> usize {
        match self {
            Playlist::Detailed { start, .. } => *start,
            Playlist::Items(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn entries(&self) -> &[PlaylistEntry] {
        match self {
            Playlist::Detailed { items, .. } => items,
            Playlist::Items(items) => items,
        }
    }

    /// Convert into a sequence, inferring missing media types.
    pub fn into_sequence(self) -> Result<MediaSequence, GalleryError> {
        let entries = match self {
            Playlist::Detailed { items, .. } => items,
            Playlist::Items(items) => items,
        };
        MediaSequence::new(entries.into_iter().map(MediaDescriptor::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: usize) -> MediaSequence {
        MediaSequence::new(
            (0..n)
                .map(|i| MediaDescriptor::image(format!("m{}", i), format!("/m{}.jpg", i)))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let result = MediaSequence::new(Vec::new());
        assert!(matches!(result, Err(GalleryError::EmptySequence)));
    }

    #[test]
    fn test_index_wraps_both_directions() {
        let seq = sample(3);
        assert_eq!(seq.next_index(2), 0);
        assert_eq!(seq.previous_index(0), 2);
        assert_eq!(seq.next_index(0), 1);
    }

    #[test]
    fn test_single_item_navigation_stays_at_zero() {
        let seq = sample(1);
        assert_eq!(seq.next_index(0), 0);
        assert_eq!(seq.previous_index(0), 0);
    }

    #[test]
    fn test_clamp_index() {
        let seq = sample(4);
        assert_eq!(seq.clamp_index(2), 2);
        assert_eq!(seq.clamp_index(17), 3);
    }

    #[test]
    fn test_infer_kind_from_url() {
        assert_eq!(MediaKind::infer_from_url("/uploads/promo.MP4"), MediaKind::Video);
        assert_eq!(
            MediaKind::infer_from_url("https://cdn.example.com/a.webm?sig=abc#t=3"),
            MediaKind::Video
        );
        assert_eq!(MediaKind::infer_from_url("/uploads/menu.png"), MediaKind::Image);
        assert_eq!(MediaKind::infer_from_url("/uploads/mp4-poster.jpg"), MediaKind::Image);
    }

    #[test]
    fn test_descriptor_accepts_backend_id_alias() {
        let yaml = "_id: 65f0\nurl: /u/a.mp4\ntype: video\nname: Promo\n";
        let media: MediaDescriptor = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(media.id, "65f0");
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.display_name(), "Promo");
    }

    #[test]
    fn test_playlist_entry_fills_missing_fields() {
        let entry = PlaylistEntry {
            id: "x".to_string(),
            url: "/clip.mov".to_string(),
            kind: None,
            name: None,
        };
        let media = MediaDescriptor::from(entry);
        assert_eq!(media.kind, MediaKind::Video);
        assert_eq!(media.name, "x");
    }

    #[test]
    fn test_playlist_both_shapes() {
        let bare: Playlist = serde_yaml_ng::from_str("- id: a\n  url: /a.jpg\n").unwrap();
        assert_eq!(bare.start_index(), 0);
        assert_eq!(bare.len(), 1);

        let detailed: Playlist =
            serde_yaml_ng::from_str("start: 1\nitems:\n  - id: a\n    url: /a.jpg\n  - id: b\n    url: /b.mp4\n")
                .unwrap();
        assert_eq!(detailed.start_index(), 1);
        let seq = detailed.into_sequence().unwrap();
        assert!(seq.has_videos());
        assert_eq!(seq.position_of("b"), Some(1));
    }
}
