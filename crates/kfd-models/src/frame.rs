//! Extracted frame sets.

use std::path::{Path, PathBuf};

/// One extracted frame on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRef {
    /// Stable identifier (the generated file name, e.g. `frame_0003.jpg`)
    pub id: String,
    /// Full path to the image file
    pub path: PathBuf,
}

impl FrameRef {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let id = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { id, path }
    }
}

/// Frames in extraction order.
///
/// Frames are sorted lexicographically by identifier. With zero-padded
/// sequence numbers in the file names this is the order they were decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSet {
    frames: Vec<FrameRef>,
}

impl FrameSet {
    /// Build a frame set from file paths, sorting by identifier.
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut frames: Vec<FrameRef> = paths.into_iter().map(FrameRef::from_path).collect();
        frames.sort_by(|a, b| a.id.cmp(&b.id));
        Self { frames }
    }

    /// A one-frame set, used for still image uploads.
    pub fn single(path: impl AsRef<Path>) -> Self {
        Self {
            frames: vec![FrameRef::from_path(path.as_ref())],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameRef> {
        self.frames.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.frames.iter().map(|f| f.id.as_str())
    }
}

impl<'a> IntoIterator for &'a FrameSet {
    type Item = &'a FrameRef;
    type IntoIter = std::slice::Iter<'a, FrameRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_by_sequence_number() {
        let set = FrameSet::from_paths([
            "/tmp/ws/frame_0010.jpg",
            "/tmp/ws/frame_0002.jpg",
            "/tmp/ws/frame_0001.jpg",
        ]);

        let ids: Vec<_> = set.ids().collect();
        assert_eq!(ids, vec!["frame_0001.jpg", "frame_0002.jpg", "frame_0010.jpg"]);
        assert_eq!(set.iter().next().unwrap().path, PathBuf::from("/tmp/ws/frame_0001.jpg"));
    }

    #[test]
    fn test_single() {
        let set = FrameSet::single("/tmp/kfd-abc.jpg");
        assert_eq!(set.len(), 1);
        assert_eq!(set.ids().next(), Some("kfd-abc.jpg"));
    }

    #[test]
    fn test_empty() {
        let set = FrameSet::from_paths(Vec::<PathBuf>::new());
        assert!(set.is_empty());
    }
}
