/// Picks the input image for the next edit-producing action.
///
/// Must be called fresh at the start of every action: undo/redo may have
/// moved the cursor since the last one.

use super::data::{Image, SourceMode};
use super::history::{Revision, RevisionStore};

/// Outcome of source resolution
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditSource<'a> {
    /// The revision under the history cursor
    Latest(&'a Revision),
    /// The uploaded image
    Original(&'a Image),
    /// Nothing to edit; no remote call may be made
    NotAvailable,
}

impl<'a> EditSource<'a> {
    pub fn image(&self) -> Option<&'a Image> {
        match *self {
            EditSource::Latest(revision) => Some(&revision.image),
            EditSource::Original(image) => Some(image),
            EditSource::NotAvailable => None,
        }
    }
}

/// `latest` prefers the current revision and falls back to the original;
/// `original` only ever uses the original.
pub fn resolve<'a>(
    mode: SourceMode,
    history: &'a RevisionStore,
    original: Option<&'a Image>,
) -> EditSource<'a> {
    if mode == SourceMode::Latest {
        if let Some(revision) = history.current() {
            return EditSource::Latest(revision);
        }
    }

    match original {
        Some(image) => EditSource::Original(image),
        None => EditSource::NotAvailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::MediaType;
    use assert_matches::assert_matches;

    fn image(tag: &[u8]) -> Image {
        Image::new(MediaType::png(), tag.to_vec()).unwrap()
    }

    #[test]
    fn test_latest_without_revisions_falls_back_to_original() {
        let store = RevisionStore::new();
        let original = image(b"X");

        let source = resolve(SourceMode::Latest, &store, Some(&original));
        assert_matches!(source, EditSource::Original(img) if img.bytes() == b"X");
    }

    #[test]
    fn test_latest_uses_revision_under_cursor() {
        let mut store = RevisionStore::new();
        store.append(Revision::new(image(b"A"), "a"));
        store.append(Revision::new(image(b"B"), "b"));
        let original = image(b"X");

        let source = resolve(SourceMode::Latest, &store, Some(&original));
        assert_eq!(source.image().unwrap().bytes(), b"B");

        store.undo();
        let source = resolve(SourceMode::Latest, &store, Some(&original));
        assert_matches!(source, EditSource::Latest(rev) if rev.image.bytes() == b"A");
    }

    #[test]
    fn test_original_mode_ignores_history() {
        let mut store = RevisionStore::new();
        store.append(Revision::new(image(b"A"), "a"));
        let original = image(b"X");

        let source = resolve(SourceMode::Original, &store, Some(&original));
        assert_eq!(source.image(), Some(&original));
    }

    #[test]
    fn test_no_original_is_not_available() {
        let mut store = RevisionStore::new();
        assert_eq!(
            resolve(SourceMode::Original, &store, None),
            EditSource::NotAvailable
        );

        store.append(Revision::new(image(b"A"), "a"));
        assert_eq!(
            resolve(SourceMode::Original, &store, None),
            EditSource::NotAvailable
        );
        assert!(resolve(SourceMode::Original, &store, None).image().is_none());
    }
}
