use iced::widget::image::Handle;
use std::collections::HashMap;

use crate::state::{Image, Session};

/// Decoded-image handles for everything the session can display
///
/// iced decodes a handle the first time it is drawn and caches by handle
/// id, so handles are created once per image and reused across frames.
/// Refreshed after every update; images that left the session are evicted.
#[derive(Debug, Default)]
pub struct PreviewCache {
    handles: HashMap<u64, Handle>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add handles for new images, drop handles for images no longer held
    pub fn sync(&mut self, session: &Session) {
        let live: Vec<&Image> = session
            .original()
            .into_iter()
            .chain(session.history().revisions().iter().map(|r| &r.image))
            .chain(session.generated())
            .collect();

        self.handles
            .retain(|id, _| live.iter().any(|image| image.id() == *id));

        for image in live {
            self.handles
                .entry(image.id())
                .or_insert_with(|| Handle::from_bytes(image.bytes().to_vec()));
        }
    }

    pub fn get(&self, image: &Image) -> Option<&Handle> {
        self.handles.get(&image.id())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }
}
