/// Edit history for AI-produced revisions
///
/// Revisions are appended by successful edit-producing actions. The cursor
/// marks the revision on screen. Appending while the cursor sits before the
/// end truncates everything after it first, so branching after an undo
/// discards the redo history.

use chrono::{DateTime, Local, Utc};

use super::data::Image;

/// One AI-produced version of the edited image
#[derive(Debug, Clone, PartialEq)]
pub struct Revision {
    /// The resulting image
    pub image: Image,
    /// Prompt or fixed instruction that produced it
    pub instruction: String,
    /// When the result arrived
    pub created_at: DateTime<Utc>,
}

impl Revision {
    pub fn new(image: Image, instruction: impl Into<String>) -> Self {
        Self {
            image,
            instruction: instruction.into(),
            created_at: Utc::now(),
        }
    }

    /// Local arrival time and shortened instruction, e.g. "14:02 · Colorize ..."
    pub fn caption(&self) -> String {
        let time = self.created_at.with_timezone(&Local).format("%H:%M");
        format!("{} · {}", time, shorten(&self.instruction, CAPTION_CHARS))
    }
}

const CAPTION_CHARS: usize = 48;

fn shorten(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut.trim_end())
}

/// Ordered revision history with a cursor
///
/// Invariant: `cursor` is `None` exactly when `revisions` is empty,
/// otherwise `cursor < revisions.len()`.
#[derive(Debug, Clone, Default)]
pub struct RevisionStore {
    revisions: Vec<Revision>,
    cursor: Option<usize>,
}

impl RevisionStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Truncate after the cursor, push, and move the cursor onto the new entry.
    /// Returns the new cursor.
    pub fn append(&mut self, revision: Revision) -> usize {
        let keep = self.cursor.map_or(0, |i| i + 1);
        self.revisions.truncate(keep);
        self.revisions.push(revision);

        let last = self.revisions.len() - 1;
        self.cursor = Some(last);
        last
    }

    /// Revision under the cursor
    pub fn current(&self) -> Option<&Revision> {
        self.cursor.and_then(|i| self.revisions.get(i))
    }

    /// Step back one revision. Stops at the first revision.
    pub fn undo(&mut self) -> Option<usize> {
        if let Some(i) = self.cursor {
            if i > 0 {
                self.cursor = Some(i - 1);
            }
        }
        self.cursor
    }

    /// Step forward one revision. Stops at the last revision.
    pub fn redo(&mut self) -> Option<usize> {
        if let Some(i) = self.cursor {
            if i + 1 < self.revisions.len() {
                self.cursor = Some(i + 1);
            }
        }
        self.cursor
    }

    /// Drop every revision (new upload or mode switch)
    pub fn reset(&mut self) {
        self.revisions.clear();
        self.cursor = None;
    }

    pub fn can_undo(&self) -> bool {
        matches!(self.cursor, Some(i) if i > 0)
    }

    pub fn can_redo(&self) -> bool {
        matches!(self.cursor, Some(i) if i + 1 < self.revisions.len())
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }

    /// "Revision n of m · HH:MM · instruction" for the revision on screen
    pub fn position_label(&self) -> Option<String> {
        let index = self.cursor?;
        let revision = self.revisions.get(index)?;
        Some(format!(
            "Revision {} of {} · {}",
            index + 1,
            self.revisions.len(),
            revision.caption()
        ))
    }
}
