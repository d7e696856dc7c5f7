/// Per-action busy tracking
///
/// Every user-triggerable action owns one busy flag. The flags live in a
/// single set of running actions, so both "is this action running" and
/// "is anything running" are plain lookups.

use std::collections::BTreeSet;

/// Predefined one-click edits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QuickAction {
    RemoveBackground,
    RemoveWatermark,
    AutoEnhance,
    ConvertBw,
    Colorize,
    Cartoonify,
}

impl QuickAction {
    pub const ALL: [QuickAction; 6] = [
        QuickAction::RemoveBackground,
        QuickAction::RemoveWatermark,
        QuickAction::AutoEnhance,
        QuickAction::ConvertBw,
        QuickAction::Colorize,
        QuickAction::Cartoonify,
    ];

    /// The fixed instruction sent to the model
    pub fn instruction(self) -> &'static str {
        match self {
            QuickAction::RemoveBackground => {
                "Remove the background. Make the background transparent and output a PNG."
            }
            QuickAction::RemoveWatermark => {
                "Identify any watermarks, logos, or text overlays in this image and remove them intelligently, reconstructing the area behind them."
            }
            QuickAction::AutoEnhance => {
                "Auto enhance this image. Adjust lighting, color balance, and sharpness for a better look. Make the result natural."
            }
            QuickAction::ConvertBw => "Convert this image to a high-contrast black and white photo.",
            QuickAction::Colorize => {
                "Colorize this black and white or sepia photo with natural, realistic colors."
            }
            QuickAction::Cartoonify => "Turn this photo into a vibrant, fun cartoon-style image.",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuickAction::RemoveBackground => "Remove Background",
            QuickAction::RemoveWatermark => "Remove Watermark",
            QuickAction::AutoEnhance => "Auto Enhance",
            QuickAction::ConvertBw => "Black & White",
            QuickAction::Colorize => "Colorize",
            QuickAction::Cartoonify => "Cartoonify",
        }
    }
}

/// Every action that can be in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Decoding a freshly picked upload
    LoadImage,
    /// Free-form prompt in edit mode
    ApplyEdit,
    /// Free-form prompt in generate mode
    Generate,
    Quick(QuickAction),
    Upscale,
    DoBetter,
    EnhancePrompt,
}

/// Set of currently running actions
#[derive(Debug, Default)]
pub struct Coordinator {
    running: BTreeSet<Action>,
}

impl Coordinator {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `action` running. Returns false (and changes nothing) if it
    /// already is, so a double trigger never starts a second call.
    pub fn begin(&mut self, action: Action) -> bool {
        self.running.insert(action)
    }

    /// Clear the flag. Releasing an idle action is a no-op.
    pub fn release(&mut self, action: Action) {
        self.running.remove(&action);
    }

    pub fn is_running(&self, action: Action) -> bool {
        self.running.contains(&action)
    }

    /// Composite busy state: any flag set
    pub fn any_running(&self) -> bool {
        !self.running.is_empty()
    }

    #[cfg(test)]
    pub fn running(&self) -> impl Iterator<Item = Action> + '_ {
        self.running.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_rejects_reentry() {
        let mut coordinator = Coordinator::new();
        assert!(coordinator.begin(Action::Upscale));
        assert!(!coordinator.begin(Action::Upscale));
        assert_eq!(coordinator.running().count(), 1);
    }

    #[test]
    fn test_flags_are_independent() {
        let mut coordinator = Coordinator::new();
        assert!(coordinator.begin(Action::Quick(QuickAction::Colorize)));
        assert!(coordinator.begin(Action::Quick(QuickAction::Cartoonify)));
        assert!(coordinator.begin(Action::EnhancePrompt));

        coordinator.release(Action::Quick(QuickAction::Colorize));
        assert!(!coordinator.is_running(Action::Quick(QuickAction::Colorize)));
        assert!(coordinator.is_running(Action::Quick(QuickAction::Cartoonify)));
        assert!(coordinator.any_running());
    }

    #[test]
    fn test_any_running_clears_after_release() {
        let mut coordinator = Coordinator::new();
        assert!(!coordinator.any_running());

        coordinator.begin(Action::ApplyEdit);
        assert!(coordinator.any_running());

        coordinator.release(Action::ApplyEdit);
        coordinator.release(Action::ApplyEdit);
        assert!(!coordinator.any_running());
    }

    #[test]
    fn test_instructions_are_distinct() {
        let mut seen = BTreeSet::new();
        for action in QuickAction::ALL {
            assert!(seen.insert(action.instruction()));
        }
    }
}
