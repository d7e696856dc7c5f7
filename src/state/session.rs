/// The editor session: one controller owning all editing state
///
/// The UI reads state through the accessors and changes it only through
/// the entry points below. Actions that need the remote model return a
/// [`Job`]; the caller runs it and feeds the [`Completion`] back through
/// [`Session::complete`]. That round trip is the only suspension point.
///
/// Every job carries the session epoch it was started in. Switching mode
/// or loading a new upload bumps the epoch, and completions from an older
/// epoch only release their busy flag; their results are dropped.

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::coordinator::{Action, Coordinator, QuickAction};
use super::data::{EditingMode, Image, SourceMode};
use super::history::{Revision, RevisionStore};
use super::resolver;
use crate::media::upload::UploadError;
use crate::remote::RemoteError;

/// Instruction used by the upscale action
pub const UPSCALE_INSTRUCTION: &str = "Upscale this image to a higher resolution. Enhance details and sharpness while maintaining photorealism. Output the highest possible quality.";

/// Wrap a previously successful prompt for a second attempt
pub fn do_better_prompt(previous: &str) -> String {
    format!(
        "The previous result wasn't quite right. Do a better job at this request: \"{}\"",
        previous
    )
}

/// Generic messages shown to the user. Details go to the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserError {
    #[error("No source image available for editing.")]
    NoSource,

    #[error("Failed to read the image file.")]
    UnreadableFile,

    #[error("Failed to edit image. Please check the console for details.")]
    EditFailed,

    #[error("Failed to generate image. Please check the console for details.")]
    GenerateFailed,

    #[error("Failed to enhance prompt. Please check the console for details.")]
    EnhanceFailed,

    #[error("Failed to save the image.")]
    SaveFailed,
}

/// Where a successful result lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// Becomes the new original upload
    Original,
    /// Appended to the revision history
    History,
    /// Replaces the generated image
    Generated,
    /// Replaces the prompt text
    PromptField,
}

/// Proof that an action was started; handed back on completion
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub action: Action,
    pub epoch: u64,
    pub target: Target,
    /// Prompt or instruction to remember on success
    pub instruction: String,
}

/// A single remote call
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Edit { image: Image, prompt: String },
    Generate { prompt: String },
    EnhancePrompt { prompt: String },
}

/// Work the caller must run against the remote service
#[derive(Debug, Clone)]
pub struct Job {
    pub ticket: Ticket,
    pub request: Request,
}

/// What a remote call produced
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Image(Image),
    Text(String),
}

/// Result of a [`Job`], delivered back to the session
#[derive(Debug, Clone)]
pub struct Completion {
    pub ticket: Ticket,
    pub result: Result<Output, RemoteError>,
}

/// Images the user can save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadSlot {
    Original,
    Edited,
    Generated,
}

impl DownloadSlot {
    fn stem(self) -> &'static str {
        match self {
            DownloadSlot::Original => "original",
            DownloadSlot::Edited => "edited",
            DownloadSlot::Generated => "generated",
        }
    }
}

/// All editor state
#[derive(Debug, Default)]
pub struct Session {
    mode: EditingMode,
    original: Option<Image>,
    history: RevisionStore,
    generated: Option<Image>,
    prompt: String,
    last_prompt: Option<String>,
    source_mode: SourceMode,
    error: Option<UserError>,
    coordinator: Coordinator,
    epoch: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    // ========== Read-only views ==========

    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    pub fn original(&self) -> Option<&Image> {
        self.original.as_ref()
    }

    pub fn history(&self) -> &RevisionStore {
        &self.history
    }

    pub fn current_revision(&self) -> Option<&Revision> {
        self.history.current()
    }

    pub fn generated(&self) -> Option<&Image> {
        self.generated.as_ref()
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn last_successful_prompt(&self) -> Option<&str> {
        self.last_prompt.as_deref()
    }

    pub fn source_mode(&self) -> SourceMode {
        self.source_mode
    }

    pub fn error(&self) -> Option<&UserError> {
        self.error.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn is_busy(&self, action: Action) -> bool {
        self.coordinator.is_running(action)
    }

    /// True while any action is in flight
    pub fn is_any_busy(&self) -> bool {
        self.coordinator.any_running()
    }

    #[cfg(test)]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Prompt entry needs an upload in edit mode, and nothing in flight
    pub fn prompt_enabled(&self) -> bool {
        let has_input = self.mode == EditingMode::Generate || self.original.is_some();
        has_input && !self.is_any_busy()
    }

    /// The image shown in `slot` and the file name to save it under
    pub fn downloadable(&self, slot: DownloadSlot) -> Option<(&Image, String)> {
        let image = match slot {
            DownloadSlot::Original => self.original.as_ref(),
            DownloadSlot::Edited => self.history.current().map(|r| &r.image),
            DownloadSlot::Generated => self.generated.as_ref(),
        }?;

        let filename = format!("{}.{}", slot.stem(), image.media_type().extension());
        Some((image, filename))
    }

    // ========== Plain mutations ==========

    /// Switch top-level mode. Always a hard reset of the editing state.
    pub fn set_mode(&mut self, mode: EditingMode) {
        info!(?mode, "switching mode");
        self.mode = mode;
        self.error = None;
        self.prompt.clear();
        self.original = None;
        self.generated = None;
        self.history.reset();
        self.source_mode = SourceMode::Original;
        self.last_prompt = None;
        self.bump_epoch();
    }

    pub fn set_prompt(&mut self, prompt: impl Into<String>) {
        self.prompt = prompt.into();
    }

    pub fn set_source_mode(&mut self, source_mode: SourceMode) {
        self.source_mode = source_mode;
    }

    pub fn undo(&mut self) -> Option<usize> {
        self.history.undo()
    }

    pub fn redo(&mut self) -> Option<usize> {
        self.history.redo()
    }

    /// Record a failed download (the save itself happens outside the session)
    pub fn note_save_failure(&mut self) {
        self.error = Some(UserError::SaveFailed);
    }

    // ========== Actions ==========

    /// Start decoding a new upload. Edit mode only.
    pub fn begin_upload(&mut self) -> Option<Ticket> {
        if self.mode != EditingMode::Edit {
            return None;
        }
        if !self.start(Action::LoadImage) {
            return None;
        }
        Some(self.ticket(Action::LoadImage, Target::Original, String::new()))
    }

    /// Apply the decoded upload (or its failure)
    pub fn finish_upload(&mut self, ticket: Ticket, result: Result<Image, UploadError>) -> bool {
        self.settle(ticket, result.map(Output::Image).map_err(|e| e.to_string()))
    }

    /// Submit the prompt field: an edit in edit mode, a generation otherwise.
    /// Blank prompts do nothing.
    pub fn submit(&mut self) -> Option<Job> {
        if self.prompt.trim().is_empty() {
            return None;
        }

        let prompt = self.prompt.clone();
        match self.mode {
            EditingMode::Edit => self.begin_edit(Action::ApplyEdit, prompt),
            EditingMode::Generate => self.begin_generate(Action::Generate, prompt),
        }
    }

    pub fn quick_action(&mut self, quick: QuickAction) -> Option<Job> {
        self.begin_edit(Action::Quick(quick), quick.instruction().to_string())
    }

    /// Upscale whatever is on screen: the current revision in edit mode,
    /// the generated image in generate mode. No-op when nothing is shown.
    pub fn upscale(&mut self) -> Option<Job> {
        let (image, target) = match self.mode {
            EditingMode::Edit => (
                self.history.current().map(|r| r.image.clone()),
                Target::History,
            ),
            EditingMode::Generate => (self.generated.clone(), Target::Generated),
        };

        let image = image?;
        if !self.start(Action::Upscale) {
            return None;
        }

        let instruction = UPSCALE_INSTRUCTION.to_string();
        Some(Job {
            ticket: self.ticket(Action::Upscale, target, instruction.clone()),
            request: Request::Edit {
                image,
                prompt: instruction,
            },
        })
    }

    /// Retry the last successful prompt with a "try harder" wrapper.
    /// Does nothing until something has succeeded.
    pub fn do_better(&mut self) -> Option<Job> {
        let previous = self.last_prompt.as_deref().filter(|p| !p.is_empty())?;
        let prompt = do_better_prompt(previous);

        match self.mode {
            EditingMode::Edit => self.begin_edit(Action::DoBetter, prompt),
            EditingMode::Generate => self.begin_generate(Action::DoBetter, prompt),
        }
    }

    /// Ask the model to rewrite the prompt field
    pub fn enhance_prompt(&mut self) -> Option<Job> {
        if self.prompt.trim().is_empty() {
            return None;
        }
        if !self.start(Action::EnhancePrompt) {
            return None;
        }

        let prompt = self.prompt.clone();
        Some(Job {
            ticket: self.ticket(Action::EnhancePrompt, Target::PromptField, prompt.clone()),
            request: Request::EnhancePrompt { prompt },
        })
    }

    /// Feed back the result of a remote call. Returns true if it was applied.
    pub fn complete(&mut self, completion: Completion) -> bool {
        let Completion { ticket, result } = completion;
        self.settle(ticket, result.map_err(|e| e.to_string()))
    }

    // ========== Internals ==========

    fn begin_edit(&mut self, action: Action, prompt: String) -> Option<Job> {
        if !self.start(action) {
            return None;
        }

        let source = resolver::resolve(self.source_mode, &self.history, self.original.as_ref());
        let Some(image) = source.image().cloned() else {
            warn!(?action, "no source image to edit");
            self.error = Some(UserError::NoSource);
            self.coordinator.release(action);
            return None;
        };

        Some(Job {
            ticket: self.ticket(action, Target::History, prompt.clone()),
            request: Request::Edit { image, prompt },
        })
    }

    fn begin_generate(&mut self, action: Action, prompt: String) -> Option<Job> {
        if !self.start(action) {
            return None;
        }

        Some(Job {
            ticket: self.ticket(action, Target::Generated, prompt.clone()),
            request: Request::Generate { prompt },
        })
    }

    /// Set the busy flag and clear the previous error
    fn start(&mut self, action: Action) -> bool {
        if !self.coordinator.begin(action) {
            debug!(?action, "already running, ignoring trigger");
            return false;
        }
        self.error = None;
        true
    }

    fn ticket(&self, action: Action, target: Target, instruction: String) -> Ticket {
        Ticket {
            action,
            epoch: self.epoch,
            target,
            instruction,
        }
    }

    fn settle(&mut self, ticket: Ticket, outcome: Result<Output, String>) -> bool {
        self.coordinator.release(ticket.action);

        if ticket.epoch != self.epoch {
            info!(
                action = ?ticket.action,
                started = ticket.epoch,
                current = self.epoch,
                "dropping result from a previous session"
            );
            return false;
        }

        let failure = failure_for(&ticket);
        match (ticket.target, outcome) {
            (Target::Original, Ok(Output::Image(image))) => {
                info!(media_type = %image.media_type(), bytes = image.len(), "loaded original image");
                self.history.reset();
                self.source_mode = SourceMode::Original;
                self.last_prompt = None;
                self.original = Some(image);
                self.bump_epoch();
            }
            (Target::History, Ok(Output::Image(image))) => {
                let index = self.history.append(Revision::new(image, ticket.instruction.clone()));
                info!(action = ?ticket.action, revision = index, "appended revision");
                self.last_prompt = Some(ticket.instruction);
            }
            (Target::Generated, Ok(Output::Image(image))) => {
                info!(action = ?ticket.action, bytes = image.len(), "replaced generated image");
                self.generated = Some(image);
                self.last_prompt = Some(ticket.instruction);
            }
            (Target::PromptField, Ok(Output::Text(text))) => {
                self.prompt = text;
            }
            (target, Ok(output)) => {
                error!(action = ?ticket.action, ?target, ?output, "unexpected output for action");
                self.error = Some(failure);
                return false;
            }
            (_, Err(detail)) => {
                error!(action = ?ticket.action, %detail, "action failed");
                self.error = Some(failure);
                return false;
            }
        }
        true
    }

    fn bump_epoch(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
    }
}

fn failure_for(ticket: &Ticket) -> UserError {
    match ticket.target {
        Target::Original => UserError::UnreadableFile,
        Target::History => UserError::EditFailed,
        // Upscaling goes through the edit model even in generate mode
        Target::Generated if ticket.action == Action::Upscale => UserError::EditFailed,
        Target::Generated => UserError::GenerateFailed,
        Target::PromptField => UserError::EnhanceFailed,
    }
}
