use iced::widget::{container, scrollable, Column};
use iced::{event, keyboard, Alignment, Element, Event, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
mod media;
mod remote;
mod state;
mod ui;

use config::Config;
use media::export::{save_image, ExportError};
use media::upload::{decode_upload, UploadError};
use remote::GeminiClient;
use state::{Completion, DownloadSlot, EditingMode, Image, Job, QuickAction, Session, SourceMode, Ticket};
use ui::panels;
use ui::preview::PreviewCache;

/// Main application state
struct Inkly {
    /// Editing state; every change goes through it
    session: Session,
    /// Remote model client shared with in-flight jobs
    service: Arc<GeminiClient>,
    /// Preview handles for the images the session holds
    previews: PreviewCache,
    /// Where save dialogs open
    download_dir: PathBuf,
}

/// Application messages (events)
#[derive(Debug, Clone)]
pub enum Message {
    /// User picked Edit or Generate
    ModeSelected(EditingMode),
    /// User asked to upload an image
    PickImage,
    /// Background decode of the picked file finished
    ImageDecoded(Ticket, Result<Image, UploadError>),
    PromptChanged(String),
    /// Apply Edit or Generate, depending on the mode
    Submit,
    EnhancePrompt,
    Quick(QuickAction),
    Upscale,
    DoBetter,
    Undo,
    Redo,
    SourceSelected(SourceMode),
    Download(DownloadSlot),
    /// Background save finished
    Saved(Result<PathBuf, ExportError>),
    /// A remote job finished
    Finished(Completion),
}

impl Inkly {
    fn new(config: Config, service: GeminiClient) -> (Self, Task<Message>) {
        info!(
            edit_model = %config.edit_model,
            image_model = %config.image_model,
            "Inkly ready"
        );

        (
            Inkly {
                session: Session::new(),
                service: Arc::new(service),
                previews: PreviewCache::new(),
                download_dir: config.download_dir,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        let task = match message {
            Message::ModeSelected(mode) => {
                self.session.set_mode(mode);
                Task::none()
            }
            Message::PickImage => self.pick_image(),
            Message::ImageDecoded(ticket, result) => {
                if let Err(e) = &result {
                    warn!(error = %e, "upload rejected");
                }
                self.session.finish_upload(ticket, result);
                Task::none()
            }
            Message::PromptChanged(prompt) => {
                self.session.set_prompt(prompt);
                Task::none()
            }
            Message::Submit => {
                let job = self.session.submit();
                self.launch(job)
            }
            Message::EnhancePrompt => {
                let job = self.session.enhance_prompt();
                self.launch(job)
            }
            Message::Quick(quick) => {
                let job = self.session.quick_action(quick);
                self.launch(job)
            }
            Message::Upscale => {
                let job = self.session.upscale();
                self.launch(job)
            }
            Message::DoBetter => {
                let job = self.session.do_better();
                self.launch(job)
            }
            // Shortcuts arrive here too, so re-check busy state
            Message::Undo => {
                if !self.session.is_any_busy() {
                    self.session.undo();
                }
                Task::none()
            }
            Message::Redo => {
                if !self.session.is_any_busy() {
                    self.session.redo();
                }
                Task::none()
            }
            Message::SourceSelected(source_mode) => {
                self.session.set_source_mode(source_mode);
                Task::none()
            }
            Message::Download(slot) => self.download(slot),
            Message::Saved(Ok(path)) => {
                info!(path = %path.display(), "download complete");
                Task::none()
            }
            Message::Saved(Err(e)) => {
                error!(error = %e, "download failed");
                self.session.note_save_failure();
                Task::none()
            }
            Message::Finished(completion) => {
                self.session.complete(completion);
                Task::none()
            }
        };

        self.previews.sync(&self.session);
        task
    }

    /// Show the file picker and decode the choice in the background
    fn pick_image(&mut self) -> Task<Message> {
        let picked = FileDialog::new()
            .set_title("Select an image")
            .add_filter("Images", &["png", "jpg", "jpeg", "webp", "gif", "bmp"])
            .pick_file();

        let Some(path) = picked else {
            return Task::none();
        };

        match self.session.begin_upload() {
            Some(ticket) => Task::perform(decode_upload(path), move |result| {
                Message::ImageDecoded(ticket.clone(), result)
            }),
            None => Task::none(),
        }
    }

    /// Ask where to save the slot's image and write it in the background
    fn download(&self, slot: DownloadSlot) -> Task<Message> {
        let Some((image, filename)) = self.session.downloadable(slot) else {
            return Task::none();
        };

        let destination = FileDialog::new()
            .set_title("Save image")
            .set_directory(&self.download_dir)
            .set_file_name(filename.as_str())
            .save_file();

        match destination {
            Some(path) => Task::perform(save_image(image.clone(), path), Message::Saved),
            None => Task::none(),
        }
    }

    fn launch(&self, job: Option<Job>) -> Task<Message> {
        match job {
            Some(job) => Task::perform(
                remote::dispatch(Arc::clone(&self.service), job),
                Message::Finished,
            ),
            None => Task::none(),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let mut content = Column::new()
            .spacing(24)
            .padding(32)
            .max_width(1100)
            .align_x(Alignment::Center)
            .push(panels::header())
            .push(panels::mode_toggle(&self.session));

        if let Some(error) = self.session.error() {
            content = content.push(panels::error_banner(error));
        }

        let workspace = match self.session.mode() {
            EditingMode::Edit => panels::edit_workspace(&self.session, &self.previews),
            EditingMode::Generate => panels::generate_workspace(&self.session, &self.previews),
        };

        content = content
            .push(workspace)
            .push(panels::prompt_bar(&self.session));

        scrollable(container(content).center_x(Length::Fill)).into()
    }

    /// Key presses a focused widget already handled (Ctrl+Z in the prompt
    /// field) never reach the history shortcuts
    fn subscription(&self) -> Subscription<Message> {
        event::listen_with(|event, status, _window| match (event, status) {
            (
                Event::Keyboard(keyboard::Event::KeyPressed { key, modifiers, .. }),
                event::Status::Ignored,
            ) => shortcut(key, modifiers),
            _ => None,
        })
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

/// Ctrl/Cmd+Z undoes; Ctrl/Cmd+Shift+Z and Ctrl/Cmd+Y redo
fn shortcut(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    if !modifiers.command() {
        return None;
    }

    match key.as_ref() {
        keyboard::Key::Character("z" | "Z") if modifiers.shift() => Some(Message::Redo),
        keyboard::Key::Character("z" | "Z") => Some(Message::Undo),
        keyboard::Key::Character("y" | "Y") => Some(Message::Redo),
        _ => None,
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkly=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    info!(?config, "configuration loaded");
    let service = GeminiClient::new(&config)?;

    iced::application("Inkly", Inkly::update, Inkly::view)
        .theme(Inkly::theme)
        .subscription(Inkly::subscription)
        .centered()
        .run_with(move || Inkly::new(config, service))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyboard::{Key, Modifiers};

    #[test]
    fn test_shortcuts() {
        let z = || Key::Character("z".into());
        assert!(matches!(shortcut(z(), Modifiers::COMMAND), Some(Message::Undo)));
        assert!(matches!(
            shortcut(z(), Modifiers::COMMAND | Modifiers::SHIFT),
            Some(Message::Redo)
        ));
        assert!(matches!(
            shortcut(Key::Character("y".into()), Modifiers::COMMAND),
            Some(Message::Redo)
        ));
        assert!(shortcut(z(), Modifiers::empty()).is_none());
        // Caps Lock reports an uppercase key without shift
        assert!(matches!(
            shortcut(Key::Character("Z".into()), Modifiers::COMMAND),
            Some(Message::Undo)
        ));
        assert!(shortcut(Key::Character("x".into()), Modifiers::COMMAND).is_none());
    }
}
