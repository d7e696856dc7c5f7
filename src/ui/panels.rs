use iced::widget::image::Handle;
use iced::widget::{button, column, container, row, text, text_input, Column, Row, Space};
use iced::{Alignment, Color, ContentFit, Element, Length};

use crate::state::session::UserError;
use crate::state::{Action, DownloadSlot, EditingMode, QuickAction, Session, SourceMode};
use crate::ui::preview::PreviewCache;
use crate::Message;

const MUTED: Color = Color::from_rgb(0.58, 0.64, 0.72);
const ERROR_RED: Color = Color::from_rgb(0.99, 0.65, 0.65);
const PANEL_HEIGHT: f32 = 380.0;

pub fn header<'a>() -> Element<'a, Message> {
    column![
        text("Inkly").size(40),
        text("Edit and generate images with a prompt")
            .size(16)
            .color(MUTED),
    ]
    .spacing(4)
    .align_x(Alignment::Center)
    .into()
}

/// Edit / Generate switch. Locked while anything is running.
pub fn mode_toggle(session: &Session) -> Element<'_, Message> {
    let busy = session.is_any_busy();
    let tab = |label: &'static str, mode: EditingMode| {
        let active = session.mode() == mode;
        button(text(label))
            .padding([8, 20])
            .style(if active {
                button::primary
            } else {
                button::secondary
            })
            .on_press_maybe((!busy && !active).then_some(Message::ModeSelected(mode)))
    };

    row![
        tab("Edit Image", EditingMode::Edit),
        tab("Generate Image", EditingMode::Generate),
    ]
    .spacing(8)
    .into()
}

pub fn error_banner(error: &UserError) -> Element<'_, Message> {
    container(
        row![
            text("Error: ").color(ERROR_RED),
            text(error.to_string()).color(ERROR_RED),
        ]
        .spacing(4),
    )
    .padding(12)
    .width(Length::Fill)
    .style(container::bordered_box)
    .into()
}

pub fn edit_workspace<'a>(session: &'a Session, previews: &'a PreviewCache) -> Element<'a, Message> {
    let Some(original) = session.original() else {
        return upload_prompt(session);
    };

    let busy = session.is_any_busy();
    let mut workspace = Column::new().spacing(16).push(quick_actions(session));

    let current = session.current_revision();
    if current.is_some() {
        workspace = workspace.push(edit_controls(session));
    }

    let original_panel = image_panel(
        "Original",
        previews.get(original),
        false,
        "Upload an image to start",
        vec![
            small_button("New Upload", (!busy).then_some(Message::PickImage)),
            small_button("Download", Some(Message::Download(DownloadSlot::Original))),
        ],
    );

    let editing = session.is_busy(Action::ApplyEdit)
        || QuickAction::ALL
            .iter()
            .any(|q| session.is_busy(Action::Quick(*q)))
        || session.is_busy(Action::Upscale)
        || session.is_busy(Action::DoBetter);

    let has_result = current.is_some();
    let edited_panel = image_panel(
        "Edited",
        current.and_then(|r| previews.get(&r.image)),
        editing,
        "Your edited image will appear here",
        result_actions(session, has_result, DownloadSlot::Edited),
    );

    workspace
        .push(row![original_panel, edited_panel].spacing(24))
        .into()
}

pub fn generate_workspace<'a>(
    session: &'a Session,
    previews: &'a PreviewCache,
) -> Element<'a, Message> {
    let generating = session.is_busy(Action::Generate)
        || session.is_busy(Action::DoBetter)
        || session.is_busy(Action::Upscale);

    let panel = image_panel(
        "Generated Image",
        session.generated().and_then(|image| previews.get(image)),
        generating,
        "Describe a scene to generate an image",
        result_actions(session, session.generated().is_some(), DownloadSlot::Generated),
    );

    container(panel).max_width(560).into()
}

/// Prompt field with Enhance and Apply/Generate
pub fn prompt_bar(session: &Session) -> Element<'_, Message> {
    let enabled = session.prompt_enabled();
    let has_text = !session.prompt().trim().is_empty();

    let placeholder = match session.mode() {
        EditingMode::Edit => "e.g., Make the sky dramatic, add a retro filter...",
        EditingMode::Generate => "e.g., An astronaut riding a horse on Mars, photorealistic...",
    };

    let mut input = text_input(placeholder, session.prompt()).padding(12).size(16);
    if enabled {
        input = input
            .on_input(Message::PromptChanged)
            .on_submit(Message::Submit);
    }

    let enhance_label = if session.is_busy(Action::EnhancePrompt) {
        "Enhancing..."
    } else {
        "Enhance"
    };

    let submit_label = if session.is_busy(Action::ApplyEdit) || session.is_busy(Action::Generate) {
        "Working..."
    } else if session.mode() == EditingMode::Edit {
        "Apply Edit"
    } else {
        "Generate"
    };

    row![
        input,
        button(text(enhance_label))
            .padding([10, 16])
            .style(button::secondary)
            .on_press_maybe((enabled && has_text).then_some(Message::EnhancePrompt)),
        button(text(submit_label))
            .padding([10, 16])
            .style(button::primary)
            .on_press_maybe((enabled && has_text).then_some(Message::Submit)),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

fn upload_prompt(session: &Session) -> Element<'_, Message> {
    let loading = session.is_busy(Action::LoadImage);
    let label = if loading { "Loading..." } else { "Upload Image" };

    container(
        column![
            text("Choose a PNG, JPEG, WebP or GIF to start editing").color(MUTED),
            button(text(label))
                .padding([12, 28])
                .style(button::primary)
                .on_press_maybe((!session.is_any_busy()).then_some(Message::PickImage)),
        ]
        .spacing(16)
        .align_x(Alignment::Center),
    )
    .padding(48)
    .center_x(Length::Fill)
    .style(container::bordered_box)
    .into()
}

fn quick_actions(session: &Session) -> Element<'_, Message> {
    let busy = session.is_any_busy();
    let buttons = QuickAction::ALL.into_iter().map(|quick| {
        let label = if session.is_busy(Action::Quick(quick)) {
            "Working..."
        } else {
            quick.label()
        };

        button(text(label))
            .padding([6, 12])
            .style(button::secondary)
            .on_press_maybe((!busy).then_some(Message::Quick(quick)))
            .into()
    });

    Row::with_children(buttons).spacing(8).into()
}

/// Source toggle plus undo/redo
fn edit_controls(session: &Session) -> Element<'_, Message> {
    let busy = session.is_any_busy();
    let source = |label: &'static str, mode: SourceMode| {
        button(text(label))
            .padding([6, 12])
            .style(if session.source_mode() == mode {
                button::primary
            } else {
                button::secondary
            })
            .on_press_maybe((!busy).then_some(Message::SourceSelected(mode)))
    };

    let position = session.history().position_label().unwrap_or_default();

    row![
        text("Edit from:").color(MUTED),
        source("Original", SourceMode::Original),
        source("Latest", SourceMode::Latest),
        Space::with_width(Length::Fill),
        text(position).color(MUTED),
        small_button("Undo", (!busy && session.can_undo()).then_some(Message::Undo)),
        small_button("Redo", (!busy && session.can_redo()).then_some(Message::Redo)),
    ]
    .spacing(8)
    .align_y(Alignment::Center)
    .into()
}

/// Upscale / Do Better / Download for a result panel
fn result_actions<'a>(
    session: &Session,
    has_result: bool,
    slot: DownloadSlot,
) -> Vec<Element<'a, Message>> {
    let busy = session.is_any_busy();
    let can_retry = session.last_successful_prompt().is_some();

    let upscale = if session.is_busy(Action::Upscale) {
        "Upscaling..."
    } else {
        "Upscale"
    };
    let better = if session.is_busy(Action::DoBetter) {
        "Retrying..."
    } else {
        "Do Better"
    };

    vec![
        small_button(upscale, (!busy && has_result).then_some(Message::Upscale)),
        small_button(
            better,
            (!busy && has_result && can_retry).then_some(Message::DoBetter),
        ),
        small_button("Download", has_result.then_some(Message::Download(slot))),
    ]
}

fn image_panel<'a>(
    title: &'a str,
    handle: Option<&Handle>,
    loading: bool,
    placeholder: &'a str,
    actions: Vec<Element<'a, Message>>,
) -> Element<'a, Message> {
    let body: Element<'a, Message> = match (loading, handle) {
        (true, _) => text("Working...").color(MUTED).into(),
        (false, Some(handle)) => iced::widget::image::Image::new(handle.clone())
            .content_fit(ContentFit::Contain)
            .width(Length::Fill)
            .height(Length::Fill)
            .into(),
        (false, None) => text(placeholder).color(MUTED).into(),
    };

    column![
        row![
            text(title).size(20),
            Space::with_width(Length::Fill),
            Row::with_children(actions).spacing(6),
        ]
        .align_y(Alignment::Center),
        container(body)
            .padding(8)
            .center_x(Length::Fill)
            .center_y(Length::Fixed(PANEL_HEIGHT))
            .style(container::bordered_box),
    ]
    .spacing(8)
    .width(Length::Fill)
    .into()
}

fn small_button<'a>(label: &'a str, message: Option<Message>) -> Element<'a, Message> {
    button(text(label))
        .padding([6, 12])
        .style(button::secondary)
        .on_press_maybe(message)
        .into()
}
