/// UI building blocks
///
/// - Panel and control views (panels.rs)
/// - Decoded preview handles for session images (preview.rs)

pub mod panels;
pub mod preview;
