/// State management module
///
/// This module holds all editor state, including:
/// - Shared data structures (data.rs)
/// - Revision history with undo/redo (history.rs)
/// - Edit source selection (resolver.rs)
/// - Per-action busy flags (coordinator.rs)
/// - The session controller tying it together (session.rs)

pub mod coordinator;
pub mod data;
pub mod history;
pub mod resolver;
pub mod session;

pub use coordinator::{Action, QuickAction};
pub use data::{EditingMode, Image, SourceMode};
pub use session::{Completion, DownloadSlot, Job, Session, Ticket};
