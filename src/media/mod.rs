/// Image file IO
///
/// This module handles:
/// - Reading and validating uploaded image files (upload.rs)
/// - Saving originals, revisions and generated images to disk (export.rs)

pub mod export;
pub mod upload;
