//! Error types for the render pipeline

use thiserror::Error;

/// Result type alias for render operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering a page
///
/// The variants follow the steps of a fetch: launching the browser,
/// navigating the page, and serializing the document. Callers can match on
/// the step that failed instead of inspecting message text.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to launch the browser or open its page
    #[error("Browser launch failed: {0}")]
    Launch(String),

    /// Failed to navigate to the target URL
    #[error("Failed to load URL: {0}")]
    Navigation(String),

    /// Failed to serialize the loaded document
    #[error("Document serialization failed: {0}")]
    Serialize(String),

    /// The render did not complete within the configured bound
    #[error("Render timed out after {0}ms")]
    Timeout(u64),

    /// The worker task driving the browser died before reporting an outcome
    #[error("Render worker failed: {0}")]
    Worker(String),
}
