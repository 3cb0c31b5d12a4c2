//! prerenderd
//!
//! A small HTTP service that loads a page in headless Chrome and returns the
//! fully rendered, serialized HTML (doctype included) to the caller.
//!
//! # Architecture
//!
//! - **Server** (`server`): one axum route, `GET /?url=...`, plus a liveness
//!   probe. Validates the query and maps renderer outcomes to responses.
//! - **Renderer** (`renderer`): drives one browser session per request
//!   (launch, navigate, serialize, close), bounded by a session semaphore and
//!   an overall timeout.
//! - **Backend** (`cdp`): adapter-based design for the browser itself; the
//!   production backend speaks the Chrome DevTools Protocol via headless
//!   Chrome, and tests substitute scripted backends.
//!
//! # Example
//!
//! ```no_run
//! use prerenderd::{cdp::CdpBackend, renderer::{RenderService, Renderer}, RendererConfig};
//!
//! # async fn example() -> prerenderd::Result<()> {
//! let config = RendererConfig {
//!     timeout_ms: 30_000,
//!     max_sessions: 4,
//!     ..Default::default()
//! };
//!
//! let renderer = Renderer::new(CdpBackend::new(config.clone()), &config);
//! let html = renderer.render_page("https://example.com").await?;
//! println!("{} bytes of rendered HTML", html.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub use error::{Error, Result};

pub mod cdp;
pub mod renderer;
pub mod server;

pub use renderer::{RenderService, Renderer};

/// Configuration for the page renderer
///
/// The defaults are conservative: a desktop viewport, a 30 second navigation
/// timeout, and at most four concurrent browser sessions. Every field maps to
/// a CLI flag in the `prerenderd` binary.
///
/// # Examples
///
/// ```
/// let cfg = prerenderd::RendererConfig::default();
/// assert!(cfg.user_agent.contains("prerenderd"));
/// ```
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// User agent string to send with requests
    pub user_agent: String,
    /// Viewport dimensions for the browser window
    pub viewport: Viewport,
    /// Timeout for page navigation in milliseconds
    pub timeout_ms: u64,
    /// Maximum number of browser sessions that may be open at once
    pub max_sessions: usize,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            user_agent:
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36 prerenderd/0.1"
                    .to_string(),
            viewport: Viewport::default(),
            timeout_ms: 30_000,
            max_sessions: 4,
        }
    }
}

/// Viewport dimensions
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// A source of browser sessions.
///
/// Implementations launch one isolated browser instance per call; nothing is
/// pooled or reused across sessions. The production implementation is
/// [`cdp::CdpBackend`]; tests provide scripted backends to exercise the
/// renderer without a browser.
pub trait Backend: Send + Sync + 'static {
    type Session: Session;

    /// Launch a new, isolated browser session
    fn launch(&self) -> Result<Self::Session>;
}

/// One live browser instance with a single page, exclusively owned by the
/// fetch that launched it.
///
/// `close` consumes the session; the renderer guarantees it is called exactly
/// once on every exit path before the outcome propagates to the caller.
pub trait Session: Send + 'static {
    /// Navigate the page to `url` and wait until navigation settles
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Serialize the loaded document: doctype followed by the root element markup
    fn serialize_document(&mut self) -> Result<String>;

    /// Tear down the session and terminate the underlying browser
    fn close(self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RendererConfig::default();
        assert_eq!(config.viewport.width, 1280);
        assert_eq!(config.viewport.height, 720);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_sessions, 4);
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
