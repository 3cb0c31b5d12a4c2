//! Chrome DevTools Protocol backend (uses the `headless_chrome` crate)

use crate::{Backend, Error, RendererConfig, Result, Session};
use headless_chrome::browser::tab::Tab;
use headless_chrome::{Browser, LaunchOptions};
use std::sync::Arc;
use std::time::Duration;

/// In-page serialization routine: the doctype (when present) followed by the
/// outer markup of the document element, produced by the browser's own
/// serializer. Pages without a doctype node serialize with an empty prefix.
const SERIALIZE_DOCUMENT_JS: &str = r#"
(function() {
    const doctype = document.doctype
        ? new XMLSerializer().serializeToString(document.doctype)
        : '';
    return doctype + document.documentElement.outerHTML;
})()
"#;

/// CDP-based backend implementation
///
/// Each `launch` starts a fresh headless Chrome process with a single tab and
/// hands it out as a [`CdpSession`]. Nothing is shared between sessions.
pub struct CdpBackend {
    config: RendererConfig,
}

impl CdpBackend {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }
}

impl Backend for CdpBackend {
    type Session = CdpSession;

    fn launch(&self) -> Result<CdpSession> {
        let launch_options = LaunchOptions::default_builder()
            .headless(true)
            .window_size(Some((
                self.config.viewport.width,
                self.config.viewport.height,
            )))
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&self.config.user_agent, None, None)
            .map_err(|e| Error::Launch(format!("Failed to set user agent: {}", e)))?;

        // Bounds navigate_to/wait_until_navigated below
        tab.set_default_timeout(Duration::from_millis(self.config.timeout_ms));

        Ok(CdpSession { browser, tab })
    }
}

/// One headless Chrome process and the tab rendering the target page
///
/// Owned exclusively by the fetch that launched it. Dropping the session
/// terminates the child process; `close` does so explicitly.
pub struct CdpSession {
    browser: Browser,
    tab: Arc<Tab>,
}

impl Session for CdpSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.tab
            .navigate_to(url)
            .map_err(|e| Error::Navigation(format!("Navigation failed: {}", e)))?;

        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Navigation(format!("Wait for navigation failed: {}", e)))?;

        Ok(())
    }

    fn serialize_document(&mut self) -> Result<String> {
        let eval = self
            .tab
            .evaluate(SERIALIZE_DOCUMENT_JS, false)
            .map_err(|e| Error::Serialize(format!("Evaluation failed: {}", e)))?;

        match eval.value {
            Some(value) => match value.as_str() {
                Some(html) => Ok(html.to_string()),
                None => Err(Error::Serialize(format!(
                    "Expected a string from serialization, got: {}",
                    value
                ))),
            },
            None => Err(Error::Serialize(
                "No value returned from evaluation".into(),
            )),
        }
    }

    fn close(self) -> Result<()> {
        // Drop the browser explicitly so the child process is terminated
        // promptly rather than at the end of the caller's scope.
        drop(self.browser);
        drop(self.tab);
        Ok(())
    }
}
