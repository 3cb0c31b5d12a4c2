//! Async render pipeline over a blocking browser backend
//!
//! The CDP drive is synchronous, so each fetch runs on the blocking thread
//! pool while the async caller awaits the outcome. A semaphore bounds how
//! many browser sessions may be live at once, and an overall deadline stops
//! a wedged browser from holding a request open indefinitely.

use crate::{Backend, Error, RendererConfig, Result, Session};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Time granted on top of the navigation timeout for browser launch and
/// document serialization before the whole render is abandoned.
const RENDER_OVERHEAD_MS: u64 = 10_000;

/// The page-rendering capability the HTTP layer depends on.
///
/// The production implementation is [`Renderer`] over a CDP backend; tests
/// substitute scripted implementations to drive the handler without Chrome.
#[async_trait]
pub trait RenderService: Send + Sync {
    /// Render `url` and return the serialized document
    async fn render_page(&self, url: &str) -> Result<String>;
}

/// Drives one browser session per fetch: launch, navigate, serialize, close.
pub struct Renderer<B> {
    backend: Arc<B>,
    limiter: Arc<Semaphore>,
    render_timeout: Duration,
}

impl<B: Backend> Renderer<B> {
    pub fn new(backend: B, config: &RendererConfig) -> Self {
        let render_timeout =
            Duration::from_millis(config.timeout_ms.saturating_add(RENDER_OVERHEAD_MS));
        Self::with_render_timeout(backend, config, render_timeout)
    }

    /// Create a renderer with an explicit overall deadline instead of the one
    /// derived from the navigation timeout.
    pub fn with_render_timeout(
        backend: B,
        config: &RendererConfig,
        render_timeout: Duration,
    ) -> Self {
        Self {
            backend: Arc::new(backend),
            // at least one session so renders can make progress
            limiter: Arc::new(Semaphore::new(config.max_sessions.max(1))),
            render_timeout,
        }
    }
}

#[async_trait]
impl<B: Backend> RenderService for Renderer<B> {
    async fn render_page(&self, url: &str) -> Result<String> {
        let permit = self
            .limiter
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Worker(format!("Session limiter closed: {}", e)))?;

        debug!(url, "rendering page");

        let backend = Arc::clone(&self.backend);
        let target = url.to_string();
        let task = tokio::task::spawn_blocking(move || {
            // The permit lives as long as the session does, including the
            // tail of a render the async caller has already abandoned.
            let _permit = permit;
            render_once(backend.as_ref(), &target)
        });

        match tokio::time::timeout(self.render_timeout, task).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => Err(Error::Worker(format!("Render task died: {}", join_err))),
            Err(_) => Err(Error::Timeout(self.render_timeout.as_millis() as u64)),
        }
    }
}

/// One full fetch against a freshly launched session.
///
/// The session is closed exactly once on every exit path; a close failure
/// after a failed step loses to the step error, a close failure after a
/// successful render fails the fetch.
fn render_once<B: Backend>(backend: &B, url: &str) -> Result<String> {
    let mut session = backend.launch()?;

    let rendered = match session.navigate(url) {
        Ok(()) => session.serialize_document(),
        Err(err) => Err(err),
    };

    match (rendered, session.close()) {
        (Ok(html), Ok(())) => Ok(html),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(step_err), Ok(())) => Err(step_err),
        (Err(step_err), Err(close_err)) => {
            warn!(error = %close_err, "session close failed after render error");
            Err(step_err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counters {
        launched: AtomicUsize,
        closed: AtomicUsize,
        live: AtomicUsize,
        peak: AtomicUsize,
    }

    #[derive(Clone, Copy)]
    enum FailAt {
        Nothing,
        Launch,
        Navigate,
        Serialize,
        Close,
    }

    struct ScriptedBackend {
        counters: Arc<Counters>,
        fail_at: FailAt,
        work_ms: u64,
    }

    impl ScriptedBackend {
        fn new(counters: Arc<Counters>, fail_at: FailAt) -> Self {
            Self {
                counters,
                fail_at,
                work_ms: 0,
            }
        }
    }

    struct ScriptedSession {
        counters: Arc<Counters>,
        fail_at: FailAt,
        work_ms: u64,
    }

    impl Backend for ScriptedBackend {
        type Session = ScriptedSession;

        fn launch(&self) -> Result<ScriptedSession> {
            if matches!(self.fail_at, FailAt::Launch) {
                return Err(Error::Launch("no browser binary".into()));
            }
            self.counters.launched.fetch_add(1, Ordering::SeqCst);
            let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.counters.peak.fetch_max(live, Ordering::SeqCst);
            Ok(ScriptedSession {
                counters: self.counters.clone(),
                fail_at: self.fail_at,
                work_ms: self.work_ms,
            })
        }
    }

    impl Session for ScriptedSession {
        fn navigate(&mut self, _url: &str) -> Result<()> {
            if self.work_ms > 0 {
                std::thread::sleep(Duration::from_millis(self.work_ms));
            }
            if matches!(self.fail_at, FailAt::Navigate) {
                return Err(Error::Navigation("net::ERR_NAME_NOT_RESOLVED".into()));
            }
            Ok(())
        }

        fn serialize_document(&mut self) -> Result<String> {
            if matches!(self.fail_at, FailAt::Serialize) {
                return Err(Error::Serialize("Evaluation failed".into()));
            }
            Ok("<!DOCTYPE html><html><body>ok</body></html>".to_string())
        }

        fn close(self) -> Result<()> {
            self.counters.live.fetch_sub(1, Ordering::SeqCst);
            self.counters.closed.fetch_add(1, Ordering::SeqCst);
            if matches!(self.fail_at, FailAt::Close) {
                return Err(Error::Worker("browser refused to exit".into()));
            }
            Ok(())
        }
    }

    #[test]
    fn test_render_once_success_closes_session() {
        let counters = Arc::new(Counters::default());
        let backend = ScriptedBackend::new(counters.clone(), FailAt::Nothing);

        let html = render_once(&backend, "https://example.com").unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_once_closes_session_on_navigation_failure() {
        let counters = Arc::new(Counters::default());
        let backend = ScriptedBackend::new(counters.clone(), FailAt::Navigate);

        let err = render_once(&backend, "https://no-such-host.invalid").unwrap_err();
        assert!(matches!(err, Error::Navigation(_)));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_once_closes_session_on_serialize_failure() {
        let counters = Arc::new(Counters::default());
        let backend = ScriptedBackend::new(counters.clone(), FailAt::Serialize);

        let err = render_once(&backend, "https://example.com").unwrap_err();
        assert!(matches!(err, Error::Serialize(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_render_once_launch_failure_creates_no_session() {
        let counters = Arc::new(Counters::default());
        let backend = ScriptedBackend::new(counters.clone(), FailAt::Launch);

        let err = render_once(&backend, "https://example.com").unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
        assert_eq!(counters.launched.load(Ordering::SeqCst), 0);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_render_once_close_failure_wins_after_success() {
        let counters = Arc::new(Counters::default());
        let backend = ScriptedBackend::new(counters.clone(), FailAt::Close);

        let err = render_once(&backend, "https://example.com").unwrap_err();
        assert!(matches!(err, Error::Worker(_)));
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_session_bound_is_respected() {
        let counters = Arc::new(Counters::default());
        let mut backend = ScriptedBackend::new(counters.clone(), FailAt::Nothing);
        backend.work_ms = 30;

        let config = RendererConfig {
            max_sessions: 2,
            ..Default::default()
        };
        let renderer = Arc::new(Renderer::new(backend, &config));

        let mut tasks = Vec::new();
        for _ in 0..6 {
            let renderer = renderer.clone();
            tasks.push(tokio::spawn(async move {
                renderer.render_page("https://example.com").await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(counters.launched.load(Ordering::SeqCst), 6);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 6);
        assert!(counters.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_render_deadline_fires() {
        let counters = Arc::new(Counters::default());
        let mut backend = ScriptedBackend::new(counters.clone(), FailAt::Nothing);
        backend.work_ms = 200;

        let config = RendererConfig::default();
        let renderer =
            Renderer::with_render_timeout(backend, &config, Duration::from_millis(50));

        let err = renderer.render_page("https://example.com").await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        // The blocking task is not interruptible; the session is still closed
        // once its work finishes.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(counters.launched.load(Ordering::SeqCst), 1);
        assert_eq!(counters.closed.load(Ordering::SeqCst), 1);
    }
}
