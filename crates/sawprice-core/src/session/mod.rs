//! Rendering-session contract and scoped acquisition.
//!
//! A [`SessionLauncher`] hands out a fresh [`BrowserSession`] per adapter
//! invocation. [`with_session`] owns it for the duration of one unit of work
//! and closes it afterwards, whatever the outcome. If the surrounding future
//! is dropped mid-flight or the work panics, [`SessionGuard`] schedules the
//! close on the runtime instead.
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | [`HttpLauncher`] | `http` | Static fetch + `scraper` DOM, no scripts |
//! | [`FixtureLauncher`] | `fixture` | In-memory pages for tests and `--mock` |
//! | `ChromiumLauncher` | `chromium` | Headless Chromium, `chromium` feature |

#[cfg(feature = "chromium")]
mod chromium;
mod fixture;
mod http;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumLauncher;
pub use fixture::{FixtureLauncher, FixturePage, LaunchStats};
pub use http::HttpLauncher;

/// Boxed future returned by session operations.
pub type SessionFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SessionError>> + Send + 'a>>;

/// Boxed future returned by the unit of work run inside [`with_session`].
pub type ScopedFuture<'s, T, E> = Pin<Box<dyn Future<Output = Result<T, E>> + Send + 's>>;

/// Failures reported by a rendering backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session launch failed: {0}")]
    Launch(String),
    #[error("navigation failed: {0}")]
    Navigation(String),
    #[error("script evaluation failed: {0}")]
    Script(String),
    #[error("no document loaded")]
    NoDocument,
}

/// One live rendering session (a browser page or equivalent).
pub trait BrowserSession: Send {
    /// Loads `url`; resolves once the document is available.
    fn goto<'a>(&'a mut self, url: &'a str) -> SessionFuture<'a, ()>;

    /// Whether the current document contains an element matching `selector`.
    fn has_element<'a>(&'a mut self, selector: &'a str) -> SessionFuture<'a, bool>;

    /// Scrolls to the bottom and returns the resulting scroll height.
    fn scroll_to_bottom(&mut self) -> SessionFuture<'_, u64>;

    /// Serialized HTML of the current document.
    fn content(&mut self) -> SessionFuture<'_, String>;

    /// Releases every resource held by the session.
    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Factory for rendering sessions.
pub trait SessionLauncher: Send + Sync {
    fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>>;
}

/// Owns a session and guarantees it is closed exactly once.
pub struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
    close_timeout: Duration,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>, close_timeout: Duration) -> Self {
        Self {
            session: Some(session),
            close_timeout,
        }
    }

    /// Live session; `None` only after [`release`](Self::release).
    pub fn session_mut(&mut self) -> Option<&mut Box<dyn BrowserSession>> {
        self.session.as_mut()
    }

    /// Closes the session, bounded by the close timeout.
    pub async fn release(mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        if tokio::time::timeout(self.close_timeout, session.close())
            .await
            .is_err()
        {
            tracing::warn!(
                timeout_ms = self.close_timeout.as_millis() as u64,
                "session close timed out"
            );
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("session dropped without release; closing in background");
                let close_timeout = self.close_timeout;
                handle.spawn(async move {
                    let _ = tokio::time::timeout(close_timeout, session.close()).await;
                });
            }
            Err(_) => {
                tracing::warn!("session dropped outside a runtime; close skipped");
            }
        }
    }
}

/// Launches a session, runs `work` on it, and closes it on every exit path.
///
/// Launch failures are converted with `E: From<SessionError>`; the session is
/// never handed out beyond `work`.
pub async fn with_session<T, E, F>(
    launcher: &dyn SessionLauncher,
    close_timeout: Duration,
    work: F,
) -> Result<T, E>
where
    E: From<SessionError>,
    F: for<'s> FnOnce(&'s mut Box<dyn BrowserSession>) -> ScopedFuture<'s, T, E>,
{
    let session = launcher.launch().await?;
    let mut guard = SessionGuard::new(session, close_timeout);

    let outcome = match guard.session_mut() {
        Some(session) => work(session).await,
        None => Err(E::from(SessionError::NoDocument)),
    };

    guard.release().await;
    outcome
}

/// Selector lookup over a static HTML snapshot.
pub(crate) fn contains_selector(html: &str, selector: &str) -> Result<bool, SessionError> {
    let selector = scraper::Selector::parse(selector)
        .map_err(|error| SessionError::Script(format!("invalid selector '{selector}': {error}")))?;
    Ok(scraper::Html::parse_document(html)
        .select(&selector)
        .next()
        .is_some())
}
