use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{contains_selector, BrowserSession, SessionError, SessionFuture, SessionLauncher};

/// Launch/close counters shared by a [`FixtureLauncher`] and its sessions.
#[derive(Debug, Clone, Default)]
pub struct LaunchStats {
    launched: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    navigations: Arc<AtomicUsize>,
    scrolls: Arc<AtomicUsize>,
}

impl LaunchStats {
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Sessions launched but not yet closed.
    pub fn open(&self) -> usize {
        self.launched().saturating_sub(self.closed())
    }

    /// Navigation attempts, failed ones included.
    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn scrolls(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

/// Scripted page served for every URL starting with its prefix.
#[derive(Debug, Clone)]
pub struct FixturePage {
    html: String,
    remaining_failures: Arc<AtomicUsize>,
    hang: bool,
    delay: Option<Duration>,
    scroll_heights: Vec<u64>,
}

impl FixturePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            remaining_failures: Arc::new(AtomicUsize::new(0)),
            hang: false,
            delay: None,
            scroll_heights: Vec::new(),
        }
    }

    /// The first `count` navigations to this page fail.
    pub fn failing_navigations(self, count: usize) -> Self {
        self.remaining_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Navigation never completes.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    /// Navigation completes after `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Heights reported by successive scrolls; the last one repeats.
    pub fn with_scroll_heights(mut self, heights: Vec<u64>) -> Self {
        self.scroll_heights = heights;
        self
    }
}

/// Deterministic in-memory launcher.
#[derive(Debug, Clone, Default)]
pub struct FixtureLauncher {
    pages: Arc<Vec<(String, FixturePage)>>,
    fail_launch: bool,
    stats: LaunchStats,
}

impl FixtureLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url_prefix: impl Into<String>, page: FixturePage) -> Self {
        let mut pages = self.pages.as_ref().clone();
        pages.push((url_prefix.into(), page));
        self.pages = Arc::new(pages);
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn stats(&self) -> LaunchStats {
        self.stats.clone()
    }
}

impl SessionLauncher for FixtureLauncher {
    fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>> {
        Box::pin(async move {
            if self.fail_launch {
                return Err(SessionError::Launch(String::from(
                    "fixture launcher configured to fail",
                )));
            }

            self.stats.launched.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FixtureSession {
                pages: Arc::clone(&self.pages),
                stats: self.stats.clone(),
                current: None,
                scroll_index: 0,
            }) as Box<dyn BrowserSession>)
        })
    }
}

struct FixtureSession {
    pages: Arc<Vec<(String, FixturePage)>>,
    stats: LaunchStats,
    current: Option<FixturePage>,
    scroll_index: usize,
}

impl FixtureSession {
    fn page_for(&self, url: &str) -> Option<FixturePage> {
        self.pages
            .iter()
            .filter(|(prefix, _)| url.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, page)| page.clone())
    }
}

impl BrowserSession for FixtureSession {
    fn goto<'a>(&'a mut self, url: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.stats.navigations.fetch_add(1, Ordering::SeqCst);

            let page = self
                .page_for(url)
                .ok_or_else(|| SessionError::Navigation(format!("no fixture page for '{url}'")))?;

            let failing = page
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_ok();
            if failing {
                return Err(SessionError::Navigation(format!(
                    "scripted navigation failure for '{url}'"
                )));
            }

            if page.hang {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = page.delay {
                tokio::time::sleep(delay).await;
            }

            self.current = Some(page);
            self.scroll_index = 0;
            Ok(())
        })
    }

    fn has_element<'a>(&'a mut self, selector: &'a str) -> SessionFuture<'a, bool> {
        let found = match &self.current {
            Some(page) => contains_selector(&page.html, selector),
            None => Err(SessionError::NoDocument),
        };
        Box::pin(std::future::ready(found))
    }

    fn scroll_to_bottom(&mut self) -> SessionFuture<'_, u64> {
        self.stats.scrolls.fetch_add(1, Ordering::SeqCst);
        let height = match &self.current {
            Some(page) => {
                let height = page
                    .scroll_heights
                    .get(self.scroll_index)
                    .or(page.scroll_heights.last())
                    .copied()
                    .unwrap_or(page.html.len() as u64);
                self.scroll_index += 1;
                Ok(height)
            }
            None => Err(SessionError::NoDocument),
        };
        Box::pin(std::future::ready(height))
    }

    fn content(&mut self) -> SessionFuture<'_, String> {
        let html = self
            .current
            .as_ref()
            .map(|page| page.html.clone())
            .ok_or(SessionError::NoDocument);
        Box::pin(std::future::ready(html))
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(()))
    }
}
