use std::future::Future;
use std::pin::Pin;

use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserSession, SessionError, SessionFuture, SessionLauncher};

const SCROLL_SCRIPT: &str =
    "window.scrollTo(0, document.body.scrollHeight); document.body.scrollHeight";

/// Headless Chromium backend; one browser process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    user_agent: String,
}

impl ChromiumLauncher {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    fn browser_config(&self) -> Result<BrowserConfig, SessionError> {
        BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox")
            .build()
            .map_err(SessionError::Launch)
    }
}

impl SessionLauncher for ChromiumLauncher {
    fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>> {
        Box::pin(async move {
            let config = self.browser_config()?;
            let (mut browser, mut handler) = Browser::launch(config)
                .await
                .map_err(|error| SessionError::Launch(error.to_string()))?;

            let handler_task = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = match open_page(&browser, &self.user_agent).await {
                Ok(page) => page,
                Err(error) => {
                    let _ = browser.close().await;
                    let _ = browser.wait().await;
                    handler_task.abort();
                    return Err(error);
                }
            };

            Ok(Box::new(ChromiumSession {
                browser,
                page: Some(page),
                handler_task,
            }) as Box<dyn BrowserSession>)
        })
    }
}

async fn open_page(browser: &Browser, user_agent: &str) -> Result<Page, SessionError> {
    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|error| SessionError::Launch(format!("page creation failed: {error}")))?;
    page.set_user_agent(user_agent)
        .await
        .map_err(|error| SessionError::Launch(format!("user agent rejected: {error}")))?;
    Ok(page)
}

struct ChromiumSession {
    browser: Browser,
    page: Option<Page>,
    handler_task: JoinHandle<()>,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page, SessionError> {
        self.page.as_ref().ok_or(SessionError::NoDocument)
    }
}

impl BrowserSession for ChromiumSession {
    fn goto<'a>(&'a mut self, url: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.page()?
                .goto(url)
                .await
                .map(|_| ())
                .map_err(|error| SessionError::Navigation(error.to_string()))
        })
    }

    fn has_element<'a>(&'a mut self, selector: &'a str) -> SessionFuture<'a, bool> {
        Box::pin(async move {
            let page = self.page()?;
            Ok::<_, SessionError>(page.find_element(selector).await.is_ok())
        })
    }

    fn scroll_to_bottom(&mut self) -> SessionFuture<'_, u64> {
        Box::pin(async move {
            self.page()?
                .evaluate(SCROLL_SCRIPT)
                .await
                .map_err(|error| SessionError::Script(error.to_string()))?
                .into_value::<f64>()
                .map(|height| height.max(0.0) as u64)
                .map_err(|error| SessionError::Script(error.to_string()))
        })
    }

    fn content(&mut self) -> SessionFuture<'_, String> {
        Box::pin(async move {
            self.page()?
                .content()
                .await
                .map_err(|error| SessionError::Script(error.to_string()))
        })
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let mut session = *self;
        Box::pin(async move {
            if let Some(page) = session.page.take() {
                if let Err(error) = page.close().await {
                    tracing::debug!(%error, "page close failed");
                }
            }
            if let Err(error) = session.browser.close().await {
                tracing::debug!(%error, "browser close failed");
            }
            let _ = session.browser.wait().await;
            session.handler_task.abort();
        })
    }
}
