use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::header::HeaderValue;

use super::{contains_selector, BrowserSession, SessionError, SessionFuture, SessionLauncher};

/// Script-less backend: fetches pages with reqwest and queries the static DOM.
///
/// Every launch builds its own client around an empty cookie jar, so no
/// cookie outlives the session that received it.
#[derive(Debug, Clone)]
pub struct HttpLauncher {
    user_agent: HeaderValue,
}

impl HttpLauncher {
    pub fn new(user_agent: &str) -> Result<Self, SessionError> {
        let user_agent = HeaderValue::from_str(user_agent).map_err(|error| {
            SessionError::Launch(format!("invalid user agent '{user_agent}': {error}"))
        })?;
        Ok(Self { user_agent })
    }

    fn session_client(&self) -> Result<reqwest::Client, SessionError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .cookie_provider(Arc::new(Jar::default()))
            .build()
            .map_err(|error| SessionError::Launch(format!("http client build failed: {error}")))
    }
}

impl SessionLauncher for HttpLauncher {
    fn launch(&self) -> SessionFuture<'_, Box<dyn BrowserSession>> {
        let session = self.session_client().map(|client| {
            Box::new(HttpSession {
                client,
                document: None,
            }) as Box<dyn BrowserSession>
        });
        Box::pin(std::future::ready(session))
    }
}

struct HttpSession {
    client: reqwest::Client,
    document: Option<String>,
}

impl HttpSession {
    fn document(&self) -> Result<&str, SessionError> {
        self.document.as_deref().ok_or(SessionError::NoDocument)
    }
}

impl BrowserSession for HttpSession {
    fn goto<'a>(&'a mut self, url: &'a str) -> SessionFuture<'a, ()> {
        Box::pin(async move {
            self.document = None;

            let response = self.client.get(url).send().await.map_err(|error| {
                if error.is_timeout() {
                    SessionError::Navigation(format!("request timeout: {error}"))
                } else if error.is_connect() {
                    SessionError::Navigation(format!("connection failed: {error}"))
                } else {
                    SessionError::Navigation(format!("request failed: {error}"))
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(SessionError::Navigation(format!(
                    "upstream returned status {}",
                    status.as_u16()
                )));
            }

            let body = response.text().await.map_err(|error| {
                SessionError::Navigation(format!("failed to read response body: {error}"))
            })?;
            self.document = Some(body);
            Ok(())
        })
    }

    fn has_element<'a>(&'a mut self, selector: &'a str) -> SessionFuture<'a, bool> {
        let found = self
            .document()
            .and_then(|html| contains_selector(html, selector));
        Box::pin(std::future::ready(found))
    }

    fn scroll_to_bottom(&mut self) -> SessionFuture<'_, u64> {
        // A static document never grows, so its size is a stable height.
        let height = self.document().map(|html| html.len() as u64);
        Box::pin(std::future::ready(height))
    }

    fn content(&mut self) -> SessionFuture<'_, String> {
        let html = self.document().map(str::to_owned);
        Box::pin(std::future::ready(html))
    }

    fn close(self: Box<Self>) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(std::future::ready(()))
    }
}
