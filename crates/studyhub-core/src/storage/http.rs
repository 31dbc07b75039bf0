//! HttpSessionStore: client for the StudyHub pomodoro REST API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::debug;

use super::store::{clamp_limit, SessionStore};
use crate::error::StoreError;
use crate::session::{CreateSessionRequest, Session, SessionDraft};

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    message: String,
}

/// Session store backed by a remote StudyHub server.
///
/// `base_url` is the pomodoro prefix, e.g.
/// `http://localhost:5000/api/v1/pomodoro`.
pub struct HttpSessionStore {
    base_url: String,
    http_client: Client,
}

impl HttpSessionStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            http_client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL of a single session. The id is one encoded path segment, so it
    /// can never address another route.
    fn session_url(&self, id: &str) -> Result<String, StoreError> {
        if id.is_empty() || id == "." || id == ".." {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(self.url(&format!("/session/{}", urlencoding::encode(id))))
    }
}

/// Turn a non-2xx response into `StoreError::Rejected`, keeping the
/// server's message when it sent one.
async fn check(resp: Response) -> Result<Response, StoreError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiMessage>(&body)
        .map(|m| m.message)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("unexpected response")
                .to_string()
        });
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(message));
    }
    Err(StoreError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn list(&self, limit: usize) -> Result<Vec<Session>, StoreError> {
        let url = self.url("/sessions");
        debug!(%url, "listing sessions");
        let resp = self
            .http_client
            .get(&url)
            .query(&[("limit", clamp_limit(limit))])
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn create(&self, draft: SessionDraft) -> Result<Session, StoreError> {
        draft.validate()?;
        let url = self.url("/session");
        debug!(%url, mode = %draft.mode, "creating session");
        let resp = self
            .http_client
            .post(&url)
            .json(&CreateSessionRequest::from(&draft))
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let url = self.session_url(id)?;
        debug!(%url, "deleting session");
        let resp = self.http_client.delete(&url).send().await?;
        check(resp).await?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let resp = self
            .http_client
            .delete(self.url("/sessions"))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}
