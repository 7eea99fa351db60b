use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Url};
use tracing::debug;

use super::{NoteStore, StoreEntry};
use crate::error::{StoreError, StoreFailure, StoreOperation};

const INDEX_FILE: &str = "index.json";

/// [`NoteStore`] backed by the store's plain HTTP surface.
///
/// No request timeout is configured; the surrounding HTTP server bounds a
/// request's lifetime.
#[derive(Debug, Clone)]
pub struct HttpNoteStore {
    client: Client,
    base: Url,
    token: Option<String>,
}

impl HttpNoteStore {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, StoreError> {
        let invalid = || {
            StoreError::new(
                StoreOperation::List,
                None,
                StoreFailure::InvalidUrl(base_url.to_string()),
            )
        };
        let base = Url::parse(base_url).map_err(|_| invalid())?;
        if base.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self {
            client: Client::new(),
            base,
            token,
        })
    }

    /// `{base}/{segment}` with the segment percent-encoded.
    fn resource_url(&self, segment: &str) -> Option<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut().ok()?.pop_if_empty().push(segment);
        Some(url)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(
        &self,
        operation: StoreOperation,
        target: Option<&str>,
        req: RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let resp = self
            .authorize(req)
            .send()
            .await
            .map_err(|e| StoreError::new(operation, target, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::new(
                operation,
                target,
                StoreFailure::Status(status.as_u16()),
            ));
        }
        Ok(resp)
    }

    fn url_for(&self, operation: StoreOperation, name: &str) -> Result<Url, StoreError> {
        self.resource_url(name).ok_or_else(|| {
            StoreError::new(
                operation,
                Some(name),
                StoreFailure::InvalidUrl(self.base.to_string()),
            )
        })
    }
}

#[async_trait]
impl NoteStore for HttpNoteStore {
    async fn list_full(&self) -> Result<Vec<StoreEntry>, StoreError> {
        let op = StoreOperation::List;
        let url = self.url_for(op, INDEX_FILE)?;
        debug!(%url, "listing note store");
        let resp = self.send(op, None, self.client.get(url)).await?;
        let body = resp.text().await.map_err(|e| StoreError::new(op, None, e))?;
        serde_json::from_str(&body).map_err(|e| StoreError::new(op, None, e))
    }

    async fn read(&self, name: &str) -> Result<String, StoreError> {
        let op = StoreOperation::Read;
        let url = self.url_for(op, name)?;
        debug!(note = name, "reading note");
        let resp = self.send(op, Some(name), self.client.get(url)).await?;
        resp.text().await.map_err(|e| StoreError::new(op, Some(name), e))
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        let op = StoreOperation::Write;
        let url = self.url_for(op, name)?;
        debug!(note = name, bytes = content.len(), "writing note");
        let req = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, "text/markdown")
            .body(content.to_string());
        self.send(op, Some(name), req).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        let op = StoreOperation::Delete;
        let url = self.url_for(op, name)?;
        debug!(note = name, "deleting note");
        self.send(op, Some(name), self.client.delete(url)).await?;
        Ok(())
    }
}
