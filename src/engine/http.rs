//! REST client for the draft engine.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{
    BootstrapRequest, BootstrappedTemplate, CreateDraftRequest, DraftEngine, DraftResponse,
    DraftVariables, EngineError, EngineResult, FinalDraft, FinalizeRequest, RegeneratedDraft,
    WebResult, WebSearchRequest, WebSearchResponse,
};
use crate::core::EngineConfig;

/// Draft engine reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpEngine {
    /// HTTP client
    client: Client,
    /// Base URL without trailing slash (e.g. "http://localhost:8000")
    base_url: String,
}

impl HttpEngine {
    /// Create a client for the engine at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: Client::new(), base_url: normalize_base_url(base_url.into()) }
    }

    /// Create a client from the `[engine]` config section.
    pub fn from_config(config: &EngineConfig) -> EngineResult<Self> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;
        Ok(Self { client, base_url: normalize_base_url(config.base_url.clone()) })
    }

    /// The base URL requests go to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    fn draft_url(&self, instance_id: &str, action: &str) -> String {
        self.url(&format!("/api/draft/{}/{}", urlencoding::encode(instance_id), action))
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> EngineResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        tracing::debug!(endpoint, "POST");
        let response = self.client.post(self.url(endpoint)).json(body).send().await?;
        decode(response).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, url: String) -> EngineResult<T> {
        tracing::debug!(%url, "POST");
        let response = self.client.post(url).send().await?;
        decode(response).await
    }
}

fn normalize_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

/// Turn a non-success response into an [`EngineError`].
///
/// The engine reports failures as `{"detail": "...", "code": "..."}`;
/// `code` is optional.
async fn failure(response: Response) -> EngineError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    failure_from_body(status, &body)
}

fn failure_from_body(status: u16, body: &str) -> EngineError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();

    let code = parsed.as_ref().and_then(|v| {
        v.get("code").or_else(|| v.get("error_code")).and_then(|c| c.as_str()).map(str::to_string)
    });

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("detail"))
        .map(|detail| match detail.as_str() {
            Some(text) => text.to_string(),
            None => detail.to_string(),
        })
        .unwrap_or_else(|| format!("HTTP {status}"));

    EngineError::api(status, code.as_deref(), message)
}

async fn decode<T: DeserializeOwned>(response: Response) -> EngineResult<T> {
    if !response.status().is_success() {
        return Err(failure(response).await);
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| EngineError::Decode(e.to_string()))
}

#[async_trait]
impl DraftEngine for HttpEngine {
    async fn create_draft(&self, user_query: &str) -> EngineResult<DraftResponse> {
        let body = CreateDraftRequest::ByQuery { user_query: user_query.to_string() };
        self.post_json("/api/draft", &body).await
    }

    async fn create_draft_with_template(&self, template_id: &str) -> EngineResult<DraftResponse> {
        let body = CreateDraftRequest::ByTemplate { template_id: template_id.to_string() };
        self.post_json("/api/draft", &body).await
    }

    async fn finalize_draft(
        &self,
        instance_id: &str,
        answers: &BTreeMap<String, String>,
        strict_replace: bool,
    ) -> EngineResult<FinalDraft> {
        let body = FinalizeRequest {
            instance_id: instance_id.to_string(),
            answers: answers.clone(),
            strict_replace,
        };
        self.post_json("/api/draft/finalize", &body).await
    }

    async fn regenerate_draft(&self, instance_id: &str) -> EngineResult<RegeneratedDraft> {
        self.post_empty(self.draft_url(instance_id, "regenerate")).await
    }

    async fn edit_draft_variables(&self, instance_id: &str) -> EngineResult<DraftVariables> {
        let response: DraftResponse = self.post_empty(self.draft_url(instance_id, "edit")).await?;
        Ok(response.into())
    }

    async fn download_docx(&self, instance_id: &str) -> EngineResult<Vec<u8>> {
        let url = self.draft_url(instance_id, "download/docx");
        tracing::debug!(%url, "GET");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(failure(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn search_web(&self, query: &str, limit: usize) -> EngineResult<Vec<WebResult>> {
        let body = WebSearchRequest { query: query.to_string(), num_results: limit };
        let response: WebSearchResponse = self.post_json("/api/web/search", &body).await?;
        Ok(response.results)
    }

    async fn bootstrap_from_web(
        &self,
        document_id: &str,
        document_url: &str,
        title: &str,
    ) -> EngineResult<BootstrappedTemplate> {
        let body = BootstrapRequest {
            document_id: document_id.to_string(),
            document_url: document_url.to_string(),
            title: title.to_string(),
        };
        self.post_json("/api/web/bootstrap", &body).await
    }

    async fn health(&self) -> EngineResult<serde_json::Value> {
        let response = self.client.get(self.url("/health")).send().await?;
        decode(response).await
    }

    fn name(&self) -> &str {
        "http"
    }
}
