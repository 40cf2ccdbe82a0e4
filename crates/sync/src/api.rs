//! Annotation REST API
//!
//! [`AnnotationApi`] is the seam the sync layer talks through.
//! [`HttpAnnotationApi`] implements it over [`reqwest`]:
//!
//! | operation | request                                                        |
//! |-----------|----------------------------------------------------------------|
//! | list      | `GET /annotations?motivation=&document_element_id=&classroom_id=` |
//! | create    | `POST /annotations`                                            |
//! | patch     | `PATCH /annotations/{id}`                                      |
//! | delete    | `DELETE /annotations/{id}`                                     |

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use marginalia_core::{Annotation, AnnotationDraft, AnnotationPatch, MarginaliaConfig, Motivation};

/// Filter for listing annotations of one bucket on one document element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationQuery {
    pub motivation: Motivation,
    pub document_element_id: String,
    pub classroom_id: Option<String>,
}

impl AnnotationQuery {
    /// Query one bucket on one element
    pub fn new(motivation: Motivation, document_element_id: impl Into<String>) -> Self {
        Self {
            motivation,
            document_element_id: document_element_id.into(),
            classroom_id: None,
        }
    }

    /// Scope the query to a classroom
    pub fn with_classroom(mut self, classroom_id: Option<impl Into<String>>) -> Self {
        self.classroom_id = classroom_id.map(Into::into);
        self
    }

    /// Query-string pairs, in a stable order
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("motivation", self.motivation.as_str().to_string()),
            ("document_element_id", self.document_element_id.clone()),
        ];
        if let Some(classroom) = &self.classroom_id {
            pairs.push(("classroom_id", classroom.clone()));
        }
        pairs
    }
}

/// Request/response access to the annotation service
#[async_trait]
pub trait AnnotationApi: Send + Sync {
    async fn list(&self, query: &AnnotationQuery) -> ApiResult<Vec<Annotation>>;

    async fn create(&self, draft: &AnnotationDraft) -> ApiResult<Annotation>;

    async fn patch(&self, id: &str, patch: &AnnotationPatch) -> ApiResult<Annotation>;

    async fn delete(&self, id: &str) -> ApiResult<()>;
}

/// HTTP client for the annotation API
#[derive(Debug, Clone)]
pub struct HttpAnnotationApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAnnotationApi {
    /// * `base_url` - API root, e.g. `https://example.org/api`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (connection pooling, auth headers)
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    /// Client for the configured API base URL
    pub fn from_config(config: &MarginaliaConfig) -> Self {
        Self::new(config.api_base_url.clone())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn annotations_url(&self) -> String {
        format!("{}/annotations", self.base_url)
    }

    fn annotation_url(&self, id: &str) -> String {
        format!("{}/annotations/{}", self.base_url, id)
    }

    /// Return the response unchanged on 2xx, otherwise an
    /// [`ApiError::Status`] carrying the body text
    async fn ensure_success(response: reqwest::Response) -> ApiResult<reqwest::Response> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let response = Self::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        decode(&bytes)
    }
}

/// Decode a JSON body, keeping decode failures distinct from transport ones
fn decode<T: serde::de::DeserializeOwned>(body: &[u8]) -> ApiResult<T> {
    Ok(serde_json::from_slice(body)?)
}

#[async_trait]
impl AnnotationApi for HttpAnnotationApi {
    async fn list(&self, query: &AnnotationQuery) -> ApiResult<Vec<Annotation>> {
        let response = self
            .client
            .get(self.annotations_url())
            .query(&query.to_pairs())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn create(&self, draft: &AnnotationDraft) -> ApiResult<Annotation> {
        let response = self
            .client
            .post(self.annotations_url())
            .json(draft)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn patch(&self, id: &str, patch: &AnnotationPatch) -> ApiResult<Annotation> {
        let response = self
            .client
            .patch(self.annotation_url(id))
            .json(patch)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        let response = self.client.delete(self.annotation_url(id)).send().await?;

        Self::ensure_success(response).await?;
        Ok(())
    }
}
