//! Businessmap HTTP client with rate limiting.
//!
//! Wraps the Businessmap REST API v2 for a single instance. Requests carry
//! the instance token in the `apikey` header and draw on a per-instance
//! [`RequestBudget`] shared by all clones of the client.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Board, Card, CardUpdate, ClientsConfig, CurrentUser, ResolvedInstance, ResourceType, Workspace,
};
use crate::domain::ports::{BoardClient, ClientFactory};
use crate::infrastructure::logging::scrub;

use super::budget::RequestBudget;
use super::models::{ApiEnvelope, ArchiveRequest, CardPage, ChildCardRef};

/// Longest backend error body echoed into an error message.
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Transport settings shared by every client a factory builds.
#[derive(Debug, Clone)]
pub struct BusinessMapClientConfig {
    /// Requests allowed per instance in any rolling minute.
    pub requests_per_minute: u32,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for BusinessMapClientConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            timeout_secs: 30,
        }
    }
}

impl From<&ClientsConfig> for BusinessMapClientConfig {
    fn from(config: &ClientsConfig) -> Self {
        Self {
            requests_per_minute: config.requests_per_minute,
            timeout_secs: config.timeout_secs,
        }
    }
}

/// HTTP client for one Businessmap instance.
#[derive(Clone)]
pub struct BusinessMapClient {
    http: Client,
    instance: String,
    base_url: String,
    api_token: String,
    read_only: bool,
    budget: Arc<Mutex<RequestBudget>>,
}

impl fmt::Debug for BusinessMapClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusinessMapClient")
            .field("instance", &self.instance)
            .field("base_url", &self.base_url)
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

impl BusinessMapClient {
    /// Build a client for `instance`. Does not contact the backend.
    pub fn new(instance: &ResolvedInstance, config: &BusinessMapClientConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| DomainError::ApiRequestFailed {
                status: None,
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            instance: instance.descriptor.name.clone(),
            base_url: instance.descriptor.api_url.trim_end_matches('/').to_string(),
            api_token: instance.api_token.clone(),
            read_only: instance.descriptor.read_only_mode,
            budget: Arc::new(Mutex::new(RequestBudget::per_minute(
                instance.descriptor.name.clone(),
                config.requests_per_minute,
            ))),
        })
    }

    /// Wait for room in the request budget and build an authorized request.
    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.budget.lock().await.acquire().await;
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .header("apikey", &self.api_token)
            .header("Accept", "application/json")
    }

    fn ensure_writable(&self, operation: &str) -> DomainResult<()> {
        if self.read_only {
            return Err(DomainError::ReadOnlyInstance {
                instance: self.instance.clone(),
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// Send a request and unwrap the `data` envelope of a successful response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        target: Option<(ResourceType, i64)>,
    ) -> DomainResult<T> {
        let response = self.send(request, target).await?;
        let envelope: ApiEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        target: Option<(ResourceType, i64)>,
    ) -> DomainResult<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.map_error_status(status, &body, target))
    }

    fn map_error_status(
        &self,
        status: StatusCode,
        body: &str,
        target: Option<(ResourceType, i64)>,
    ) -> DomainError {
        match (status, target) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
                DomainError::Unauthorized(self.instance.clone())
            }
            (StatusCode::NOT_FOUND, Some((resource, id))) => DomainError::NotFound {
                resource: resource.label().to_string(),
                id,
            },
            (StatusCode::TOO_MANY_REQUESTS, _) => DomainError::RateLimited(self.instance.clone()),
            _ => {
                let message: String = scrub(body).chars().take(MAX_ERROR_BODY_CHARS).collect();
                tracing::warn!(
                    instance = %self.instance,
                    status = status.as_u16(),
                    "Businessmap request failed"
                );
                DomainError::ApiRequestFailed {
                    status: Some(status.as_u16()),
                    message,
                }
            }
        }
    }
}

#[async_trait]
impl BoardClient for BusinessMapClient {
    fn instance_name(&self) -> &str {
        &self.instance
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    async fn initialize(&self) -> DomainResult<CurrentUser> {
        let request = self.request(Method::GET, "/me").await;
        let user: CurrentUser = self.send_json(request, None).await?;
        tracing::info!(instance = %self.instance, user_id = user.user_id, "Businessmap client initialized");
        Ok(user)
    }

    async fn get_workspace(&self, workspace_id: i64) -> DomainResult<Workspace> {
        let request = self
            .request(Method::GET, &format!("/workspaces/{workspace_id}"))
            .await;
        self.send_json(request, Some((ResourceType::Workspace, workspace_id)))
            .await
    }

    async fn get_board(&self, board_id: i64) -> DomainResult<Board> {
        let request = self.request(Method::GET, &format!("/boards/{board_id}")).await;
        self.send_json(request, Some((ResourceType::Board, board_id)))
            .await
    }

    async fn get_card(&self, card_id: i64) -> DomainResult<Card> {
        let request = self.request(Method::GET, &format!("/cards/{card_id}")).await;
        self.send_json(request, Some((ResourceType::Card, card_id)))
            .await
    }

    async fn list_boards(&self, workspace_id: i64) -> DomainResult<Vec<Board>> {
        let request = self
            .request(Method::GET, "/boards")
            .await
            .query(&[("workspace_ids", workspace_id.to_string())]);
        self.send_json(request, Some((ResourceType::Workspace, workspace_id)))
            .await
    }

    async fn list_cards(&self, board_id: i64) -> DomainResult<Vec<Card>> {
        let request = self
            .request(Method::GET, "/cards")
            .await
            .query(&[("board_ids", board_id.to_string())]);
        let page: CardPage = self
            .send_json(request, Some((ResourceType::Board, board_id)))
            .await?;
        Ok(page.data)
    }

    async fn list_card_children(&self, card_id: i64) -> DomainResult<Vec<i64>> {
        let request = self
            .request(Method::GET, &format!("/cards/{card_id}/children"))
            .await;
        let children: Vec<ChildCardRef> = self
            .send_json(request, Some((ResourceType::Card, card_id)))
            .await?;
        Ok(children.into_iter().map(|c| c.card_id).collect())
    }

    async fn archive_workspace(&self, workspace_id: i64) -> DomainResult<()> {
        self.ensure_writable("archive workspace")?;
        let request = self
            .request(Method::PATCH, &format!("/workspaces/{workspace_id}"))
            .await
            .json(&ArchiveRequest::archived());
        self.send(request, Some((ResourceType::Workspace, workspace_id)))
            .await?;
        Ok(())
    }

    async fn archive_board(&self, board_id: i64) -> DomainResult<()> {
        self.ensure_writable("archive board")?;
        let request = self
            .request(Method::PATCH, &format!("/boards/{board_id}"))
            .await
            .json(&ArchiveRequest::archived());
        self.send(request, Some((ResourceType::Board, board_id)))
            .await?;
        Ok(())
    }

    async fn delete_board(&self, board_id: i64) -> DomainResult<()> {
        self.ensure_writable("delete board")?;
        let request = self
            .request(Method::DELETE, &format!("/boards/{board_id}"))
            .await;
        self.send(request, Some((ResourceType::Board, board_id)))
            .await?;
        Ok(())
    }

    async fn update_card(&self, card_id: i64, update: &CardUpdate) -> DomainResult<Card> {
        self.ensure_writable("update card")?;
        let request = self
            .request(Method::PATCH, &format!("/cards/{card_id}"))
            .await
            .json(update);
        self.send_json(request, Some((ResourceType::Card, card_id)))
            .await
    }

    async fn delete_card(&self, card_id: i64) -> DomainResult<()> {
        self.ensure_writable("delete card")?;
        let request = self
            .request(Method::DELETE, &format!("/cards/{card_id}"))
            .await;
        self.send(request, Some((ResourceType::Card, card_id)))
            .await?;
        Ok(())
    }
}

/// [`ClientFactory`] producing HTTP clients.
#[derive(Debug, Clone, Default)]
pub struct HttpClientFactory {
    config: BusinessMapClientConfig,
}

impl HttpClientFactory {
    /// Factory building clients with `config`.
    pub const fn new(config: BusinessMapClientConfig) -> Self {
        Self { config }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, instance: &ResolvedInstance) -> DomainResult<Arc<dyn BoardClient>> {
        Ok(Arc::new(BusinessMapClient::new(instance, &self.config)?))
    }
}
