use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::cookie::Jar;
use reqwest::{Client, Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::model::config::ServerConfig;
use crate::model::task::{ListId, TaskId, TaskPatch};

use super::client::{SyncClient, SyncError};
use super::wire::{
    AddListResponse, AddTaskBody, AddTaskResponse, ErrorBody, FetchResponse, ListHeader,
    MoveBody, NameBody, WireTask,
};

/// `SyncClient` over JSON/HTTP with a session cookie.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
}

impl HttpClient {
    pub fn new(config: &ServerConfig) -> Result<Self, SyncError> {
        let base_url = Url::parse(config.url.trim_end_matches('/'))
            .map_err(|e| SyncError::InvalidUrl(format!("{}: {}", config.url, e)))?;

        let jar = Arc::new(Jar::default());
        if !config.session.is_empty() {
            jar.add_cookie_str(
                &format!("{}={}", config.cookie_name, config.session),
                &base_url,
            );
        }

        let client = Client::builder()
            .cookie_provider(jar)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(HttpClient { client, base_url })
    }

    /// Append `path` to the base URL, keeping any path prefix the base has.
    fn url(&self, path: &str) -> Result<Url, SyncError> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Url::parse(&joined).map_err(|e| SyncError::InvalidUrl(format!("{}: {}", joined, e)))
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, SyncError> {
        let url = self.url(path)?;
        debug!(%method, %url, "sync request");
        let mut builder = self.client.request(method, url);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| SyncError::Network(e.to_string()))?;
        check_status(response).await
    }

    async fn request_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, SyncError> {
        self.request(method, path, body)
            .await?
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("could not decode response: {}", e)))
    }
}

/// Pass 2xx responses through; turn anything else into `Rejected`.
async fn check_status(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or_else(|_| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        });
    Err(SyncError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Empty request body
const NO_BODY: Option<&()> = None;

#[async_trait]
impl SyncClient for HttpClient {
    async fn fetch_all(&self) -> Result<FetchResponse, SyncError> {
        self.request_json(Method::GET, "/tasks", NO_BODY).await
    }

    async fn add_list(&self, name: &str) -> Result<ListHeader, SyncError> {
        let resp: AddListResponse = self
            .request_json(Method::POST, "/add_list", Some(&NameBody { name }))
            .await?;
        Ok(resp.list)
    }

    async fn rename_list(&self, list_id: ListId, name: &str) -> Result<(), SyncError> {
        self.request(
            Method::PUT,
            &format!("/update_list/{}", list_id),
            Some(&NameBody { name }),
        )
        .await?;
        Ok(())
    }

    async fn delete_list(&self, list_id: ListId) -> Result<(), SyncError> {
        self.request(Method::DELETE, &format!("/delete_list/{}", list_id), NO_BODY)
            .await?;
        Ok(())
    }

    async fn delete_all_lists(&self) -> Result<(), SyncError> {
        self.request(Method::DELETE, "/delete_all_lists", NO_BODY)
            .await?;
        Ok(())
    }

    async fn add_task(&self, body: &AddTaskBody) -> Result<WireTask, SyncError> {
        let resp: AddTaskResponse = self
            .request_json(Method::POST, "/add_task", Some(body))
            .await?;
        Ok(resp.task)
    }

    async fn update_task(&self, task_id: TaskId, patch: &TaskPatch) -> Result<(), SyncError> {
        self.request(Method::PUT, &format!("/update_task/{}", task_id), Some(patch))
            .await?;
        Ok(())
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), SyncError> {
        self.request(Method::DELETE, &format!("/delete_task/{}", task_id), NO_BODY)
            .await?;
        Ok(())
    }

    async fn move_task(&self, task_id: TaskId, list_id: ListId) -> Result<(), SyncError> {
        self.request(
            Method::PUT,
            &format!("/move_task/{}", task_id),
            Some(&MoveBody { list_id }),
        )
        .await?;
        Ok(())
    }

    async fn logout(&self) -> Result<(), SyncError> {
        self.request(Method::POST, "/logout", NO_BODY).await?;
        Ok(())
    }
}
