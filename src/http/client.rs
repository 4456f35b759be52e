//! Reqwest-backed [`CoordinatorClient`] for remote workers.

use super::wire::{ErrorBody, JobsRequest, JobsResponse};
use crate::coordinator::Job;
use crate::task::domain::TaskId;
use crate::worker::{ClientError, ClientResult, CoordinatorClient};
use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use std::time::Duration;

/// Talks to a coordinator over HTTP.
///
/// Each request carries the configured timeout; an in-flight call is never
/// aborted early on shutdown.
#[derive(Debug, Clone)]
pub struct HttpCoordinatorClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCoordinatorClient {
    /// Creates a client for the coordinator at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(transport)?;
        let raw: String = base_url.into();
        Ok(Self {
            base_url: raw.trim_end_matches('/').to_owned(),
            client,
        })
    }

    fn task_url(&self, task_id: TaskId, action: &str) -> String {
        format!("{}/tasks/{task_id}/{action}", self.base_url)
    }

    async fn post_empty(&self, task_id: TaskId, action: &str) -> ClientResult<()> {
        let response = self
            .client
            .post(self.task_url(task_id, action))
            .send()
            .await
            .map_err(transport)?;
        check(response, ClientError::Internal).await?;
        Ok(())
    }
}

#[async_trait]
impl CoordinatorClient for HttpCoordinatorClient {
    async fn jobs(&self, worker: &str) -> ClientResult<Vec<Job>> {
        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .json(&JobsRequest {
                worker: worker.to_owned(),
            })
            .send()
            .await
            .map_err(transport)?;
        let body: JobsResponse = check(response, ClientError::InvalidWorker)
            .await?
            .json()
            .await
            .map_err(transport)?;

        body.jobs
            .into_iter()
            .map(|wire| {
                Job::try_from(wire)
                    .map_err(|err| ClientError::Transport(format!("malformed job: {err}")))
            })
            .collect()
    }

    async fn start(&self, task_id: TaskId) -> ClientResult<()> {
        self.post_empty(task_id, "start").await
    }

    async fn fail(&self, task_id: TaskId) -> ClientResult<()> {
        self.post_empty(task_id, "fail").await
    }

    async fn halt(&self, task_id: TaskId) -> ClientResult<()> {
        self.post_empty(task_id, "halt").await
    }

    async fn upload(&self, task_id: TaskId, contents: Vec<u8>) -> ClientResult<()> {
        let response = self
            .client
            .post(self.task_url(task_id, "upload"))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(contents)
            .send()
            .await
            .map_err(transport)?;
        check(response, ClientError::Internal).await?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    ClientError::Transport(err.to_string())
}

/// Maps a non-2xx response to a [`ClientError`].
///
/// Only `/jobs` validates anything the worker controls, so each call names
/// what a 400 means for it.
async fn check(
    response: Response,
    bad_request: fn(String) -> ClientError,
) -> ClientResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text).map_or(text, |body| body.error);
    Err(match status {
        StatusCode::BAD_REQUEST => bad_request(message),
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::CONFLICT => ClientError::Conflict(message),
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ClientError::Transport(message)
        }
        _ => ClientError::Internal(message),
    })
}
