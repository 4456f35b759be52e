//! Axum router exposing a [`CoordinatorClient`] to remote workers.

use super::wire::{ErrorBody, JobsRequest, JobsResponse, WireJob};
use crate::config::HttpConfig;
use crate::task::domain::TaskId;
use crate::worker::{ClientError, CoordinatorClient};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State, rejection::BytesRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

type SharedClient = Arc<dyn CoordinatorClient>;

/// Error wrapper rendering [`ClientError`] as a JSON response.
#[derive(Debug)]
pub struct ApiError(pub ClientError);

impl ApiError {
    /// Returns the HTTP status for the wrapped error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self.0 {
            ClientError::InvalidWorker(_) => StatusCode::BAD_REQUEST,
            ClientError::NotFound(_) => StatusCode::NOT_FOUND,
            ClientError::Conflict(_) => StatusCode::CONFLICT,
            ClientError::Transport(_) => StatusCode::BAD_GATEWAY,
            ClientError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        } else {
            warn!(%status, error = %self.0, "request rejected");
        }
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the coordinator router.
///
/// Routes: `POST /jobs`, and `POST /tasks/{task_id}/start`, `/fail`,
/// `/halt`, `/upload` (raw output as the request body, at most
/// `config.max_upload_bytes`).
pub fn router(client: SharedClient, config: HttpConfig) -> Router {
    Router::new()
        .route("/jobs", post(jobs))
        .route("/tasks/{task_id}/start", post(start))
        .route("/tasks/{task_id}/fail", post(fail))
        .route("/tasks/{task_id}/halt", post(halt))
        .route(
            "/tasks/{task_id}/upload",
            post(upload).layer(DefaultBodyLimit::max(config.max_upload_bytes)),
        )
        .with_state(client)
}

async fn jobs(
    State(client): State<SharedClient>,
    Json(request): Json<JobsRequest>,
) -> Result<Json<JobsResponse>, ApiError> {
    let assigned = client.jobs(&request.worker).await?;
    Ok(Json(JobsResponse {
        jobs: assigned.iter().map(WireJob::from).collect(),
    }))
}

async fn start(
    State(client): State<SharedClient>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    client.start(TaskId::from_uuid(task_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn fail(
    State(client): State<SharedClient>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    client.fail(TaskId::from_uuid(task_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn halt(
    State(client): State<SharedClient>,
    Path(task_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    client.halt(TaskId::from_uuid(task_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload(
    State(client): State<SharedClient>,
    Path(task_id): Path<Uuid>,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, Response> {
    let contents = body.map_err(|rejection| {
        warn!(
            %task_id,
            status = %rejection.status(),
            reason = %rejection.body_text(),
            "upload body rejected"
        );
        rejection.into_response()
    })?;
    client
        .upload(TaskId::from_uuid(task_id), contents.to_vec())
        .await
        .map_err(|err| ApiError(err).into_response())?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{Job, JobModule};
    use crate::task::domain::CommitSha;
    use crate::worker::ports::MockCoordinatorClient;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use rstest::rstest;
    use std::time::Duration;
    use tower::ServiceExt;

    async fn send(client: MockCoordinatorClient, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        send_with(client, HttpConfig::default(), request).await
    }

    async fn send_with(
        client: MockCoordinatorClient,
        config: HttpConfig,
        request: Request<Body>,
    ) -> (StatusCode, Vec<u8>) {
        let app = router(Arc::new(client), config);
        let response = app.oneshot(request).await.expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, body.to_vec())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .expect("request")
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn jobs_returns_wire_jobs() {
        let task_id = TaskId::new();
        let mut client = MockCoordinatorClient::new();
        client
            .expect_jobs()
            .withf(|worker| worker == "gopher")
            .returning(move |_| {
                Ok(vec![Job {
                    task_id,
                    commit_sha: CommitSha::new("a".repeat(40)).expect("valid sha"),
                    module: JobModule {
                        path: "example.com/bench".to_owned(),
                        version: "v1.0.0".to_owned(),
                    },
                    short: true,
                    bench_time: Duration::from_secs(1),
                }])
            });

        let (status, body) = send(client, post_json("/jobs", r#"{"worker":"gopher"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        let response: JobsResponse = serde_json::from_slice(&body).expect("json body");
        let uuids: Vec<Uuid> = response.jobs.iter().map(|job| job.task_uuid).collect();
        assert_eq!(uuids, vec![task_id.into_inner()]);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn empty_assignment_is_ok() {
        let mut client = MockCoordinatorClient::new();
        client.expect_jobs().returning(|_| Ok(Vec::new()));

        let (status, body) = send(client, post_json("/jobs", r#"{"worker":"gopher"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"jobs":[]}"#);
    }

    #[rstest]
    #[case(ClientError::InvalidWorker("gopherPi".to_owned()), StatusCode::BAD_REQUEST)]
    #[case(ClientError::NotFound("task".to_owned()), StatusCode::NOT_FOUND)]
    #[case(ClientError::Conflict("task is halted".to_owned()), StatusCode::CONFLICT)]
    #[case(ClientError::Internal("store offline".to_owned()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[tokio::test(flavor = "multi_thread")]
    async fn errors_map_to_status_codes(#[case] err: ClientError, #[case] expected: StatusCode) {
        let mut client = MockCoordinatorClient::new();
        let returned = err.clone();
        client
            .expect_start()
            .returning(move |_| Err(returned.clone()));

        let uri = format!("/tasks/{}/start", Uuid::new_v4());
        let (status, body) = send(client, post_json(&uri, "")).await;
        assert_eq!(status, expected);
        let error: ErrorBody = serde_json::from_slice(&body).expect("error body");
        assert_eq!(error.error, err.to_string());
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn upload_forwards_raw_body() {
        let task_id = Uuid::new_v4();
        let mut client = MockCoordinatorClient::new();
        client
            .expect_upload()
            .withf(move |id, contents| id.into_inner() == task_id && contents == b"raw output")
            .times(1)
            .returning(|_, _| Ok(()));

        let request = Request::builder()
            .method("POST")
            .uri(format!("/tasks/{task_id}/upload"))
            .body(Body::from("raw output"))
            .expect("request");
        let (status, _) = send(client, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    fn upload_request(task_id: Uuid, size: usize) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/tasks/{task_id}/upload"))
            .body(Body::from(vec![b'x'; size]))
            .expect("request")
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn uploads_beyond_two_mebibytes_are_accepted() {
        let size = 3 * 1024 * 1024;
        let task_id = Uuid::new_v4();
        let mut client = MockCoordinatorClient::new();
        client
            .expect_upload()
            .withf(move |_, contents| contents.len() == size)
            .times(1)
            .returning(|_, _| Ok(()));

        let (status, _) = send(client, upload_request(task_id, size)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn uploads_over_the_configured_limit_are_refused() {
        let mut client = MockCoordinatorClient::new();
        client.expect_upload().never();
        let config = HttpConfig {
            max_upload_bytes: 1024,
        };

        let (status, _) =
            send_with(client, config, upload_request(Uuid::new_v4(), 4096)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread")]
    async fn malformed_task_id_is_rejected() {
        let client = MockCoordinatorClient::new();
        let (status, _) = send(client, post_json("/tasks/not-a-uuid/halt", "")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
