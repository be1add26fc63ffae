//! In-process stub of the redaction backend for integration tests.
//!
//! Records every request it receives (path, API key, multipart fields) and
//! answers from scripted responses. Job status responses are replayed in
//! order; the last one repeats.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use privacyscrub_console::config::ApiBase;
use privacyscrub_console::contract::ContractVersion;
use privacyscrub_console::services::client::ScrubClient;

pub const TEST_API_KEY: &str = "test-key";

#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl StubResponse {
    pub fn json(status: u16, value: serde_json::Value) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn bytes(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: content_type.to_string(),
            body: body.to_vec(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "text/plain".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }
}

/// One request as the stub saw it.
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub request_id: Option<String>,
    pub fields: Vec<(String, String)>,
    pub file_name: Option<String>,
    pub file_bytes: Option<Vec<u8>>,
}

impl RecordedRequest {
    pub fn field_count(&self, name: &str) -> usize {
        self.fields.iter().filter(|(n, _)| n == name).count()
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone)]
pub struct StubBackend {
    received: Arc<Mutex<Vec<RecordedRequest>>>,
    submit_response: Arc<Mutex<StubResponse>>,
    job_script: Arc<Mutex<VecDeque<StubResponse>>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            received: Arc::default(),
            submit_response: Arc::new(Mutex::new(StubResponse::json(
                200,
                serde_json::json!({ "job_id": "job-123", "status": "PENDING" }),
            ))),
            job_script: Arc::default(),
        }
    }

    /// Response for any POST submission endpoint.
    pub fn with_submit_response(self, response: StubResponse) -> Self {
        *self.submit_response.lock().unwrap() = response;
        self
    }

    /// Responses for `GET /v1/jobs/{job_id}`, replayed in order.
    pub fn with_job_script(self, script: Vec<StubResponse>) -> Self {
        *self.job_script.lock().unwrap() = script.into();
        self
    }

    pub fn received(&self) -> Vec<RecordedRequest> {
        self.received.lock().unwrap().clone()
    }

    /// Bind to an ephemeral loopback port and serve in the background.
    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/v1/anonymize-image", post(submit))
            .route("/v1/anonymize-video", post(submit))
            .route("/v1/video", post(submit))
            .route("/v1/jobs/{job_id}", get(job_status))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub backend");
        let addr = listener.local_addr().expect("Stub backend has no address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Stub backend crashed");
        });

        format!("http://{addr}")
    }

    fn record(&self, request: RecordedRequest) {
        self.received.lock().unwrap().push(request);
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn respond(response: StubResponse) -> impl IntoResponse {
    (
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, response.content_type)],
        response.body,
    )
}

async fn submit(
    State(stub): State<StubBackend>,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let mut recorded = RecordedRequest {
        path: uri.path().to_string(),
        api_key: header_value(&headers, "x-api-key"),
        request_id: header_value(&headers, "x-request-id"),
        ..Default::default()
    };

    while let Some(field) = multipart.next_field().await.expect("Malformed multipart body") {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            recorded.file_name = field.file_name().map(str::to_string);
            recorded.file_bytes = Some(field.bytes().await.expect("Unreadable file part").to_vec());
        } else {
            let value = field.text().await.expect("Unreadable text field");
            recorded.fields.push((name, value));
        }
    }

    stub.record(recorded);
    let response = stub.submit_response.lock().unwrap().clone();
    respond(response)
}

async fn job_status(
    State(stub): State<StubBackend>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> impl IntoResponse {
    stub.record(RecordedRequest {
        path: format!("/v1/jobs/{job_id}"),
        api_key: header_value(&headers, "x-api-key"),
        request_id: header_value(&headers, "x-request-id"),
        ..Default::default()
    });

    let response = {
        let mut script = stub.job_script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
    };
    match response {
        Some(response) => respond(response).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Client against `base_url` speaking `contract`, authenticated with [`TEST_API_KEY`].
pub fn client(base_url: &str, contract: ContractVersion) -> Arc<ScrubClient> {
    Arc::new(
        ScrubClient::new(
            ApiBase::parse(base_url).expect("Stub URL should parse"),
            Some(TEST_API_KEY.to_string()),
            contract.adapter(),
            Duration::from_secs(5),
        )
        .expect("Failed to build client"),
    )
}
