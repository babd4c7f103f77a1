use crate::backend::{Backend, BackendCall, BackendError, BackendResponse, BinaryMatchOptions};
use crate::config::BackendConfig;
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const API_TOKEN_HEADER: &str = "apitoken";

/// Body of an outgoing backend request
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Text(String),
    Binary(Bytes),
}

/// Backend REST request an operation maps onto
#[derive(Debug, Clone, PartialEq)]
pub struct BackendRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub payload: Payload,
}

impl BackendRequest {
    fn get(path: String) -> Self {
        Self {
            method: Method::GET,
            path,
            query: Vec::new(),
            payload: Payload::Empty,
        }
    }

    fn post(path: String, payload: Payload) -> Self {
        Self {
            method: Method::POST,
            path,
            query: Vec::new(),
            payload,
        }
    }

    fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    fn param_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    fn match_options(self, options: &BinaryMatchOptions) -> Self {
        self.param_opt("minhash_threshold", options.minhash_threshold)
            .param_opt("pichash_size", options.pichash_size)
            .param_opt("band_matches_required", options.band_matches_required)
            .param(
                "force_recalculation",
                options.force_recalculation.as_query_value(),
            )
    }
}

fn with_suffix(base: String, suffix: &str, enabled: bool) -> String {
    if enabled {
        format!("{}/{}", base, suffix)
    } else {
        base
    }
}

impl From<BackendCall> for BackendRequest {
    fn from(call: BackendCall) -> Self {
        match call {
            BackendCall::GetStatus => Self::get("/status".to_string()),
            BackendCall::GetVersion => Self::get("/version".to_string()),
            BackendCall::GetFunctionsBySampleId(id) => {
                Self::get(format!("/samples/{}/functions", id))
            }
            BackendCall::GetSampleById(id) => Self::get(format!("/samples/{}", id)),
            BackendCall::GetSampleBySha256(digest) => {
                Self::get(format!("/samples/sha256/{}", digest))
            }
            BackendCall::GetSamples { start, limit } => Self::get("/samples".to_string())
                .param("start", start)
                .param("limit", limit),
            BackendCall::AddReport(report) => {
                Self::post("/samples".to_string(), Payload::Json(report))
            }
            BackendCall::GetFamily {
                family_id,
                with_samples,
            } => Self::get(format!("/families/{}", family_id)).param("with_samples", with_samples),
            BackendCall::GetFamilies => Self::get("/families".to_string()),
            BackendCall::GetFunctionById {
                function_id,
                with_xcfg,
            } => Self::get(format!("/functions/{}", function_id)).param("with_xcfg", with_xcfg),
            BackendCall::GetFunctions { start, limit } => Self::get("/functions".to_string())
                .param("start", start)
                .param("limit", limit),
            BackendCall::GetFunctionsByIds {
                function_ids,
                with_label_only,
            } => {
                let body = function_ids
                    .iter()
                    .map(u64::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                Self::post("/functions".to_string(), Payload::Text(body))
                    .param("with_label_only", with_label_only)
            }
            BackendCall::GetMatchesForSmdaFunction(report) => {
                Self::post("/query/function".to_string(), Payload::Json(report))
            }
            BackendCall::GetMatchesForPicHash { pichash, summary } => Self::get(with_suffix(
                format!("/query/pichash/{:016x}", pichash),
                "summary",
                summary,
            )),
            BackendCall::GetMatchesForPicBlockHash {
                picblockhash,
                summary,
            } => Self::get(with_suffix(
                format!("/query/picblockhash/{:016x}", picblockhash),
                "summary",
                summary,
            )),
            BackendCall::GetQueueData(queue) => Self::get("/jobs".to_string())
                .param("start", queue.start)
                .param("limit", queue.limit)
                .param_opt("method", queue.method)
                .param_opt("filter", queue.filter)
                .param_opt("state", queue.state)
                .param("ascending", queue.ascending.as_query_value()),
            BackendCall::GetJobData(job_id) => Self::get(format!("/jobs/{}", job_id)),
            BackendCall::GetResultForJob(job_id) => Self::get(format!("/jobs/{}/result", job_id)),
            BackendCall::GetResult(result_id) => Self::get(format!("/results/{}", result_id)),
            BackendCall::GetJobForResult(result_id) => {
                Self::get(format!("/results/{}/job", result_id))
            }
            BackendCall::RequestMatchesForSample(sample_id) => {
                Self::get(format!("/matches/sample/{}", sample_id))
            }
            BackendCall::RequestMatchesForSampleVs {
                sample_id,
                other_sample_id,
            } => Self::get(format!("/matches/sample/{}/{}", sample_id, other_sample_id)),
            BackendCall::GetMatchFunctionVs {
                function_id,
                other_function_id,
            } => match other_function_id {
                Some(other) => Self::get(format!("/matches/function/{}/{}", function_id, other)),
                None => Self::get(format!("/matches/function/{}", function_id)),
            },
            BackendCall::RequestMatchesForMappedBinary {
                binary,
                base_address,
                options,
            } => Self::post(
                format!("/query/binary/mapped/{}", base_address),
                Payload::Binary(binary),
            )
            .match_options(&options),
            BackendCall::RequestMatchesForUnmappedBinary { binary, options } => {
                Self::post("/query/binary".to_string(), Payload::Binary(binary))
                    .match_options(&options)
            }
        }
    }
}

/// Backend reached over HTTP with a pooled reqwest client
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    /// Create a new HTTP backend from configuration
    pub fn new(config: BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_connections)
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, call: BackendCall) -> Result<BackendResponse, BackendError> {
        let operation = call.name();
        let request = BackendRequest::from(call);
        let url = self.url(&request.path);

        debug!(
            operation,
            "Executing backend request: {} {} with {} query params",
            request.method,
            url,
            request.query.len()
        );

        let mut builder = self.client.request(request.method, &url);

        for (key, value) in &self.config.headers {
            builder = builder.header(key, value);
        }

        if let Some(token) = self.config.api_token.as_deref().filter(|t| !t.is_empty()) {
            builder = builder.header(API_TOKEN_HEADER, token);
        }

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match request.payload {
            Payload::Empty => builder,
            Payload::Json(value) => builder.json(&value),
            Payload::Text(text) => builder.body(text),
            Payload::Binary(bytes) => builder.body(bytes),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        debug!(
            operation,
            "Backend response received: status={}, body_len={}",
            status,
            body.len()
        );

        Ok(BackendResponse::new(status, decode_payload(status, &body)?))
    }
}

/// Successful answers must be JSON; error bodies are never relayed, so they
/// are kept only when they happen to decode
fn decode_payload(status: u16, body: &[u8]) -> Result<Value, BackendError> {
    match serde_json::from_slice(body) {
        Ok(value) => Ok(value),
        Err(e) if status == 200 || status == 202 => {
            Err(BackendError::InvalidPayload(e.to_string()))
        }
        Err(_) => Ok(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::QueueQuery;
    use crate::coercion::StringifiedBool;
    use axum::{
        extract::{DefaultBodyLimit, Query, State},
        http::HeaderMap,
        routing::{get, post},
        Router,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    fn backend_config() -> BackendConfig {
        BackendConfig {
            base_url: "http://127.0.0.1:8000/".to_string(),
            api_token: None,
            headers: HashMap::new(),
            timeout: 30,
            max_connections: 10,
        }
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_http_backend_creation() {
        let backend = HttpBackend::new(backend_config()).unwrap();
        assert_eq!(backend.url("/status"), "http://127.0.0.1:8000/status");
    }

    #[test]
    fn test_simple_get_mapping() {
        let request = BackendRequest::from(BackendCall::GetSampleById(42));
        assert_eq!(request, BackendRequest::get("/samples/42".to_string()));

        let request = BackendRequest::from(BackendCall::GetJobForResult("ab12".to_string()));
        assert_eq!(request.path, "/results/ab12/job");
    }

    #[test]
    fn test_paging_and_flags_become_query() {
        let request = BackendRequest::from(BackendCall::GetSamples { start: 5, limit: 10 });
        assert_eq!(request.query, query(&[("start", "5"), ("limit", "10")]));

        let request = BackendRequest::from(BackendCall::GetFamily {
            family_id: 3,
            with_samples: true,
        });
        assert_eq!(request.path, "/families/3");
        assert_eq!(request.query, query(&[("with_samples", "true")]));
    }

    #[test]
    fn test_function_ids_are_joined() {
        let request = BackendRequest::from(BackendCall::GetFunctionsByIds {
            function_ids: vec![1, 2, 3],
            with_label_only: false,
        });
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.payload, Payload::Text("1,2,3".to_string()));
        assert_eq!(request.query, query(&[("with_label_only", "false")]));
    }

    #[test]
    fn test_pichash_is_rendered_as_hex() {
        let request = BackendRequest::from(BackendCall::GetMatchesForPicHash {
            pichash: 255,
            summary: true,
        });
        assert_eq!(request.path, "/query/pichash/00000000000000ff/summary");
    }

    #[test]
    fn test_queue_query_skips_absent_filters() {
        let request = BackendRequest::from(BackendCall::GetQueueData(QueueQuery {
            state: Some("queued".to_string()),
            ascending: StringifiedBool::Raw("maybe".to_string()),
            ..Default::default()
        }));
        assert_eq!(
            request.query,
            query(&[
                ("start", "0"),
                ("limit", "0"),
                ("state", "queued"),
                ("ascending", "maybe")
            ])
        );
    }

    #[test]
    fn test_binary_request_mapping() {
        let request = BackendRequest::from(BackendCall::RequestMatchesForMappedBinary {
            binary: Bytes::from_static(b"MZ"),
            base_address: "4194304".to_string(),
            options: BinaryMatchOptions {
                minhash_threshold: Some(70),
                ..Default::default()
            },
        });
        assert_eq!(request.path, "/query/binary/mapped/4194304");
        assert_eq!(request.payload, Payload::Binary(Bytes::from_static(b"MZ")));
        assert_eq!(
            request.query,
            query(&[("minhash_threshold", "70"), ("force_recalculation", "false")])
        );
    }

    #[test]
    fn test_report_is_posted_as_json() {
        let request = BackendRequest::from(BackendCall::AddReport(json!({"sha256": "00"})));
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.payload, Payload::Json(json!({"sha256": "00"})));
    }

    #[test]
    fn test_decode_payload() {
        assert_eq!(decode_payload(200, br#"{"a":1}"#).unwrap(), json!({"a": 1}));
        assert!(decode_payload(202, b"<html>").is_err());
        assert_eq!(decode_payload(500, b"<html>").unwrap(), Value::Null);
    }

    /// What the stand-in backend saw for one request
    struct Received {
        headers: HeaderMap,
        query: HashMap<String, String>,
        body: Bytes,
    }

    type ReceivedLog = Arc<Mutex<Vec<Received>>>;

    async fn record(
        State(log): State<ReceivedLog>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
        body: Bytes,
    ) -> axum::Json<Value> {
        log.lock().unwrap().push(Received {
            headers,
            query,
            body,
        });
        axum::Json(json!({"status": "successful"}))
    }

    async fn spawn_backend() -> (String, ReceivedLog) {
        let log = ReceivedLog::default();
        let app = Router::new()
            .route("/query/binary", post(record))
            .route("/status", get(|| async { "<html>maintenance</html>" }))
            .layer(DefaultBodyLimit::disable())
            .with_state(log.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}"), log)
    }

    fn binary_call() -> BackendCall {
        BackendCall::RequestMatchesForUnmappedBinary {
            binary: Bytes::from((0..=255u8).collect::<Vec<_>>()),
            options: BinaryMatchOptions {
                minhash_threshold: Some(70),
                ..Default::default()
            },
        }
    }

    #[tokio::test]
    async fn test_call_sends_token_headers_and_raw_body() {
        let (base_url, log) = spawn_backend().await;
        let mut config = backend_config();
        config.base_url = base_url;
        config.api_token = Some("secret".to_string());
        config
            .headers
            .insert("x-tenant".to_string(), "lab".to_string());

        let backend = HttpBackend::new(config).unwrap();
        let response = backend.call(binary_call()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.payload, json!({"status": "successful"}));

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        let received = &log[0];
        assert_eq!(received.headers.get(API_TOKEN_HEADER).unwrap(), "secret");
        assert_eq!(received.headers.get("x-tenant").unwrap(), "lab");
        assert_eq!(received.body.as_ref(), (0..=255u8).collect::<Vec<_>>().as_slice());
        assert_eq!(received.query.get("minhash_threshold").map(String::as_str), Some("70"));
        assert_eq!(
            received.query.get("force_recalculation").map(String::as_str),
            Some("false")
        );
        assert!(!received.query.contains_key("pichash_size"));
    }

    #[tokio::test]
    async fn test_empty_token_is_not_sent() {
        let (base_url, log) = spawn_backend().await;
        let mut config = backend_config();
        config.base_url = base_url;
        config.api_token = Some(String::new());

        let backend = HttpBackend::new(config).unwrap();
        backend.call(binary_call()).await.unwrap();

        let log = log.lock().unwrap();
        assert!(log[0].headers.get(API_TOKEN_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_non_json_success_is_an_error() {
        let (base_url, _log) = spawn_backend().await;
        let mut config = backend_config();
        config.base_url = base_url;

        let backend = HttpBackend::new(config).unwrap();
        let result = backend.call(BackendCall::GetStatus).await;
        assert!(matches!(result, Err(BackendError::InvalidPayload(_))));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mut config = backend_config();
        config.base_url = format!("http://{addr}");

        let backend = HttpBackend::new(config).unwrap();
        let result = backend.call(BackendCall::GetVersion).await;
        assert!(matches!(result, Err(BackendError::Transport(_))));
    }
}
