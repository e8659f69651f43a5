//! CNB OpenAPI client.
//!
//! Talks to two repository-scoped endpoints:
//! - `POST /{repo}/-/knowledge/base/query`: knowledge-base search
//! - `POST /{repo}/-/ai/chat/completions`: streaming chat completion
//!
//! Both use bearer-token auth. The completion body is read as a byte stream
//! on a background task and decoded line by line with [`SseDecoder`].

use async_trait::async_trait;
use cnbchat_config::AppConfig;
use cnbchat_core::error::{Endpoint, ProviderError};
use cnbchat_core::knowledge::KnowledgeChunk;
use cnbchat_core::provider::{
    ChunkReceiver, CompletionProvider, CompletionRequest, KnowledgeBase, StreamChunk, StreamEvent,
};
use futures::StreamExt;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::sse::SseDecoder;

/// Client for the CNB knowledge-base and AI endpoints.
pub struct CnbClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl CnbClient {
    /// Create a new client.
    ///
    /// A missing token is accepted here and reported on the first request,
    /// so a misconfigured bot still starts and can tell users what is wrong.
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    /// Build a client from the application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(
            config.api_base_url.clone(),
            config.token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn token(&self) -> Result<&str, ProviderError> {
        self.token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::NotConfigured("token".into()))
    }

    fn endpoint_url(&self, repository: &str, path: &str) -> Result<String, ProviderError> {
        let repository = repository.trim().trim_matches('/');
        if repository.is_empty() {
            return Err(ProviderError::NotConfigured("repository".into()));
        }
        Ok(format!("{}/{}/-/{}", self.base_url, repository, path))
    }

    async fn post_json(
        &self,
        endpoint: Endpoint,
        url: &str,
        body: &Value,
    ) -> Result<reqwest::Response, ProviderError> {
        let token = self.token()?;

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(%endpoint, status = status.as_u16(), body = %error_body, "CNB returned error");
            return Err(ProviderError::ApiError {
                endpoint,
                status_code: status.as_u16(),
                message: error_body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl KnowledgeBase for CnbClient {
    async fn query(
        &self,
        repository: &str,
        question: &str,
    ) -> Result<Vec<KnowledgeChunk>, ProviderError> {
        let url = self.endpoint_url(repository, "knowledge/base/query")?;
        let body = serde_json::json!({ "query": question });

        debug!(%repository, "Sending knowledge query");

        let response = self.post_json(Endpoint::Knowledge, &url, &body).await?;
        let data: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(format!("knowledge response: {e}")))?;

        let chunks = parse_chunks(data)?;
        debug!(%repository, chunks = chunks.len(), "Knowledge query succeeded");
        Ok(chunks)
    }
}

#[async_trait]
impl CompletionProvider for CnbClient {
    async fn stream(&self, request: CompletionRequest) -> Result<ChunkReceiver, ProviderError> {
        let url = self.endpoint_url(&request.repository, "ai/chat/completions")?;
        let body = serde_json::json!({
            "messages": [{ "role": "user", "content": request.prompt }],
            "model": request.model,
            "stream": true,
        });

        debug!(repository = %request.repository, model = %request.model, "Sending streaming request");

        let response = self.post_json(Endpoint::Completion, &url, &body).await?;

        let (tx, rx) = mpsc::channel(64);

        // Read the body on a separate task; it ends at [DONE], on a
        // transport error, or as soon as the receiver is dropped.
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            loop {
                let next = tokio::select! {
                    _ = tx.closed() => {
                        debug!("Completion stream receiver dropped, closing connection");
                        return;
                    }
                    next = byte_stream.next() => next,
                };

                match next {
                    Some(Ok(bytes)) => {
                        if forward(&tx, decoder.feed(&bytes)).await {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        let err = if e.is_timeout() {
                            ProviderError::Timeout(e.to_string())
                        } else {
                            ProviderError::StreamInterrupted(e.to_string())
                        };
                        let _ = tx.send(Err(err)).await;
                        return;
                    }
                    None => {
                        if forward(&tx, decoder.finish()).await {
                            return;
                        }
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(
                                "connection closed before [DONE]".into(),
                            )))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Push decoded events to the receiver. Returns `true` once the stream is
/// over, either because `[DONE]` was forwarded or the receiver went away.
async fn forward(
    tx: &mpsc::Sender<Result<StreamChunk, ProviderError>>,
    events: Vec<StreamEvent>,
) -> bool {
    for event in events {
        match event {
            StreamEvent::Delta(text) => {
                if tx.send(Ok(StreamChunk::delta(text))).await.is_err() {
                    return true;
                }
            }
            StreamEvent::Done => {
                let _ = tx.send(Ok(StreamChunk::done())).await;
                return true;
            }
            StreamEvent::Malformed => {
                trace!("Ignoring unparseable stream line");
            }
        }
    }
    false
}

fn request_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout(e.to_string())
    } else {
        ProviderError::Network(e.to_string())
    }
}

/// Turn a knowledge-base response body into chunks.
///
/// The body must be a JSON array. Each element contributes its `chunk`
/// text (empty when absent) and its non-empty `metadata.permalink`.
fn parse_chunks(data: Value) -> Result<Vec<KnowledgeChunk>, ProviderError> {
    let Value::Array(items) = data else {
        return Err(ProviderError::InvalidFormat(format!(
            "expected a JSON array, got {}",
            json_type(&data)
        )));
    };

    Ok(items
        .iter()
        .map(|item| KnowledgeChunk {
            text: item
                .get("chunk")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            reference_link: item
                .pointer("/metadata/permalink")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(String::from),
        })
        .collect())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> CnbClient {
        CnbClient::new(server.uri(), Some("test-token".into()), Duration::from_secs(5)).unwrap()
    }

    fn completion_request(prompt: &str) -> CompletionRequest {
        CompletionRequest {
            repository: "cnb/docs".into(),
            model: "gpt-3.5-turbo".into(),
            prompt: prompt.into(),
        }
    }

    async fn drain(mut rx: ChunkReceiver) -> Vec<Result<StreamChunk, ProviderError>> {
        let mut items = Vec::new();
        while let Some(item) = rx.recv().await {
            items.push(item);
        }
        items
    }

    #[test]
    fn parse_chunks_extracts_text_and_links() {
        let data = serde_json::json!([
            {"chunk": "第一段", "metadata": {"permalink": "https://cnb.cool/cnb/docs/a"}},
            {"chunk": "第二段", "metadata": {"permalink": ""}},
            {"metadata": {"title": "no chunk"}},
            {"chunk": "第四段"}
        ]);
        let chunks = parse_chunks(data).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].text, "第一段");
        assert_eq!(
            chunks[0].reference_link.as_deref(),
            Some("https://cnb.cool/cnb/docs/a")
        );
        assert!(chunks[1].reference_link.is_none());
        assert_eq!(chunks[2].text, "");
        assert!(chunks[3].reference_link.is_none());
    }

    #[test]
    fn parse_chunks_rejects_non_array() {
        let err = parse_chunks(serde_json::json!({"data": []})).unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFormat(ref m) if m.contains("object")));
    }

    #[test]
    fn endpoint_url_trims_slashes() {
        let client =
            CnbClient::new("https://api.cnb.cool/", Some("t".into()), Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.endpoint_url("/cnb/docs/", "knowledge/base/query").unwrap(),
            "https://api.cnb.cool/cnb/docs/-/knowledge/base/query"
        );
        assert!(matches!(
            client.endpoint_url("  ", "ai/chat/completions"),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn query_sends_bearer_and_question() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cnb/docs/-/knowledge/base/query"))
            .and(header("Authorization", "Bearer test-token"))
            .and(header("Accept", "application/json"))
            .and(body_json(serde_json::json!({"query": "如何创建仓库"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"chunk": "在首页点击新建仓库", "metadata": {"permalink": "https://cnb.cool/cnb/docs/repo"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let chunks = client(&server).query("cnb/docs", "如何创建仓库").await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "在首页点击新建仓库");
    }

    #[tokio::test]
    async fn query_non_2xx_is_api_error_with_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cnb/docs/-/knowledge/base/query"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden: bad token"))
            .mount(&server)
            .await;

        let err = client(&server).query("cnb/docs", "q").await.unwrap_err();
        match err {
            ProviderError::ApiError {
                endpoint,
                status_code,
                message,
            } => {
                assert_eq!(endpoint, Endpoint::Knowledge);
                assert_eq!(status_code, 403);
                assert_eq!(message, "forbidden: bad token");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn query_object_body_is_format_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "oops"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).query("cnb/docs", "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn missing_token_never_hits_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CnbClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = client.query("cnb/docs", "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured(ref f) if f == "token"));
    }

    #[tokio::test]
    async fn stream_stops_at_done_and_ignores_noise() {
        let server = MockServer::start().await;
        let body = concat!(
            ": keep-alive\n",
            "\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: not-json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"after\"}}]}\n\n",
        );
        Mock::given(method("POST"))
            .and(path("/cnb/docs/-/ai/chat/completions"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "messages": [{"role": "user", "content": "prompt"}],
                "model": "gpt-3.5-turbo",
                "stream": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client(&server).stream(completion_request("prompt")).await.unwrap();
        let items = drain(rx).await;

        let chunks: Vec<StreamChunk> = items.into_iter().map(Result::unwrap).collect();
        assert_eq!(
            chunks,
            vec![
                StreamChunk::delta("Hel"),
                StreamChunk::delta("lo"),
                StreamChunk::done()
            ]
        );
    }

    #[tokio::test]
    async fn stream_without_done_reports_interruption() {
        let server = MockServer::start().await;
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n";
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let rx = client(&server).stream(completion_request("p")).await.unwrap();
        let items = drain(rx).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Ok(ref c) if c.content.as_deref() == Some("partial")));
        assert!(matches!(items[1], Err(ProviderError::StreamInterrupted(_))));
    }

    #[tokio::test]
    async fn stream_non_2xx_fails_before_streaming() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/cnb/docs/-/ai/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model overloaded"))
            .mount(&server)
            .await;

        let err = client(&server).stream(completion_request("p")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::ApiError { endpoint: Endpoint::Completion, status_code: 500, ref message }
                if message == "model overloaded"
        ));
    }

    #[tokio::test]
    async fn slow_knowledge_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            CnbClient::new(server.uri(), Some("t".into()), Duration::from_millis(300)).unwrap();
        let err = client.query("cnb/docs", "q").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn slow_completion_endpoint_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("data: [DONE]\n", "text/event-stream")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client =
            CnbClient::new(server.uri(), Some("t".into()), Duration::from_millis(300)).unwrap();
        let err = client.stream(completion_request("p")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn dropping_the_receiver_closes_the_connection() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Answers with one delta, then keeps the stream open and reports
        // whether the client hung up.
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            while !String::from_utf8_lossy(&request).contains("\"stream\":true") {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "client closed before sending the request");
                request.extend_from_slice(&buf[..n]);
            }

            let event = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n";
            let response = format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/event-stream\r\n\
                 Transfer-Encoding: chunked\r\n\r\n\
                 {:x}\r\n{event}\r\n",
                event.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();

            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => return true,
                    Ok(_) => continue,
                }
            }
        });

        let client = CnbClient::new(
            format!("http://{addr}"),
            Some("t".into()),
            Duration::from_secs(30),
        )
        .unwrap();
        let mut rx = client.stream(completion_request("p")).await.unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first, StreamChunk::delta("Hi"));
        drop(rx);

        let hung_up = tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("connection stayed open after the receiver was dropped")
            .unwrap();
        assert!(hung_up);
    }
}
