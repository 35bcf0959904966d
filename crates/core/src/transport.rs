//! Outbound transport to the workflow engine.
//!
//! The client talks to the engine only through [`WorkflowTransport`], so the single wire
//! contract (one JSON POST per run) is isolated here and tests can substitute an in-memory
//! implementation.

use crate::constants::RUN_FLOW_PATH;
use crate::request::RunPayload;
use crate::{WorkflowError, WorkflowResult};
use async_trait::async_trait;
use serde_json::Value;

/// Executes one flow run and returns the raw JSON response.
#[async_trait]
pub trait WorkflowTransport: Send + Sync {
    async fn run_flow(&self, flow_id: &str, payload: &RunPayload) -> WorkflowResult<Value>;
}

/// HTTP transport backed by `reqwest`.
///
/// No timeout or retry is applied beyond the HTTP client defaults.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: reqwest::Url,
}

impl HttpTransport {
    pub fn new(base_url: reqwest::Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Full run endpoint for a flow, e.g. `http://host:7860/api/v1/run/<flow_id>`.
    pub fn endpoint(&self, flow_id: &str) -> String {
        run_endpoint(&self.base_url, flow_id)
    }
}

pub(crate) fn run_endpoint(base_url: &reqwest::Url, flow_id: &str) -> String {
    format!(
        "{}/{}/{}",
        base_url.as_str().trim_end_matches('/'),
        RUN_FLOW_PATH,
        flow_id
    )
}

#[async_trait]
impl WorkflowTransport for HttpTransport {
    async fn run_flow(&self, flow_id: &str, payload: &RunPayload) -> WorkflowResult<Value> {
        let url = self.endpoint(flow_id);
        tracing::debug!("POST {url}");

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(WorkflowError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|e| {
                tracing::debug!("failed to read error response body: {e}");
                String::new()
            });
            tracing::error!("workflow run failed with HTTP {status}");
            return Err(WorkflowError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response.json::<Value>().await.map_err(WorkflowError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slashes() {
        let base = reqwest::Url::parse("http://localhost:7860/").expect("valid url");
        let transport = HttpTransport::new(base);
        assert_eq!(
            transport.endpoint("abc"),
            "http://localhost:7860/api/v1/run/abc"
        );
    }

    #[test]
    fn endpoint_keeps_base_path_prefix() {
        let base = reqwest::Url::parse("https://flows.example.org/langflow").expect("valid url");
        assert_eq!(
            run_endpoint(&base, "flow-1"),
            "https://flows.example.org/langflow/api/v1/run/flow-1"
        );
    }

    /// Serves exactly one connection with a canned raw HTTP response.
    async fn serve_once(raw_response: &'static str) -> reqwest::Url {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Read headers, then as much body as Content-Length announces.
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .and_then(|v| v.trim().parse::<usize>().ok())
                        })
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            socket
                .write_all(raw_response.as_bytes())
                .await
                .expect("write");
            socket.shutdown().await.ok();
        });

        reqwest::Url::parse(&format!("http://{addr}")).expect("valid url")
    }

    #[tokio::test]
    async fn error_status_keeps_response_body() {
        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\nboom",
        )
        .await;

        let err = HttpTransport::new(base)
            .run_flow("flow", &RunPayload::chat("hello"))
            .await
            .expect_err("500 should fail");
        match err {
            WorkflowError::HttpStatus { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn truncated_error_body_still_reports_status() {
        // Announces more body than it sends, so reading the body fails.
        let base = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 100\r\nConnection: close\r\n\r\nshort",
        )
        .await;

        let err = HttpTransport::new(base)
            .run_flow("flow", &RunPayload::chat("hello"))
            .await
            .expect_err("404 should fail");
        assert_eq!(err.status(), Some(404));
        assert!(matches!(err, WorkflowError::HttpStatus { ref body, .. } if body.is_empty()));
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind an ephemeral port and release it so nothing is listening there.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("local addr").port()
        };
        let base = reqwest::Url::parse(&format!("http://127.0.0.1:{port}")).expect("valid url");

        let err = HttpTransport::new(base)
            .run_flow("flow", &RunPayload::chat("hello"))
            .await
            .expect_err("connection should fail");
        assert!(matches!(err, WorkflowError::Transport(_)));
        assert_eq!(err.status(), None);
    }
}
