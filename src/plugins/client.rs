//! Remote tool client
//!
//! Sends tool calls to the post-creator tool server over HTTP.

use super::protocol::{ToolCall, ToolOutput};
use crate::config::ToolServerConfig;
use crate::error::ToolError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Result type for tool calls
type Result<T> = std::result::Result<T, ToolError>;

/// Something that can execute a named tool with JSON arguments
#[async_trait]
pub trait ToolClient: Send + Sync {
    /// Call `tool_name` and return the decoded response object
    async fn call(&self, tool_name: &str, arguments: Map<String, Value>) -> Result<ToolOutput>;
}

/// Tool client speaking the `POST /call_tool` JSON contract
#[derive(Debug, Clone)]
pub struct HttpToolClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: u64,
}

impl HttpToolClient {
    /// Create a client for the given server. No connection is opened here.
    pub fn new(config: &ToolServerConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| ToolError::Transport {
                url: endpoint.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            timeout: config.timeout,
        })
    }

    /// URL every call is POSTed to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn send_error(&self, tool_name: &str, err: reqwest::Error) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout {
                tool: tool_name.to_string(),
                secs: self.timeout,
            }
        } else {
            ToolError::Transport {
                url: self.endpoint.clone(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl ToolClient for HttpToolClient {
    async fn call(&self, tool_name: &str, arguments: Map<String, Value>) -> Result<ToolOutput> {
        let call = ToolCall::new(tool_name, arguments);
        debug!("Calling tool '{}' at {}", tool_name, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&call)
            .send()
            .await
            .map_err(|e| self.send_error(tool_name, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!("Could not read error body from '{}': {}", tool_name, e);
                    format!("<unreadable body: {}>", e)
                }
            };
            warn!("Tool '{}' failed with HTTP {}", tool_name, status);
            return Err(ToolError::Http {
                tool: tool_name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.send_error(tool_name, e)
            } else {
                ToolError::Decode {
                    tool: tool_name.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        let output = match body {
            Value::Object(map) => map,
            other => {
                return Err(ToolError::Decode {
                    tool: tool_name.to_string(),
                    message: format!("expected a JSON object, got {}", other),
                })
            }
        };

        if let Some(detail) = error_detail(&output) {
            warn!("Tool '{}' reported an error", tool_name);
            return Err(ToolError::Remote {
                tool: tool_name.to_string(),
                detail,
            });
        }

        debug!("Tool '{}' succeeded", tool_name);
        Ok(output)
    }
}

/// Error indicator carried in a successful HTTP response, if any
fn error_detail(output: &ToolOutput) -> Option<Value> {
    match output.get("error") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {}
        Some(detail) => return Some(detail.clone()),
    }

    if output.get("isError").and_then(Value::as_bool) == Some(true) {
        return Some(Value::Object(output.clone()));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn config_for(server: &mockito::ServerGuard) -> ToolServerConfig {
        let addr = server.socket_address();
        ToolServerConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            timeout: 5,
            ..ToolServerConfig::default()
        }
    }

    fn args(pairs: Value) -> Map<String, Value> {
        pairs.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_call_posts_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/call_tool")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "tool_name": "create_post",
                "arguments": {"text": "hi"}
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"draft": "hi!", "length": 3}"#)
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let output = client
            .call("create_post", args(json!({"text": "hi"})))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(Value::Object(output), json!({"draft": "hi!", "length": 3}));
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/call_tool")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();

        match err {
            ToolError::Http { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_error_payload_is_passed_through() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/call_tool")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": {"code": "missing_credentials", "message": "X_API_KEY not set"}}"#)
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let err = client.call("publish_post", Map::new()).await.unwrap_err();

        match err {
            ToolError::Remote { tool, detail } => {
                assert_eq!(tool, "publish_post");
                assert_eq!(
                    detail,
                    json!({"code": "missing_credentials", "message": "X_API_KEY not set"})
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_is_error_flag() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/call_tool")
            .with_status(200)
            .with_body(r#"{"isError": true, "content": "drafting failed"}"#)
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_non_object_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/call_tool")
            .with_status(200)
            .with_body(r#"["not", "a", "mapping"]"#)
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/call_tool")
            .with_status(200)
            .with_body("POST TEXT: not json")
            .create_async()
            .await;

        let client = HttpToolClient::new(&config_for(&server)).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = ToolServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout: 5,
            ..ToolServerConfig::default()
        };
        let client = HttpToolClient::new(&config).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();

        assert!(matches!(err, ToolError::Transport { .. }));
        assert!(err.is_indeterminate());
    }

    /// Accept connections on a local port and hand each one to `handle`
    async fn raw_server<F, Fut>(handle: F) -> (u16, tokio::task::JoinHandle<()>)
    where
        F: Fn(tokio::net::TcpStream) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let task = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(handle(socket));
            }
        });
        (port, task)
    }

    fn local_config(port: u16, timeout: u64) -> ToolServerConfig {
        ToolServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            timeout,
            ..ToolServerConfig::default()
        }
    }

    /// Read one HTTP request (headers plus Content-Length body)
    async fn read_request(socket: &mut tokio::net::TcpStream) {
        use tokio::io::AsyncReadExt;

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&request).to_string();
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    return;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_unanswered_request_times_out() {
        // Accept and hold the connection without ever replying
        let (port, task) = raw_server(|socket| async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        })
        .await;

        let client = HttpToolClient::new(&local_config(port, 1)).unwrap();
        let err = client.call("publish_post", Map::new()).await.unwrap_err();
        task.abort();

        match &err {
            ToolError::Timeout { tool, secs } => {
                assert_eq!(tool, "publish_post");
                assert_eq!(*secs, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.is_indeterminate());
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_reported() {
        let (port, task) = raw_server(|mut socket| async move {
            use tokio::io::AsyncWriteExt;

            read_request(&mut socket).await;
            let _ = socket
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 100\r\n\r\npartial")
                .await;
            let _ = socket.shutdown().await;
        })
        .await;

        let client = HttpToolClient::new(&local_config(port, 5)).unwrap();
        let err = client.call("create_post", Map::new()).await.unwrap_err();
        task.abort();

        match err {
            ToolError::Http { status, body, .. } => {
                assert_eq!(status, 500);
                assert!(body.starts_with("<unreadable body:"), "body was {:?}", body);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_error_detail_ignores_null() {
        let output = args(json!({"error": null, "status": "ok"}));
        assert!(error_detail(&output).is_none());

        let output = args(json!({"error": false}));
        assert!(error_detail(&output).is_none());
    }
}
