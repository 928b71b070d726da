use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{PanelError, Result};
use crate::model::{Analysis, AskRequest, ComparisonResult, ModelResponses};

/// The two remote operations the panel depends on
#[async_trait]
pub trait QueryBackend: Send + Sync {
    async fn ask(&self, question: &str) -> Result<ModelResponses>;
    async fn compare(&self, responses: &ModelResponses) -> Result<ComparisonResult>;
}

/// JSON-over-HTTP backend exposing `/ask` and `/compare`
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post_json<T: serde::Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%url, %status, bytes = text.len(), "backend responded");

        // Non-2xx is a failure even when the body would decode as an answer
        if !status.is_success() {
            return Err(PanelError::Status { status, body: text });
        }

        Ok(text)
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    #[instrument(skip(self, question), fields(len = question.len()))]
    async fn ask(&self, question: &str) -> Result<ModelResponses> {
        let request = AskRequest {
            question: question.to_string(),
        };
        let raw = self.post_json("/ask", &request).await?;
        parse_ask_response(&raw)
    }

    #[instrument(skip_all)]
    async fn compare(&self, responses: &ModelResponses) -> Result<ComparisonResult> {
        let raw = self.post_json("/compare", responses).await?;
        parse_compare_response(&raw)
    }
}

pub fn parse_ask_response(raw: &str) -> Result<ModelResponses> {
    serde_json::from_str(raw).map_err(|e| PanelError::decode(e, raw))
}

/// Keeps the server's key order; every value has to be a string
pub fn parse_compare_response(raw: &str) -> Result<ComparisonResult> {
    let value: Value = serde_json::from_str(raw).map_err(|e| PanelError::decode(e, raw))?;

    let Value::Object(map) = value else {
        return Err(PanelError::decode("expected a JSON object", raw));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (model, analysis) in map {
        match analysis {
            Value::String(text) => entries.push(Analysis { model, text }),
            other => {
                return Err(PanelError::decode(
                    format!("analysis for {} is not a string: {}", model, other),
                    raw,
                ))
            }
        }
    }

    Ok(ComparisonResult { entries })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves a single canned HTTP response and hands back the raw request
    pub(crate) async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];

            loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);

                if let Some(header_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
                    let content_length = headers
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if buf.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            String::from_utf8_lossy(&buf).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    #[tokio::test]
    async fn ask_posts_question_as_json() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"chatgpt":"A","gemini":"B","claude":"C","extra":1}"#,
        )
        .await;

        let backend = HttpBackend::new(&format!("{}/", url));
        let responses = backend.ask("Vad är huvudstaden?").await.unwrap();

        assert_eq!(responses.chatgpt, "A");
        assert_eq!(responses.gemini, "B");
        assert_eq!(responses.claude, "C");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /ask HTTP/1.1"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.ends_with(r#"{"question":"Vad är huvudstaden?"}"#));
    }

    #[tokio::test]
    async fn compare_keeps_server_key_order() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"Gemini":"second\nline","ChatGPT":"first","Claude":"third"}"#,
        )
        .await;

        let backend = HttpBackend::new(&url);
        let result = backend
            .compare(&ModelResponses {
                chatgpt: "a".into(),
                gemini: "b".into(),
                claude: "c".into(),
            })
            .await
            .unwrap();

        let models: Vec<&str> = result.entries.iter().map(|e| e.model.as_str()).collect();
        assert_eq!(models, vec!["Gemini", "ChatGPT", "Claude"]);
        assert_eq!(result.entries[0].text, "second\nline");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /compare HTTP/1.1"));
        assert!(request.ends_with(r#"{"chatgpt":"a","gemini":"b","claude":"c"}"#));
    }

    #[tokio::test]
    async fn non_json_body_is_a_decode_error() {
        let (url, _server) = serve_once("200 OK", "<html>oops</html>").await;

        let err = HttpBackend::new(&url).ask("q").await.unwrap_err();
        match err {
            PanelError::Decode { raw, .. } => assert_eq!(raw, "<html>oops</html>"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (url, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;

        let err = HttpBackend::new(&url).ask("q").await.unwrap_err();
        match err {
            PanelError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert!(body.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn error_status_wins_over_a_decodable_body() {
        let body = r#"{"chatgpt":"A","gemini":"B","claude":"C"}"#;
        let (url, _server) = serve_once("503 Service Unavailable", body).await;

        let err = HttpBackend::new(&url).ask("q").await.unwrap_err();
        assert!(matches!(err, PanelError::Status { status, .. } if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = HttpBackend::new(&format!("http://{}", addr))
            .ask("q")
            .await
            .unwrap_err();
        assert!(matches!(err, PanelError::Transport(_)));
    }

    #[test]
    fn ask_response_needs_all_three_strings() {
        assert!(parse_ask_response(r#"{"chatgpt":"a","gemini":"b"}"#).is_err());
        assert!(parse_ask_response(r#"{"chatgpt":"a","gemini":"b","claude":3}"#).is_err());
    }

    #[test]
    fn compare_response_rejects_non_string_analysis() {
        let err = parse_compare_response(r#"{"chatgpt":"x","gemini":null}"#).unwrap_err();
        assert!(err.to_string().contains("gemini"));
        assert!(parse_compare_response("[1,2]").is_err());
    }

    #[test]
    fn empty_compare_object_is_allowed() {
        let result = parse_compare_response("{}").unwrap();
        assert!(result.entries.is_empty());
    }
}
