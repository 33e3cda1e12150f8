use chatpipe_core::{ChatCompletion, ChatMessage, CompletionOptions, Error, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

fn env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn openai_base_url_from_env() -> Option<String> {
    env("CHATPIPE_OPENAI_BASE_URL")
}

pub fn openai_api_key_from_env() -> Option<String> {
    env("CHATPIPE_OPENAI_API_KEY").or_else(|| env("OPENAI_API_KEY"))
}

fn openai_model_from_env() -> Option<String> {
    env("CHATPIPE_OPENAI_MODEL").or_else(|| env("OPENAI_MODEL"))
}

#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    pub fn from_env(client: reqwest::Client) -> Result<Self> {
        let base_url =
            openai_base_url_from_env().unwrap_or_else(|| "https://api.openai.com".to_string());
        let api_key = openai_api_key_from_env();
        if api_key.is_none() && base_url.starts_with("https://api.openai.com") {
            return Err(Error::NotConfigured(
                "missing CHATPIPE_OPENAI_API_KEY (or OPENAI_API_KEY)".to_string(),
            ));
        }
        let model = openai_model_from_env().unwrap_or_else(|| "gpt-4o".to_string());
        Ok(Self::new(client, base_url, api_key, model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint_chat_completions(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.base_url.trim_end_matches('/')
        )
    }

    fn request_builder(&self, req: &ChatCompletionsRequest, timeout_ms: u64) -> reqwest::RequestBuilder {
        let mut rb = self
            .client
            .post(self.endpoint_chat_completions())
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(k) = &self.api_key {
            rb = rb.header(reqwest::header::AUTHORIZATION, format!("Bearer {k}"));
        }
        rb.json(req)
    }

    async fn chat_once(&self, messages: &[ChatMessage], opts: &CompletionOptions) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            stream: Some(false),
        };

        let resp = self
            .request_builder(&req, opts.timeout_ms)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("chat.completions HTTP {status}")));
        }

        let parsed: ChatCompletionsResponse =
            resp.json().await.map_err(|e| Error::Llm(e.to_string()))?;
        Ok(parsed
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default())
    }

    /// Streamed variant: consume the SSE stream to completion and return the
    /// concatenated delta text. A mid-stream transport error is an [`Error`];
    /// the caller decides whether to retry non-streaming.
    async fn chat_streamed(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<String> {
        let req = ChatCompletionsRequest {
            model: self.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            stream: Some(true),
        };

        let resp = self
            .request_builder(&req, opts.timeout_ms)
            .send()
            .await
            .map_err(|e| Error::Llm(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Llm(format!("chat.completions HTTP {status}")));
        }

        let mut out = String::new();
        let mut buf = String::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Llm(e.to_string()))?;
            buf.push_str(&String::from_utf8_lossy(&chunk));
            // SSE events are newline-delimited; keep the trailing partial line.
            while let Some(idx) = buf.find('\n') {
                let line = buf[..idx].trim().to_string();
                buf.drain(..=idx);
                let Some(data) = line.strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();
                if data == "[DONE]" {
                    return Ok(out);
                }
                if let Ok(ev) = serde_json::from_str::<StreamEvent>(data) {
                    if let Some(delta) = ev
                        .choices
                        .first()
                        .and_then(|c| c.delta.content.as_deref())
                    {
                        out.push_str(delta);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ChatCompletion for OpenAiCompatClient {
    async fn complete(&self, messages: &[ChatMessage], opts: &CompletionOptions) -> Result<String> {
        if !opts.stream {
            return self.chat_once(messages, opts).await;
        }
        // Streaming first; an empty streamed answer gets one non-streaming
        // retry, then the failure is terminal for the request.
        match self.chat_streamed(messages, opts).await {
            Ok(text) if !text.trim().is_empty() => Ok(text),
            Ok(_) => {
                debug!("streamed answer was empty, retrying non-streaming");
                self.chat_once(messages, opts).await
            }
            Err(e) => {
                debug!(error = %e, "streaming failed, retrying non-streaming");
                self.chat_once(messages, opts).await
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(m: &ChatMessage) -> Self {
        Self {
            role: m.role.as_str().to_string(),
            content: m.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::post;
    use axum::Router;

    fn client_for(addr: std::net::SocketAddr) -> OpenAiCompatClient {
        OpenAiCompatClient::new(
            reqwest::Client::new(),
            format!("http://{addr}"),
            Some("test-key".to_string()),
            "gpt-4o".to_string(),
        )
    }

    #[tokio::test]
    async fn chat_once_extracts_the_first_choice() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                axum::Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "Bonjour !"}}]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let c = client_for(addr);
        let msgs = [ChatMessage::system("s"), ChatMessage::user("u")];
        let out = c.complete(&msgs, &CompletionOptions::default()).await.unwrap();
        assert_eq!(out, "Bonjour !");
    }

    #[tokio::test]
    async fn streamed_answer_concatenates_deltas() {
        let sse = "data: {\"choices\":[{\"delta\":{\"content\":\"Bon\"}}]}\n\n\
                   data: {\"choices\":[{\"delta\":{\"content\":\"jour\"}}]}\n\n\
                   data: [DONE]\n\n";
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || async move {
                ([(axum::http::header::CONTENT_TYPE, "text/event-stream")], sse)
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let c = client_for(addr);
        let msgs = [ChatMessage::user("u")];
        let opts = CompletionOptions {
            stream: true,
            ..CompletionOptions::default()
        };
        let out = c.complete(&msgs, &opts).await.unwrap();
        assert_eq!(out, "Bonjour");
    }

    #[tokio::test]
    async fn empty_streamed_answer_falls_back_to_non_streaming() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |body: String| {
                let calls = calls2.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if body.contains("\"stream\":true") {
                        // Stream that never emits content.
                        (
                            [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
                            "data: [DONE]\n\n".to_string(),
                        )
                    } else {
                        (
                            [(axum::http::header::CONTENT_TYPE, "application/json")],
                            serde_json::json!({
                                "choices": [{"message": {"role": "assistant", "content": "secours"}}]
                            })
                            .to_string(),
                        )
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let c = client_for(addr);
        let msgs = [ChatMessage::user("u")];
        let opts = CompletionOptions {
            stream: true,
            ..CompletionOptions::default()
        };
        let out = c.complete(&msgs, &opts).await.unwrap();
        assert_eq!(out, "secours");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn http_error_maps_to_llm_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let c = client_for(addr);
        let msgs = [ChatMessage::user("u")];
        let err = c
            .complete(&msgs, &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(_)), "unexpected error: {err}");
    }
}
