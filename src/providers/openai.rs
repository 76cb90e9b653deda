//! OpenAI-compatible Provider Implementation
//!
//! This module implements the `LLMProvider` trait for any endpoint speaking the
//! OpenAI Chat Completions protocol (DeepSeek, OpenAI, vLLM, ...), handling
//! message conversion, tool calls, JSON mode and incremental SSE streaming.
//!
//! # Example
//!
//! ```rust,ignore
//! use querybridge::providers::{openai::OpenAIProvider, ChatOptions, LLMProvider};
//! use querybridge::session::Message;
//!
//! async fn example() {
//!     let provider = OpenAIProvider::with_base_url("your-api-key", "https://api.deepseek.com/v1");
//!     let mut rx = provider
//!         .chat_stream(vec![Message::user("Hello!")], vec![], Some("deepseek-chat"), ChatOptions::default())
//!         .await
//!         .unwrap();
//!     while let Some(event) = rx.recv().await {
//!         println!("{:?}", event);
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::session::{Message, Role};

use super::{
    parse_provider_error, ChatOptions, LLMProvider, LLMResponse, LLMToolCall, StreamEvent,
    ToolDefinition, Usage,
};

/// The default API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com/v1";

/// The default model to use.
const DEFAULT_MODEL: &str = "deepseek-chat";

// ============================================================================
// API Request Types
// ============================================================================

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAITool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream_options: Option<StreamOptions>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

/// A message in OpenAI's format.
#[derive(Debug, Serialize)]
struct OpenAIMessage {
    /// Role: "system", "user", "assistant", or "tool"
    role: String,
    /// Message content (null for assistant turns that only carry tool_calls)
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAIToolCallRequest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenAIToolCallRequest {
    id: String,
    r#type: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAIFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAITool {
    r#type: String,
    function: OpenAIFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAIFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OpenAIToolCallResponse {
    id: String,
    function: OpenAIFunctionCall,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
    #[serde(default)]
    r#type: Option<String>,
}

// ============================================================================
// Streaming Chunk Types
// ============================================================================

/// One `data:` payload of a streamed completion.
#[derive(Debug, Deserialize)]
struct OpenAIStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAIStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<OpenAIToolCallFragment>>,
}

/// Tool calls arrive in fragments keyed by `index`; only the first fragment
/// carries the id and name.
#[derive(Debug, Deserialize)]
struct OpenAIToolCallFragment {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<OpenAIFunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct OpenAIFunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Debug, Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Folds streamed chunks into text deltas and a final tool-call list.
#[derive(Debug, Default)]
struct StreamAssembler {
    content: String,
    calls: BTreeMap<usize, PartialToolCall>,
    usage: Option<Usage>,
}

impl StreamAssembler {
    /// Apply one chunk, returning the text delta it carried (if any).
    fn apply(&mut self, chunk: OpenAIStreamChunk) -> Option<String> {
        if let Some(usage) = chunk.usage {
            self.usage = Some(Usage::new(usage.prompt_tokens, usage.completion_tokens));
        }

        let mut text = String::new();
        for choice in chunk.choices {
            if let Some(content) = choice.delta.content {
                text.push_str(&content);
            }
            for fragment in choice.delta.tool_calls.unwrap_or_default() {
                let call = self.calls.entry(fragment.index).or_default();
                if let Some(id) = fragment.id {
                    call.id = id;
                }
                if let Some(function) = fragment.function {
                    if let Some(name) = function.name {
                        call.name.push_str(&name);
                    }
                    if let Some(args) = function.arguments {
                        call.arguments.push_str(&args);
                    }
                }
            }
        }

        if text.is_empty() {
            None
        } else {
            self.content.push_str(&text);
            Some(text)
        }
    }

    fn finish(self) -> (String, Vec<LLMToolCall>, Option<Usage>) {
        let calls = self
            .calls
            .into_values()
            .filter(|c| !c.name.is_empty())
            .map(|c| {
                let args = if c.arguments.trim().is_empty() {
                    "{}".to_string()
                } else {
                    c.arguments
                };
                LLMToolCall::new(&c.id, &c.name, &args)
            })
            .collect();
        (self.content, calls, self.usage)
    }
}

/// `true` when an SSE data field is the stream terminator.
fn is_done_marker(data: &str) -> bool {
    data.trim() == "[DONE]"
}

// ============================================================================
// OpenAI-compatible Provider
// ============================================================================

/// OpenAI-compatible LLM provider.
pub struct OpenAIProvider {
    api_key: String,
    api_base: String,
    default_model: String,
    client: Client,
}

impl OpenAIProvider {
    /// Create a provider against the default endpoint.
    ///
    /// # Example
    /// ```
    /// use querybridge::providers::openai::OpenAIProvider;
    /// use querybridge::providers::LLMProvider;
    ///
    /// let provider = OpenAIProvider::new("sk-xxx");
    /// assert_eq!(provider.name(), "openai");
    /// assert_eq!(provider.default_model(), "deepseek-chat");
    /// ```
    pub fn new(api_key: &str) -> Self {
        Self::with_base_url(api_key, DEFAULT_API_BASE)
    }

    /// Create a provider with a custom base URL (trailing slash removed).
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self::with_client(api_key, api_base, Client::new())
    }

    /// Create a provider with a custom HTTP client (timeouts, proxies).
    pub fn with_client(api_key: &str, api_base: &str, client: Client) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            client,
        }
    }

    /// Override the model used when callers pass `None`.
    pub fn with_default_model(mut self, model: &str) -> Self {
        self.default_model = model.to_string();
        self
    }

    fn build_request(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
        stream: bool,
    ) -> OpenAIRequest {
        OpenAIRequest {
            model: model.unwrap_or(&self.default_model).to_string(),
            messages: convert_messages(messages),
            tools: if tools.is_empty() {
                None
            } else {
                Some(convert_tools(tools))
            },
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            response_format: options.json_mode.then(|| ResponseFormat {
                r#type: "json_object".to_string(),
            }),
            stream,
            stream_options: stream.then_some(StreamOptions {
                include_usage: true,
            }),
        }
    }

    async fn send(&self, request: &OpenAIRequest) -> Result<reqwest::Response> {
        debug!(model = %request.model, stream = request.stream, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| BridgeError::Provider(format!("Chat completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_default();
            let body = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
                Ok(parsed) => format!(
                    "{} - {}",
                    parsed.error.r#type.unwrap_or_else(|| "error".to_string()),
                    parsed.error.message
                ),
                Err(_) => error_text,
            };
            let err = parse_provider_error(status, &body);
            warn!(status, retryable = err.is_retryable(), "Chat completion rejected");
            return Err(BridgeError::from(err));
        }

        Ok(response)
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

fn convert_messages(messages: Vec<Message>) -> Vec<OpenAIMessage> {
    messages
        .into_iter()
        .map(|msg| {
            let tool_calls = msg.tool_calls.filter(|tcs| !tcs.is_empty()).map(|tcs| {
                tcs.into_iter()
                    .map(|tc| OpenAIToolCallRequest {
                        id: tc.id,
                        r#type: "function".to_string(),
                        function: OpenAIFunctionCall {
                            name: tc.name,
                            arguments: tc.arguments,
                        },
                    })
                    .collect()
            });

            let content = if msg.content.is_empty() && tool_calls.is_some() {
                None
            } else {
                Some(msg.content)
            };

            OpenAIMessage {
                role: role_name(msg.role).to_string(),
                content,
                tool_calls,
                tool_call_id: msg.tool_call_id,
            }
        })
        .collect()
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<OpenAITool> {
    tools
        .into_iter()
        .map(|t| OpenAITool {
            r#type: "function".to_string(),
            function: OpenAIFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect()
}

fn convert_response(response: OpenAIResponse) -> LLMResponse {
    let (content, tool_calls) = match response.choices.into_iter().next() {
        Some(c) => {
            let content = c.message.content.unwrap_or_default();
            let tool_calls = c
                .message
                .tool_calls
                .map(|tcs| {
                    tcs.into_iter()
                        .map(|tc| {
                            LLMToolCall::new(&tc.id, &tc.function.name, &tc.function.arguments)
                        })
                        .collect()
                })
                .unwrap_or_default();
            (content, tool_calls)
        }
        None => (String::new(), Vec::new()),
    };

    let mut llm_response = LLMResponse::with_tools(&content, tool_calls);
    if let Some(usage) = response.usage {
        llm_response =
            llm_response.with_usage(Usage::new(usage.prompt_tokens, usage.completion_tokens));
    }
    llm_response
}

// ============================================================================
// LLMProvider Implementation
// ============================================================================

#[async_trait]
impl LLMProvider for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, tools, model, options, false);
        let response = self.send(&request).await?;

        let parsed: OpenAIResponse = response.json().await.map_err(|e| {
            BridgeError::Provider(format!("Failed to parse chat completion response: {}", e))
        })?;

        info!(model = %request.model, "Chat completion received");
        Ok(convert_response(parsed))
    }

    async fn chat_stream(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>> {
        let request = self.build_request(messages, tools, model, options, true);
        let response = self.send(&request).await?;

        let (tx, rx) = mpsc::channel::<StreamEvent>(32);
        // The decoder buffers raw bytes, so a character split across
        // network chunks arrives intact.
        let mut events = response.bytes_stream().eventsource();

        tokio::spawn(async move {
            let mut assembler = StreamAssembler::default();

            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        let _ = tx
                            .send(StreamEvent::Error(BridgeError::Provider(format!(
                                "Stream read error: {}",
                                e
                            ))))
                            .await;
                        return;
                    }
                };

                if is_done_marker(&event.data) {
                    break;
                }
                if event.data.trim().is_empty() {
                    continue;
                }
                let parsed: OpenAIStreamChunk = match serde_json::from_str(&event.data) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!(error = %e, "Skipping unparseable stream chunk");
                        continue;
                    }
                };
                if let Some(text) = assembler.apply(parsed) {
                    if tx.send(StreamEvent::Delta(text)).await.is_err() {
                        // Receiver dropped: the consumer stopped listening.
                        return;
                    }
                }
            }

            let (content, tool_calls, usage) = assembler.finish();
            if !tool_calls.is_empty() && tx.send(StreamEvent::ToolCalls(tool_calls)).await.is_err()
            {
                return;
            }
            let _ = tx.send(StreamEvent::Done { content, usage }).await;
        });

        Ok(rx)
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;

    fn chunk(json: &str) -> OpenAIStreamChunk {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_provider_creation() {
        let provider = OpenAIProvider::with_base_url("test-key", "https://custom.api/v1/");
        assert_eq!(provider.api_base, "https://custom.api/v1");
        assert_eq!(provider.name(), "openai");
        let provider = provider.with_default_model("gpt-4o");
        assert_eq!(provider.default_model(), "gpt-4o");
    }

    #[test]
    fn test_convert_messages_with_tool_calls() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "query_database", r#"{"query":"SELECT 1"}"#)],
            ),
            Message::tool_result("call_1", r#"{"code":0}"#),
        ];
        let converted = convert_messages(messages);

        assert_eq!(converted[0].role, "system");
        assert_eq!(converted[1].role, "assistant");
        assert!(converted[1].content.is_none());
        let calls = converted[1].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].r#type, "function");
        assert_eq!(calls[0].function.name, "query_database");
        assert_eq!(converted[2].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_request_json_mode_and_stream_flags() {
        let provider = OpenAIProvider::new("k");
        let request = provider.build_request(
            vec![Message::user("hi")],
            vec![],
            None,
            ChatOptions::new().with_json_mode().with_temperature(0.6),
            false,
        );
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""response_format":{"type":"json_object"}"#));
        assert!(json.contains("deepseek-chat"));
        assert!(!json.contains("stream"));
        assert!(!json.contains("tools"));

        let streamed = provider.build_request(vec![], vec![], Some("m"), ChatOptions::new(), true);
        let json = serde_json::to_string(&streamed).unwrap();
        assert!(json.contains(r#""stream":true"#));
        assert!(json.contains("include_usage"));
        assert!(!json.contains("response_format"));
    }

    #[test]
    fn test_convert_response_with_tool_calls() {
        let response: OpenAIResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":null,"tool_calls":[
                {"id":"call_9","type":"function","function":{"name":"search_schema","arguments":"{\"query\":\"orders\"}"}}
            ]}}],"usage":{"prompt_tokens":10,"completion_tokens":5}}"#,
        )
        .unwrap();
        let converted = convert_response(response);
        assert_eq!(converted.content, "");
        assert_eq!(converted.tool_calls[0].id, "call_9");
        assert_eq!(converted.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_convert_response_empty_choices() {
        let converted = convert_response(OpenAIResponse {
            choices: vec![],
            usage: None,
        });
        assert_eq!(converted.content, "");
        assert!(!converted.has_tool_calls());
    }

    #[test]
    fn test_done_marker() {
        assert!(is_done_marker("[DONE]"));
        assert!(is_done_marker(" [DONE]\n"));
        assert!(!is_done_marker(r#"{"choices":[]}"#));
    }

    /// Serve one SSE response, writing `parts` as separate socket writes.
    async fn serve_sse(parts: Vec<Vec<u8>>) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the request so closing the socket does not reset it.
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let length = text
                        .lines()
                        .find_map(|l| {
                            l.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }

            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\n\r\n",
                )
                .await
                .unwrap();
            for part in parts {
                socket.write_all(&part).await.unwrap();
                socket.flush().await.unwrap();
                tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            }
            socket.shutdown().await.unwrap();
        });

        format!("http://{}/v1", addr)
    }

    async fn drain(mut rx: mpsc::Receiver<StreamEvent>) -> (String, String) {
        let mut deltas = String::new();
        let mut done = String::new();
        while let Some(event) = rx.recv().await {
            match event {
                StreamEvent::Delta(text) => deltas.push_str(&text),
                StreamEvent::Done { content, .. } => done = content,
                StreamEvent::Error(e) => panic!("unexpected stream error: {}", e),
                StreamEvent::ToolCalls(_) => {}
            }
        }
        (deltas, done)
    }

    #[tokio::test]
    async fn test_stream_keeps_characters_split_across_writes() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"销售\"}}]}\n\ndata: [DONE]\n\n";
        let bytes = body.as_bytes().to_vec();
        // Split one byte into the three-byte encoding of the first character.
        let split = body.find('销').unwrap() + 1;
        let parts = vec![bytes[..split].to_vec(), bytes[split..].to_vec()];

        let base = serve_sse(parts).await;
        let provider = OpenAIProvider::with_base_url("test-key", &base);
        let rx = provider
            .chat_stream(vec![Message::user("销售额")], vec![], None, ChatOptions::new())
            .await
            .unwrap();

        let (deltas, done) = drain(rx).await;
        assert_eq!(deltas, "销售");
        assert_eq!(done, "销售");
    }

    #[tokio::test]
    async fn test_stream_events_split_between_lines() {
        let parts = vec![
            b"data: {\"choices\":[{\"delta\":{\"content\":\"Hel".to_vec(),
            b"lo\"}}]}\n".to_vec(),
            b"\n: keep-alive\n\ndata: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\n".to_vec(),
            b"data: [DONE]\n\n".to_vec(),
        ];

        let base = serve_sse(parts).await;
        let provider = OpenAIProvider::with_base_url("test-key", &base);
        let rx = provider
            .chat_stream(vec![Message::user("hi")], vec![], None, ChatOptions::new())
            .await
            .unwrap();

        let (deltas, done) = drain(rx).await;
        assert_eq!(deltas, "Hello world");
        assert_eq!(done, "Hello world");
    }

    #[test]
    fn test_assembler_text_deltas_in_order() {
        let mut asm = StreamAssembler::default();
        assert_eq!(
            asm.apply(chunk(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#)),
            Some("Hel".to_string())
        );
        assert_eq!(
            asm.apply(chunk(r#"{"choices":[{"delta":{"content":"lo"}}]}"#)),
            Some("lo".to_string())
        );
        assert_eq!(asm.apply(chunk(r#"{"choices":[{"delta":{}}]}"#)), None);
        asm.apply(chunk(
            r#"{"choices":[],"usage":{"prompt_tokens":3,"completion_tokens":2}}"#,
        ));

        let (content, calls, usage) = asm.finish();
        assert_eq!(content, "Hello");
        assert!(calls.is_empty());
        assert_eq!(usage.unwrap().total_tokens, 5);
    }

    #[test]
    fn test_assembler_joins_tool_call_fragments() {
        let mut asm = StreamAssembler::default();
        asm.apply(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_a","function":{"name":"query_database","arguments":"{\"qu"}}]}}]}"#,
        ));
        asm.apply(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"ery\":\"SELECT 1\"}"}}]}}]}"#,
        ));
        asm.apply(chunk(
            r#"{"choices":[{"delta":{"tool_calls":[{"index":1,"id":"call_b","function":{"name":"search_schema"}}]}}]}"#,
        ));

        let (content, calls, _) = asm.finish();
        assert!(content.is_empty());
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(calls[0].arguments, r#"{"query":"SELECT 1"}"#);
        assert_eq!(calls[1].name, "search_schema");
        assert_eq!(calls[1].arguments, "{}");
    }
}
