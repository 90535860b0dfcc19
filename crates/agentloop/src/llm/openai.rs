//! OpenAI-compatible chat completions client (`POST {base_url}/chat/completions`).
//!
//! Works against any endpoint speaking the OpenAI wire format (Moonshot/Kimi, OpenAI,
//! local proxies). Request: `{model, messages[], temperature, max_tokens?, tools?}`;
//! response: `choices[0].message.{content?, tool_calls?}` and optional `usage`.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::LlmError;
use super::types::{LlmResponse, Usage};
use super::{request_messages, LlmClient};
use crate::message::{Message, ToolCall};
use crate::tool::ToolSpec;

/// Connection and sampling settings for `ChatOpenAI`.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Bearer credential.
    pub api_key: String,
    /// Base URL without trailing slash, e.g. `https://api.moonshot.cn/v1`.
    pub base_url: String,
    /// Model id, e.g. `moonshot-v1-8k`.
    pub model: String,
    /// Sampling temperature sent with every request.
    pub temperature: Option<f32>,
    /// Response-length cap.
    pub max_tokens: Option<u32>,
    /// HTTP-level timeout for one request; the turn controller applies its own on top.
    pub request_timeout: Option<Duration>,
}

impl OpenAiConfig {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            request_timeout: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(m: &Message) -> Self {
        let mut wire = WireMessage {
            role: m.role(),
            content: m.content().to_string(),
            tool_calls: None,
            tool_call_id: None,
            name: None,
        };
        match m {
            Message::Assistant { tool_calls, .. } if !tool_calls.is_empty() => {
                wire.tool_calls = Some(
                    tool_calls
                        .iter()
                        .map(|tc| WireToolCall {
                            id: tc.id.clone(),
                            kind: "function",
                            function: WireFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments_string(),
                            },
                        })
                        .collect(),
                );
            }
            Message::ToolResult {
                tool_call_id, name, ..
            } => {
                wire.tool_call_id = Some(tool_call_id.clone());
                wire.name = Some(name.clone());
            }
            _ => {}
        }
        wire
    }
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct RequestBody {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseChoice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<ResponseChoice>,
    usage: Option<ResponseUsage>,
}

/// Parses a chat-completions body into an `LlmResponse`.
///
/// Missing tool-call ids become `call_{index}` (suffixed when that id is already taken in the
/// same reply); duplicate ids sent by the endpoint are rejected.
pub(crate) fn parse_response(text: &str) -> Result<LlmResponse, LlmError> {
    let body: ResponseBody = serde_json::from_str(text)
        .map_err(|e| LlmError::MalformedResponse(format!("{e}: {text}")))?;
    let usage = body
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        })
        .unwrap_or_default();
    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response has no choices".into()))?;

    let raw_calls = choice.message.tool_calls.unwrap_or_default();
    let mut seen = HashSet::new();
    for id in raw_calls.iter().filter_map(|tc| tc.id.as_deref()) {
        if !id.is_empty() && !seen.insert(id.to_string()) {
            return Err(LlmError::MalformedResponse(format!(
                "duplicate tool call id: {id}"
            )));
        }
    }

    let mut tool_calls = Vec::with_capacity(raw_calls.len());
    for (index, tc) in raw_calls.into_iter().enumerate() {
        let id = match tc.id.filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let mut candidate = format!("call_{index}");
                let mut n = 1;
                while seen.contains(&candidate) {
                    candidate = format!("call_{index}_{n}");
                    n += 1;
                }
                seen.insert(candidate.clone());
                candidate
            }
        };
        tool_calls.push(ToolCall {
            id,
            name: tc.function.name,
            arguments: ToolCall::parse_arguments(&tc.function.arguments),
        });
    }

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        tool_calls,
        usage,
    })
}

/// Chat completions client implementing `LlmClient`.
///
/// Bind the registry's tools with `with_tools(registry.specs())` so the model can emit
/// tool calls; without tools every reply is final.
///
/// **Interaction**: used by `TurnController` as its `Arc<dyn LlmClient>`; the CLI builds it
/// from `AgentConfig::openai_config`.
#[derive(Debug, Clone)]
pub struct ChatOpenAI {
    config: OpenAiConfig,
    http: reqwest::Client,
    tools: Vec<ToolSpec>,
}

impl ChatOpenAI {
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("http client build: {e}")))?;
        Ok(Self {
            config,
            http,
            tools: Vec::new(),
        })
    }

    /// Binds tool definitions sent with every request.
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body(&self, messages: &[Message]) -> RequestBody {
        let tools = if self.tools.is_empty() {
            None
        } else {
            Some(
                self.tools
                    .iter()
                    .map(|t| WireTool {
                        kind: "function",
                        function: WireFunctionDef {
                            name: t.name.clone(),
                            description: t.description.clone(),
                            parameters: t.input_schema.clone(),
                        },
                    })
                    .collect(),
            )
        };
        RequestBody {
            model: self.config.model.clone(),
            messages: messages.iter().map(WireMessage::from).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            tools,
        }
    }
}

fn transport(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Transport(format!("request timed out: {e}"))
    } else {
        LlmError::Transport(e.to_string())
    }
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(
        &self,
        history: &[Message],
        system_prompt: &str,
    ) -> Result<LlmResponse, LlmError> {
        let messages = request_messages(history, system_prompt)?;
        let body = self.build_body(&messages);
        let url = format!("{}/chat/completions", self.config.base_url);
        tracing::debug!(
            model = %self.config.model,
            messages = body.messages.len(),
            tools = self.tools.len(),
            "sending chat completion"
        );

        let res = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        let status = res.status();
        let text = res.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(LlmError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }
        parse_response(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> ChatOpenAI {
        ChatOpenAI::new(
            OpenAiConfig::new("sk-test", "https://api.moonshot.cn/v1/", "moonshot-v1-8k")
                .with_temperature(0.7),
        )
        .unwrap()
    }

    #[test]
    fn config_trims_trailing_slash() {
        assert_eq!(client().config.base_url, "https://api.moonshot.cn/v1");
    }

    #[test]
    fn body_carries_model_temperature_and_tools() {
        let c = client().with_tools(vec![ToolSpec {
            name: "get_user_location".into(),
            description: "Get the user's location".into(),
            input_schema: json!({"type": "object", "properties": {}}),
        }]);
        let messages = request_messages(&[Message::user("hi")], "sys").unwrap();
        let v = serde_json::to_value(c.build_body(&messages)).unwrap();
        assert_eq!(v["model"], "moonshot-v1-8k");
        assert!((v["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert!(v.get("max_tokens").is_none());
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["tools"][0]["type"], "function");
        assert_eq!(v["tools"][0]["function"]["name"], "get_user_location");
    }

    #[test]
    fn body_encodes_tool_calls_and_results() {
        let history = vec![
            Message::user("weather here?"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new("call_1", "get_weather_for_location", json!({"city": "Florida"}))],
            ),
            Message::tool_result("call_1", "get_weather_for_location", "It's always sunny in Florida!"),
        ];
        let v = serde_json::to_value(client().build_body(&history)).unwrap();
        let assistant = &v["messages"][1];
        assert_eq!(assistant["tool_calls"][0]["id"], "call_1");
        assert_eq!(assistant["tool_calls"][0]["function"]["arguments"], r#"{"city":"Florida"}"#);
        let tool = &v["messages"][2];
        assert_eq!(tool["role"], "tool");
        assert_eq!(tool["tool_call_id"], "call_1");
        assert!(v.get("tools").is_none());
    }

    #[test]
    fn parse_final_answer_with_usage() {
        let r = parse_response(
            r#"{"choices":[{"message":{"role":"assistant","content":"Sunny!"}}],
                "usage":{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15}}"#,
        )
        .unwrap();
        assert!(r.is_final());
        assert_eq!(r.content, "Sunny!");
        assert_eq!(r.usage.total(), 15);
    }

    #[test]
    fn parse_tool_calls_synthesizes_missing_ids() {
        let r = parse_response(
            r#"{"choices":[{"message":{"content":null,"tool_calls":[
                {"type":"function","function":{"name":"get_user_location","arguments":""}},
                {"id":"abc","type":"function","function":{"name":"get_weather_for_location","arguments":"{\"city\":\"Paris\"}"}}
            ]}}]}"#,
        )
        .unwrap();
        assert_eq!(r.content, "");
        assert_eq!(r.tool_calls[0].id, "call_0");
        assert_eq!(r.tool_calls[0].arguments, json!({}));
        assert_eq!(r.tool_calls[1].id, "abc");
        assert_eq!(r.tool_calls[1].arguments, json!({"city": "Paris"}));
    }

    #[test]
    fn synthesized_id_skips_ids_the_endpoint_already_used() {
        let r = parse_response(
            r#"{"choices":[{"message":{"tool_calls":[
                {"function":{"name":"get_user_location","arguments":"{}"}},
                {"id":"call_0","function":{"name":"get_user_location","arguments":"{}"}},
                {"function":{"name":"get_user_location","arguments":"{}"}}
            ]}}]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = r.tool_calls.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_0_1", "call_0", "call_2"]);
    }

    #[test]
    fn parse_rejects_duplicate_ids() {
        let err = parse_response(
            r#"{"choices":[{"message":{"tool_calls":[
                {"id":"x","function":{"name":"a","arguments":"{}"}},
                {"id":"x","function":{"name":"b","arguments":"{}"}}
            ]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(m) if m.contains("duplicate")));
    }

    #[test]
    fn parse_rejects_missing_choices_and_garbage() {
        assert!(matches!(
            parse_response(r#"{"choices":[]}"#),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_response("<html>bad gateway</html>"),
            Err(LlmError::MalformedResponse(_))
        ));
    }
}
