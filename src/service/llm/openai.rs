//! OpenAI-compatible LLM client implementation.
//!
//! Works against any endpoint that speaks the chat completions API (Groq by
//! default). The target schema is delivered either as the parameters of a
//! forced function call or as a strict `json_schema` response format, and
//! replies that fail validation are re-asked with the validation error.

use std::sync::{Arc, OnceLock};

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionMessageToolCall, ChatCompletionNamedToolChoice, ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionToolChoiceOption,
        ChatCompletionToolType, CreateChatCompletionRequestArgs, CreateChatCompletionResponse, FunctionName, FunctionObject, ResponseFormat, ResponseFormatJsonSchema,
    },
};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use crate::base::{
    config::{Config, LlmMode},
    prompts,
    types::{BrainDumpResponse, Category, Err, Res},
};

use super::{GenericLlmClient, LlmClient, parse_brain_dump};

/// Name of the schema, and of the function in `tools` mode.
const SCHEMA_NAME: &str = "BrainDumpResponse";

// Extra methods on `LlmClient` applied by the openai implementation.

impl LlmClient {
    pub fn openai(config: &Config) -> Self {
        let client = OpenAiLlmClient::new(config);
        Self { inner: Arc::new(client) }
    }
}

// Specific implementations.

/// A single model reply that should carry the structured result.
#[derive(Debug, Clone)]
pub enum Reply {
    /// The model called the schema function.
    ToolCall(ChatCompletionMessageToolCall),
    /// The model answered with message content.
    Content(String),
}

impl Reply {
    /// The raw JSON text to parse.
    pub fn payload(&self) -> &str {
        match self {
            Reply::ToolCall(call) => &call.function.arguments,
            Reply::Content(content) => content,
        }
    }
}

/// OpenAI-compatible LLM client implementation.
#[derive(Clone)]
pub struct OpenAiLlmClient {
    client: Client<OpenAIConfig>,
    config: Config,
}

impl OpenAiLlmClient {
    /// Create a new OpenAI-compatible LLM client.
    #[instrument(name = "OpenAiLlmClient::new", skip_all)]
    pub fn new(config: &Config) -> Self {
        let cfg = OpenAIConfig::new().with_api_key(config.llm_api_key.clone()).with_api_base(config.llm_api_base.clone());

        Self {
            client: Client::with_config(cfg),
            config: config.clone(),
        }
    }

    /// Build the two-message prompt (directive + raw text).
    #[instrument(name = "OpenAiLlmClient::build_brain_dump_input", skip_all)]
    fn build_brain_dump_input(&self, raw_text: &str) -> Res<Vec<ChatCompletionRequestMessage>> {
        let prompt = prompts::assemble(&self.config.system_directive, raw_text);

        Ok(vec![
            ChatCompletionRequestSystemMessageArgs::default().content(prompt.system).build()?.into(),
            ChatCompletionRequestUserMessageArgs::default().content(prompt.user).build()?.into(),
        ])
    }

    /// Build the request skeleton shared by every attempt.
    fn build_request(&self) -> CreateChatCompletionRequestArgs {
        let mut request = CreateChatCompletionRequestArgs::default();

        request
            .model(&self.config.llm_model)
            .temperature(self.config.llm_temperature)
            .max_completion_tokens(self.config.llm_max_tokens);

        match self.config.llm_mode {
            LlmMode::Tools => {
                request.tools(vec![get_brain_dump_tool().clone()]).tool_choice(get_brain_dump_tool_choice().clone());
            }
            LlmMode::JsonSchema => {
                request.response_format(get_brain_dump_response_format().clone());
            }
        }

        request
    }
}

#[async_trait]
impl GenericLlmClient for OpenAiLlmClient {
    #[instrument(name = "OpenAiLlmClient::get_brain_dump_response", skip_all)]
    async fn get_brain_dump_response(&self, raw_text: &str) -> Res<BrainDumpResponse> {
        let template = self.build_request();
        let mut messages = self.build_brain_dump_input(raw_text)?;
        let max_attempts = self.config.llm_max_attempts.max(1);

        let mut attempt = 1;

        loop {
            // Send the request.

            let mut request = template.clone();
            let request = request.messages(messages.clone()).build()?;

            let response = self.client.chat().create(request).await?;
            let reply = extract_reply(&response)?;

            // Validate, and re-ask on failure.

            match parse_brain_dump(reply.payload()) {
                Ok(result) => {
                    info!("Received {} tasks from LLM after {} attempt(s).", result.tasks.len(), attempt);
                    return Ok(result);
                }
                Err(err) if attempt < max_attempts => {
                    warn!("LLM output failed validation, re-asking {attempt}/{max_attempts}: {err:#}");

                    messages.extend(build_reask_input(&reply, &err)?);
                    attempt += 1;
                }
                Err(err) => {
                    return Err(anyhow::anyhow!("LLM output failed validation after {max_attempts} attempt(s): {err:#}"));
                }
            }
        }
    }
}

/// Pull the structured reply out of a chat completion.
#[instrument(skip_all)]
pub fn extract_reply(response: &CreateChatCompletionResponse) -> Res<Reply> {
    let choice = response.choices.first().ok_or_else(|| anyhow::anyhow!("LLM response contained no choices."))?;
    let message = &choice.message;

    if let Some(refusal) = &message.refusal {
        return Err(anyhow::anyhow!("Request refused: {refusal}"));
    }

    if let Some(calls) = &message.tool_calls {
        if let Some(call) = calls.iter().find(|call| call.function.name == SCHEMA_NAME) {
            return Ok(Reply::ToolCall(call.clone()));
        }

        warn!("LLM called unexpected tools: {:?}", calls.iter().map(|call| &call.function.name).collect::<Vec<_>>());
    }

    match &message.content {
        Some(content) => Ok(Reply::Content(content.clone())),
        None => Err(anyhow::anyhow!("LLM response contained neither a `{SCHEMA_NAME}` call nor content.")),
    }
}

/// Build the follow-up messages that hand a validation error back to the model.
pub fn build_reask_input(reply: &Reply, err: &Err) -> Res<Vec<ChatCompletionRequestMessage>> {
    let correction = format!("Validation failed: {err:#}\n\nFix the errors and respond again with the complete, corrected `{SCHEMA_NAME}`.");

    Ok(match reply {
        Reply::ToolCall(call) => vec![
            ChatCompletionRequestAssistantMessageArgs::default().tool_calls(vec![call.clone()]).build()?.into(),
            ChatCompletionRequestToolMessageArgs::default().tool_call_id(call.id.clone()).content(correction).build()?.into(),
        ],
        Reply::Content(content) => vec![
            ChatCompletionRequestAssistantMessageArgs::default().content(content.clone()).build()?.into(),
            ChatCompletionRequestUserMessageArgs::default().content(correction).build()?.into(),
        ],
    })
}

// Statics.

static BRAIN_DUMP_SCHEMA: OnceLock<serde_json::Value> = OnceLock::new();
static BRAIN_DUMP_TOOL: OnceLock<ChatCompletionTool> = OnceLock::new();
static BRAIN_DUMP_TOOL_CHOICE: OnceLock<ChatCompletionToolChoiceOption> = OnceLock::new();
static BRAIN_DUMP_RESPONSE_FORMAT: OnceLock<ResponseFormat> = OnceLock::new();

/// Get the JSON schema for [`BrainDumpResponse`].
pub fn get_brain_dump_schema() -> &'static serde_json::Value {
    BRAIN_DUMP_SCHEMA.get_or_init(|| {
        let categories = Category::ALL.iter().map(|category| category.as_str()).collect::<Vec<_>>();

        serde_json::json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "description": "Actionable tasks extracted from the brain dump.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "title": { "type": "string", "description": "The main action of the task." },
                            "category": { "type": "string", "enum": categories, "description": "red=Urgent/Today, yellow=This Week, green=Later." },
                            "duration": { "type": "integer", "description": "Estimated minutes (15, 25, or 45)." },
                            "reasoning": { "type": "string", "description": "Short reason for the priority." }
                        },
                        "required": ["title", "category", "duration", "reasoning"],
                        "additionalProperties": false
                    }
                }
            },
            "required": ["tasks"],
            "additionalProperties": false
        })
    })
}

/// Get the schema function for `tools` mode.
fn get_brain_dump_tool() -> &'static ChatCompletionTool {
    BRAIN_DUMP_TOOL.get_or_init(|| ChatCompletionTool {
        r#type: ChatCompletionToolType::Function,
        function: FunctionObject {
            name: SCHEMA_NAME.to_string(),
            description: Some("Record the prioritized tasks extracted from the user's brain dump.".to_string()),
            parameters: Some(get_brain_dump_schema().clone()),
            strict: None,
        },
    })
}

/// Force the model to call the schema function.
fn get_brain_dump_tool_choice() -> &'static ChatCompletionToolChoiceOption {
    BRAIN_DUMP_TOOL_CHOICE.get_or_init(|| {
        ChatCompletionToolChoiceOption::Named(ChatCompletionNamedToolChoice {
            r#type: ChatCompletionToolType::Function,
            function: FunctionName { name: SCHEMA_NAME.to_string() },
        })
    })
}

/// Get the response format for `json_schema` mode.
fn get_brain_dump_response_format() -> &'static ResponseFormat {
    BRAIN_DUMP_RESPONSE_FORMAT.get_or_init(|| ResponseFormat::JsonSchema {
        json_schema: ResponseFormatJsonSchema {
            name: SCHEMA_NAME.to_string(),
            description: Some("Prioritized tasks extracted from a brain dump.".to_string()),
            schema: Some(get_brain_dump_schema().clone()),
            strict: Some(true),
        },
    })
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use axum::{
        Json, Router,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
        routing::post,
    };
    use serde_json::json;
    use tokio::net::TcpListener;

    use super::*;
    use crate::base::config::ConfigInner;

    fn create_test_config(mode: LlmMode) -> Config {
        Config {
            inner: Arc::new(ConfigInner {
                llm_api_key: std::env::var("NEUROFLOW_LLM_API_KEY").unwrap_or_else(|_| "test_key".to_string()),
                llm_mode: mode,
                llm_max_tokens: 1024u32,
                ..Default::default()
            }),
        }
    }

    fn completion(message: serde_json::Value) -> CreateChatCompletionResponse {
        serde_json::from_value(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "llama-3.3-70b-versatile",
            "choices": [{ "index": 0, "message": message, "finish_reason": "stop" }]
        }))
        .unwrap()
    }

    const ARGUMENTS: &str = r#"{"tasks":[{"title":"Call dentist","category":"red","duration":15,"reasoning":"Tooth hurts."}]}"#;

    #[test]
    fn test_build_request_tools_mode() {
        let client = OpenAiLlmClient::new(&create_test_config(LlmMode::Tools));
        let messages = client.build_brain_dump_input("call dentist").unwrap();

        let mut request = client.build_request();
        let request = request.messages(messages).build().unwrap();

        assert_eq!(request.model, "llama-3.3-70b-versatile");
        assert_eq!(request.temperature, Some(0.1));
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
        assert!(matches!(request.tool_choice, Some(ChatCompletionToolChoiceOption::Named(_))));
        assert!(request.response_format.is_none());
    }

    #[test]
    fn test_build_request_json_schema_mode() {
        let client = OpenAiLlmClient::new(&create_test_config(LlmMode::JsonSchema));
        let messages = client.build_brain_dump_input("").unwrap();

        let mut request = client.build_request();
        let request = request.messages(messages).build().unwrap();

        assert!(request.tools.is_none());
        assert!(matches!(request.response_format, Some(ResponseFormat::JsonSchema { .. })));
    }

    #[test]
    fn test_schema_lists_exactly_the_categories() {
        let schema = get_brain_dump_schema();

        assert_eq!(schema["properties"]["tasks"]["items"]["properties"]["category"]["enum"], json!(["red", "yellow", "green"]));
        assert_eq!(schema["required"], json!(["tasks"]));
    }

    #[test]
    fn test_extract_reply_tool_call() {
        let response = completion(json!({
            "role": "assistant",
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": { "name": "BrainDumpResponse", "arguments": ARGUMENTS }
            }]
        }));

        let reply = extract_reply(&response).unwrap();

        assert!(matches!(reply, Reply::ToolCall(_)));
        assert_eq!(parse_brain_dump(reply.payload()).unwrap().tasks[0].title, "Call dentist");
    }

    #[test]
    fn test_extract_reply_content() {
        let response = completion(json!({ "role": "assistant", "content": ARGUMENTS }));

        let reply = extract_reply(&response).unwrap();

        assert!(matches!(reply, Reply::Content(_)));
        assert_eq!(reply.payload(), ARGUMENTS);
    }

    #[test]
    fn test_extract_reply_refusal() {
        let response = completion(json!({ "role": "assistant", "refusal": "I can't help with that." }));

        let err = extract_reply(&response).unwrap_err();

        assert_eq!(err.to_string(), "Request refused: I can't help with that.");
    }

    #[test]
    fn test_extract_reply_no_choices() {
        let mut response = completion(json!({ "role": "assistant", "content": "{}" }));
        response.choices.clear();

        assert!(extract_reply(&response).is_err());
    }

    #[test]
    fn test_build_reask_input() {
        let err = anyhow::anyhow!("tasks[0].title must not be empty.");

        let tool_reply = extract_reply(&completion(json!({
            "role": "assistant",
            "tool_calls": [{ "id": "call_9", "type": "function", "function": { "name": "BrainDumpResponse", "arguments": "{}" } }]
        })))
        .unwrap();

        let messages = build_reask_input(&tool_reply, &err).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(&messages[1], ChatCompletionRequestMessage::Tool(tool) if tool.tool_call_id == "call_9"));

        let messages = build_reask_input(&Reply::Content("nope".to_string()), &err).unwrap();
        assert!(matches!(messages[0], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
    }

    #[tokio::test]
    async fn test_unreachable_provider_fails() {
        let config = Config {
            inner: Arc::new(ConfigInner {
                llm_api_key: "sk-invalid-key-for-testing".to_string(),
                llm_api_base: "http://127.0.0.1:9/v1".to_string(),
                ..Default::default()
            }),
        };

        let client = LlmClient::openai(&config);

        let result = client.get_brain_dump_response("call dentist").await;
        assert!(result.is_err(), "Should fail without a reachable provider");
    }

    // Fake provider.

    const INVALID_ARGUMENTS: &str = r#"{"tasks":[{"title":"Call dentist","category":"purple","duration":15,"reasoning":"Tooth hurts."}]}"#;

    /// An OpenAI-compatible endpoint that answers with canned replies.
    struct FakeProvider {
        /// Attempt (1-based) whose reply is valid; `None` never is.
        valid_at: Option<usize>,
        /// Answer every call with 401 instead.
        reject: bool,
        /// Message count of every request received.
        seen: Mutex<Vec<usize>>,
    }

    impl FakeProvider {
        fn new(valid_at: Option<usize>) -> Arc<Self> {
            Arc::new(Self { valid_at, reject: false, seen: Mutex::new(Vec::new()) })
        }

        fn rejecting() -> Arc<Self> {
            Arc::new(Self { valid_at: None, reject: true, seen: Mutex::new(Vec::new()) })
        }

        fn seen(&self) -> Vec<usize> {
            self.seen.lock().unwrap().clone()
        }
    }

    async fn fake_completions(State(provider): State<Arc<FakeProvider>>, Json(body): Json<serde_json::Value>) -> axum::response::Response {
        let attempt = {
            let mut seen = provider.seen.lock().unwrap();
            seen.push(body["messages"].as_array().map(Vec::len).unwrap_or_default());
            seen.len()
        };

        if provider.reject {
            let error = json!({ "error": { "message": "Invalid API Key", "type": "invalid_request_error", "param": null, "code": "invalid_api_key" } });
            return (StatusCode::UNAUTHORIZED, Json(error)).into_response();
        }

        let arguments = if provider.valid_at == Some(attempt) { ARGUMENTS } else { INVALID_ARGUMENTS };

        let completion = json!({
            "id": format!("chatcmpl-{attempt}"),
            "object": "chat.completion",
            "created": 1_700_000_000u32,
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": format!("call_{attempt}"),
                        "type": "function",
                        "function": { "name": "BrainDumpResponse", "arguments": arguments }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        });

        Json(completion).into_response()
    }

    /// Serve the fake provider on an ephemeral port and point a client at it.
    async fn setup_fake_provider(provider: Arc<FakeProvider>) -> LlmClient {
        let app = Router::new().route("/v1/chat/completions", post(fake_completions)).with_state(provider);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        LlmClient::openai(&Config {
            inner: Arc::new(ConfigInner {
                llm_api_key: "test_key".to_string(),
                llm_api_base: format!("http://{address}/v1"),
                ..Default::default()
            }),
        })
    }

    #[tokio::test]
    async fn test_valid_first_reply_is_not_reasked() {
        let provider = FakeProvider::new(Some(1));
        let client = setup_fake_provider(provider.clone()).await;

        let response = client.get_brain_dump_response("call dentist").await.unwrap();

        assert_eq!(response.tasks.len(), 1);
        assert_eq!(provider.seen(), vec![2]);
    }

    #[tokio::test]
    async fn test_reask_until_valid() {
        let provider = FakeProvider::new(Some(3));
        let client = setup_fake_provider(provider.clone()).await;

        let response = client.get_brain_dump_response("call dentist").await.unwrap();

        assert_eq!(response.tasks[0].category, Category::Red);
        // Each re-ask appends the faulty call and the tool correction.
        assert_eq!(provider.seen(), vec![2, 4, 6]);
    }

    #[tokio::test]
    async fn test_reask_budget_exhausted() {
        let provider = FakeProvider::new(None);
        let client = setup_fake_provider(provider.clone()).await;

        let err = client.get_brain_dump_response("call dentist").await.unwrap_err();

        assert_eq!(provider.seen(), vec![2, 4, 6]);
        assert!(err.to_string().starts_with("LLM output failed validation after 3 attempt(s): "), "unexpected error: {err}");
        assert!(err.to_string().contains("purple"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_provider_errors_are_not_reasked() {
        let provider = FakeProvider::rejecting();
        let client = setup_fake_provider(provider.clone()).await;

        let err = client.get_brain_dump_response("call dentist").await.unwrap_err();

        assert_eq!(provider.seen(), vec![2]);
        assert!(err.to_string().contains("Invalid API Key"), "unexpected error: {err}");
    }

    #[tokio::test]
    #[ignore = "requires NEUROFLOW_LLM_API_KEY and network access"]
    async fn test_llm_client_get_brain_dump_response() {
        let config = create_test_config(LlmMode::Tools);
        let client = LlmClient::openai(&config);

        let response = client.get_brain_dump_response("Finish tax return, call dentist, plan vacation").await.unwrap();

        assert!(!response.tasks.is_empty(), "Response should contain tasks");
        // The lane limits are advisory: flag, don't fail.
        for violation in response.limit_violations() {
            eprintln!("Soft limit exceeded: {violation:?}");
        }
    }
}
