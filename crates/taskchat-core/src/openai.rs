//! OpenAI-compatible backend client.
//!
//! Presents the tool catalog as function-calling tools and maps the chat
//! completion response into a [`BackendReply`]. Tool exchanges already
//! executed this turn are replayed as assistant/tool messages so the model
//! can produce a follow-up response.

use crate::backend::{BackendReply, BackendRequest, ChatBackend};
use crate::catalog::{ToolCatalog, ToolSpec};
use crate::config::ProviderConfig;
use crate::error::AgentError;
use crate::types::ToolInvocation;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolArgs, ChatCompletionToolType,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use taskchat_store::Role;
use tracing::debug;
use uuid::Uuid;

/// Default system preamble when the config doesn't supply one.
pub const SYSTEM_PREAMBLE: &str = "\
You are a helpful task management assistant. Your job is to help users manage \
their todo tasks through natural conversation.

You can perform these actions:
- Add new tasks when users want to create or remember something
- List tasks (all, pending only, or completed only)
- Mark tasks as complete when users finish them
- Delete tasks when users want to remove them
- Update tasks when users want to change their title or description

Guidelines:
1. Always use the appropriate tool when the user wants to perform a task action
2. Be friendly and confirm actions after completing them
3. When listing tasks, format them clearly
4. If a task ID is mentioned, use it; if not and context is unclear, ask for clarification";

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
    preamble: String,
}

impl OpenAiBackend {
    pub fn new(config: &ProviderConfig, system_prompt: Option<&str>) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_base(&config.api_base)
            .with_api_key(
                config
                    .api_key
                    .clone()
                    .unwrap_or_else(|| "not-needed".to_string()),
            );

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            preamble: system_prompt.unwrap_or(SYSTEM_PREAMBLE).to_string(),
        }
    }

    fn build_messages(
        &self,
        request: &BackendRequest<'_>,
    ) -> Result<Vec<ChatCompletionRequestMessage>, AgentError> {
        let mut messages = Vec::new();

        let system = format!("{}\n\n{}", self.preamble, request.catalog.describe());
        let sys_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system.as_str())
            .build()
            .map_err(backend_err)?;
        messages.push(ChatCompletionRequestMessage::System(sys_msg));

        for turn in request.history {
            match turn.role {
                Role::User => {
                    let m = ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.as_str())
                        .build()
                        .map_err(backend_err)?;
                    messages.push(ChatCompletionRequestMessage::User(m));
                }
                Role::Assistant => {
                    let m = ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.as_str())
                        .build()
                        .map_err(backend_err)?;
                    messages.push(ChatCompletionRequestMessage::Assistant(m));
                }
            }
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(request.message)
            .build()
            .map_err(backend_err)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        // Replay this turn's tool exchanges: one assistant message carrying
        // the calls, then one tool message per result, ids matched up.
        if !request.tool_results.is_empty() {
            let ids: Vec<String> = request
                .tool_results
                .iter()
                .map(|_| Uuid::new_v4().to_string())
                .collect();

            let tool_calls: Vec<ChatCompletionMessageToolCall> = request
                .tool_results
                .iter()
                .zip(&ids)
                .map(|(call, id)| ChatCompletionMessageToolCall {
                    id: id.clone(),
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionCall {
                        name: call.tool_name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect();

            let assistant = ChatCompletionRequestAssistantMessageArgs::default()
                .tool_calls(tool_calls)
                .build()
                .map_err(backend_err)?;
            messages.push(ChatCompletionRequestMessage::Assistant(assistant));

            for (call, id) in request.tool_results.iter().zip(&ids) {
                let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(id.as_str())
                    .content(call.result.to_value().to_string())
                    .build()
                    .map_err(backend_err)?;
                messages.push(ChatCompletionRequestMessage::Tool(tool_msg));
            }
        }

        Ok(messages)
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn respond(&self, request: BackendRequest<'_>) -> Result<BackendReply, AgentError> {
        let messages = self.build_messages(&request)?;
        let tools = build_tools(request.catalog)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens);
        if !tools.is_empty() {
            builder.tools(tools);
        }
        let chat_request = builder.build().map_err(backend_err)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(backend_err)?;

        let choice = response
            .choices
            .first()
            .ok_or_else(|| AgentError::BackendUnavailable("no choices in response".into()))?;
        let assistant = &choice.message;

        if let Some(tool_calls) = &assistant.tool_calls {
            if !tool_calls.is_empty() {
                debug!(count = tool_calls.len(), "backend requested tool calls");
                let invocations = tool_calls
                    .iter()
                    .map(|tc| {
                        // Malformed argument JSON degrades to an empty set;
                        // the executor reports the missing parameters back.
                        let arguments = serde_json::from_str::<Value>(&tc.function.arguments)
                            .ok()
                            .and_then(|v| v.as_object().cloned())
                            .unwrap_or_default();
                        ToolInvocation::new(tc.function.name.clone(), arguments)
                    })
                    .collect();
                return Ok(BackendReply::ToolRequests(invocations));
            }
        }

        Ok(BackendReply::Final(
            assistant.content.clone().unwrap_or_default(),
        ))
    }
}

fn backend_err(err: impl std::fmt::Display) -> AgentError {
    AgentError::BackendUnavailable(err.to_string())
}

/// Convert the catalog into the function-calling tool format.
fn build_tools(catalog: &ToolCatalog) -> Result<Vec<ChatCompletionTool>, AgentError> {
    catalog
        .list()
        .iter()
        .map(|spec| {
            let func = FunctionObjectArgs::default()
                .name(&spec.name)
                .description(&spec.description)
                .parameters(parameters_schema(spec))
                .build()
                .map_err(backend_err)?;
            ChatCompletionToolArgs::default()
                .r#type(ChatCompletionToolType::Function)
                .function(func)
                .build()
                .map_err(backend_err)
        })
        .collect()
}

fn parameters_schema(spec: &ToolSpec) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in &spec.parameters {
        properties.insert(
            param.name.clone(),
            json!({
                "type": param.ty.as_str(),
                "description": param.description,
            }),
        );
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParamSpec, ParamType, ToolHandler};
    use crate::types::{ToolArgs, ToolReply};
    use std::sync::Arc;

    struct NoopHandler;

    #[async_trait]
    impl ToolHandler for NoopHandler {
        async fn call(&self, _args: &ToolArgs, _user_id: &str) -> Result<ToolReply, AgentError> {
            Ok(ToolReply::new("success"))
        }
    }

    #[test]
    fn test_parameters_schema_shape() {
        let spec = ToolSpec::new(
            "add_task",
            "Create a new task",
            vec![
                ParamSpec::required("title", ParamType::String, "The title"),
                ParamSpec::optional("description", ParamType::String, "Details"),
            ],
            Arc::new(NoopHandler),
        );
        let schema = parameters_schema(&spec);
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["title"]["type"], "string");
        assert_eq!(schema["required"], json!(["title"]));
    }
}
