//! Chat session coordinator.
//!
//! Top-level entry point for a chat turn: resolves the conversation,
//! persists both turns, routes between the model-backed loop and the
//! fallback parser, synthesizes a reply when the tools produced no text,
//! and records the tool-call audit trail.

use crate::agent_loop::AgentLoop;
use crate::backend::ChatBackend;
use crate::catalog::ToolCatalog;
use crate::config::ChatConfig;
use crate::error::Result;
use crate::executor::ToolExecutor;
use crate::fallback::IntentParser;
use crate::types::{ChatReply, ExecutedToolCall, FinishReason, HistoryMessage, ToolResult};
use serde_json::Value;
use std::sync::Arc;
use taskchat_store::{ConversationStore, Role};
use tracing::{error, info, warn};

const DEFAULT_REPLY: &str =
    "I processed your request. Is there anything else I can help you with?";

const EMPTY_LIST_REPLY: &str =
    "You don't have any tasks yet. Would you like to add one? Just say 'add task [title]'!";

pub struct ChatService {
    store: Arc<dyn ConversationStore>,
    executor: Arc<ToolExecutor>,
    agent: Option<AgentLoop>,
    parser: IntentParser,
    history_limit: usize,
}

impl ChatService {
    /// Build the coordinator. When `backend` is `None` every turn goes
    /// through the fallback parser.
    pub fn new(
        config: &ChatConfig,
        catalog: Arc<ToolCatalog>,
        store: Arc<dyn ConversationStore>,
        backend: Option<Arc<dyn ChatBackend>>,
    ) -> Self {
        let executor = Arc::new(ToolExecutor::new(catalog.clone()));
        let agent = backend.map(|b| {
            AgentLoop::new(b, executor.clone(), catalog, config.max_iterations)
        });
        Self {
            store,
            executor,
            agent,
            parser: IntentParser::new(),
            history_limit: config.history_limit,
        }
    }

    /// Process one user message. Fails only when the conversation cannot be
    /// resolved or a turn cannot be persisted; everything downstream of the
    /// persisted user turn degrades into a user-visible error reply instead.
    pub async fn chat(
        &self,
        user_id: &str,
        conversation_id: Option<i64>,
        message: &str,
    ) -> Result<ChatReply> {
        let conversation = match conversation_id {
            Some(id) => self.store.touch_conversation(user_id, id).await?,
            None => self.store.create_conversation(user_id).await?,
        };

        self.store
            .append_message(conversation.id, user_id, Role::User, message)
            .await?;

        let turn = match &self.agent {
            Some(agent) => {
                self.model_turn(agent, user_id, conversation.id, message)
                    .await
            }
            None => Ok(self.fallback_turn(user_id, message).await),
        };

        let (mut response, tool_calls) = match turn {
            Ok(turn) => turn,
            Err(err) => {
                error!(error = %err, user = user_id, "chat turn failed, degrading to error reply");
                (
                    format!("I encountered an error processing your request: {err}"),
                    Vec::new(),
                )
            }
        };

        if response.is_empty() {
            response = synthesize_reply(&tool_calls).unwrap_or_else(|| DEFAULT_REPLY.to_string());
        }

        let assistant = self
            .store
            .append_message(conversation.id, user_id, Role::Assistant, &response)
            .await?;
        for call in &tool_calls {
            self.store
                .record_tool_call(
                    assistant.id,
                    &call.tool_name,
                    call.arguments.clone(),
                    call.result.to_value(),
                )
                .await?;
        }

        info!(
            user = user_id,
            conversation = conversation.id,
            tool_calls = tool_calls.len(),
            "chat turn completed"
        );

        Ok(ChatReply {
            conversation_id: conversation.id,
            response,
            tool_calls,
        })
    }

    async fn model_turn(
        &self,
        agent: &AgentLoop,
        user_id: &str,
        conversation_id: i64,
        message: &str,
    ) -> Result<(String, Vec<ExecutedToolCall>)> {
        let mut records = self
            .store
            .history(user_id, conversation_id, self.history_limit, 0)
            .await?;
        // The just-persisted user turn travels as the message itself.
        records.pop();
        let history: Vec<HistoryMessage> = records.iter().map(HistoryMessage::from).collect();

        let outcome = agent.run(user_id, message, &history).await?;
        if outcome.finish_reason == FinishReason::MaxIterations {
            warn!(user = user_id, "turn stopped by the iteration budget");
        }
        Ok((outcome.response, outcome.tool_calls))
    }

    async fn fallback_turn(
        &self,
        user_id: &str,
        message: &str,
    ) -> (String, Vec<ExecutedToolCall>) {
        let intent = self.parser.parse(message);
        let mut response = intent.reply;
        let mut tool_calls = Vec::new();

        if let Some(invocation) = intent.invocation {
            info!(tool = %invocation.name, "fallback parser matched a tool");
            let result = self
                .executor
                .invoke(&invocation.name, &invocation.arguments, user_id)
                .await;
            let call = ExecutedToolCall {
                tool_name: invocation.name,
                arguments: Value::Object(invocation.arguments),
                result,
            };
            response = if call.tool_name == "list_tasks" && !call.result.is_failure() {
                format_task_list(&call.result)
            } else {
                call.result.message.clone().unwrap_or(response)
            };
            tool_calls.push(call);
        }

        (response, tool_calls)
    }
}

/// Build a reply from tool results when the backend produced none.
fn synthesize_reply(tool_calls: &[ExecutedToolCall]) -> Option<String> {
    let mut response = None;
    for call in tool_calls {
        if call.tool_name == "list_tasks" && !call.result.is_failure() {
            response = Some(format_task_list(&call.result));
        } else {
            response = Some(
                call.result
                    .message
                    .clone()
                    .unwrap_or_else(|| "Action completed.".to_string()),
            );
            break;
        }
    }
    response
}

/// Render a `list_tasks` result as a readable list, newest first with a
/// Done/Pending marker per item and a trailing count.
fn format_task_list(result: &ToolResult) -> String {
    let tasks = result
        .fields
        .get("tasks")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if tasks.is_empty() {
        return EMPTY_LIST_REPLY.to_string();
    }

    let lines: Vec<String> = tasks
        .iter()
        .map(|task| {
            let id = task["id"].as_i64().unwrap_or_default();
            let title = task["title"].as_str().unwrap_or_default();
            let marker = if task["completed"].as_bool().unwrap_or(false) {
                "Done"
            } else {
                "Pending"
            };
            format!("[{id}] {title} - {marker}")
        })
        .collect();

    let filter = result
        .fields
        .get("filter")
        .and_then(Value::as_str)
        .unwrap_or("all");

    format!(
        "Here are your {} tasks:\n\n{}\n\nTotal: {} task(s)",
        filter,
        lines.join("\n"),
        tasks.len()
    )
}
