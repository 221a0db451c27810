//! The model backend boundary.
//!
//! A backend takes one round-trip: given the user message, prior turns, the
//! tool catalog, and any tool results already produced this turn, it returns
//! either a final text reply or a list of requested tool invocations.

use crate::catalog::ToolCatalog;
use crate::error::AgentError;
use crate::types::{ExecutedToolCall, HistoryMessage, ToolInvocation};
use async_trait::async_trait;

/// One request to the backend. `tool_results` carries every tool exchange
/// executed earlier in the current turn, in execution order.
pub struct BackendRequest<'a> {
    pub message: &'a str,
    pub history: &'a [HistoryMessage],
    pub catalog: &'a ToolCatalog,
    pub tool_results: &'a [ExecutedToolCall],
}

/// What the backend decided. An empty invocation list is treated by the
/// orchestrator exactly like `Final` with empty text.
#[derive(Debug, Clone)]
pub enum BackendReply {
    Final(String),
    ToolRequests(Vec<ToolInvocation>),
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn respond(&self, request: BackendRequest<'_>) -> Result<BackendReply, AgentError>;
}
