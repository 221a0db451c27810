pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Conversation {0} not found")]
    ConversationNotFound(i64),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A single todo item, always owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A chat conversation. Owns an ordered sequence of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn within a conversation. Immutable once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: i64,
    pub conversation_id: i64,
    pub user_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Audit entry linking a tool invocation to the assistant message that
/// produced it. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: i64,
    pub message_id: i64,
    pub tool_name: String,
    pub arguments: serde_json::Value,
    pub result: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Status filter for task listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskFilter {
    All,
    Pending,
    Completed,
}

impl TaskFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskFilter::All => "all",
            TaskFilter::Pending => "pending",
            TaskFilter::Completed => "completed",
        }
    }
}

/// Task CRUD. Every operation takes the owning user id as a mandatory
/// filter; a lookup by task id alone is never exposed.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task>;

    /// List the user's tasks, newest-first by creation time. The filter is
    /// applied before ordering.
    async fn list_tasks(&self, user_id: &str, filter: TaskFilter) -> Result<Vec<Task>>;

    /// Mark a task completed. Re-completing an already-completed task is not
    /// an error.
    async fn complete_task(&self, user_id: &str, task_id: i64) -> Result<Task>;

    /// Delete a task, returning it as it was just before deletion.
    async fn delete_task(&self, user_id: &str, task_id: i64) -> Result<Task>;

    /// Update title and/or description. `title` is applied when `Some`;
    /// `description` is applied when `Some` (the caller decides whether a
    /// blank value means "clear" or "leave alone").
    async fn update_task(
        &self,
        user_id: &str,
        task_id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task>;
}

/// Conversation, message, and tool-call persistence for the chat flow.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn create_conversation(&self, user_id: &str) -> Result<Conversation>;

    /// Fetch a conversation the user owns and bump its `updated_at`.
    async fn touch_conversation(&self, user_id: &str, conversation_id: i64)
        -> Result<Conversation>;

    /// Fetch a conversation the user owns without side effects.
    async fn get_conversation(&self, user_id: &str, conversation_id: i64)
        -> Result<Conversation>;

    /// All of the user's conversations, most recently updated first.
    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>>;

    async fn append_message(
        &self,
        conversation_id: i64,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<MessageRecord>;

    /// Conversation history with pagination, ordered by creation time
    /// ascending (ties broken by insertion order).
    async fn history(
        &self,
        user_id: &str,
        conversation_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageRecord>>;

    async fn record_tool_call(
        &self,
        message_id: i64,
        tool_name: &str,
        arguments: serde_json::Value,
        result: serde_json::Value,
    ) -> Result<ToolCallRecord>;

    async fn tool_calls_for_message(&self, message_id: i64) -> Result<Vec<ToolCallRecord>>;
}
