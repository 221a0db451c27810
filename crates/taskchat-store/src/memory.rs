//! In-memory store backing the tool handlers and the chat coordinator.
//!
//! Holds everything behind a single async `RwLock`; each trait method takes
//! the lock once, so one call is one atomic mutation from the caller's
//! perspective.

use crate::{
    Conversation, ConversationStore, MessageRecord, Result, Role, StoreError, Task, TaskFilter,
    TaskStore, ToolCallRecord,
};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    tasks: Vec<Task>,
    conversations: Vec<Conversation>,
    messages: Vec<MessageRecord>,
    tool_calls: Vec<ToolCallRecord>,
    next_task_id: i64,
    next_conversation_id: i64,
    next_message_id: i64,
    next_tool_call_id: i64,
}

impl Inner {
    fn new() -> Self {
        Self {
            next_task_id: 1,
            next_conversation_id: 1,
            next_message_id: 1,
            next_tool_call_id: 1,
            ..Default::default()
        }
    }

    fn task_mut(&mut self, user_id: &str, task_id: i64) -> Result<&mut Task> {
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .ok_or(StoreError::TaskNotFound(task_id))
    }
}

pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(
        &self,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task> {
        let mut inner = self.inner.write().await;
        let task = Task {
            id: inner.next_task_id,
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.map(str::to_string),
            completed: false,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.next_task_id += 1;
        inner.tasks.push(task.clone());
        Ok(task)
    }

    async fn list_tasks(&self, user_id: &str, filter: TaskFilter) -> Result<Vec<Task>> {
        let inner = self.inner.read().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| match filter {
                TaskFilter::All => true,
                TaskFilter::Pending => !t.completed,
                TaskFilter::Completed => t.completed,
            })
            .cloned()
            .collect();
        // Newest first; ids break ties for tasks created within the same tick.
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn complete_task(&self, user_id: &str, task_id: i64) -> Result<Task> {
        let mut inner = self.inner.write().await;
        let task = inner.task_mut(user_id, task_id)?;
        task.completed = true;
        task.updated_at = Some(Utc::now());
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: &str, task_id: i64) -> Result<Task> {
        let mut inner = self.inner.write().await;
        let idx = inner
            .tasks
            .iter()
            .position(|t| t.id == task_id && t.user_id == user_id)
            .ok_or(StoreError::TaskNotFound(task_id))?;
        Ok(inner.tasks.remove(idx))
    }

    async fn update_task(
        &self,
        user_id: &str,
        task_id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Task> {
        let mut inner = self.inner.write().await;
        let task = inner.task_mut(user_id, task_id)?;
        if let Some(title) = title {
            task.title = title.to_string();
        }
        if let Some(description) = description {
            task.description = Some(description.to_string());
        }
        task.updated_at = Some(Utc::now());
        Ok(task.clone())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn create_conversation(&self, user_id: &str) -> Result<Conversation> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let conversation = Conversation {
            id: inner.next_conversation_id,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        inner.next_conversation_id += 1;
        inner.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn touch_conversation(
        &self,
        user_id: &str,
        conversation_id: i64,
    ) -> Result<Conversation> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id && c.user_id == user_id)
            .ok_or(StoreError::ConversationNotFound(conversation_id))?;
        conversation.updated_at = Utc::now();
        Ok(conversation.clone())
    }

    async fn get_conversation(
        &self,
        user_id: &str,
        conversation_id: i64,
    ) -> Result<Conversation> {
        let inner = self.inner.read().await;
        inner
            .conversations
            .iter()
            .find(|c| c.id == conversation_id && c.user_id == user_id)
            .cloned()
            .ok_or(StoreError::ConversationNotFound(conversation_id))
    }

    async fn list_conversations(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        Ok(conversations)
    }

    async fn append_message(
        &self,
        conversation_id: i64,
        user_id: &str,
        role: Role,
        content: &str,
    ) -> Result<MessageRecord> {
        let mut inner = self.inner.write().await;
        let message = MessageRecord {
            id: inner.next_message_id,
            conversation_id,
            user_id: user_id.to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        inner.next_message_id += 1;
        inner.messages.push(message.clone());
        Ok(message)
    }

    async fn history(
        &self,
        user_id: &str,
        conversation_id: i64,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<MessageRecord>> {
        let inner = self.inner.read().await;
        let mut messages: Vec<MessageRecord> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id && m.user_id == user_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages.into_iter().skip(offset).take(limit).collect())
    }

    async fn record_tool_call(
        &self,
        message_id: i64,
        tool_name: &str,
        arguments: serde_json::Value,
        result: serde_json::Value,
    ) -> Result<ToolCallRecord> {
        let mut inner = self.inner.write().await;
        let record = ToolCallRecord {
            id: inner.next_tool_call_id,
            message_id,
            tool_name: tool_name.to_string(),
            arguments,
            result,
            created_at: Utc::now(),
        };
        inner.next_tool_call_id += 1;
        inner.tool_calls.push(record.clone());
        Ok(record)
    }

    async fn tool_calls_for_message(&self, message_id: i64) -> Result<Vec<ToolCallRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .tool_calls
            .iter()
            .filter(|c| c.message_id == message_id)
            .cloned()
            .collect())
    }
}
