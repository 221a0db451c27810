use crate::error::AgentError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use taskchat_store::Role;

/// A tool invocation requested by the model backend or the fallback parser.
/// Transient; never persisted as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// A validated argument value, tagged with its declared parameter type.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ArgValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            ArgValue::Str(s) => Value::String(s.clone()),
            ArgValue::Int(n) => Value::from(*n),
            ArgValue::Bool(b) => Value::Bool(*b),
        }
    }
}

/// The validated argument set a handler receives. Only declared parameters
/// that passed type checking are present.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs(BTreeMap<String, ArgValue>);

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.0.get(name)
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_str)
    }

    pub fn opt_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    /// Fetch a string parameter the tool declared required. The executor
    /// guarantees presence, so a miss here is a catalog/handler mismatch.
    pub fn str(&self, name: &str) -> Result<&str, AgentError> {
        self.opt_str(name)
            .ok_or_else(|| AgentError::MissingParameter(name.to_string()))
    }

    pub fn int(&self, name: &str) -> Result<i64, AgentError> {
        self.opt_int(name)
            .ok_or_else(|| AgentError::MissingParameter(name.to_string()))
    }
}

/// What a handler returns on success: an operation-specific status, extra
/// result fields, and an optional human-readable confirmation.
#[derive(Debug, Clone)]
pub struct ToolReply {
    pub status: String,
    pub fields: Map<String, Value>,
    pub message: Option<String>,
}

impl ToolReply {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            fields: Map::new(),
            message: None,
        }
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// The uniform envelope every tool invocation produces, regardless of which
/// path (model-driven or fallback) invoked it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub message: Option<String>,
}

impl ToolResult {
    pub fn success(reply: ToolReply) -> Self {
        Self {
            status: reply.status,
            fields: reply.fields,
            error: None,
            message: reply.message,
        }
    }

    pub fn failure(err: &AgentError) -> Self {
        let message = match err {
            AgentError::TaskNotFound(id) => Some(format!(
                "Task {id} not found. Use 'show my tasks' to see available tasks."
            )),
            _ => None,
        };
        Self {
            status: "failed".into(),
            fields: Map::new(),
            error: Some(err.to_string()),
            message,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == "failed"
    }

    /// JSON form used for audit records.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Audit triple for one executed tool invocation.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutedToolCall {
    pub tool_name: String,
    pub arguments: Value,
    pub result: ToolResult,
}

/// Why an orchestrated turn stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The backend produced a final text response.
    Stop,
    /// The iteration budget ran out before a final response arrived.
    MaxIterations,
}

/// Outcome of one orchestrated chat turn.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub response: String,
    pub tool_calls: Vec<ExecutedToolCall>,
    pub finish_reason: FinishReason,
}

/// A prior conversation turn as presented to the model backend.
#[derive(Debug, Clone)]
pub struct HistoryMessage {
    pub role: Role,
    pub content: String,
}

impl From<&taskchat_store::MessageRecord> for HistoryMessage {
    fn from(record: &taskchat_store::MessageRecord) -> Self {
        Self {
            role: record.role,
            content: record.content.clone(),
        }
    }
}

/// Caller-facing reply from the chat coordinator.
#[derive(Debug, Clone, Serialize)]
pub struct ChatReply {
    pub conversation_id: i64,
    pub response: String,
    pub tool_calls: Vec<ExecutedToolCall>,
}
