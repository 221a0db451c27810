use taskchat_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid value for parameter '{parameter}': {message}")]
    InvalidParameterValue { parameter: String, message: String },

    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Conversation {0} not found")]
    ConversationNotFound(i64),

    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Tool iteration budget exhausted after {0} iterations")]
    IterationBudgetExhausted(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<StoreError> for AgentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::TaskNotFound(id) => AgentError::TaskNotFound(id),
            StoreError::ConversationNotFound(id) => AgentError::ConversationNotFound(id),
        }
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;
