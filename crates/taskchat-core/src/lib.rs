pub mod agent_loop;
pub mod backend;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod error;
pub mod executor;
pub mod fallback;
pub mod openai;
pub mod types;

pub use agent_loop::AgentLoop;
pub use backend::{BackendReply, BackendRequest, ChatBackend};
pub use catalog::{ParamSpec, ParamType, ToolCatalog, ToolHandler, ToolSpec};
pub use chat::ChatService;
pub use config::AppConfig;
pub use error::AgentError;
pub use executor::ToolExecutor;
pub use fallback::IntentParser;
pub use openai::OpenAiBackend;
