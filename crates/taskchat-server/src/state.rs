use std::sync::Arc;
use taskchat_core::backend::ChatBackend;
use taskchat_core::catalog::ToolCatalog;
use taskchat_core::chat::ChatService;
use taskchat_core::config::AppConfig;
use taskchat_core::error::AgentError;
use taskchat_core::openai::OpenAiBackend;
use taskchat_store::MemoryStore;

/// Shared application state for the server. Everything is constructed once
/// at startup and handed around by reference; there is no module-level
/// global anywhere.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub chat: Arc<ChatService>,
    pub store: Arc<MemoryStore>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, AgentError> {
        let store = Arc::new(MemoryStore::new());

        let mut catalog = ToolCatalog::new();
        taskchat_tools::register_all(&mut catalog, store.clone())?;
        let catalog = Arc::new(catalog);

        let backend: Option<Arc<dyn ChatBackend>> = if config.backend_configured() {
            tracing::info!(model = %config.provider.model, "model backend enabled");
            Some(Arc::new(OpenAiBackend::new(
                &config.provider,
                config.system_prompt.as_deref(),
            )))
        } else {
            tracing::info!("no model backend configured, using the fallback parser");
            None
        };

        let chat = Arc::new(ChatService::new(
            &config.chat,
            catalog,
            store.clone(),
            backend,
        ));

        Ok(Self {
            config,
            chat,
            store,
        })
    }
}
