pub mod tasks;

use std::sync::Arc;
use taskchat_core::catalog::ToolCatalog;
use taskchat_core::error::AgentError;
use taskchat_store::TaskStore;

/// Register the five task-management tools. The catalog is sealed after
/// this runs at startup; nothing registers tools mid-session.
pub fn register_all(
    catalog: &mut ToolCatalog,
    store: Arc<dyn TaskStore>,
) -> Result<(), AgentError> {
    catalog.register(tasks::add_task(store.clone()))?;
    catalog.register(tasks::list_tasks(store.clone()))?;
    catalog.register(tasks::complete_task(store.clone()))?;
    catalog.register(tasks::delete_task(store.clone()))?;
    catalog.register(tasks::update_task(store))?;
    Ok(())
}
