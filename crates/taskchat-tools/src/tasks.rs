//! The five task-management tools.
//!
//! Each handler is the only code path that touches the task store for its
//! operation, and every store call carries the caller's user id — a lookup
//! by task id alone never happens here.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use taskchat_core::catalog::{ParamSpec, ParamType, ToolHandler, ToolSpec};
use taskchat_core::error::AgentError;
use taskchat_core::types::{ToolArgs, ToolReply};
use taskchat_store::{Task, TaskFilter, TaskStore};
use tracing::info;

// ── add_task ───────────────────────────────────────────────────────────

struct AddTaskTool {
    store: Arc<dyn TaskStore>,
}

#[async_trait]
impl ToolHandler for AddTaskTool {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError> {
        let title = args.str("title")?;
        let description = args.opt_str("description");

        let task = self.store.create_task(user_id, title, description).await?;
        info!(task_id = task.id, user = user_id, "task created");

        Ok(ToolReply::new("created")
            .field("task_id", task.id)
            .field("title", task.title.clone())
            .message(format!(
                "Task '{}' created successfully! (ID: {})",
                task.title, task.id
            )))
    }
}

pub fn add_task(store: Arc<dyn TaskStore>) -> ToolSpec {
    ToolSpec::new(
        "add_task",
        "Create a new task for the user. Use this when the user wants to add, \
         create, or remember something as a task.",
        vec![
            ParamSpec::required(
                "title",
                ParamType::String,
                "The title or name of the task to create",
            ),
            ParamSpec::optional(
                "description",
                ParamType::String,
                "Optional description with more details about the task",
            ),
        ],
        Arc::new(AddTaskTool { store }),
    )
}

// ── list_tasks ─────────────────────────────────────────────────────────

struct ListTasksTool {
    store: Arc<dyn TaskStore>,
}

#[async_trait]
impl ToolHandler for ListTasksTool {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError> {
        let status = args.opt_str("status").unwrap_or("all").to_lowercase();
        let filter = match status.as_str() {
            "all" => TaskFilter::All,
            "pending" => TaskFilter::Pending,
            "completed" => TaskFilter::Completed,
            other => {
                return Err(AgentError::InvalidParameterValue {
                    parameter: "status".into(),
                    message: format!("must be 'all', 'pending', or 'completed', got '{other}'"),
                })
            }
        };

        let tasks = self.store.list_tasks(user_id, filter).await?;
        info!(count = tasks.len(), user = user_id, "tasks listed");

        let items: Vec<Value> = tasks.iter().map(task_json).collect();
        Ok(ToolReply::new("success")
            .field("tasks", Value::Array(items))
            .field("count", tasks.len() as i64)
            .field("filter", filter.as_str()))
    }
}

fn task_json(task: &Task) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at.to_rfc3339(),
    })
}

pub fn list_tasks(store: Arc<dyn TaskStore>) -> ToolSpec {
    ToolSpec::new(
        "list_tasks",
        "List the user's tasks. Use this when the user wants to see, view, \
         show, or check their tasks.",
        vec![ParamSpec::optional(
            "status",
            ParamType::String,
            "Filter tasks by status: 'all' (default), 'pending' (incomplete), \
             or 'completed' (done)",
        )],
        Arc::new(ListTasksTool { store }),
    )
}

// ── complete_task ──────────────────────────────────────────────────────

struct CompleteTaskTool {
    store: Arc<dyn TaskStore>,
}

#[async_trait]
impl ToolHandler for CompleteTaskTool {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError> {
        let task_id = args.int("task_id")?;

        let task = self.store.complete_task(user_id, task_id).await?;
        info!(task_id, user = user_id, "task completed");

        Ok(ToolReply::new("completed")
            .field("task_id", task.id)
            .field("title", task.title.clone())
            .field("completed", true)
            .message(format!(
                "Task '{}' marked as complete! Great job!",
                task.title
            )))
    }
}

pub fn complete_task(store: Arc<dyn TaskStore>) -> ToolSpec {
    ToolSpec::new(
        "complete_task",
        "Mark a task as completed. Use this when the user says they finished, \
         completed, or done with a task.",
        vec![ParamSpec::required(
            "task_id",
            ParamType::Integer,
            "The ID number of the task to mark as complete",
        )],
        Arc::new(CompleteTaskTool { store }),
    )
}

// ── delete_task ────────────────────────────────────────────────────────

struct DeleteTaskTool {
    store: Arc<dyn TaskStore>,
}

#[async_trait]
impl ToolHandler for DeleteTaskTool {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError> {
        let task_id = args.int("task_id")?;

        // The store hands back the task as it was, so the title survives
        // the deletion for the confirmation message.
        let task = self.store.delete_task(user_id, task_id).await?;
        info!(task_id, user = user_id, "task deleted");

        Ok(ToolReply::new("deleted")
            .field("task_id", task.id)
            .field("title", task.title.clone())
            .message(format!("Task '{}' has been deleted.", task.title)))
    }
}

pub fn delete_task(store: Arc<dyn TaskStore>) -> ToolSpec {
    ToolSpec::new(
        "delete_task",
        "Delete a task permanently. Use this when the user wants to remove, \
         delete, or cancel a task.",
        vec![ParamSpec::required(
            "task_id",
            ParamType::Integer,
            "The ID number of the task to delete",
        )],
        Arc::new(DeleteTaskTool { store }),
    )
}

// ── update_task ────────────────────────────────────────────────────────

struct UpdateTaskTool {
    store: Arc<dyn TaskStore>,
}

#[async_trait]
impl ToolHandler for UpdateTaskTool {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError> {
        let task_id = args.int("task_id")?;
        let title = args.opt_str("title");
        let description = args.opt_str("description");

        if title.is_none() && description.is_none() {
            return Err(AgentError::MissingParameter("title or description".into()));
        }

        let task = self
            .store
            .update_task(user_id, task_id, title, description)
            .await?;
        info!(task_id, user = user_id, "task updated");

        Ok(ToolReply::new("updated")
            .field("task_id", task.id)
            .field("title", task.title.clone())
            .message(format!("Task updated to '{}'.", task.title)))
    }
}

pub fn update_task(store: Arc<dyn TaskStore>) -> ToolSpec {
    ToolSpec::new(
        "update_task",
        "Update a task's title or description. Use this when the user wants \
         to change, edit, rename, or modify a task.",
        vec![
            ParamSpec::required(
                "task_id",
                ParamType::Integer,
                "The ID number of the task to update",
            ),
            ParamSpec::optional("title", ParamType::String, "The new title for the task"),
            ParamSpec::optional(
                "description",
                ParamType::String,
                "The new description for the task",
            ),
        ],
        Arc::new(UpdateTaskTool { store }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use taskchat_core::catalog::ToolCatalog;
    use taskchat_core::executor::ToolExecutor;
    use taskchat_store::MemoryStore;

    fn executor() -> (ToolExecutor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let mut catalog = ToolCatalog::new();
        crate::register_all(&mut catalog, store.clone()).unwrap();
        (ToolExecutor::new(Arc::new(catalog)), store)
    }

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn test_add_task_returns_id_and_title() {
        let (executor, _store) = executor();
        let result = executor
            .invoke("add_task", &args(json!({"title": "buy milk"})), "alice")
            .await;
        assert_eq!(result.status, "created");
        assert_eq!(result.fields["task_id"], 1);
        assert_eq!(result.fields["title"], "buy milk");
        assert_eq!(
            result.message.as_deref(),
            Some("Task 'buy milk' created successfully! (ID: 1)")
        );
    }

    #[tokio::test]
    async fn test_add_task_requires_title() {
        let (executor, _store) = executor();
        let result = executor.invoke("add_task", &Map::new(), "alice").await;
        assert!(result.is_failure());
        assert_eq!(
            result.error.as_deref(),
            Some("Missing required parameter: title")
        );
    }

    #[tokio::test]
    async fn test_list_tasks_filters_and_orders() {
        let (executor, _store) = executor();
        for title in ["First", "Second", "Third"] {
            executor
                .invoke("add_task", &args(json!({"title": title})), "alice")
                .await;
        }
        executor
            .invoke("complete_task", &args(json!({"task_id": 2})), "alice")
            .await;

        let all = executor
            .invoke("list_tasks", &args(json!({"status": "all"})), "alice")
            .await;
        assert_eq!(all.fields["count"], 3);
        let titles: Vec<&str> = all.fields["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);

        let pending = executor
            .invoke("list_tasks", &args(json!({"status": "pending"})), "alice")
            .await;
        assert_eq!(pending.fields["count"], 2);
        for task in pending.fields["tasks"].as_array().unwrap() {
            assert_eq!(task["completed"], false);
        }

        let completed = executor
            .invoke("list_tasks", &args(json!({"status": "completed"})), "alice")
            .await;
        assert_eq!(completed.fields["count"], 1);
        assert_eq!(completed.fields["tasks"][0]["title"], "Second");
    }

    #[tokio::test]
    async fn test_list_tasks_rejects_bad_status() {
        let (executor, _store) = executor();
        let result = executor
            .invoke("list_tasks", &args(json!({"status": "bogus"})), "alice")
            .await;
        assert!(result.is_failure());
        assert!(result.error.as_deref().unwrap().contains("status"));
    }

    #[tokio::test]
    async fn test_list_tasks_defaults_to_all_and_lowercases() {
        let (executor, _store) = executor();
        executor
            .invoke("add_task", &args(json!({"title": "One"})), "alice")
            .await;

        let default = executor.invoke("list_tasks", &Map::new(), "alice").await;
        assert_eq!(default.fields["filter"], "all");

        let upper = executor
            .invoke("list_tasks", &args(json!({"status": "PENDING"})), "alice")
            .await;
        assert_eq!(upper.status, "success");
        assert_eq!(upper.fields["filter"], "pending");
    }

    #[tokio::test]
    async fn test_cross_user_access_always_fails() {
        let (executor, _store) = executor();
        executor
            .invoke("add_task", &args(json!({"title": "Private"})), "alice")
            .await;

        for tool in ["complete_task", "delete_task"] {
            let result = executor
                .invoke(tool, &args(json!({"task_id": 1})), "bob")
                .await;
            assert!(result.is_failure(), "{tool} must not cross users");
            assert_eq!(result.error.as_deref(), Some("Task 1 not found"));
        }
        let result = executor
            .invoke(
                "update_task",
                &args(json!({"task_id": 1, "title": "Stolen"})),
                "bob",
            )
            .await;
        assert!(result.is_failure());

        // Alice's task is untouched.
        let list = executor.invoke("list_tasks", &Map::new(), "alice").await;
        assert_eq!(list.fields["tasks"][0]["title"], "Private");
        assert_eq!(list.fields["tasks"][0]["completed"], false);
    }

    #[tokio::test]
    async fn test_complete_task_is_idempotent() {
        let (executor, _store) = executor();
        executor
            .invoke("add_task", &args(json!({"title": "Ship"})), "alice")
            .await;

        let first = executor
            .invoke("complete_task", &args(json!({"task_id": 1})), "alice")
            .await;
        let second = executor
            .invoke("complete_task", &args(json!({"task_id": 1})), "alice")
            .await;
        assert_eq!(first.status, "completed");
        assert_eq!(second.status, "completed");
        assert_eq!(first.fields["completed"], true);
        assert_eq!(second.fields["completed"], true);
    }

    #[tokio::test]
    async fn test_delete_task_reports_title() {
        let (executor, _store) = executor();
        executor
            .invoke("add_task", &args(json!({"title": "Ephemeral"})), "alice")
            .await;

        let result = executor
            .invoke("delete_task", &args(json!({"task_id": 1})), "alice")
            .await;
        assert_eq!(result.status, "deleted");
        assert_eq!(result.fields["title"], "Ephemeral");
        assert_eq!(
            result.message.as_deref(),
            Some("Task 'Ephemeral' has been deleted.")
        );
    }

    #[tokio::test]
    async fn test_update_task_needs_some_field() {
        let (executor, _store) = executor();
        executor
            .invoke("add_task", &args(json!({"title": "Old"})), "alice")
            .await;

        let result = executor
            .invoke("update_task", &args(json!({"task_id": 1})), "alice")
            .await;
        assert!(result.is_failure());
        assert_eq!(
            result.error.as_deref(),
            Some("Missing required parameter: title or description")
        );

        let renamed = executor
            .invoke(
                "update_task",
                &args(json!({"task_id": 1, "title": "New"})),
                "alice",
            )
            .await;
        assert_eq!(renamed.status, "updated");
        assert_eq!(renamed.fields["title"], "New");
        assert_eq!(renamed.message.as_deref(), Some("Task updated to 'New'."));
    }

    #[tokio::test]
    async fn test_missing_required_parameter_for_each_tool() {
        let (executor, _store) = executor();
        for (tool, parameter) in [
            ("add_task", "title"),
            ("complete_task", "task_id"),
            ("delete_task", "task_id"),
        ] {
            let result = executor.invoke(tool, &Map::new(), "alice").await;
            assert!(result.is_failure(), "{tool} should fail");
            assert_eq!(
                result.error.as_deref(),
                Some(format!("Missing required parameter: {parameter}").as_str())
            );
        }
    }
}
