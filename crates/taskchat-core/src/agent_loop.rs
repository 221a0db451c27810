//! The model-backed orchestration loop.
//!
//! Drives a bounded tool-calling exchange: send context to the backend,
//! execute any requested tools, feed the results back, repeat until the
//! backend produces a final text response or the iteration budget runs out.

use crate::backend::{BackendReply, BackendRequest, ChatBackend};
use crate::catalog::ToolCatalog;
use crate::error::AgentError;
use crate::executor::ToolExecutor;
use crate::types::{AgentOutcome, ExecutedToolCall, FinishReason, HistoryMessage};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reply used when the iteration budget runs out before a final response.
const BUDGET_EXHAUSTED_REPLY: &str = "I couldn't complete your request. Please try again.";

pub struct AgentLoop {
    backend: Arc<dyn ChatBackend>,
    executor: Arc<ToolExecutor>,
    catalog: Arc<ToolCatalog>,
    max_iterations: usize,
}

impl AgentLoop {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        executor: Arc<ToolExecutor>,
        catalog: Arc<ToolCatalog>,
        max_iterations: usize,
    ) -> Self {
        Self {
            backend,
            executor,
            catalog,
            max_iterations,
        }
    }

    /// Run one chat turn for `user_id`. Backend failures propagate without
    /// retry; tool failures are already absorbed into their results and the
    /// loop continues.
    pub async fn run(
        &self,
        user_id: &str,
        message: &str,
        history: &[HistoryMessage],
    ) -> Result<AgentOutcome, AgentError> {
        let mut executed: Vec<ExecutedToolCall> = Vec::new();
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;
            debug!(iteration = iterations, "agent loop iteration");

            let reply = self
                .backend
                .respond(BackendRequest {
                    message,
                    history,
                    catalog: &self.catalog,
                    tool_results: &executed,
                })
                .await?;

            match reply {
                BackendReply::ToolRequests(requests) if !requests.is_empty() => {
                    for request in requests {
                        let result = self
                            .executor
                            .invoke(&request.name, &request.arguments, user_id)
                            .await;
                        executed.push(ExecutedToolCall {
                            tool_name: request.name,
                            arguments: Value::Object(request.arguments),
                            result,
                        });
                    }
                    // Loop back so the backend can process the results.
                }
                // A zero-entry invocation list is the same as empty final text.
                BackendReply::ToolRequests(_) => {
                    return Ok(AgentOutcome {
                        response: String::new(),
                        tool_calls: executed,
                        finish_reason: FinishReason::Stop,
                    });
                }
                BackendReply::Final(text) => {
                    return Ok(AgentOutcome {
                        response: text,
                        tool_calls: executed,
                        finish_reason: FinishReason::Stop,
                    });
                }
            }
        }

        warn!(
            max_iterations = self.max_iterations,
            "iteration budget exhausted before a final response"
        );
        Ok(AgentOutcome {
            response: BUDGET_EXHAUSTED_REPLY.to_string(),
            tool_calls: executed,
            finish_reason: FinishReason::MaxIterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ParamSpec, ParamType, ToolHandler, ToolSpec};
    use crate::types::{ToolArgs, ToolInvocation, ToolReply};
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use std::sync::Mutex;

    /// Backend that plays back a fixed sequence of replies.
    struct ScriptedBackend {
        replies: Mutex<Vec<Result<BackendReply, AgentError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<BackendReply, AgentError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn respond(&self, _request: BackendRequest<'_>) -> Result<BackendReply, AgentError> {
            *self.calls.lock().unwrap() += 1;
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                // Keep requesting tools forever once the script runs dry.
                Ok(BackendReply::ToolRequests(vec![ToolInvocation::new(
                    "list_all",
                    Map::new(),
                )]))
            } else {
                replies.remove(0)
            }
        }
    }

    struct CountingHandler;

    #[async_trait]
    impl ToolHandler for CountingHandler {
        async fn call(&self, _args: &ToolArgs, _user_id: &str) -> Result<ToolReply, AgentError> {
            Ok(ToolReply::new("success").field("tasks", json!([])).field("count", 0))
        }
    }

    fn harness(backend: ScriptedBackend, max_iterations: usize) -> AgentLoop {
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolSpec::new(
                "list_all",
                "List everything",
                vec![ParamSpec::optional("status", ParamType::String, "Filter")],
                Arc::new(CountingHandler),
            ))
            .unwrap();
        let catalog = Arc::new(catalog);
        let executor = Arc::new(ToolExecutor::new(catalog.clone()));
        AgentLoop::new(Arc::new(backend), executor, catalog, max_iterations)
    }

    fn tool_request(name: &str) -> BackendReply {
        BackendReply::ToolRequests(vec![ToolInvocation::new(name, Map::new())])
    }

    #[tokio::test]
    async fn test_tool_then_final_text() {
        let backend = ScriptedBackend::new(vec![
            Ok(tool_request("list_all")),
            Ok(BackendReply::Final("You have no tasks yet.".into())),
        ]);
        let agent = harness(backend, 5);

        let outcome = agent.run("alice", "show my tasks", &[]).await.unwrap();
        assert_eq!(outcome.response, "You have no tasks yet.");
        assert_eq!(outcome.tool_calls.len(), 1);
        assert_eq!(outcome.tool_calls[0].tool_name, "list_all");
        assert_eq!(outcome.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_iteration_budget_is_enforced() {
        // The scripted backend requests tools on every round.
        let backend = ScriptedBackend::new(vec![]);
        let agent = harness(backend, 5);

        let outcome = agent.run("alice", "loop forever", &[]).await.unwrap();
        assert_eq!(outcome.finish_reason, FinishReason::MaxIterations);
        assert_eq!(outcome.tool_calls.len(), 5);
        assert_eq!(outcome.response, BUDGET_EXHAUSTED_REPLY);
    }

    #[tokio::test]
    async fn test_backend_call_count_never_exceeds_budget() {
        let backend = Arc::new(ScriptedBackend::new(vec![]));
        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolSpec::new(
                "list_all",
                "List everything",
                vec![],
                Arc::new(CountingHandler),
            ))
            .unwrap();
        let catalog = Arc::new(catalog);
        let executor = Arc::new(ToolExecutor::new(catalog.clone()));
        let agent = AgentLoop::new(backend.clone(), executor, catalog, 3);

        let outcome = agent.run("alice", "hi", &[]).await.unwrap();
        assert_eq!(backend.call_count(), 3);
        assert_eq!(outcome.finish_reason, FinishReason::MaxIterations);
    }

    #[tokio::test]
    async fn test_empty_tool_request_list_is_final_empty_text() {
        let backend = ScriptedBackend::new(vec![Ok(BackendReply::ToolRequests(vec![]))]);
        let agent = harness(backend, 5);

        let outcome = agent.run("alice", "hello", &[]).await.unwrap();
        assert_eq!(outcome.response, "");
        assert!(outcome.tool_calls.is_empty());
        assert_eq!(outcome.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let backend = ScriptedBackend::new(vec![Err(AgentError::BackendUnavailable(
            "connection refused".into(),
        ))]);
        let agent = harness(backend, 5);

        let err = agent.run("alice", "hello", &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::BackendUnavailable(_)));
    }

    #[tokio::test]
    async fn test_tool_failure_does_not_abort_loop() {
        let backend = ScriptedBackend::new(vec![
            Ok(tool_request("no_such_tool")),
            Ok(BackendReply::Final("done".into())),
        ]);
        let agent = harness(backend, 5);

        let outcome = agent.run("alice", "hi", &[]).await.unwrap();
        assert_eq!(outcome.response, "done");
        assert!(outcome.tool_calls[0].result.is_failure());
    }
}
