//! The tool execution boundary.
//!
//! Validates arguments against the declared parameter contract, dispatches
//! to the handler with the caller identity supplied out-of-band, and
//! normalizes every outcome into a [`ToolResult`] envelope. A tool failure
//! never escapes as an error; the orchestration loop always continues.

use crate::catalog::{ParamSpec, ParamType, ToolCatalog};
use crate::error::AgentError;
use crate::types::{ArgValue, ToolArgs, ToolReply, ToolResult};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ToolExecutor {
    catalog: Arc<ToolCatalog>,
}

impl ToolExecutor {
    pub fn new(catalog: Arc<ToolCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    /// Invoke a tool on behalf of `user_id`. Any `user_id` key in the raw
    /// argument set is discarded — the caller identity travels out-of-band,
    /// so a model backend can never act as another user.
    pub async fn invoke(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        user_id: &str,
    ) -> ToolResult {
        debug!(tool = tool_name, user = user_id, "invoking tool");
        match self.try_invoke(tool_name, arguments, user_id).await {
            Ok(reply) => ToolResult::success(reply),
            Err(err) => {
                warn!(tool = tool_name, error = %err, "tool invocation failed");
                ToolResult::failure(&err)
            }
        }
    }

    async fn try_invoke(
        &self,
        tool_name: &str,
        arguments: &Map<String, Value>,
        user_id: &str,
    ) -> Result<ToolReply, AgentError> {
        let spec = self.catalog.get(tool_name)?;
        let args = validate_arguments(&spec.parameters, arguments)?;
        spec.handler.call(&args, user_id).await
    }
}

/// Check the raw arguments against the declared parameters, producing the
/// typed argument set. Blank strings are equivalent to absent values;
/// undeclared arguments are ignored.
fn validate_arguments(
    parameters: &[ParamSpec],
    raw: &Map<String, Value>,
) -> Result<ToolArgs, AgentError> {
    let mut args = ToolArgs::new();
    for param in parameters {
        let coerced = match raw.get(&param.name) {
            None | Some(Value::Null) => None,
            Some(value) => coerce(param, value)?,
        };
        match coerced {
            Some(value) => args.insert(&param.name, value),
            None if param.required => {
                return Err(AgentError::MissingParameter(param.name.clone()));
            }
            None => {}
        }
    }
    Ok(args)
}

fn coerce(param: &ParamSpec, value: &Value) -> Result<Option<ArgValue>, AgentError> {
    match param.ty {
        ParamType::String => match value {
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(ArgValue::Str(trimmed.to_string())))
                }
            }
            other => Err(invalid(param, "string", other)),
        },
        ParamType::Integer => match value {
            Value::Number(n) => n
                .as_i64()
                .map(|n| Some(ArgValue::Int(n)))
                .ok_or_else(|| invalid(param, "integer", value)),
            // Model backends routinely send numeric ids as strings.
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(|n| Some(ArgValue::Int(n)))
                .map_err(|_| invalid(param, "integer", value)),
            other => Err(invalid(param, "integer", other)),
        },
        ParamType::Boolean => match value {
            Value::Bool(b) => Ok(Some(ArgValue::Bool(*b))),
            other => Err(invalid(param, "boolean", other)),
        },
    }
}

fn invalid(param: &ParamSpec, expected: &str, got: &Value) -> AgentError {
    AgentError::InvalidParameterValue {
        parameter: param.name.clone(),
        message: format!("expected {}, got {}", expected, json_type_name(got)),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
