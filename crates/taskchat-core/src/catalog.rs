use crate::error::AgentError;
use crate::types::{ToolArgs, ToolReply};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// Primitive types a tool parameter may declare. Anything else is rejected
/// at registration time by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

/// Declaration of a single tool parameter.
#[derive(Debug, Clone, Serialize)]
pub struct ParamSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(name: impl Into<String>, ty: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            required: false,
            description: description.into(),
        }
    }
}

/// Trait implemented by every tool handler. Handlers are the only code path
/// allowed to touch the task store, and receive the caller identity
/// out-of-band — it never travels in the argument set.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: &ToolArgs, user_id: &str) -> Result<ToolReply, AgentError>;
}

/// A registered tool: name, description, parameter contract, handler.
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
    pub handler: Arc<dyn ToolHandler>,
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl ToolSpec {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParamSpec>,
        handler: Arc<dyn ToolHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
        }
    }
}

/// Registry of tools, the single source of truth for what operations exist.
/// Immutable once startup registration completes; safe for unsynchronized
/// concurrent reads after that.
pub struct ToolCatalog {
    tools: Vec<Arc<ToolSpec>>,
    index: HashMap<String, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn register(&mut self, spec: ToolSpec) -> Result<(), AgentError> {
        if self.index.contains_key(&spec.name) {
            return Err(AgentError::DuplicateTool(spec.name));
        }
        tracing::debug!("Registered tool: {}", spec.name);
        self.index.insert(spec.name.clone(), self.tools.len());
        self.tools.push(Arc::new(spec));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&Arc<ToolSpec>, AgentError> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// All specs, in registration order.
    pub fn list(&self) -> &[Arc<ToolSpec>] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Human-readable tool documentation for embedding in a system prompt.
    pub fn describe(&self) -> String {
        let mut out = String::from("Available Tools:\n");
        for tool in &self.tools {
            let _ = write!(out, "\n- {}: {}\n", tool.name, tool.description);
            out.push_str("  Parameters:\n");
            for param in &tool.parameters {
                let required = if param.required { "required" } else { "optional" };
                let _ = write!(
                    out,
                    "    - {} ({}, {}): {}\n",
                    param.name,
                    param.ty.as_str(),
                    required,
                    param.description
                );
            }
        }
        out
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}
