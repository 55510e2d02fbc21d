use async_trait::async_trait;
use futures::FutureExt;
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use super::tool::Tool;
use crate::errors::{AgentError, AgentResult, ToolError, ToolOutcome};
use crate::models::tool::{ToolCall, ToolMetadata, ToolResult};

/// Core trait of a toolbox: what it offers and how to run a requested call
#[async_trait]
pub trait Toolbox: Send + Sync {
    /// Metadata of every tool, in registration order
    fn tools(&self) -> Vec<ToolMetadata>;

    /// Execute one tool call
    async fn execute(&self, call: &ToolCall) -> ToolOutcome<ToolResult>;
}

#[async_trait]
impl<T: Toolbox + ?Sized> Toolbox for Arc<T> {
    fn tools(&self) -> Vec<ToolMetadata> {
        (**self).tools()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome<ToolResult> {
        (**self).execute(call).await
    }
}

struct Registered {
    tool: Arc<dyn Tool>,
    validator: Option<Validator>,
}

/// A toolbox built once at startup. Lookups take no locks.
pub struct ToolRegistry {
    tools: Vec<Registered>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Register `tools`, compiling each parameter schema. Duplicate names and schemas that
    /// do not compile are rejected.
    pub fn new<I>(tools: I) -> AgentResult<Self>
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        let mut registered = Vec::new();
        let mut index = HashMap::new();

        for tool in tools {
            let metadata = tool.metadata();
            if index.contains_key(&metadata.name) {
                return Err(AgentError::InvalidToolbox(format!(
                    "Duplicate tool name: {}",
                    metadata.name
                )));
            }
            let validator = match &metadata.parameters {
                Value::Null => None,
                schema => Some(Validator::new(schema).map_err(|e| {
                    AgentError::InvalidToolbox(format!(
                        "Invalid parameter schema for {}: {}",
                        metadata.name, e
                    ))
                })?),
            };
            index.insert(metadata.name.clone(), registered.len());
            registered.push(Registered { tool, validator });
        }

        Ok(Self {
            tools: registered,
            index,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i].tool)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn validate(name: &str, validator: &Validator, arguments: &Value) -> ToolOutcome<()> {
    if validator.is_valid(arguments) {
        return Ok(());
    }
    let reasons: Vec<String> = validator
        .iter_errors(arguments)
        .map(|e| e.to_string())
        .collect();
    Err(ToolError::InvalidArguments {
        tool: name.to_string(),
        reason: reasons.join("; "),
    })
}

#[async_trait]
impl Toolbox for ToolRegistry {
    fn tools(&self) -> Vec<ToolMetadata> {
        self.tools
            .iter()
            .map(|registered| registered.tool.metadata().clone())
            .collect()
    }

    async fn execute(&self, call: &ToolCall) -> ToolOutcome<ToolResult> {
        let registered = self
            .index
            .get(&call.name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        if let Some(validator) = &registered.validator {
            validate(&call.name, validator, &call.arguments)?;
        }

        tracing::debug!(tool = %call.name, id = %call.id, "executing tool");
        let outcome = AssertUnwindSafe(registered.tool.call(call.arguments.clone()))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(output)) => Ok(ToolResult::success(call, output)),
            Ok(Err(err)) => Err(ToolError::Execution {
                tool: call.name.clone(),
                message: format!("{:#}", err),
            }),
            Err(_) => Err(ToolError::Execution {
                tool: call.name.clone(),
                message: "tool panicked".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolbox::FunctionTool;
    use serde_json::json;

    fn echo() -> Arc<dyn Tool> {
        Arc::new(FunctionTool::sync(
            ToolMetadata::new(
                "echo",
                "Echoes back the input",
                json!({
                    "type": "object",
                    "properties": {"message": {"type": "string"}},
                    "required": ["message"]
                }),
            ),
            |args| Ok(args["message"].clone()),
        ))
    }

    fn failing() -> Arc<dyn Tool> {
        Arc::new(FunctionTool::sync(
            ToolMetadata::new("fail", "Always fails", json!({"type": "object"})),
            |_| Err(anyhow::anyhow!("backend unavailable")),
        ))
    }

    fn panicking() -> Arc<dyn Tool> {
        Arc::new(FunctionTool::sync(
            ToolMetadata::new("panic", "Always panics", Value::Null),
            |_| panic!("unreachable state"),
        ))
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![echo(), failing(), panicking()]).unwrap()
    }

    #[tokio::test]
    async fn test_execute_success() {
        let call = ToolCall::new("1", "echo", json!({"message": "hello world"}));
        let result = registry().execute(&call).await.unwrap();
        assert_eq!(result.call_id, "1");
        assert_eq!(result.output, json!("hello world"));
        assert!(!result.is_error);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let call = ToolCall::new("1", "weather", json!({}));
        let err = registry().execute(&call).await.unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("weather".into()));
    }

    #[tokio::test]
    async fn test_arguments_violating_schema() {
        let call = ToolCall::new("1", "echo", json!({"message": 42}));
        let err = registry().execute(&call).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments { ref tool, .. } if tool == "echo"));

        let call = ToolCall::new("2", "echo", json!({}));
        let err = registry().execute(&call).await.unwrap_err();
        assert!(err.to_string().contains("message"));
    }

    #[tokio::test]
    async fn test_execution_failure_and_panic_are_captured() {
        let toolbox = registry();

        let err = toolbox
            .execute(&ToolCall::new("1", "fail", json!({})))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolError::Execution {
                tool: "fail".into(),
                message: "backend unavailable".into()
            }
        );

        let err = toolbox
            .execute(&ToolCall::new("2", "panic", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Execution { .. }));
    }

    #[test]
    fn test_tools_keep_registration_order() {
        let names: Vec<_> = registry().tools().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["echo", "fail", "panic"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = ToolRegistry::new(vec![echo(), echo()]).err().unwrap();
        assert_eq!(
            err,
            AgentError::InvalidToolbox("Duplicate tool name: echo".into())
        );
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let broken: Arc<dyn Tool> = Arc::new(FunctionTool::sync(
            ToolMetadata::new("broken", "Bad schema", json!({"type": 12})),
            |_| Ok(Value::Null),
        ));
        assert!(matches!(
            ToolRegistry::new(vec![broken]),
            Err(AgentError::InvalidToolbox(_))
        ));
    }
}
