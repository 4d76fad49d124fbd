//! Tool trait, descriptors, and the registry the LLM runtime dispatches
//! through.
//!
//! The binding contract at this boundary: a tool is invoked with a JSON
//! object of named arguments and the runtime gets a plain string back,
//! unconditionally. `ToolRegistry::dispatch` is where every failure mode
//! collapses into text.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::gateway::QueryGateway;

/// Function-calling descriptor in the shape LLM providers expect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub r#type: String,
    pub function: FunctionDescriptor,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn descriptor(&self) -> ToolDescriptor;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let mut descriptors: Vec<ToolDescriptor> =
            self.tools.values().map(|tool| tool.descriptor()).collect();
        descriptors.sort_by(|a, b| a.function.name.cmp(&b.function.name));
        descriptors
    }

    /// Invoke a tool by name. Whatever happens inside, the caller gets a
    /// string it can hand back to the model.
    pub async fn dispatch(&self, name: &str, input: Value) -> String {
        let Some(tool) = self.tools.get(name) else {
            return format!("ERROR: unknown tool `{name}`.");
        };

        match tool.execute(input).await {
            Ok(Value::String(text)) => text,
            Ok(other) => other.to_string(),
            Err(error) => format!("ERROR: tool `{name}` failed: {error:#}"),
        }
    }
}

/// The `execute_warehouse_query` tool: one required string argument,
/// `sql_query`, forwarded verbatim to the gateway.
pub struct WarehouseQueryTool {
    gateway: Arc<QueryGateway>,
}

impl WarehouseQueryTool {
    pub const NAME: &'static str = "execute_warehouse_query";

    pub fn new(gateway: Arc<QueryGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl Tool for WarehouseQueryTool {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            r#type: "function".to_string(),
            function: FunctionDescriptor {
                name: Self::NAME.to_string(),
                description: format!(
                    "Executes a SQL query against the sales warehouse and returns the results. \
                     The query MUST be a SELECT statement. Results are truncated to the first \
                     {} rows. Always include the full table name from the schema context.",
                    self.gateway.max_rows()
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "sql_query": {
                            "type": "string",
                            "description": "The SQL SELECT statement to execute."
                        }
                    },
                    "required": ["sql_query"]
                }),
            },
        }
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let Some(sql) = input.get("sql_query").and_then(Value::as_str) else {
            // A missing argument is still a string result: the model is
            // expected to read it and retry with a corrected call.
            return Ok(Value::String(
                "ERROR: missing required string argument `sql_query`.".to_string(),
            ));
        };

        Ok(Value::String(self.gateway.execute(sql).await))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use salescope_warehouse::{ResultSet, Warehouse, WarehouseError};

    use crate::gateway::{QueryGateway, REJECTION_MESSAGE};

    use super::{Tool, ToolRegistry, WarehouseQueryTool};

    struct StaticWarehouse;

    #[async_trait]
    impl Warehouse for StaticWarehouse {
        async fn select(&self, _sql: &str, _max_rows: usize) -> Result<ResultSet, WarehouseError> {
            Ok(ResultSet {
                columns: vec!["ProductName".to_string(), "SalesRevenue".to_string()],
                rows: vec![vec!["Smartwatch".to_string(), "4000".to_string()]],
            })
        }
    }

    fn registry() -> ToolRegistry {
        let gateway = Arc::new(QueryGateway::new(Arc::new(StaticWarehouse), 50));
        let mut registry = ToolRegistry::default();
        registry.register(WarehouseQueryTool::new(gateway));
        registry
    }

    #[tokio::test]
    async fn dispatch_returns_the_serialized_result_as_plain_text() {
        let registry = registry();

        let result = registry
            .dispatch(
                WarehouseQueryTool::NAME,
                json!({"sql_query": "SELECT ProductName, SalesRevenue FROM monthly_retail_sales"}),
            )
            .await;

        assert_eq!(result, "ProductName,SalesRevenue\nSmartwatch,4000\n");
    }

    #[tokio::test]
    async fn dispatch_surfaces_policy_rejections_as_text() {
        let registry = registry();

        let result = registry
            .dispatch(WarehouseQueryTool::NAME, json!({"sql_query": "DROP TABLE t"}))
            .await;

        assert_eq!(result, REJECTION_MESSAGE);
    }

    #[tokio::test]
    async fn missing_argument_produces_a_correctable_error_string() {
        let registry = registry();

        let result = registry.dispatch(WarehouseQueryTool::NAME, json!({})).await;

        assert!(result.contains("missing required string argument `sql_query`"));
    }

    #[tokio::test]
    async fn unknown_tool_names_do_not_panic() {
        let registry = registry();

        let result = registry.dispatch("does_not_exist", Value::Null).await;

        assert!(result.contains("unknown tool `does_not_exist`"));
    }

    #[test]
    fn descriptor_declares_the_single_required_argument() {
        let gateway = Arc::new(QueryGateway::new(Arc::new(StaticWarehouse), 50));
        let tool = WarehouseQueryTool::new(gateway);
        let descriptor = tool.descriptor();

        assert_eq!(descriptor.r#type, "function");
        assert_eq!(descriptor.function.name, "execute_warehouse_query");
        assert_eq!(descriptor.function.parameters["required"], json!(["sql_query"]));
        assert!(descriptor.function.description.contains("50 rows"));
    }
}
