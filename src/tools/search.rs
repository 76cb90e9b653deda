//! Semantic search over table schemas and worked SQL examples.
//!
//! The agent calls `search_schema` before writing SQL. Two collections are
//! consulted through the external [`VectorSearch`] collaborator: table
//! schema documents (always returned, diversity-ranked by the backend) and
//! question/SQL examples (kept only when their distance is at most
//! `qa_min_score`; lower means closer).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;

use super::{Tool, ToolContext, ToolOutput};

const DEFAULT_K: usize = 5;
const DEFAULT_QA_MIN_SCORE: f64 = 0.5;

/// A table description stored in the schema collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDoc {
    pub table_name: String,
    pub display_name: String,
    pub structure: String,
}

/// A worked example stored in the example collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleDoc {
    /// The natural-language scenario the SQL answers
    pub scenario: String,
    pub remark: String,
    pub sql: String,
}

/// Vector similarity search service.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Up to `k` schema documents relevant to `query`.
    async fn search_schema(&self, query: &str, k: usize) -> Result<Vec<SchemaDoc>>;

    /// Up to `k` examples with their distance score (lower is closer).
    async fn search_examples(&self, query: &str, k: usize) -> Result<Vec<(ExampleDoc, f64)>>;
}

/// Search tool exposed to the model as `search_schema`.
pub struct SemanticSearchTool {
    index: Arc<dyn VectorSearch>,
}

impl SemanticSearchTool {
    pub fn new(index: Arc<dyn VectorSearch>) -> Self {
        Self { index }
    }
}

fn format_schema(docs: &[SchemaDoc]) -> String {
    docs.iter()
        .map(|d| {
            format!(
                "Table: {}\nDisplay name: {}\nStructure: {}\n",
                d.table_name, d.display_name, d.structure
            )
        })
        .collect()
}

fn format_examples(docs: &[(ExampleDoc, f64)], max_score: f64) -> String {
    docs.iter()
        .filter(|(_, score)| *score <= max_score)
        .map(|(d, _)| {
            format!(
                "Scenario: {}\nRemark: {}\nSQL: {}\n",
                d.scenario, d.remark, d.sql
            )
        })
        .collect()
}

#[async_trait]
impl Tool for SemanticSearchTool {
    fn name(&self) -> &str {
        "search_schema"
    }

    fn description(&self) -> &str {
        "Semantic search over table schemas and worked question/SQL examples. Use it whenever \
         you need to know which tables and columns hold the data, before writing SQL. \
         Returns {schema_result, qa_result}."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question or keywords to search for"
                },
                "k": {
                    "type": "integer",
                    "description": "Number of documents to fetch from each collection (default 5)"
                },
                "qa_min_score": {
                    "type": "number",
                    "description": "Maximum distance for examples; lower is more relevant (default 0.5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let Some(query) = args.get("query").and_then(Value::as_str) else {
            return Ok(ToolOutput::error("missing required argument 'query'"));
        };
        let k = args
            .get("k")
            .and_then(Value::as_u64)
            .map(|k| k.max(1) as usize)
            .unwrap_or(DEFAULT_K);
        let qa_min_score = args
            .get("qa_min_score")
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_QA_MIN_SCORE);

        let schema = self.index.search_schema(query, k).await?;
        let examples = self.index.search_examples(query, k).await?;
        debug!(
            schema_docs = schema.len(),
            example_docs = examples.len(),
            k,
            "Vector search finished"
        );

        Ok(ToolOutput::json(&json!({
            "qa_result": format_examples(&examples, qa_min_score),
            "schema_result": format_schema(&schema),
        })))
    }
}
