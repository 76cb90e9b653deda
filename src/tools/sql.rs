//! Read-only SQL tool.
//!
//! Lets the data-query agent run `SELECT` / `SHOW` / `DESCRIBE` statements
//! through an external [`QueryExecutor`]. Anything else is rejected before it
//! reaches the database. The tool answers with a small JSON envelope:
//!
//! | code | meaning                         | result              |
//! |------|---------------------------------|---------------------|
//! | 0    | success                         | array of row objects |
//! | -1   | executor failed                 | error text          |
//! | -2   | statement is not read-only      | rejection text      |

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::error::Result;
use crate::utils::string::preview;

use super::{Tool, ToolContext, ToolOutput};

/// One result row, column name to value.
pub type Row = Map<String, Value>;

/// Relational query executor backing [`SqlQueryTool`].
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a statement and return its rows.
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}

static READ_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(select|show|describe|desc)\b").unwrap());

/// Whether `sql` starts with a read-only verb.
pub fn is_read_only(sql: &str) -> bool {
    READ_ONLY.is_match(sql)
}

/// SQL tool exposed to the model as `query_database`.
pub struct SqlQueryTool {
    executor: Arc<dyn QueryExecutor>,
}

impl SqlQueryTool {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for SqlQueryTool {
    fn name(&self) -> &str {
        "query_database"
    }

    fn description(&self) -> &str {
        "Execute a read-only SQL statement against the business database and return the rows. \
         Only SELECT, SHOW and DESCRIBE are allowed. Returns {code, result}: code 0 = success \
         with rows, -1 = execution failed with the reason, -2 = statement rejected because it \
         would modify data."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The SQL statement to run"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let Some(sql) = args.get("query").and_then(Value::as_str) else {
            return Ok(ToolOutput::error(
                json!({"code": -1, "result": "missing required argument 'query'"}).to_string(),
            ));
        };

        if !is_read_only(sql) {
            warn!(thread_id = ?ctx.thread_id, sql = %preview(sql, 120), "Rejected mutating SQL");
            return Ok(ToolOutput::error(
                json!({"code": -2, "result": "rejected: only read-only statements are allowed"})
                    .to_string(),
            ));
        }

        let start = Instant::now();
        match self.executor.query(sql).await {
            Ok(rows) => {
                info!(
                    rows = rows.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "SQL query finished"
                );
                Ok(ToolOutput::json(&json!({"code": 0, "result": rows})))
            }
            Err(e) => {
                warn!(error = %e, sql = %preview(sql, 120), "SQL query failed");
                Ok(ToolOutput::error(
                    json!({"code": -1, "result": format!("execution failed: {}", e)}).to_string(),
                ))
            }
        }
    }
}
