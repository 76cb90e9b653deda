//! Tools module - Tool definitions and execution for the data-query agent
//!
//! The agent stage requests tools by name; the tools stage resolves them
//! through a [`ToolRegistry`] and feeds each [`ToolOutput`] back as a
//! tool-result turn.
//!
//! # Built-in Tools
//!
//! - [`sql::SqlQueryTool`] (`query_database`): run a read-only SQL statement
//! - [`search::SemanticSearchTool`] (`search_schema`): look up table schemas
//!   and worked examples
//!
//! Both delegate to a backend trait ([`sql::QueryExecutor`],
//! [`search::VectorSearch`]) supplied by the embedding application.

mod registry;
pub mod search;
pub mod sql;
mod types;

pub use registry::ToolRegistry;
pub use types::{Tool, ToolContext, ToolOutput};
