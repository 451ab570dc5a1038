//! MCP tool implementations.
//!
//! This module contains all tools exposed by the mcp-tabula server.

pub mod table_extract;
pub mod table_inspect;

pub use table_extract::{TableExtractOutput, TableExtractParams};
pub use table_inspect::{TableInspectOutput, TableInspectParams};
