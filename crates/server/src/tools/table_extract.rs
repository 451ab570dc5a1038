//! table_extract tool implementation.
//!
//! Runs a full paginated extraction and returns the table as JSON. Nothing
//! is written to disk.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabula_client::{ExportOptions, ExportRequest, GENERATOR, PageSource, StopSignal, collect_table};
use tabula_core::{AppConfig, ColumnSpec, Error, FieldMapping, Row};

/// Input parameters for table_extract tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableExtractParams {
    /// Listing URL. Its query string is kept; the page parameter is set per page.
    pub url: String,

    /// Query parameter carrying the page number. Omit to read a single page.
    #[serde(default)]
    pub page_param: Option<String>,

    /// XPath selecting the repeating item element, e.g. `//ul[@class='results']/li`.
    pub item_xpath: String,

    /// Output columns in order. `relative_path` is appended to each item's
    /// absolute path, e.g. `/a[1]`.
    pub columns: Vec<ColumnSpec>,

    /// First page number (default from server config, usually 1).
    #[serde(default)]
    pub first_page: Option<u32>,

    /// Stop after this many pages.
    #[serde(default)]
    pub max_pages: Option<u32>,

    /// Fetch the next page while the current one is extracted.
    #[serde(default)]
    pub prefetch: Option<bool>,
}

/// Output structure for table_extract tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableExtractOutput {
    /// Canonical listing URL.
    pub url: String,
    /// Expanded header; link columns add a `<name>Url` column.
    pub header: Vec<String>,
    /// Data rows aligned with `header`. Absent values are `null`.
    pub rows: Vec<Row>,
    pub row_count: usize,
    /// Pages fetched, including the final empty page.
    pub pages: u32,
    /// ISO8601 timestamp of when the extraction finished.
    pub extracted_at: String,
    pub generator: String,
}

/// Implementation of the table_extract tool.
pub async fn extract_impl(
    source: Arc<dyn PageSource>, config: &AppConfig, params: TableExtractParams,
) -> Result<CallToolResult, McpError> {
    if params.max_pages == Some(0) {
        return Err(Error::InvalidInput("max_pages must be at least 1".into()).into());
    }

    let request = ExportRequest::new(
        &params.url,
        params.page_param.as_deref(),
        &params.item_xpath,
        FieldMapping::new(params.columns),
    )?;

    let mut options = ExportOptions::from(config);
    if let Some(first_page) = params.first_page {
        options.pagination.first_page = first_page;
    }
    if params.max_pages.is_some() {
        options.pagination.max_pages = params.max_pages;
    }
    if let Some(prefetch) = params.prefetch {
        options.pagination.prefetch = prefetch;
    }

    tracing::info!("table_extract {} ({} columns)", request.base_url, request.mapping.len());

    let collected = collect_table(source, &request, &options, StopSignal::new(), |page| {
        tracing::debug!("table_extract: page {} done", page);
    })
    .await?;

    let output = TableExtractOutput {
        url: request.base_url.to_string(),
        header: collected.table.header().to_vec(),
        row_count: collected.table.len(),
        rows: collected.table.rows().to_vec(),
        pages: collected.pages,
        extracted_at: chrono::Utc::now().to_rfc3339(),
        generator: GENERATOR.to_string(),
    };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}
