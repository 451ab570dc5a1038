//! table_inspect tool implementation.
//!
//! Fetches one page and lists candidate columns under the first item.

use rmcp::{ErrorData as McpError, model::*};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tabula_client::{ItemSurvey, PageSource, canonicalize, inspect_url};
use tabula_core::{ColumnSpec, Error};

/// Input parameters for table_inspect tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableInspectParams {
    /// Page to inspect.
    pub url: String,

    /// XPath selecting the repeating item element.
    pub item_xpath: String,
}

/// Output structure for table_inspect tool.
#[derive(Debug, Clone, Serialize)]
pub struct TableInspectOutput {
    #[serde(flatten)]
    pub survey: ItemSurvey,
    /// Columns for every candidate, ready to pass to table_extract.
    pub suggested_columns: Vec<ColumnSpec>,
}

/// Implementation of the table_inspect tool.
pub async fn inspect_impl(source: &dyn PageSource, params: TableInspectParams) -> Result<CallToolResult, McpError> {
    let url = canonicalize(&params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
    let survey = inspect_url(source, &url, &params.item_xpath).await?;
    let suggested_columns = survey.suggest_mapping().columns().to_vec();

    let output = TableInspectOutput { survey, suggested_columns };

    Ok(CallToolResult::success(vec![Content::text(
        serde_json::to_string_pretty(&output).unwrap_or_default(),
    )]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::fixtures::{FixtureSource, PAGE_ONE};

    fn json(result: CallToolResult) -> serde_json::Value {
        let text = result.content[0].as_text().map(|t| t.text.clone()).unwrap_or_default();
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_inspect_lists_candidates() {
        let source = FixtureSource::new(&[("https://books.example.com/list", PAGE_ONE)]);
        let params =
            TableInspectParams { url: "books.example.com/list".into(), item_xpath: "//ul[@class='books']/li".into() };

        let value = json(inspect_impl(&source, params).await.unwrap());
        assert_eq!(value["item_count"], 2);
        assert_eq!(value["item_path"], "/html[1]/body[1]/ul[1]/li[1]");
        assert_eq!(value["fields"][1]["kind"], "link");
        assert_eq!(value["suggested_columns"][1]["relative_path"], "/a[1]");
        assert_eq!(value["suggested_columns"][1]["name"], "rating-45");
    }

    #[tokio::test]
    async fn test_inspect_invalid_url() {
        let source = FixtureSource::new(&[]);
        let params = TableInspectParams { url: "ftp://example.com".into(), item_xpath: "//li".into() };
        let err = inspect_impl(&source, params).await.unwrap_err();
        assert_eq!(err.code, ErrorCode(-32003));
    }
}
