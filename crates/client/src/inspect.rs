//! Item survey: list what a mapping could extract from the first item.

use serde::Serialize;
use url::Url;

use crate::dom::{Page, compile, inner_text, node_path};
use crate::fetch::PageSource;
use tabula_core::{ColumnSpec, Error, FieldMapping, TagKind, relative_path};

const PREVIEW_CHARS: usize = 80;

/// One element under the first item that could become a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldCandidate {
    pub tag: String,
    pub kind: TagKind,
    pub relative_path: String,
    /// The element's `class` attribute, or its tag name.
    pub suggested_name: String,
    pub preview: String,
}

impl FieldCandidate {
    pub fn to_column(&self) -> ColumnSpec {
        ColumnSpec::new(self.suggested_name.clone(), self.kind, self.relative_path.clone())
    }
}

/// Result of surveying a page for a repeating item path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSurvey {
    pub url: String,
    pub item_count: usize,
    pub item_path: Option<String>,
    pub fields: Vec<FieldCandidate>,
}

impl ItemSurvey {
    /// A starting mapping with every candidate as a column.
    pub fn suggest_mapping(&self) -> FieldMapping {
        let mut mapping = FieldMapping::default();
        for field in &self.fields {
            if let Err(e) = mapping.push(field.to_column()) {
                tracing::debug!("skipping candidate: {}", e);
            }
        }
        mapping
    }
}

/// Survey `page` for items matching `item_xpath`.
pub fn survey(page: &Page, item_xpath: &str) -> Result<ItemSurvey, Error> {
    let items = compile(item_xpath)?.select(page.document());
    let url = page.url().to_string();

    let Some(first) = items.first().copied() else {
        return Ok(ItemSurvey { url, item_count: 0, item_path: None, fields: Vec::new() });
    };

    let item_path = node_path(first);
    let mut fields = Vec::new();

    for element in first.descendants().skip(1).filter_map(scraper::ElementRef::wrap) {
        let Some(relative) = relative_path(&item_path, &node_path(element)) else {
            continue;
        };
        let tag = element.value().name().to_string();
        let kind = TagKind::from_tag_name(&tag);

        let preview = match kind {
            TagKind::Image => element.value().attr("src").unwrap_or_default().to_string(),
            TagKind::Link | TagKind::Text => inner_text(element).split_whitespace().collect::<Vec<_>>().join(" "),
        };
        if preview.is_empty() && kind == TagKind::Text {
            continue;
        }

        let suggested_name = element
            .value()
            .attr("class")
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(tag.as_str())
            .to_string();

        fields.push(FieldCandidate {
            tag,
            kind,
            relative_path: relative,
            suggested_name,
            preview: preview.chars().take(PREVIEW_CHARS).collect(),
        });
    }

    tracing::debug!("Found {} nodes; {} candidate fields in first item", items.len(), fields.len());
    Ok(ItemSurvey { url, item_count: items.len(), item_path: Some(item_path), fields })
}

/// Fetch `url` and survey it.
pub async fn inspect_url(source: &dyn PageSource, url: &Url, item_xpath: &str) -> Result<ItemSurvey, Error> {
    compile(item_xpath)?;
    let raw = source.fetch_html(url).await?;
    survey(&Page::from_raw(raw), item_xpath)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSource;

    const HTML: &str = r#"<html><body><ol>
<li>
  <div class="card">
    <a class="title" href="/p/1">  The   Hobbit </a>
    <img src="/c/1.png">
    <span class="author">Tolkien</span>
    <span></span>
  </div>
</li>
<li><div class="card"><a class="title" href="/p/2">Beowulf</a></div></li>
</ol></body></html>"#;

    fn page() -> Page {
        Page::parse(Url::parse("https://example.com/").unwrap(), HTML)
    }

    #[test]
    fn test_survey_first_item() {
        let survey = survey(&page(), "//ol/li").unwrap();
        assert_eq!(survey.item_count, 2);
        assert_eq!(survey.item_path.as_deref(), Some("/html[1]/body[1]/ol[1]/li[1]"));

        let paths: Vec<_> = survey.fields.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(paths, vec!["/div[1]", "/div[1]/a[1]", "/div[1]/img[1]", "/div[1]/span[1]"]);

        let link = &survey.fields[1];
        assert_eq!(link.kind, TagKind::Link);
        assert_eq!(link.suggested_name, "title");
        assert_eq!(link.preview, "The Hobbit");

        assert_eq!(survey.fields[2].kind, TagKind::Image);
        assert_eq!(survey.fields[2].preview, "/c/1.png");
        assert_eq!(survey.fields[2].suggested_name, "img");
    }

    #[test]
    fn test_survey_no_items() {
        let survey = survey(&page(), "//table/tr").unwrap();
        assert_eq!(survey.item_count, 0);
        assert!(survey.item_path.is_none());
        assert!(survey.fields.is_empty());
    }

    #[test]
    fn test_suggest_mapping() {
        let survey = survey(&page(), "//ol/li").unwrap();
        let mapping = survey.suggest_mapping();
        assert_eq!(mapping.len(), 4);
        assert_eq!(mapping.header(), vec!["card", "title", "titleUrl", "img", "author"]);
    }

    #[tokio::test]
    async fn test_inspect_url() {
        let source = StaticSource::new().fallback(HTML);
        let url = Url::parse("https://example.com/list").unwrap();
        let survey = inspect_url(&source, &url, "//ol/li").await.unwrap();
        assert_eq!(survey.item_count, 2);
        assert_eq!(survey.url, "https://example.com/list");
        assert_eq!(source.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_inspect_url_rejects_bad_xpath_before_fetch() {
        let source = StaticSource::new().fallback(HTML);
        let url = Url::parse("https://example.com/list").unwrap();
        assert!(matches!(inspect_url(&source, &url, "//ol/li[").await, Err(Error::InvalidXPath(_))));
        assert!(source.requests().is_empty());
    }
}
