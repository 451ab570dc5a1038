//! Row extraction: replay the field mapping against one item root.
//!
//! ### Tag Rules
//! - `link`: text (or rating) cell, then the resolved and decoded `href`
//! - `image`: the `src` attribute, or the column's attribute override
//! - `text`: inner text, or the column's attribute override
//!
//! A column whose path matches nothing yields absent cells. The only
//! fallible path is the rating column under the `abort` policy.

pub mod links;
pub mod rating;

pub use links::resolve_href;
pub use rating::parse_rating;

use scraper::ElementRef;
use url::Url;

use crate::dom::{ItemRoot, Page, XPath, compile_column, inner_text};
use tabula_core::{Cell, ColumnSpec, Error, FieldMapping, RatingConfig, RatingFailure, Row, TagKind};

/// Builds one row per item from a fixed mapping.
#[derive(Debug, Clone)]
pub struct RowExtractor {
    mapping: FieldMapping,
    /// Parsed path of each column, in mapping order; `None` reads the item itself.
    paths: Vec<Option<XPath>>,
    base_url: Url,
    rating: RatingConfig,
}

impl RowExtractor {
    /// `base_url` is the run's listing URL; link hrefs resolve against it.
    ///
    /// Column paths are parsed here, once per run.
    pub fn new(mapping: FieldMapping, base_url: Url, rating: RatingConfig) -> Result<Self, Error> {
        let paths = mapping.columns().iter().map(compile_column).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mapping, paths, base_url, rating })
    }

    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Extract the row for `item`. The row has exactly `mapping.width()` cells.
    pub fn extract(&self, page: &Page, item: &ItemRoot) -> Result<Row, Error> {
        let mut row = Vec::with_capacity(self.mapping.width());
        let root = item.element(page);

        for (column, path) in self.mapping.columns().iter().zip(&self.paths) {
            let node = root.and_then(|root| match path {
                Some(path) => path.select_first_from(page.document(), root),
                None => Some(root),
            });

            match column.tag {
                TagKind::Link => {
                    row.push(self.link_cell(column, node, item)?);
                    let href = node.and_then(|n| n.value().attr("href"));
                    row.push(href.map(|h| resolve_href(&self.base_url, h)).into());
                }
                TagKind::Image => {
                    let attr = column.attribute.as_deref().unwrap_or("src");
                    row.push(attribute(node, attr).into());
                }
                TagKind::Text => {
                    let value = match column.attribute.as_deref() {
                        Some(attr) => attribute(node, attr),
                        None => node.map(inner_text),
                    };
                    row.push(value.into());
                }
            }
        }

        Ok(row)
    }

    fn link_cell(&self, column: &ColumnSpec, node: Option<ElementRef<'_>>, item: &ItemRoot) -> Result<Cell, Error> {
        if column.name != self.rating.column {
            return Ok(node.map(inner_text).into());
        }

        let class = node.and_then(|n| n.value().attr("class"));
        if let Some(value) = class.and_then(|c| parse_rating(c, &self.rating.prefix, self.rating.divisor)) {
            return Ok(Cell::Number(value));
        }

        let text = class.unwrap_or_default().to_string();
        match self.rating.on_error {
            RatingFailure::Abort => Err(Error::RatingParse { column: column.name.clone(), text }),
            RatingFailure::Absent => {
                tracing::warn!("unparseable rating '{}' in column '{}' at {}", text, column.name, item.path());
                Ok(Cell::Absent)
            }
        }
    }
}

fn attribute(node: Option<ElementRef<'_>>, name: &str) -> Option<String> {
    node.and_then(|n| n.value().attr(name)).map(str::to_string)
}
