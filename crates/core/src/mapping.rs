//! Field mapping: the ordered column schema replayed against every item.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Suffix appended to a link column's name for its URL cell.
pub const URL_SUFFIX: &str = "Url";

/// Extraction rule selected by the tag found at a column's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    /// `<a>`: text (or rating) cell followed by a resolved URL cell.
    Link,
    /// `<img>`: the `src` attribute.
    Image,
    /// Any other element: its inner text.
    Text,
}

impl TagKind {
    /// Classify an HTML tag name the way the element picker does.
    pub fn from_tag_name(tag: &str) -> Self {
        if tag.eq_ignore_ascii_case("a") {
            TagKind::Link
        } else if tag.eq_ignore_ascii_case("img") {
            TagKind::Image
        } else {
            TagKind::Text
        }
    }

    /// Number of output cells a column of this kind produces.
    pub fn cell_count(self) -> usize {
        match self {
            TagKind::Link => 2,
            TagKind::Image | TagKind::Text => 1,
        }
    }
}

/// One output column: a name, the expected tag kind and a path relative to
/// the item root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    /// Output header.
    pub name: String,

    /// Extraction rule.
    pub tag: TagKind,

    /// Path appended to the item root's own path, e.g. `/div[1]/a[1]`.
    /// Empty selects the item itself.
    #[serde(default)]
    pub relative_path: String,

    /// Attribute read instead of the default value. Applies to `text`
    /// (instead of inner text) and `image` (instead of `src`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, tag: TagKind, relative_path: impl Into<String>) -> Self {
        Self { name: name.into(), tag, relative_path: relative_path.into(), attribute: None }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Header cells for this column, in output order.
    pub fn header_cells(&self) -> Vec<String> {
        match self.tag {
            TagKind::Link => vec![self.name.clone(), format!("{}{}", self.name, URL_SUFFIX)],
            TagKind::Image | TagKind::Text => vec![self.name.clone()],
        }
    }
}

/// Ordered column definitions. Column order is output order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct FieldMapping {
    columns: Vec<ColumnSpec>,
}

impl FieldMapping {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Append a column, rejecting one whose relative path is already mapped.
    ///
    /// Names are not checked; duplicate names produce duplicate headers.
    pub fn push(&mut self, column: ColumnSpec) -> Result<(), Error> {
        if self.columns.iter().any(|c| c.relative_path == column.relative_path) {
            return Err(Error::InvalidInput(format!("'{}' is already mapped", column.relative_path)));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Remove the column mapped at `relative_path`, if any.
    pub fn remove(&mut self, relative_path: &str) -> Option<ColumnSpec> {
        let index = self.columns.iter().position(|c| c.relative_path == relative_path)?;
        Some(self.columns.remove(index))
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Expanded header: each column name, plus `<name>Url` after link columns.
    pub fn header(&self) -> Vec<String> {
        self.columns.iter().flat_map(ColumnSpec::header_cells).collect()
    }

    /// Expanded width; equals `header().len()` and every row's length.
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.tag.cell_count()).sum()
    }
}

impl From<Vec<ColumnSpec>> for FieldMapping {
    fn from(columns: Vec<ColumnSpec>) -> Self {
        Self::new(columns)
    }
}

impl<'a> IntoIterator for &'a FieldMapping {
    type Item = &'a ColumnSpec;
    type IntoIter = std::slice::Iter<'a, ColumnSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

/// Derive a column's relative path from an item path and a descendant's path.
///
/// Returns `None` when `node_path` is not the item or below it. The match
/// respects step boundaries, so `/ul[1]/li[1]` is not a prefix of
/// `/ul[1]/li[10]/a[1]`.
pub fn relative_path(item_path: &str, node_path: &str) -> Option<String> {
    let rest = node_path.strip_prefix(item_path)?;
    if rest.is_empty() || rest.starts_with('/') { Some(rest.to_string()) } else { None }
}
