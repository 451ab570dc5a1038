//! Parsed listing pages and the item locator.
//!
//! Elements are addressed by absolute positional paths
//! (`/html[1]/body[1]/ul[1]/li[2]`). An item root is kept as its parsed
//! locator rather than as a node reference, so batches own no borrow into the
//! document. Column paths are parsed once and evaluated from the item element.

pub mod xpath;

use scraper::{ElementRef, Html};
use url::Url;

pub use xpath::{XPath, XPathError};

use crate::fetch::RawPage;
use tabula_core::{ColumnSpec, Error};

impl From<XPathError> for Error {
    fn from(err: XPathError) -> Self {
        Error::InvalidXPath(err.to_string())
    }
}

/// Parse a path expression, reporting failures as [`Error::InvalidXPath`].
pub fn compile(expr: &str) -> Result<XPath, Error> {
    Ok(XPath::parse(expr)?)
}

/// Parse a column's item-relative path, naming the column on failure.
///
/// `None` means the column reads the item element itself.
pub fn compile_column(column: &ColumnSpec) -> Result<Option<XPath>, Error> {
    XPath::parse_relative(&column.relative_path).map_err(|e| {
        Error::InvalidXPath(format!("column '{}' path '{}': {}", column.name, column.relative_path, e))
    })
}

/// One fetched listing page, parsed.
///
/// Not `Send`: build it from a [`RawPage`] on the task that reads it.
pub struct Page {
    url: Url,
    document: Html,
}

impl Page {
    pub fn parse(url: Url, html: &str) -> Self {
        Self { url, document: Html::parse_document(html) }
    }

    pub fn from_raw(raw: RawPage) -> Self {
        Self::parse(raw.final_url, &raw.html)
    }

    /// URL the document was served from (after redirects).
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// All elements matching `xpath`, in document order.
    pub fn select_all(&self, xpath: &str) -> Result<Vec<ElementRef<'_>>, Error> {
        Ok(compile(xpath)?.select(&self.document))
    }

    /// First element matching `xpath`.
    pub fn select_first(&self, xpath: &str) -> Result<Option<ElementRef<'_>>, Error> {
        Ok(compile(xpath)?.select_first(&self.document))
    }

    /// Locate the repeating items on this page. Empty means "no items".
    pub fn items(&self, xpath: &XPath) -> Vec<ItemRoot> {
        xpath
            .select(&self.document)
            .into_iter()
            .enumerate()
            .map(|(index, element)| ItemRoot { locator: XPath::locate(element), index })
            .collect()
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page").field("url", &self.url.as_str()).finish_non_exhaustive()
    }
}

/// One repeating item: its absolute locator and its position on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRoot {
    locator: XPath,
    index: usize,
}

impl ItemRoot {
    pub fn path(&self) -> &str {
        self.locator.as_str()
    }

    /// Zero-based position among the page's items.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The item element in `page`, the page it was located on.
    pub fn element<'a>(&self, page: &'a Page) -> Option<ElementRef<'a>> {
        self.locator.select_first(page.document())
    }
}

/// Absolute positional path of an element, as rendered by [`XPath::locate`].
pub fn node_path(element: ElementRef<'_>) -> String {
    XPath::locate(element).as_str().to_string()
}

/// Concatenated text of an element and its descendants, untrimmed.
pub fn inner_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}
