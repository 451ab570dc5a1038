//! Extraction engine for tabula.
//!
//! This crate provides the HTTP fetch pipeline, the document and XPath
//! layer, row extraction, pagination, export and the item inspector shared
//! by the server and CLI.

pub mod dom;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod inspect;
pub mod paginate;

#[cfg(test)]
pub(crate) mod testing;

pub use dom::{ItemRoot, Page, XPath, XPathError, node_path};
pub use export::{
    Collected, Destination, ExportError, ExportOptions, ExportRequest, ExportSummary, FixedDestination, GENERATOR,
    OutputFormat, TableWriter, collect_into, collect_table, export, persist, suggested_name,
};
pub use extract::{RowExtractor, parse_rating, resolve_href};
pub use fetch::{FetchClient, FetchConfig, FetchResponse, PageSource, RawPage, canonicalize, page_url};
pub use inspect::{FieldCandidate, ItemSurvey, inspect_url, survey};
pub use paginate::{PageBatch, PaginationOptions, Paginator, StopSignal};
