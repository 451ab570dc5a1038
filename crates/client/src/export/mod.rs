//! Export orchestration: paginate, extract, assemble, persist.
//!
//! [`collect_table`] runs the extraction phase and returns the table in
//! memory. [`export`] adds the persist phase: ask a [`Destination`] for a
//! path and write the table there. Extraction failures never touch the
//! filesystem; persist failures hand the table back for a retry.

pub mod writer;

pub use writer::{GENERATOR, OutputFormat, TableWriter};

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use url::Url;

use crate::dom::{compile, compile_column};
use crate::extract::RowExtractor;
use crate::fetch::{PageSource, canonicalize};
use crate::paginate::{PaginationOptions, Paginator, StopSignal};
use tabula_core::{AppConfig, Error, FieldMapping, RatingConfig, Table, TableSink};

/// Validated description of one run.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub base_url: Url,
    pub page_param: Option<String>,
    pub item_xpath: String,
    pub mapping: FieldMapping,
}

impl ExportRequest {
    /// Validate the inputs of a run before anything is fetched.
    ///
    /// The item path and every column path are parsed up front so a typo
    /// fails here rather than after the first page.
    pub fn new(
        base_url: &str, page_param: Option<&str>, item_xpath: &str, mapping: FieldMapping,
    ) -> Result<Self, Error> {
        let base_url = canonicalize(base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

        let item_xpath = item_xpath.trim();
        if item_xpath.is_empty() {
            return Err(Error::InvalidInput("item xpath must not be empty".into()));
        }
        if mapping.is_empty() {
            return Err(Error::InvalidInput("mapping must contain at least one column".into()));
        }

        compile(item_xpath)?;
        for column in &mapping {
            compile_column(column)?;
        }

        let page_param = page_param.map(str::trim).filter(|p| !p.is_empty()).map(str::to_string);

        Ok(Self { base_url, page_param, item_xpath: item_xpath.to_string(), mapping })
    }
}

/// Engine settings for a run, usually derived from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub pagination: PaginationOptions,
    pub rating: RatingConfig,
    /// Base name suggested to the destination, without extension.
    pub export_name: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ExportOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            pagination: PaginationOptions::from(config),
            rating: config.rating.clone(),
            export_name: config.export_name.clone(),
        }
    }
}

/// Outcome of the extraction phase.
#[derive(Debug, Clone)]
pub struct Collected {
    pub table: Table,
    /// Pages fetched, including the terminating empty page.
    pub pages: u32,
    /// The run ended on the stop signal rather than on an empty page.
    pub stopped: bool,
}

/// Outcome of a completed export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub rows: usize,
    pub pages: u32,
    pub stopped: bool,
}

/// Failure of an export, split by phase.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Fetching, parsing or extracting failed; nothing was written.
    #[error(transparent)]
    Extraction(Error),

    /// The table was complete but could not be saved.
    #[error("{source}")]
    Persist { table: Table, source: Error },
}

impl ExportError {
    pub fn error(&self) -> &Error {
        match self {
            ExportError::Extraction(e) => e,
            ExportError::Persist { source, .. } => source,
        }
    }

    /// The collected table, when the failure happened while persisting it.
    pub fn table(&self) -> Option<&Table> {
        match self {
            ExportError::Extraction(_) => None,
            ExportError::Persist { table, .. } => Some(table),
        }
    }

    pub fn into_table(self) -> Option<Table> {
        match self {
            ExportError::Extraction(_) => None,
            ExportError::Persist { table, .. } => Some(table),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.error(), Error::ExportCancelled)
    }
}

impl From<ExportError> for Error {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Extraction(e) => e,
            ExportError::Persist { source, .. } => source,
        }
    }
}

/// Chooses where a finished table is saved. `None` cancels the save.
pub trait Destination {
    fn choose(&self, suggested: &str) -> Option<PathBuf>;
}

/// Always saves to one path.
#[derive(Debug, Clone)]
pub struct FixedDestination(pub PathBuf);

impl Destination for FixedDestination {
    fn choose(&self, _suggested: &str) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

impl<F> Destination for F
where
    F: Fn(&str) -> Option<PathBuf>,
{
    fn choose(&self, suggested: &str) -> Option<PathBuf> {
        self(suggested)
    }
}

/// Run the extraction phase into `sink`. Returns pages fetched and whether
/// the stop signal ended the run.
///
/// The header is written first; then for every page, each item's row in
/// document order, followed by `on_progress(page_number)`.
pub async fn collect_into<S, F>(
    source: Arc<dyn PageSource>, request: &ExportRequest, options: &ExportOptions, stop: StopSignal, sink: &mut S,
    mut on_progress: F,
) -> Result<(u32, bool), Error>
where
    S: TableSink,
    F: FnMut(u32),
{
    sink.write_header(&request.mapping)?;

    let extractor = RowExtractor::new(request.mapping.clone(), request.base_url.clone(), options.rating.clone())?;
    let mut paginator = Paginator::new(
        source,
        request.base_url.clone(),
        request.page_param.as_deref(),
        &request.item_xpath,
        options.pagination.clone(),
    )?
    .with_stop(stop);

    let mut rows = 0usize;
    loop {
        let Some(batch) = paginator.next_batch().await? else {
            break;
        };
        for item in &batch.items {
            sink.write_row(extractor.extract(&batch.page, item)?)?;
        }
        rows += batch.items.len();
        tracing::debug!("extracted {} row(s) from page {}", batch.items.len(), batch.page_number);
        on_progress(batch.page_number);
    }

    tracing::info!("extraction finished: {} row(s) from {} page(s)", rows, paginator.pages_fetched());
    Ok((paginator.pages_fetched(), paginator.was_stopped()))
}

/// Run the extraction phase into a fresh in-memory [`Table`].
pub async fn collect_table<F>(
    source: Arc<dyn PageSource>, request: &ExportRequest, options: &ExportOptions, stop: StopSignal, on_progress: F,
) -> Result<Collected, Error>
where
    F: FnMut(u32),
{
    let mut table = Table::new();
    let (pages, stopped) = collect_into(source, request, options, stop, &mut table, on_progress).await?;
    Ok(Collected { table, pages, stopped })
}

/// Ask `destination` for a path and write `table` there.
///
/// On failure the table is returned inside [`ExportError::Persist`] so the
/// caller can try another destination.
pub fn persist(
    table: Table, suggested: &str, destination: &dyn Destination, format: Option<OutputFormat>,
) -> Result<(PathBuf, OutputFormat), ExportError> {
    let Some(path) = destination.choose(suggested) else {
        tracing::info!("save cancelled");
        return Err(ExportError::Persist { table, source: Error::ExportCancelled });
    };

    let writer = TableWriter::for_path(&path, format);
    match writer.write_path(&table, &path) {
        Ok(()) => Ok((path, writer.format())),
        Err(source) => Err(ExportError::Persist { table, source }),
    }
}

/// Suggested file name for a run: export name plus the format's extension.
pub fn suggested_name(options: &ExportOptions, format: Option<OutputFormat>) -> String {
    format!("{}.{}", options.export_name, format.unwrap_or_default().extension())
}

/// Full export: collect every page, then persist the table.
pub async fn export<F>(
    source: Arc<dyn PageSource>, request: &ExportRequest, options: &ExportOptions, stop: StopSignal,
    destination: &dyn Destination, format: Option<OutputFormat>, on_progress: F,
) -> Result<ExportSummary, ExportError>
where
    F: FnMut(u32),
{
    let collected =
        collect_table(source, request, options, stop, on_progress).await.map_err(ExportError::Extraction)?;

    let rows = collected.table.len();
    let (path, format) = persist(collected.table, &suggested_name(options, format), destination, format)?;

    Ok(ExportSummary { path, format, rows, pages: collected.pages, stopped: collected.stopped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticSource, listing};
    use tabula_core::{Cell, ColumnSpec, RatingFailure, TagKind};

    const BASE: &str = "https://example.com/list";
    const ITEMS: &str = "//ul[@class='results']/li";

    fn mapping() -> FieldMapping {
        FieldMapping::new(vec![
            ColumnSpec::new("Title", TagKind::Text, "/h2[1]"),
            ColumnSpec::new("Link", TagKind::Link, "/a[1]"),
        ])
    }

    fn two_pages() -> Arc<StaticSource> {
        Arc::new(
            StaticSource::new()
                .page("https://example.com/list?page=1", &listing(&["Dune", "Emma"]))
                .page("https://example.com/list?page=2", &listing(&[])),
        )
    }

    fn request(param: Option<&str>, mapping: FieldMapping) -> ExportRequest {
        ExportRequest::new(BASE, param, ITEMS, mapping).unwrap()
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tabula-export-{}-{}", std::process::id(), name))
    }

    #[tokio::test]
    async fn test_collect_end_to_end() {
        let source = two_pages();
        let mut progress = Vec::new();

        let collected = collect_table(
            source.clone(),
            &request(Some("page"), mapping()),
            &ExportOptions::default(),
            StopSignal::new(),
            |page| progress.push(page),
        )
        .await
        .unwrap();

        assert_eq!(collected.table.header(), ["Title", "Link", "LinkUrl"]);
        assert_eq!(collected.table.len(), 2);
        assert_eq!(
            collected.table.rows()[0],
            vec![Cell::Text("Dune".into()), Cell::Text("Dune".into()), Cell::Text("https://example.com/p/0".into())]
        );
        assert_eq!(collected.table.rows()[1][0], Cell::Text("Emma".into()));
        assert_eq!(collected.pages, 2);
        assert!(!collected.stopped);
        assert_eq!(progress, vec![1, 2]);
        assert_eq!(source.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_collect_rows_follow_page_order() {
        let source = Arc::new(
            StaticSource::new()
                .page("https://example.com/list?page=1", &listing(&["a", "b"]))
                .page("https://example.com/list?page=2", &listing(&["c"]))
                .page("https://example.com/list?page=3", &listing(&[])),
        );
        let options = ExportOptions {
            pagination: PaginationOptions { prefetch: true, ..Default::default() },
            ..Default::default()
        };

        let collected =
            collect_table(source, &request(Some("page"), mapping()), &options, StopSignal::new(), |_| {})
                .await
                .unwrap();

        let titles: Vec<_> = collected.table.rows().iter().map(|r| r[0].clone()).collect();
        assert_eq!(titles, vec![Cell::from("a"), Cell::from("b"), Cell::from("c")]);
    }

    #[tokio::test]
    async fn test_collect_is_repeatable() {
        let source = Arc::new(
            StaticSource::new()
                .page("https://example.com/list?page=1", &listing(&["Dune", "Emma"]))
                .page("https://example.com/list?page=2", &listing(&["Ulysses"]))
                .page("https://example.com/list?page=3", &listing(&[])),
        );
        let request = request(Some("page"), mapping());
        let sequential = ExportOptions::default();
        let prefetching = ExportOptions {
            pagination: PaginationOptions { prefetch: true, ..Default::default() },
            ..Default::default()
        };

        let mut outputs = Vec::new();
        for options in [&sequential, &sequential, &prefetching] {
            let collected = collect_table(source.clone(), &request, options, StopSignal::new(), |_| {}).await.unwrap();
            let mut csv = Vec::new();
            TableWriter::new(OutputFormat::Csv).write_to(&collected.table, &mut csv).unwrap();
            outputs.push(csv);
        }

        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[0], outputs[2]);
        assert_eq!(source.requests().len(), 9);
    }

    #[tokio::test]
    async fn test_collect_without_pagination() {
        let source = Arc::new(StaticSource::new().fallback(&listing(&["a", "b", "c"])));
        let collected =
            collect_table(source.clone(), &request(None, mapping()), &ExportOptions::default(), StopSignal::new(), |_| {})
                .await
                .unwrap();

        assert_eq!(collected.table.len(), 3);
        assert_eq!(source.requests(), vec![BASE]);
    }

    #[tokio::test]
    async fn test_collect_rating_abort() {
        let source = Arc::new(StaticSource::new().fallback(&listing(&["a"]).replace("rating-10", "rating-x")));
        let mapping = FieldMapping::new(vec![ColumnSpec::new("Rating", TagKind::Link, "/a[1]")]);

        let result =
            collect_table(source, &request(None, mapping), &ExportOptions::default(), StopSignal::new(), |_| {}).await;
        assert!(matches!(result, Err(Error::RatingParse { .. })));
    }

    #[tokio::test]
    async fn test_collect_rating_absent_policy() {
        let source = Arc::new(StaticSource::new().fallback(&listing(&["a", "b"]).replace("rating-10", "rating-x")));
        let mapping = FieldMapping::new(vec![ColumnSpec::new("Rating", TagKind::Link, "/a[1]")]);
        let mut options = ExportOptions::default();
        options.rating.on_error = RatingFailure::Absent;

        let collected =
            collect_table(source, &request(None, mapping), &options, StopSignal::new(), |_| {}).await.unwrap();
        assert_eq!(collected.table.rows()[0][0], Cell::Absent);
        assert_eq!(collected.table.rows()[1][0], Cell::Number(1.1));
    }

    #[tokio::test]
    async fn test_collect_stop_keeps_partial_table() {
        let source = Arc::new(StaticSource::new().fallback(&listing(&["x", "y"])));
        let stop = StopSignal::new();
        let trigger = stop.clone();

        let collected = collect_table(source, &request(Some("page"), mapping()), &ExportOptions::default(), stop, |page| {
            if page == 2 {
                trigger.trigger();
            }
        })
        .await
        .unwrap();

        assert!(collected.stopped);
        assert_eq!(collected.pages, 2);
        assert_eq!(collected.table.len(), 4);
    }

    #[tokio::test]
    async fn test_export_writes_file() {
        let path = temp_path("books.tsv");
        let summary = export(
            two_pages(),
            &request(Some("page"), mapping()),
            &ExportOptions::default(),
            StopSignal::new(),
            &FixedDestination(path.clone()),
            None,
            |_| {},
        )
        .await
        .unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(summary.format, OutputFormat::Tsv);
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.pages, 2);
        assert!(written.starts_with("Title\tLink\tLinkUrl\n"));
    }

    #[tokio::test]
    async fn test_export_cancelled_returns_table() {
        let cancel = |suggested: &str| -> Option<PathBuf> {
            assert_eq!(suggested, "tabula-export.json");
            None
        };

        let err = export(
            two_pages(),
            &request(Some("page"), mapping()),
            &ExportOptions::default(),
            StopSignal::new(),
            &cancel,
            Some(OutputFormat::Json),
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(err.is_cancelled());
        let table = err.into_table().unwrap();
        assert_eq!(table.len(), 2);

        // Retry the save against a real destination.
        let path = temp_path("retry.csv");
        let retry = FixedDestination(path.clone());
        let (saved, format) = persist(table, "tabula-export.csv", &retry, None).unwrap();
        let written = std::fs::read_to_string(&saved).unwrap();
        std::fs::remove_file(&saved).ok();
        assert_eq!(format, OutputFormat::Csv);
        assert_eq!(written.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_extraction_failure_writes_nothing() {
        let path = temp_path("never.csv");
        let source = Arc::new(StaticSource::new());

        let err = export(
            source,
            &request(Some("page"), mapping()),
            &ExportOptions::default(),
            StopSignal::new(),
            &FixedDestination(path.clone()),
            None,
            |_| {},
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExportError::Extraction(Error::HttpError(_))));
        assert!(err.table().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(ExportRequest::new("", None, ITEMS, mapping()), Err(Error::InvalidUrl(_))));
        assert!(matches!(ExportRequest::new(BASE, None, " ", mapping()), Err(Error::InvalidInput(_))));
        assert!(matches!(
            ExportRequest::new(BASE, None, ITEMS, FieldMapping::default()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(ExportRequest::new(BASE, None, "//li[", mapping()), Err(Error::InvalidXPath(_))));

        let bad_column = FieldMapping::new(vec![ColumnSpec::new("T", TagKind::Text, "h2[1]")]);
        assert!(matches!(ExportRequest::new(BASE, None, ITEMS, bad_column), Err(Error::InvalidXPath(_))));
    }

    #[test]
    fn test_request_normalizes_inputs() {
        let req = ExportRequest::new("example.com/list#top", Some(" page "), " //li ", mapping()).unwrap();
        assert_eq!(req.base_url.as_str(), "https://example.com/list");
        assert_eq!(req.page_param.as_deref(), Some("page"));
        assert_eq!(req.item_xpath, "//li");

        let req = ExportRequest::new(BASE, Some(""), ITEMS, mapping()).unwrap();
        assert!(req.page_param.is_none());
    }

    #[test]
    fn test_suggested_name() {
        let options = ExportOptions { export_name: "books".into(), ..Default::default() };
        assert_eq!(suggested_name(&options, None), "books.xlsx");
        assert_eq!(suggested_name(&options, Some(OutputFormat::Json)), "books.json");
    }
}
