//! Table persistence: CSV, TSV, JSON and XLSX workbooks.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use rust_xlsxwriter::{DocProperties, Format, Workbook, XlsxError};
use serde::Serialize;

use tabula_core::{Cell, Error, Row, Table};

/// Generator stamp written into JSON exports and as the workbook author.
pub const GENERATOR: &str = concat!("tabula ", env!("CARGO_PKG_VERSION"));

/// Name of the single worksheet in XLSX exports.
const WORKSHEET_NAME: &str = "tabula";

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Tsv,
    Json,
    #[default]
    Xlsx,
}

impl OutputFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(|e| e.parse().ok())
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "tsv" | "tab" => Ok(OutputFormat::Tsv),
            "json" => Ok(OutputFormat::Json),
            "xlsx" => Ok(OutputFormat::Xlsx),
            other => Err(Error::InvalidInput(format!("unknown output format '{}'", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    generator: &'static str,
    exported_at: String,
    header: &'a [String],
    rows: &'a [Row],
}

/// Writes a finished [`Table`] in one format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableWriter {
    format: OutputFormat,
}

impl TableWriter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// `explicit` wins; otherwise the extension of `path`, then XLSX.
    pub fn for_path(path: &Path, explicit: Option<OutputFormat>) -> Self {
        Self::new(explicit.or_else(|| OutputFormat::from_path(path)).unwrap_or_default())
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Create (or truncate) `path` and write the table to it.
    pub fn write_path(&self, table: &Table, path: &Path) -> Result<(), Error> {
        let file = File::create(path).map_err(|e| Error::PersistFailed(format!("{}: {}", path.display(), e)))?;
        self.write_to(table, BufWriter::new(file))?;
        tracing::info!("wrote {} row(s) to {} as {}", table.len(), path.display(), self.format);
        Ok(())
    }

    pub fn write_to<W: Write>(&self, table: &Table, out: W) -> Result<(), Error> {
        match self.format {
            OutputFormat::Csv => write_delimited(table, out, b','),
            OutputFormat::Tsv => write_delimited(table, out, b'\t'),
            OutputFormat::Json => write_json(table, out),
            OutputFormat::Xlsx => write_xlsx(table, out),
        }
    }
}

fn write_delimited<W: Write>(table: &Table, out: W, delimiter: u8) -> Result<(), Error> {
    let persist = |e: csv::Error| Error::PersistFailed(e.to_string());
    let mut writer = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);

    writer.write_record(table.header()).map_err(persist)?;
    for row in table.rows() {
        let fields: Vec<_> = row.iter().map(|cell| cell.to_field()).collect();
        writer.write_record(fields.iter().map(|f| f.as_bytes())).map_err(persist)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(table: &Table, mut out: W) -> Result<(), Error> {
    let doc = JsonExport {
        generator: GENERATOR,
        exported_at: chrono::Utc::now().to_rfc3339(),
        header: table.header(),
        rows: table.rows(),
    };
    serde_json::to_writer_pretty(&mut out, &doc).map_err(|e| Error::PersistFailed(e.to_string()))?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

fn write_xlsx<W: Write>(table: &Table, mut out: W) -> Result<(), Error> {
    let buffer = workbook(table).map_err(|e| Error::PersistFailed(e.to_string()))?;
    out.write_all(&buffer)?;
    out.flush()?;
    Ok(())
}

/// One worksheet: a bold header row, then the data rows. Absent cells stay blank.
fn workbook(table: &Table) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    workbook.set_properties(&DocProperties::new().set_author(GENERATOR));

    let bold = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    for (col, name) in table.header().iter().enumerate() {
        worksheet.write_string_with_format(0, column_index(col)?, name, &bold)?;
    }

    for (index, row) in table.rows().iter().enumerate() {
        let row_index = u32::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col, cell) in row.iter().enumerate() {
            let col = column_index(col)?;
            match cell {
                Cell::Number(n) => {
                    worksheet.write_number(row_index, col, *n)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row_index, col, s)?;
                }
                Cell::Absent => {}
            }
        }
    }

    workbook.save_to_buffer()
}

fn column_index(col: usize) -> Result<u16, XlsxError> {
    u16::try_from(col).map_err(|_| XlsxError::RowColumnLimitError)
}
