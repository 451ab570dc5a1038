//! Job files: the listing, the item path and the column mapping of one export.
//!
//! ```toml
//! url = "https://example.com/books?sort=new"
//! page_param = "page"
//! item_xpath = "//ul[@class='results']/li"
//! output = "books.csv"
//!
//! [[columns]]
//! name = "Title"
//! tag = "link"
//! relative_path = "/h2[1]/a[1]"
//! ```
//!
//! JSON is accepted for files ending in `.json`; everything else is read as TOML.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Format, Json, Toml};
use serde::Deserialize;

use tabula_client::{ExportRequest, OutputFormat};
use tabula_core::{ColumnSpec, FieldMapping};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Job {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_param: Option<String>,
    #[serde(default)]
    pub item_xpath: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<String>,
}

impl Job {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("job file {} not found", path.display());
        }

        let is_json = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let figment = if is_json { Figment::from(Json::file(path)) } else { Figment::from(Toml::file(path)) };

        figment.extract().with_context(|| format!("invalid job file {}", path.display()))
    }

    /// Output format named in the job file, if any.
    pub fn format(&self) -> Result<Option<OutputFormat>> {
        self.format.as_deref().map(str::parse::<OutputFormat>).transpose().context("invalid format in job file")
    }

    pub fn request(&self) -> Result<ExportRequest> {
        let Some(url) = self.url.as_deref() else {
            bail!("no listing url: set `url` in the job file or pass --url");
        };
        let Some(item_xpath) = self.item_xpath.as_deref() else {
            bail!("no item path: set `item_xpath` in the job file or pass --item-xpath");
        };

        let mut mapping = FieldMapping::default();
        for column in &self.columns {
            mapping.push(column.clone()).with_context(|| format!("column '{}'", column.name))?;
        }

        Ok(ExportRequest::new(url, self.page_param.as_deref(), item_xpath, mapping)?)
    }
}
