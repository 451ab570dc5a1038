//! In-memory page source for network-free tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::fetch::{PageSource, RawPage};
use tabula_core::Error;

/// Serves fixed documents keyed by full URL and records every request.
#[derive(Default)]
pub struct StaticSource {
    pages: HashMap<String, String>,
    fallback: Option<String>,
    requests: Mutex<Vec<String>>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Document served for any URL without an explicit page.
    pub fn fallback(mut self, html: &str) -> Self {
        self.fallback = Some(html.to_string());
        self
    }

    /// Requested URLs, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for StaticSource {
    async fn fetch_html(&self, url: &Url) -> Result<RawPage, Error> {
        self.requests.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .get(url.as_str())
            .or(self.fallback.as_ref())
            .cloned()
            .ok_or_else(|| Error::HttpError(format!("status 404 for {}", url)))?;
        Ok(RawPage { url: url.clone(), final_url: url.clone(), html })
    }
}

/// A listing page with one `<li>` per title; no titles gives an empty list.
pub fn listing(titles: &[&str]) -> String {
    let items: String = titles
        .iter()
        .enumerate()
        .map(|(i, t)| format!(r#"<li class="item"><h2>{t}</h2><a href="/p/{i}" class="rating-{}">{t}</a></li>"#, 10 + i))
        .collect();
    format!(r#"<html><body><ul class="results">{items}</ul></body></html>"#)
}
