//! Link extractor: page → download section → indirection pages → direct URLs.
//!
//! `extract` returns a finite stream of [`ScrapeProgress`] events. Failures
//! never escape the stream: a missing download section ends it with a single
//! `error` event, a link that cannot be resolved yields an `error` event and
//! the loop moves on to the next link.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::common::{ScrapeProgress, ScrapedLink};
use crate::kernel::BasePageFetcher;

/// Where to look and what to match. Defaults target the one site layout the
/// relay currently supports.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// CSS selector of the collapsible blocks holding the mirror lists
    pub section_selector: String,
    /// Which matching block lists the download links
    pub block_index: usize,
    /// Substring an anchor href must contain to be a candidate
    pub link_marker: String,
    /// Substring identifying the script that builds the download URL
    pub script_marker: String,
    /// Pattern of the direct download URL inside that script
    pub download_pattern: String,
    /// Pause between two indirection pages
    pub pacing: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            section_selector: "div.su-spoiler-content.su-u-clearfix.su-u-trim".to_string(),
            block_index: 1,
            link_marker: "fucking".to_string(),
            script_marker: "function download()".to_string(),
            download_pattern: r#"https://fuckingfast\.co/[^\s"']+"#.to_string(),
            pacing: Duration::from_millis(100),
        }
    }
}

impl ExtractorConfig {
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }
}

/// Why a page or a link could not be turned into download links.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("Could not find any download section on the page")]
    MissingSection,

    #[error("No download links found")]
    NoCandidates,

    #[error("Error processing link {url}: no file name fragment")]
    MissingFragment { url: String },

    #[error("Error processing link {url}: no download URL found")]
    Unresolved { url: String },

    #[error("invalid {what}: {reason}")]
    InvalidConfig { what: &'static str, reason: String },
}

/// Resolves a page's download links through their indirection pages.
pub struct LinkExtractor {
    fetcher: Arc<dyn BasePageFetcher>,
    config: ExtractorConfig,
    section: Selector,
    anchor: Selector,
    script: Selector,
    download_url: Regex,
}

impl LinkExtractor {
    pub fn new(
        fetcher: Arc<dyn BasePageFetcher>,
        config: ExtractorConfig,
    ) -> Result<Self, ExtractError> {
        let section =
            Selector::parse(&config.section_selector).map_err(|e| ExtractError::InvalidConfig {
                what: "section selector",
                reason: e.to_string(),
            })?;
        let download_url =
            Regex::new(&config.download_pattern).map_err(|e| ExtractError::InvalidConfig {
                what: "download pattern",
                reason: e.to_string(),
            })?;

        Ok(Self {
            fetcher,
            config,
            section,
            anchor: Selector::parse("a[href]").map_err(|e| ExtractError::InvalidConfig {
                what: "anchor selector",
                reason: e.to_string(),
            })?,
            script: Selector::parse("script").map_err(|e| ExtractError::InvalidConfig {
                what: "script selector",
                reason: e.to_string(),
            })?,
            download_url,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Stream progress while resolving every download link of `page_url`.
    ///
    /// Each call fetches everything afresh.
    pub fn extract(
        &self,
        page_url: impl Into<String>,
    ) -> impl Stream<Item = ScrapeProgress> + Send + '_ {
        let page_url = page_url.into();

        stream! {
            let page = match self.fetcher.fetch_html(&page_url).await {
                Ok(page) => page,
                Err(e) => {
                    warn!(url = %page_url, error = %e, "Page fetch failed");
                    let err = ExtractError::Fetch { url: page_url.clone(), reason: e.to_string() };
                    yield ScrapeProgress::error(0, 0, err.to_string());
                    return;
                }
            };

            let candidates = match self.candidate_links(&page_url, &page) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(url = %page_url, error = %e, "No usable download section");
                    yield ScrapeProgress::error(0, 0, e.to_string());
                    return;
                }
            };

            let total = candidates.len();
            info!(url = %page_url, total, "Extracting download links");
            yield ScrapeProgress::started(total);

            let mut links: Vec<ScrapedLink> = Vec::new();

            for (i, link) in candidates.iter().enumerate() {
                let current = i + 1;
                if i > 0 {
                    tokio::time::sleep(self.config.pacing).await;
                }

                let html = match self.fetcher.fetch_html(link).await {
                    Ok(html) => html,
                    Err(e) => {
                        warn!(url = %link, error = %e, "Indirection page fetch failed");
                        let err = ExtractError::Fetch { url: link.clone(), reason: e.to_string() };
                        yield ScrapeProgress::error(current, total, err.to_string());
                        continue;
                    }
                };

                let filename = match file_name_from_link(link) {
                    Some(filename) => filename,
                    None => {
                        let err = ExtractError::MissingFragment { url: link.clone() };
                        yield ScrapeProgress::error(current, total, err.to_string());
                        continue;
                    }
                };

                yield ScrapeProgress::processing(current, total, &filename);

                match self.find_download_url(&html) {
                    Some(url) if links.iter().any(|l| l.filename == filename) => {
                        debug!(filename = %filename, url = %url, "Duplicate file name, keeping first");
                    }
                    Some(url) => links.push(ScrapedLink::new(filename, url)),
                    None => {
                        let err = ExtractError::Unresolved { url: link.clone() };
                        yield ScrapeProgress::error(current, total, err.to_string())
                            .with_filename(filename);
                    }
                }
            }

            info!(url = %page_url, resolved = links.len(), total, "Extraction completed");
            yield ScrapeProgress::completed(total, links);
        }
    }

    /// Drive `extract` to the end and return the resolved links.
    pub async fn collect_links(&self, page_url: &str) -> anyhow::Result<Vec<ScrapedLink>> {
        use futures::StreamExt;

        let stream = self.extract(page_url);
        futures::pin_mut!(stream);

        let mut last_error = None;
        while let Some(progress) = stream.next().await {
            if let Some(links) = progress.links {
                return Ok(links);
            }
            if progress.is_terminal() {
                last_error = progress.message;
            }
        }
        Err(anyhow::anyhow!(last_error
            .unwrap_or_else(|| "extraction ended without result".to_string())))
    }

    /// Candidate links in document order, absolute.
    fn candidate_links(&self, page_url: &str, page: &str) -> Result<Vec<String>, ExtractError> {
        let document = Html::parse_document(page);
        let block = document
            .select(&self.section)
            .nth(self.config.block_index)
            .ok_or(ExtractError::MissingSection)?;

        let base = Url::parse(page_url).ok();
        let links: Vec<String> = block
            .select(&self.anchor)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.contains(&self.config.link_marker))
            .map(|href| absolute_link(base.as_ref(), href))
            .collect();

        if links.is_empty() {
            return Err(ExtractError::NoCandidates);
        }
        Ok(links)
    }

    /// First download URL inside the download script, if any.
    fn find_download_url(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let script = document
            .select(&self.script)
            .map(|s| s.html())
            .find(|s| s.contains(&self.config.script_marker))?;

        self.download_url
            .find(&script)
            .map(|m| m.as_str().to_string())
    }
}

/// Resolve `href` against the page URL. The fragment is carried over
/// verbatim since it holds the file name; `Url` would percent-encode it.
fn absolute_link(base: Option<&Url>, href: &str) -> String {
    let (target, fragment) = match href.split_once('#') {
        Some((target, fragment)) => (target, Some(fragment)),
        None => (href, None),
    };
    let resolved = base
        .and_then(|base| base.join(target).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| target.to_string());

    match fragment {
        Some(fragment) => format!("{}#{}", resolved, fragment),
        None => resolved,
    }
}

/// File name carried in the link's fragment (`.../abc#setup.part01.rar`).
fn file_name_from_link(link: &str) -> Option<String> {
    link.split_once('#')
        .map(|(_, fragment)| fragment.trim().to_string())
        .filter(|name| !name.is_empty())
}
