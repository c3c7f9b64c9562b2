//! Scraping domain - resolves a page's download links with a progress stream

pub mod extractor;

pub use extractor::{ExtractError, ExtractorConfig, LinkExtractor};
