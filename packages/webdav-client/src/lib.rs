//! Minimal WebDAV file-store client.
//!
//! Talks to a single collection URL with fixed basic-auth credentials.
//! Supports listing the collection, streaming a file to disk and deleting it.
//!
//! # Example
//!
//! ```rust,ignore
//! use webdav_client::WebDavClient;
//!
//! let client = WebDavClient::new("https://dav.example.com/files/relay/", "user", "secret");
//!
//! for name in client.list().await? {
//!     client.download(&name, &format!("./{}", name)).await?;
//!     client.delete(&name).await?;
//! }
//! ```

pub mod error;
pub mod multistatus;

pub use error::{Result, WebDavError};

use std::path::Path;

use futures::StreamExt;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, StatusCode};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Byte counters reported while a download is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub downloaded: u64,
    /// Declared `Content-Length`, 0 when the server did not send one.
    pub total: u64,
}

/// WebDAV client bound to one collection.
#[derive(Clone)]
pub struct WebDavClient {
    client: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
}

impl WebDavClient {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client: reqwest::Client::new(),
            base_url,
            username: username.into(),
            password: password.into(),
        }
    }

    /// Use a preconfigured HTTP client (proxies, timeouts).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of a file inside the collection.
    pub fn file_url(&self, filename: &str) -> String {
        format!("{}{}", self.base_url, urlencoding::encode(filename))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(&self.username, Some(&self.password))
    }

    /// List the files in the collection (one level deep).
    ///
    /// Anything other than `207 Multi-Status` is a [`WebDavError::Listing`].
    pub async fn list(&self) -> Result<Vec<String>> {
        let resp = self
            .request(propfind(), &self.base_url)
            .header("Depth", "1")
            .header(CONTENT_TYPE, HeaderValue::from_static("application/xml"))
            .send()
            .await?;

        let status = resp.status();
        if status != StatusCode::MULTI_STATUS {
            return Err(WebDavError::Listing {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let names = multistatus::parse_file_names(&body)?;
        debug!(count = names.len(), "Listed remote collection");
        Ok(names)
    }

    /// Stream a file to `dest`. Returns the number of bytes written.
    pub async fn download(&self, filename: &str, dest: impl AsRef<Path>) -> Result<u64> {
        self.download_with_progress(filename, dest, |progress| {
            debug!(
                downloaded = progress.downloaded,
                total = progress.total,
                "Download progress"
            );
        })
        .await
    }

    /// Stream a file to `dest`, calling `on_progress` after every chunk.
    ///
    /// The file is flushed before this returns `Ok`.
    pub async fn download_with_progress<F>(
        &self,
        filename: &str,
        dest: impl AsRef<Path>,
        mut on_progress: F,
    ) -> Result<u64>
    where
        F: FnMut(TransferProgress) + Send,
    {
        let url = self.file_url(filename);
        let resp = self.request(Method::GET, &url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(WebDavError::Api {
                method: "GET",
                url,
                status: status.as_u16(),
            });
        }

        let total = resp.content_length().unwrap_or(0);
        let mut file = tokio::fs::File::create(dest.as_ref()).await?;
        let mut downloaded = 0u64;
        let mut stream = resp.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
            on_progress(TransferProgress { downloaded, total });
        }

        file.flush().await?;
        info!(
            filename = %filename,
            bytes = downloaded,
            path = %dest.as_ref().display(),
            "File downloaded"
        );
        Ok(downloaded)
    }

    /// Remove a file. A file that is already gone counts as removed.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let url = self.file_url(filename);
        let resp = self.request(Method::DELETE, &url).send().await?;

        let status = resp.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            debug!(filename = %filename, status = status.as_u16(), "Remote file removed");
            return Ok(());
        }

        Err(WebDavError::Api {
            method: "DELETE",
            url,
            status: status.as_u16(),
        })
    }
}

fn propfind() -> Method {
    Method::from_bytes(b"PROPFIND").expect("PROPFIND is a valid method token")
}
