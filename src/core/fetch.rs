use crate::core::config::Config;
use crate::error::FetchError;
use bytes::Bytes;
use reqwest::blocking::Client;
use reqwest::Url;
use std::io::Cursor;
use std::time::Duration;
use tracing::debug;

/// A fully downloaded archive held in memory.
///
/// Decoders only ever see it by shared reference, so the bytes never change
/// during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteBuffer(Bytes);

impl ByteBuffer {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A fresh seekable reader positioned at the start of the buffer.
    pub fn cursor(&self) -> Cursor<&[u8]> {
        Cursor::new(self.as_slice())
    }
}

impl From<Bytes> for ByteBuffer {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

/// Retrieves a whole resource into memory.
pub trait Fetch {
    fn fetch(&self, url: &str) -> Result<ByteBuffer, FetchError>;
}

impl<F: Fetch + ?Sized> Fetch for &F {
    fn fetch(&self, url: &str) -> Result<ByteBuffer, FetchError> {
        (**self).fetch(url)
    }
}

/// Blocking fetcher for `http`, `https` and `file` URLs.
pub struct HttpFetcher {
    user_agent: String,
    timeout: Option<Duration>,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout_secs.map(Duration::from_secs),
        }
    }

    fn fetch_http(&self, url: Url) -> Result<ByteBuffer, FetchError> {
        let mut builder = Client::builder().user_agent(self.user_agent.as_str());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        // The response owns the connection; it is released when it drops at
        // the end of this scope on every path.
        let response = client
            .get(url.clone())
            .send()
            .and_then(|response| response.error_for_status())
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        let body = response
            .bytes()
            .map_err(|e| FetchError::network(url.as_str(), e))?;

        debug!("Downloaded {} bytes from {url}", body.len());
        Ok(ByteBuffer::from(body))
    }

    fn fetch_file(&self, url: Url) -> Result<ByteBuffer, FetchError> {
        let path = url
            .to_file_path()
            .map_err(|_| FetchError::invalid_url(url.as_str(), "not a local file path"))?;

        let contents =
            std::fs::read(&path).map_err(|e| FetchError::network(url.as_str(), e))?;

        debug!("Read {} bytes from {}", contents.len(), path.display());
        Ok(ByteBuffer::from(contents))
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<ByteBuffer, FetchError> {
        let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(url, e))?;

        match parsed.scheme() {
            "http" | "https" => self.fetch_http(parsed),
            "file" => self.fetch_file(parsed),
            other => Err(FetchError::invalid_url(
                url,
                format!("unsupported scheme '{other}'"),
            )),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("arcfetch/{}", env!("CARGO_PKG_VERSION"))
}
