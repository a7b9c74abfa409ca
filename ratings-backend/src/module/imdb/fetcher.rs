//! Dataset fetcher
//!
//! Streams a gzip-compressed TSV dataset to a transient file, then hands out
//! a lazy line stream decoding it. The transient file lives exactly as long
//! as the stream.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_compression::tokio::bufread::GzipDecoder;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use tempfile::TempPath;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_stream::wrappers::SplitStream;

/// A remote dataset: a short name used for staging/logging plus its URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    /// e.g. "title.ratings.tsv"
    pub name: String,
    pub url: String,
}

impl DatasetDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to download {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to stage {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Lazy, finite, non-restartable sequence of decoded lines.
///
/// Read errors (including a corrupt gzip stream) surface as `Err` items.
pub type LineStream = Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>;

/// Anything that can turn a dataset descriptor into a line stream
#[async_trait]
pub trait DatasetSource: Send + Sync {
    async fn fetch(&self, dataset: &DatasetDescriptor) -> Result<LineStream, FetchError>;
}

/// Fetches datasets over HTTP, staging the compressed payload on disk
pub struct HttpDatasetFetcher {
    client: Client,
    staging_dir: PathBuf,
}

impl HttpDatasetFetcher {
    pub fn new(
        staging_dir: impl Into<PathBuf>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("ratings-backend/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(client, staging_dir))
    }

    pub fn with_client(client: Client, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            client,
            staging_dir: staging_dir.into(),
        }
    }

    /// Stream the response body into `path`. Returns the number of bytes written.
    async fn download(&self, dataset: &DatasetDescriptor, path: &Path) -> Result<u64, FetchError> {
        let http_err = |source| FetchError::Http {
            url: dataset.url.clone(),
            source,
        };
        let io_err = |source| FetchError::Io {
            name: dataset.name.clone(),
            source,
        };

        let response = self
            .client
            .get(&dataset.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;

        if let Some(len) = response.content_length() {
            tracing::info!("Downloading {} ({:.1} MB)", dataset.name, len as f64 / 1_048_576.0);
        } else {
            tracing::info!("Downloading {}", dataset.name);
        }

        let mut file = File::create(path).await.map_err(io_err)?;
        let mut body = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(http_err)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;

        Ok(written)
    }
}

#[async_trait]
impl DatasetSource for HttpDatasetFetcher {
    async fn fetch(&self, dataset: &DatasetDescriptor) -> Result<LineStream, FetchError> {
        let io_err = |source| FetchError::Io {
            name: dataset.name.clone(),
            source,
        };

        tokio::fs::create_dir_all(&self.staging_dir)
            .await
            .map_err(io_err)?;

        // Removed on drop, whether the download fails or the stream is consumed.
        let artifact = tempfile::Builder::new()
            .prefix(&format!("{}.", dataset.name))
            .suffix(".gz")
            .tempfile_in(&self.staging_dir)
            .map_err(io_err)?
            .into_temp_path();

        let written = self.download(dataset, &artifact).await?;
        tracing::info!("Downloaded {} ({} bytes), extracting...", dataset.name, written);

        let lines = DatasetLines::open(artifact).await.map_err(io_err)?;
        Ok(Box::pin(lines))
    }
}

/// Line stream over a staged gzip file; deletes the file when dropped.
pub struct DatasetLines {
    lines: SplitStream<BufReader<GzipDecoder<BufReader<File>>>>,
    _artifact: TempPath,
}

impl DatasetLines {
    pub async fn open(artifact: TempPath) -> io::Result<Self> {
        let file = File::open(&artifact).await?;
        let mut decoder = GzipDecoder::new(BufReader::new(file));
        decoder.multiple_members(true);

        Ok(Self {
            lines: SplitStream::new(BufReader::new(decoder).split(b'\n')),
            _artifact: artifact,
        })
    }
}

impl Stream for DatasetLines {
    type Item = io::Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.lines)
            .poll_next(cx)
            .map(|item| item.map(|line| line.map(decode_line)))
    }
}

/// Bytes of one line (without `\n`) to text. Drops a trailing `\r`; invalid UTF-8 is replaced.
fn decode_line(mut bytes: Vec<u8>) -> String {
    if bytes.last() == Some(&b'\r') {
        bytes.pop();
    }
    match String::from_utf8(bytes) {
        Ok(line) => line,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
