use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::range::RangeWindow;
use crate::error::LibraryError;
use crate::metrics::Metrics;

/// Status and headers for serving `window` of a file.
///
/// `206` with `Content-Range` when the window is a strict sub-range, `200` otherwise.
/// `Content-Length` always equals the window length.
pub fn response_head(window: &RangeWindow, content_type: &'static str) -> (StatusCode, HeaderMap) {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(window.len()));
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if window.is_full() {
        return (StatusCode::OK, headers);
    }
    if let Ok(v) = HeaderValue::from_str(&window.content_range()) {
        headers.insert(header::CONTENT_RANGE, v);
    }
    (StatusCode::PARTIAL_CONTENT, headers)
}

/// A lazy, finite, non-restartable sequence of file chunks covering one [`RangeWindow`].
///
/// The file handle lives inside the stream. Dropping the stream (response finished, client
/// gone, read error) closes it.
pub struct ChunkedStream {
    session: StreamSession,
}

impl ChunkedStream {
    /// Opens `path` and positions it at `window.start()`.
    pub async fn open(
        path: &Path,
        window: &RangeWindow,
        chunk_size: usize,
        cancel: CancellationToken,
        metrics: Metrics,
    ) -> Result<Self, LibraryError> {
        let mut file = File::open(path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => LibraryError::NotFound(path.display().to_string()),
            _ => LibraryError::StreamIo(e),
        })?;
        if window.start() > 0 {
            file.seek(SeekFrom::Start(window.start())).await.map_err(LibraryError::StreamIo)?;
        }
        metrics.stream_opened();
        Ok(Self {
            session: StreamSession {
                file,
                path: path.to_path_buf(),
                remaining: window.len(),
                chunk_size: chunk_size.max(1),
                cancel,
                sent: 0,
                done: false,
                metrics,
            },
        })
    }

    /// Bytes still to be produced.
    pub fn remaining(&self) -> u64 {
        self.session.remaining
    }

    /// Each poll reads at most one chunk, and only when the consumer asks for it.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        futures::stream::unfold(self.session, |mut session| async move {
            let item = session.next_chunk().await?;
            Some((item, session))
        })
    }
}

struct StreamSession {
    file: File,
    path: PathBuf,
    remaining: u64,
    chunk_size: usize,
    cancel: CancellationToken,
    sent: u64,
    done: bool,
    metrics: Metrics,
}

impl StreamSession {
    async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if self.done || self.remaining == 0 {
            return None;
        }
        let want = self.remaining.min(self.chunk_size as u64) as usize;
        let mut buf = BytesMut::zeroed(want);
        let cancel = self.cancel.clone();
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            r = fill(&mut self.file, &mut buf) => Some(r),
        };
        match outcome {
            None => {
                self.done = true;
                Some(Err(io::Error::new(io::ErrorKind::Interrupted, "stream cancelled")))
            }
            Some(Ok(0)) => {
                // EOF before the window end: hard stop
                self.done = true;
                None
            }
            Some(Ok(n)) => {
                if n < want {
                    self.done = true;
                }
                buf.truncate(n);
                self.remaining -= n as u64;
                self.sent += n as u64;
                Some(Ok(buf.freeze()))
            }
            Some(Err(e)) => {
                self.done = true;
                warn!(path = %self.path.display(), "Stream read failed: {}", e);
                Some(Err(e))
            }
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.metrics.stream_closed(self.sent);
        trace!(path = %self.path.display(), sent = self.sent, remaining = self.remaining, "Stream released");
    }
}

/// Reads until `buf` is full or the file ends. Returns the number of bytes read.
async fn fill(file: &mut File, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
