#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use axum::http::{header, StatusCode};
    use futures::StreamExt;
    use tokio_util::sync::CancellationToken;

    use crate::metrics::Metrics;
    use crate::streaming::{compute_window, content_type_for, response_head, ChunkedStream};
    use crate::tests::{library, sample_bytes, SAMPLE_LEN};

    async fn collect(stream: ChunkedStream) -> (Vec<u8>, Vec<usize>) {
        let mut s = Box::pin(stream.into_stream());
        let mut body = Vec::new();
        let mut chunks = Vec::new();
        while let Some(item) = s.next().await {
            let bytes = item.unwrap();
            chunks.push(bytes.len());
            body.extend_from_slice(&bytes);
        }
        (body, chunks)
    }

    #[tokio::test]
    async fn streams_whole_file_in_bounded_chunks() {
        let fx = library();
        let path = fx.root().join("sample.mp4");
        let window = compute_window(None, SAMPLE_LEN as u64).unwrap();

        let stream = ChunkedStream::open(&path, &window, 64, CancellationToken::new(), Metrics::new())
            .await
            .unwrap();
        assert_eq!(stream.remaining(), SAMPLE_LEN as u64);
        let (body, chunks) = collect(stream).await;

        assert_eq!(body, sample_bytes());
        assert_eq!(chunks.len(), 16);
        assert!(chunks.iter().all(|&c| c <= 64));
    }

    #[tokio::test]
    async fn streams_only_the_window() {
        let fx = library();
        let path = fx.root().join("sample.mp4");
        let window = compute_window(Some("bytes=100-349"), SAMPLE_LEN as u64).unwrap();

        let stream = ChunkedStream::open(&path, &window, 100, CancellationToken::new(), Metrics::new())
            .await
            .unwrap();
        let (body, chunks) = collect(stream).await;

        assert_eq!(body, sample_bytes()[100..350].to_vec());
        assert_eq!(chunks, vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn cancellation_ends_the_stream() {
        let fx = library();
        let path = fx.root().join("sample.mp4");
        let window = compute_window(None, SAMPLE_LEN as u64).unwrap();
        let cancel = CancellationToken::new();
        let metrics = Metrics::new();

        let stream = ChunkedStream::open(&path, &window, 64, cancel.clone(), metrics.clone())
            .await
            .unwrap();
        let mut s = Box::pin(stream.into_stream());

        let first = s.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 64);

        cancel.cancel();
        let err = s.next().await.unwrap().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(s.next().await.is_none());

        drop(s);
        let m = metrics.get_snapshot();
        assert_eq!(m.streams_active, 0);
        assert_eq!(m.bytes_streamed, 64);
    }

    #[tokio::test]
    async fn dropping_the_stream_releases_the_session() {
        let fx = library();
        let path = fx.root().join("sample.mp4");
        let window = compute_window(None, SAMPLE_LEN as u64).unwrap();
        let metrics = Metrics::new();

        let stream = ChunkedStream::open(&path, &window, 128, CancellationToken::new(), metrics.clone())
            .await
            .unwrap();
        assert_eq!(metrics.get_snapshot().streams_active, 1);

        let mut s = Box::pin(stream.into_stream());
        s.next().await.unwrap().unwrap();
        // consumer goes away mid-body
        drop(s);

        let m = metrics.get_snapshot();
        assert_eq!(m.streams_started, 1);
        assert_eq!(m.streams_active, 0);
        assert_eq!(m.bytes_streamed, 128);
    }

    #[tokio::test]
    async fn end_of_file_is_a_hard_stop() {
        let fx = library();
        let path = fx.root().join("sample.mp4");
        let window = compute_window(None, SAMPLE_LEN as u64).unwrap();
        // file shrinks after the window was computed
        std::fs::OpenOptions::new().write(true).open(&path).unwrap().set_len(500).unwrap();

        let stream = ChunkedStream::open(&path, &window, 256, CancellationToken::new(), Metrics::new())
            .await
            .unwrap();
        let (body, _) = collect(stream).await;

        assert_eq!(body, sample_bytes()[..500].to_vec());
    }

    #[tokio::test]
    async fn empty_file_yields_nothing() {
        let fx = library();
        let path = fx.root().join("empty.mp4");
        std::fs::write(&path, b"").unwrap();
        let window = compute_window(None, 0).unwrap();

        let stream = ChunkedStream::open(&path, &window, 64, CancellationToken::new(), Metrics::new())
            .await
            .unwrap();
        let (body, chunks) = collect(stream).await;

        assert!(body.is_empty());
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn opening_a_missing_file_is_not_found() {
        let fx = library();
        let window = compute_window(None, 10).unwrap();

        let res = ChunkedStream::open(
            &fx.root().join("gone.mp4"),
            &window,
            64,
            CancellationToken::new(),
            Metrics::new(),
        )
        .await;

        assert!(matches!(res, Err(crate::error::LibraryError::NotFound(_))));
    }

    #[test]
    fn full_window_head() {
        let window = compute_window(None, 1000).unwrap();
        let (status, headers) = response_head(&window, "video/mp4");

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_LENGTH], "1000");
        assert_eq!(headers[header::ACCEPT_RANGES], "bytes");
        assert_eq!(headers[header::CONTENT_TYPE], "video/mp4");
        assert!(!headers.contains_key(header::CONTENT_RANGE));
    }

    #[test]
    fn partial_window_head() {
        let window = compute_window(Some("bytes=0-99"), 1000).unwrap();
        let (status, headers) = response_head(&window, "video/webm");

        assert_eq!(status, StatusCode::PARTIAL_CONTENT);
        assert_eq!(headers[header::CONTENT_LENGTH], "100");
        assert_eq!(headers[header::CONTENT_RANGE], "bytes 0-99/1000");
    }

    #[test]
    fn explicit_whole_file_range_is_served_as_ok() {
        let window = compute_window(Some("bytes=0-999"), 1000).unwrap();
        let (status, headers) = response_head(&window, "video/mp4");

        assert_eq!(status, StatusCode::OK);
        assert!(!headers.contains_key(header::CONTENT_RANGE));
    }

    #[test]
    fn content_type_lookup() {
        assert_eq!(content_type_for(Path::new("a.mp4")), "video/mp4");
        assert_eq!(content_type_for(Path::new("a.MKV")), "video/x-matroska");
        assert_eq!(content_type_for(Path::new("a.webm")), "video/webm");
        assert_eq!(content_type_for(Path::new("a.mov")), "video/quicktime");
        assert_eq!(content_type_for(Path::new("a.unknown")), "video/mp4");
        assert_eq!(content_type_for(Path::new("no_extension")), "video/mp4");
    }
}
