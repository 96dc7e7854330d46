use crate::error::LibraryError;

/// A validated, inclusive byte span of a file of `total` bytes.
///
/// Only produced by [`compute_window`]; for a non-empty file `start <= end <= total - 1`
/// always holds. An empty file yields the single empty full window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    start: u64,
    end: u64,
    total: u64,
}

impl RangeWindow {
    fn full(total: u64) -> Self {
        Self { start: 0, end: total.saturating_sub(1), total }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of bytes in the window (`end - start + 1`, zero for an empty file).
    pub fn len(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the window spans the whole file (served as `200`, not `206`).
    pub fn is_full(&self) -> bool {
        self.start == 0 && self.len() == self.total
    }

    /// `Content-Range` value for a partial response.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Computes the byte window to serve for an optional `Range` header.
///
/// No header means the whole file. Accepted forms are `bytes=<start>-<end>`,
/// `bytes=<start>-` and the suffix form `bytes=-<n>`. The window always covers the full
/// span the client asked for; an explicit `end` past the last byte, multiple ranges or
/// anything unparsable is [`LibraryError::RangeNotSatisfiable`].
pub fn compute_window(range_header: Option<&str>, file_size: u64) -> Result<RangeWindow, LibraryError> {
    let header = match range_header {
        None => return Ok(RangeWindow::full(file_size)),
        Some(h) => h.trim(),
    };
    let unsatisfiable = || LibraryError::RangeNotSatisfiable { total: file_size };

    let (unit, ranges) = header.split_once('=').ok_or_else(unsatisfiable)?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(unsatisfiable());
    }
    let ranges = ranges.trim();
    if ranges.contains(',') || file_size == 0 {
        return Err(unsatisfiable());
    }
    let (start_str, end_str) = ranges.split_once('-').ok_or_else(unsatisfiable)?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());
    let last = file_size - 1;

    let (start, end) = match (start_str.is_empty(), end_str.is_empty()) {
        // bytes=-500 (last 500 bytes)
        (true, false) => {
            let suffix = parse_position(end_str).ok_or_else(unsatisfiable)?;
            if suffix == 0 {
                return Err(unsatisfiable());
            }
            (file_size.saturating_sub(suffix), last)
        }
        // bytes=500- (from 500 to end)
        (false, true) => (parse_position(start_str).ok_or_else(unsatisfiable)?, last),
        // bytes=0-499
        (false, false) => (
            parse_position(start_str).ok_or_else(unsatisfiable)?,
            parse_position(end_str).ok_or_else(unsatisfiable)?,
        ),
        (true, true) => return Err(unsatisfiable()),
    };

    if start > end || end > last {
        return Err(unsatisfiable());
    }
    Ok(RangeWindow { start, end, total: file_size })
}

/// Plain ASCII digits only; `u64::from_str` would also take a leading `+`.
fn parse_position(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(header: &str, size: u64) -> Result<RangeWindow, LibraryError> {
        compute_window(Some(header), size)
    }

    #[test]
    fn no_header_is_full_file() {
        let w = compute_window(None, 1000).unwrap();
        assert_eq!((w.start(), w.end(), w.total()), (0, 999, 1000));
        assert_eq!(w.len(), 1000);
        assert!(w.is_full());
    }

    #[test]
    fn bounded_range() {
        let w = window("bytes=0-99", 1000).unwrap();
        assert_eq!((w.start(), w.end()), (0, 99));
        assert_eq!(w.len(), 100);
        assert!(!w.is_full());
        assert_eq!(w.content_range(), "bytes 0-99/1000");
    }

    #[test]
    fn open_ended_range_is_not_truncated() {
        let w = window("bytes=100-", 50_000_000).unwrap();
        assert_eq!((w.start(), w.end()), (100, 49_999_999));
        assert_eq!(w.len(), 49_999_900);
    }

    #[test]
    fn range_covering_whole_file_counts_as_full() {
        assert!(window("bytes=0-999", 1000).unwrap().is_full());
        assert!(window("bytes=0-", 1000).unwrap().is_full());
    }

    #[test]
    fn suffix_range() {
        let w = window("bytes=-100", 1000).unwrap();
        assert_eq!((w.start(), w.end()), (900, 999));
        // longer than the file: clamped to the whole file
        let w = window("bytes=-5000", 1000).unwrap();
        assert_eq!((w.start(), w.end()), (0, 999));
    }

    #[test]
    fn end_past_last_byte_is_rejected() {
        match window("bytes=990-2000", 1000) {
            Err(LibraryError::RangeNotSatisfiable { total }) => assert_eq!(total, 1000),
            other => panic!("expected RangeNotSatisfiable, got {:?}", other),
        }
    }

    #[test]
    fn malformed_ranges_are_rejected() {
        for h in [
            "bytes=",
            "bytes=-",
            "bytes=abc-",
            "bytes=+5-10",
            "bytes=10-5",
            "bytes=1000-",
            "bytes=-0",
            "bytes=0-1,5-9",
            "items=0-10",
            "0-10",
            "bytes=99999999999999999999999-",
        ] {
            assert!(
                matches!(window(h, 1000), Err(LibraryError::RangeNotSatisfiable { total: 1000 })),
                "{h} should be unsatisfiable"
            );
        }
    }

    #[test]
    fn unit_is_case_insensitive_and_whitespace_tolerant() {
        let w = window(" Bytes = 10 - 19 ", 1000).unwrap();
        assert_eq!((w.start(), w.end()), (10, 19));
    }

    #[test]
    fn empty_file() {
        let w = compute_window(None, 0).unwrap();
        assert!(w.is_empty());
        assert!(w.is_full());
        assert!(window("bytes=0-", 0).is_err());
    }
}
