//! Minimal HTTP response parsing over a reassembled flow.
//!
//! Detects image responses and recovers the body bytes. Parsing is
//! idempotent over a growing buffer: callers re-run it as packets arrive
//! and wait while [`extract_body`] returns `None`. No decoding or
//! validation of the image payload happens here - that is the analysis
//! queue's job.

/// Header/body separator.
const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

/// A parsed HTTP response: status, header map, and the body byte range.
/// Derived losslessly from a flow buffer; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpExchange {
    /// Status code from the status line.
    pub status: u16,
    /// Header name/value pairs in arrival order. Names are lowercased.
    pub headers: Vec<(String, String)>,
    /// Offset of the first body byte in the source buffer.
    pub body_start: usize,
}

impl HttpExchange {
    /// Returns the first header with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// The Content-Type header value, if present.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// The Content-Length header value, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header("content-length")?.trim().parse().ok()
    }

    /// True if the response declares an image content type.
    pub fn is_image(&self) -> bool {
        self.content_type()
            .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("image"))
            .unwrap_or(false)
    }

    /// The body bytes currently available in the source buffer.
    pub fn body<'a>(&self, buffer: &'a [u8]) -> &'a [u8] {
        &buffer[self.body_start.min(buffer.len())..]
    }

    /// True once the declared Content-Length has fully arrived. With no
    /// declared length, completeness cannot be judged here and the caller
    /// should extract at flow close.
    pub fn body_complete(&self, buffer: &[u8]) -> bool {
        match self.content_length() {
            Some(expected) => self.body(buffer).len() >= expected,
            None => false,
        }
    }
}

/// True iff the buffer starts with an HTTP status line and a header
/// declares an image content type.
pub fn is_http_image_response(buffer: &[u8]) -> bool {
    if !buffer.starts_with(b"HTTP/") {
        return false;
    }
    contains_ignore_ascii_case(header_section(buffer), b"content-type: image")
}

/// Returns the bytes after the blank-line separator, or `None` if the
/// separator has not arrived yet (caller should wait for more packets).
pub fn extract_body(buffer: &[u8]) -> Option<&[u8]> {
    let end = find(buffer, HEADER_TERMINATOR)?;
    Some(&buffer[end + HEADER_TERMINATOR.len()..])
}

/// Parses the status line and headers. `None` until the full header
/// section has arrived or when the status line is malformed.
pub fn parse_exchange(buffer: &[u8]) -> Option<HttpExchange> {
    let header_end = find(buffer, HEADER_TERMINATOR)?;
    let head = std::str::from_utf8(&buffer[..header_end]).ok()?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next()?;
    if !status_line.starts_with("HTTP/") {
        return None;
    }
    let status: u16 = status_line.split_whitespace().nth(1)?.parse().ok()?;

    let headers = lines
        .filter_map(|line| {
            let (name, value) = line.split_once(':')?;
            Some((name.trim().to_ascii_lowercase(), value.trim().to_string()))
        })
        .collect();

    Some(HttpExchange {
        status,
        headers,
        body_start: header_end + HEADER_TERMINATOR.len(),
    })
}

/// The header section: everything before the terminator, or the whole
/// buffer while the terminator is still in flight.
fn header_section(buffer: &[u8]) -> &[u8] {
    match find(buffer, HEADER_TERMINATOR) {
        Some(end) => &buffer[..end],
        None => buffer,
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn contains_ignore_ascii_case(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_RESPONSE: &[u8] =
        b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 4\r\n\r\n\x89PNG";

    #[test]
    fn detects_image_responses() {
        assert!(is_http_image_response(PNG_RESPONSE));
        assert!(is_http_image_response(
            b"HTTP/1.1 200 OK\r\ncontent-type: IMAGE/JPEG\r\n\r\n"
        ));
    }

    #[test]
    fn rejects_non_image_responses() {
        assert!(!is_http_image_response(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html>"
        ));
        assert!(!is_http_image_response(b"GET / HTTP/1.1\r\n\r\n"));
        assert!(!is_http_image_response(b""));
    }

    #[test]
    fn detects_image_header_before_separator_arrives() {
        // Header still streaming in: the type is already visible.
        assert!(is_http_image_response(
            b"HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Le"
        ));
    }

    #[test]
    fn body_extraction_waits_for_separator() {
        assert_eq!(
            extract_body(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n"),
            None
        );
        assert_eq!(extract_body(PNG_RESPONSE), Some(&b"\x89PNG"[..]));
    }

    #[test]
    fn exchange_parses_status_and_headers() {
        let exchange = parse_exchange(PNG_RESPONSE).unwrap();
        assert_eq!(exchange.status, 200);
        assert_eq!(exchange.content_type(), Some("image/png"));
        assert_eq!(exchange.content_length(), Some(4));
        assert!(exchange.is_image());
        assert_eq!(exchange.body(PNG_RESPONSE), b"\x89PNG");
    }

    #[test]
    fn exchange_waits_for_full_headers() {
        assert!(parse_exchange(b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\n").is_none());
    }

    #[test]
    fn malformed_status_line_is_rejected() {
        assert!(parse_exchange(b"NONSENSE 200\r\n\r\n").is_none());
        assert!(parse_exchange(b"HTTP/1.1 abc\r\n\r\n").is_none());
    }

    #[test]
    fn body_completeness_tracks_content_length() {
        let partial = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 8\r\n\r\n\x89PNG";
        let exchange = parse_exchange(partial).unwrap();
        assert!(!exchange.body_complete(partial));

        let full = b"HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: 8\r\n\r\n\x89PNG\r\n\x1a\n";
        let exchange = parse_exchange(full).unwrap();
        assert!(exchange.body_complete(full));
    }

    #[test]
    fn unknown_length_is_never_complete_here() {
        let buffer = b"HTTP/1.1 200 OK\r\nContent-Type: image/gif\r\n\r\nGIF89a";
        let exchange = parse_exchange(buffer).unwrap();
        assert!(!exchange.body_complete(buffer));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let exchange = parse_exchange(PNG_RESPONSE).unwrap();
        assert_eq!(exchange.header("CONTENT-TYPE"), Some("image/png"));
        assert_eq!(exchange.header("x-missing"), None);
    }
}
