//! JSON Lines framing over a chunked byte stream.
//!
//! The generation endpoint writes one JSON object per line:
//! ```text
//! {"status":"initialized","session_id":"abc"}
//! {"status":"generating","delta":{"text":"Hi"},"step":1,"tokens":3}
//! {"status":"completed","cost":10,"cost_per_mtk":2}
//! ```
//!
//! Network chunks do not respect line boundaries, so raw bytes are buffered
//! and only whole lines are handed on. UTF-8 decoding happens per line,
//! never per chunk.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, Stream, StreamExt};

use crate::client::ClientError;

/// Extension trait for `reqwest::Response` to read the body as JSON Lines.
///
/// # Example
/// ```ignore
/// use sintelli::ndjson::NdjsonResponseExt;
///
/// let response = client.post(url).send().await?;
/// let mut lines = std::pin::pin!(response.json_lines());
/// while let Some(line) = lines.next().await {
///     println!("{:?}", line?);
/// }
/// ```
pub trait NdjsonResponseExt {
    /// Convert the response into a stream of non-blank lines, without their terminators.
    fn json_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send;
}

impl NdjsonResponseExt for reqwest::Response {
    fn json_lines(self) -> impl Stream<Item = Result<Bytes, ClientError>> + Send {
        json_lines(self.bytes_stream().map(|chunk| chunk.map_err(ClientError::from)))
    }
}

/// Split a byte stream into lines.
///
/// Blank lines are skipped, a trailing `\r` is removed, and a final line
/// without a terminating newline is still emitted when the input ends.
/// An error from the input is forwarded and ends the output.
pub fn json_lines<S, E>(byte_stream: S) -> impl Stream<Item = Result<Bytes, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Send,
{
    stream::unfold(
        (Box::pin(byte_stream), BytesMut::new(), false),
        |(mut byte_stream, mut buffer, mut stream_ended)| async move {
            loop {
                while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                    let line = buffer.split_to(pos + 1).freeze();
                    if let Some(line) = non_blank(line) {
                        return Some((Ok(line), (byte_stream, buffer, stream_ended)));
                    }
                }

                if stream_ended {
                    let rest = buffer.split().freeze();
                    return non_blank(rest).map(|line| (Ok(line), (byte_stream, buffer, stream_ended)));
                }

                match byte_stream.next().await {
                    Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                    Some(Err(e)) => {
                        // Nothing after a read error is trustworthy.
                        buffer.clear();
                        return Some((Err(e), (byte_stream, buffer, true)));
                    }
                    None => stream_ended = true,
                }
            }
        },
    )
}

/// Strip the line terminator; `None` for lines holding only whitespace.
fn non_blank(line: Bytes) -> Option<Bytes> {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    if line[..end].iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line.slice(..end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, String>> + Send {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    fn collect(parts: &[&'static [u8]]) -> Vec<Result<Bytes, String>> {
        block_on(json_lines(chunks(parts)).collect::<Vec<_>>())
    }

    #[test]
    fn test_splits_lines_across_chunks() {
        let lines = collect(&[b"{\"a\":", b"1}\n{\"b\"", b":2}\n"]);
        assert_eq!(
            lines,
            vec![Ok(Bytes::from_static(b"{\"a\":1}")), Ok(Bytes::from_static(b"{\"b\":2}"))]
        );
    }

    #[test]
    fn test_skips_blank_lines_and_carriage_returns() {
        let lines = collect(&[b"\n\r\n  \none\r\n\ntwo\n"]);
        assert_eq!(
            lines,
            vec![Ok(Bytes::from_static(b"one")), Ok(Bytes::from_static(b"two"))]
        );
    }

    #[test]
    fn test_flushes_unterminated_final_line() {
        let lines = collect(&[b"first\nsec", b"ond"]);
        assert_eq!(
            lines,
            vec![Ok(Bytes::from_static(b"first")), Ok(Bytes::from_static(b"second"))]
        );
    }

    #[test]
    fn test_keeps_multibyte_characters_split_between_chunks() {
        // "é" is 0xC3 0xA9
        let lines = collect(&[b"caf\xC3", b"\xA9\n"]);
        assert_eq!(lines, vec![Ok(Bytes::from("café".as_bytes().to_vec()))]);
    }

    #[test]
    fn test_forwards_errors_and_stops() {
        let input = stream::iter(vec![
            Ok(Bytes::from_static(b"ok\npartial")),
            Err("reset".to_string()),
            Ok(Bytes::from_static(b"never\n")),
        ]);
        let lines = block_on(json_lines(input).collect::<Vec<_>>());
        assert_eq!(lines, vec![Ok(Bytes::from_static(b"ok")), Err("reset".to_string())]);
    }

    #[test]
    fn test_empty_body() {
        assert!(collect(&[]).is_empty());
    }
}
