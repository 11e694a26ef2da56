//! Newline-delimited framing.
//!
//! Every message on the wire is one JSON document followed by `\n`.
//! [`FrameReader`] splits a connection's byte stream into those lines
//! with a hard cap on line length, and [`encode_frame`] produces the
//! matching output.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Default cap on a single inbound line, terminator excluded.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1_048_576;

/// One decoding step on a connection.
#[derive(Debug, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, including its trailing `\n`.
    Line(Vec<u8>),
    /// A line longer than the configured limit. Its bytes were discarded
    /// up to and including the terminator.
    Oversized { limit: usize },
    /// The peer closed the stream. A trailing unterminated line is dropped.
    Eof,
}

/// Splits a buffered byte stream into newline-terminated frames.
pub struct FrameReader<R> {
    reader: R,
    max_frame_bytes: usize,
}

impl<R> FrameReader<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, max_frame_bytes: usize) -> Self {
        Self {
            reader,
            max_frame_bytes,
        }
    }

    /// Read the next frame.
    ///
    /// Frames already sitting in the read buffer are returned without
    /// touching the socket, so a single read carrying several lines yields
    /// them one call at a time.
    pub async fn next_frame(&mut self) -> std::io::Result<Frame> {
        let mut line = Vec::new();
        let mut oversized = false;

        loop {
            let buffer = self.reader.fill_buf().await?;
            if buffer.is_empty() {
                if !line.is_empty() || oversized {
                    tracing::debug!(
                        pending_bytes = line.len(),
                        "discarding unterminated frame at end of stream"
                    );
                }
                return Ok(Frame::Eof);
            }

            match buffer.iter().position(|byte| *byte == b'\n') {
                Some(newline_index) => {
                    let to_take = newline_index + 1;
                    if oversized || line.len() + newline_index > self.max_frame_bytes {
                        self.reader.consume(to_take);
                        return Ok(Frame::Oversized {
                            limit: self.max_frame_bytes,
                        });
                    }

                    line.extend_from_slice(&buffer[..to_take]);
                    self.reader.consume(to_take);
                    return Ok(Frame::Line(line));
                }
                None => {
                    let available = buffer.len();
                    if !oversized && line.len() + available > self.max_frame_bytes {
                        oversized = true;
                        line = Vec::new();
                    }
                    if !oversized {
                        line.extend_from_slice(buffer);
                    }
                    self.reader.consume(available);
                }
            }
        }
    }
}

/// Serialize a message as one compact JSON line terminated by `\n`.
pub fn encode_frame<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn splits_multiple_frames_from_one_read() {
        let input: &[u8] = b"{\"a\":1}\n{\"b\":2}\n[]\n";
        let mut frames = FrameReader::new(input, DEFAULT_MAX_FRAME_BYTES);

        assert_eq!(
            frames.next_frame().await.unwrap(),
            Frame::Line(b"{\"a\":1}\n".to_vec())
        );
        assert_eq!(
            frames.next_frame().await.unwrap(),
            Frame::Line(b"{\"b\":2}\n".to_vec())
        );
        assert_eq!(frames.next_frame().await.unwrap(), Frame::Line(b"[]\n".to_vec()));
        assert_eq!(frames.next_frame().await.unwrap(), Frame::Eof);
    }

    #[tokio::test]
    async fn joins_a_frame_split_across_reads() {
        // A two-byte buffer forces the line to arrive in several fill_buf calls.
        let input: &[u8] = b"{\"method\":\"x/y\"}\n";
        let mut frames = FrameReader::new(BufReader::with_capacity(2, input), 64);

        assert_eq!(
            frames.next_frame().await.unwrap(),
            Frame::Line(b"{\"method\":\"x/y\"}\n".to_vec())
        );
        assert_eq!(frames.next_frame().await.unwrap(), Frame::Eof);
    }

    #[tokio::test]
    async fn blank_line_is_a_frame() {
        let input: &[u8] = b"\n";
        let mut frames = FrameReader::new(input, DEFAULT_MAX_FRAME_BYTES);

        assert_eq!(frames.next_frame().await.unwrap(), Frame::Line(b"\n".to_vec()));
    }

    #[tokio::test]
    async fn drops_unterminated_tail_at_eof() {
        let input: &[u8] = b"{\"a\":1}\n{\"partial\":";
        let mut frames = FrameReader::new(input, DEFAULT_MAX_FRAME_BYTES);

        assert!(matches!(frames.next_frame().await.unwrap(), Frame::Line(_)));
        assert_eq!(frames.next_frame().await.unwrap(), Frame::Eof);
    }

    #[tokio::test]
    async fn oversized_line_is_skipped_and_stream_recovers() {
        let mut input = vec![b'x'; 40];
        input.push(b'\n');
        input.extend_from_slice(b"{}\n");
        let mut frames = FrameReader::new(BufReader::with_capacity(8, &input[..]), 16);

        assert_eq!(
            frames.next_frame().await.unwrap(),
            Frame::Oversized { limit: 16 }
        );
        assert_eq!(frames.next_frame().await.unwrap(), Frame::Line(b"{}\n".to_vec()));
    }

    #[tokio::test]
    async fn line_at_exact_limit_is_accepted() {
        let input: &[u8] = b"1234\n";
        let mut frames = FrameReader::new(input, 4);

        assert_eq!(frames.next_frame().await.unwrap(), Frame::Line(b"1234\n".to_vec()));
    }

    #[test]
    fn encoded_frame_is_single_terminated_line() {
        let line = encode_frame(&json!({"text": "two\nlines"})).unwrap();

        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }
}
