//! Reassembles newline-delimited records from arbitrary byte chunks.

use bytes::{Bytes, BytesMut};

/// Longest partial line kept while waiting for its terminator.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
    /// Set after an overflow until the oversized line's `\n` arrives.
    discarding: bool,
}

impl LineBuffer {
    /// Append `chunk` and return every line it completed, without the
    /// trailing `\n` or `\r\n`.
    ///
    /// A partial line growing past [`MAX_LINE_BYTES`] is discarded, along
    /// with the rest of it from later chunks, and reported through the `bool`
    /// in the return value.
    pub fn push(&mut self, mut chunk: &[u8]) -> (Vec<Bytes>, bool) {
        if self.discarding {
            match chunk.iter().position(|b| *b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    chunk = &chunk[pos + 1..];
                }
                None => return (Vec::new(), false),
            }
        }
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let mut line = self.pending.split_to(pos + 1);
            line.truncate(pos);
            if line.last() == Some(&b'\r') {
                line.truncate(pos - 1);
            }
            lines.push(line.freeze());
        }
        let overflowed = self.pending.len() > MAX_LINE_BYTES;
        if overflowed {
            self.pending.clear();
            self.discarding = true;
        }
        (lines, overflowed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut buffer = LineBuffer::default();
        let (lines, _) = buffer.push(b"{\"a\":");
        assert!(lines.is_empty());
        let (lines, _) = buffer.push(b"1}\r\n\r\n{\"b\"");
        assert_eq!(lines, vec![Bytes::from_static(b"{\"a\":1}"), Bytes::new()]);
        let (lines, overflowed) = buffer.push(b":2}\n");
        assert_eq!(lines, vec![Bytes::from_static(b"{\"b\":2}")]);
        assert!(!overflowed);
    }

    #[test]
    fn test_oversized_partial_line_is_dropped() {
        let mut buffer = LineBuffer::default();
        let (lines, overflowed) = buffer.push(&vec![b'x'; MAX_LINE_BYTES + 1]);
        assert!(lines.is_empty());
        assert!(overflowed);
        let (lines, overflowed) = buffer.push(b"xxxx");
        assert!(lines.is_empty());
        assert!(!overflowed);
        let (lines, overflowed) = buffer.push(b"xx\"}\r\nok\n");
        assert_eq!(lines, vec![Bytes::from_static(b"ok")]);
        assert!(!overflowed);
        let (lines, _) = buffer.push(b"next\n");
        assert_eq!(lines, vec![Bytes::from_static(b"next")]);
    }
}
