//! Byte-chunk to line reassembly.

/// Longest run of bytes held while waiting for a newline.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Accumulates raw output chunks and yields complete lines.
///
/// Lines end at `\n`; a preceding `\r` is dropped. Bytes after the last
/// newline are held until the next chunk or [`LineSplitter::finish`]. A
/// run longer than the line limit is emitted in pieces, cut on a UTF-8
/// character boundary.
#[derive(Debug)]
pub struct LineSplitter {
    partial: Vec<u8>,
    max_line: usize,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splitter that flushes unterminated runs at `max_line` bytes.
    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            partial: Vec::new(),
            max_line: max_line.max(4),
        }
    }

    /// Feeds a chunk and returns every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.partial.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.partial[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            lines.push(decode(&self.partial[start..end]));
            start = end + 1;
        }
        self.partial.drain(..start);

        while self.partial.len() >= self.max_line {
            let cut = char_boundary(&self.partial, self.max_line);
            lines.push(String::from_utf8_lossy(&self.partial[..cut]).into_owned());
            self.partial.drain(..cut);
        }
        lines
    }

    /// Flushes a trailing unterminated line at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if self.partial.is_empty() {
            return None;
        }
        let line = decode(&self.partial);
        self.partial.clear();
        Some(line)
    }

    /// Bytes waiting for a newline.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }
}

/// Largest cut at or below `max` that does not split a UTF-8 sequence.
fn char_boundary(bytes: &[u8], max: usize) -> usize {
    (1..=max)
        .rev()
        .find(|&i| i == bytes.len() || bytes[i] & 0xC0 != 0x80)
        .filter(|&i| max - i < 4)
        .unwrap_or(max)
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
