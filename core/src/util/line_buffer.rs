/// Longest line a provider may send before the stream is treated as broken.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("provider line exceeded {limit} bytes without a newline")]
pub struct LineTooLong {
    pub limit: usize,
}

/// Splits a chunked byte stream into text lines.
///
/// Bytes are held until a `\n` arrives, so a line (or a multi-byte UTF-8
/// sequence) split across reads is only decoded once it is whole.
#[derive(Debug)]
pub struct LineBuffer {
    buf: Vec<u8>,
    // bytes of `buf` already known to hold no newline
    scanned: usize,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_limit(MAX_LINE_BYTES)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(8 * 1024),
            scanned: 0,
            limit,
        }
    }

    /// Append a chunk and return every line it completed, without terminators.
    ///
    /// Fails once a line, complete or pending, grows past the limit.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>, LineTooLong> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.buf[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if end - start > self.limit {
                return Err(self.overflow());
            }
            lines.push(decode(&self.buf[start..end]));
            start = end + 1;
            from = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        if self.buf.len() > self.limit {
            return Err(self.overflow());
        }
        Ok(lines)
    }

    /// EOF flush: the trailing partial line, if any.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let line = decode(&rest);
        (!line.is_empty()).then_some(line)
    }

    fn overflow(&mut self) -> LineTooLong {
        self.buf.clear();
        self.scanned = 0;
        LineTooLong { limit: self.limit }
    }
}

fn decode(line: &[u8]) -> String {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}
