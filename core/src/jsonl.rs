//! Incremental decoder for newline-delimited JSON byte streams.
//!
//! The subprocess writes one JSON value per line but the reader sees
//! arbitrary chunk boundaries, so bytes are buffered until a LF arrives.
//! Blank and whitespace-only lines are skipped. The decoder knows nothing
//! about record schemas; callers get raw [`serde_json::Value`]s.

use crate::error::SwitchboardErr;

#[derive(Default)]
pub struct JsonlDecoder {
    buf: Vec<u8>,
}

impl JsonlDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and collect every line completed by it. A decode
    /// failure is reported per line; the caller decides whether to
    /// terminate the stream or log and continue, and later lines in the
    /// same chunk still decode.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Result<serde_json::Value, SwitchboardErr>> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(newline) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            if let Some(result) = decode_line(&line[..newline]) {
                out.push(result);
            }
        }
        out
    }

    /// Drain the residual buffer at end-of-stream. A non-empty residue
    /// that parses is emitted; one that does not is an error.
    pub fn finish(&mut self) -> Option<Result<serde_json::Value, SwitchboardErr>> {
        let rest = std::mem::take(&mut self.buf);
        decode_line(&rest)
    }

    /// Discard buffered bytes, e.g. when the subprocess restarts.
    pub fn reset(&mut self) {
        self.buf.clear();
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<serde_json::Value, SwitchboardErr>> {
    let line = String::from_utf8_lossy(raw);
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(serde_json::from_str(trimmed).map_err(|_| SwitchboardErr::Parse {
        line: trimmed.to_string(),
    }))
}
