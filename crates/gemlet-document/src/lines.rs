//! Line re-assembly across network reads

/// Buffers raw bytes and hands out complete `\n`-terminated lines.
///
/// The parser only ever sees whole lines; a read that ends mid-line leaves
/// the partial line here until the rest arrives.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes already searched for a newline
    scanned: usize,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Next complete line without its `\n`. A trailing `\r` is left for the
    /// parser to strip.
    pub fn next_line(&mut self) -> Option<String> {
        let found = self.buf[self.scanned..]
            .iter()
            .position(|&byte| byte == b'\n')
            .map(|offset| self.scanned + offset);

        match found {
            Some(end) => {
                let line = decode(&self.buf[..end]);
                self.buf.drain(..=end);
                self.scanned = 0;
                Some(line)
            }
            None => {
                self.scanned = self.buf.len();
                None
            }
        }
    }

    /// Whatever is left once the peer has closed the connection: a final
    /// line that was never newline-terminated.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buf.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buf);
        Some(decode(&rest))
    }

    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

/// Lossy UTF-8 with NUL bytes dropped.
fn decode(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.contains('\0') {
        text.replace('\0', "")
    } else {
        text.into_owned()
    }
}
