use std::collections::VecDeque;

/// Capacity of the per-connection accumulation buffer for undelimited bytes.
pub const ACCUM_CAPACITY: usize = 4096;
/// Longest line handed to the application; longer lines are truncated.
pub const MAX_LINE_LEN: usize = 1023;

/// Turns an arbitrarily fragmented byte stream into `\n`-delimited lines.
///
/// Bytes that have not yet seen a delimiter are held in `partial`. If that
/// tail would grow past `capacity` it is dropped and the rest of the
/// oversized line is skipped up to the next `\n`, so memory stays bounded
/// and the following line is delivered intact.
#[derive(Debug)]
pub struct LineBuffer {
    partial: Vec<u8>,
    ready: VecDeque<String>,
    capacity: usize,
    max_line: usize,
    discarding: bool,
    overflows: u64,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new(ACCUM_CAPACITY, MAX_LINE_LEN)
    }
}

impl LineBuffer {
    pub fn new(capacity: usize, max_line: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            partial: Vec::with_capacity(capacity),
            ready: VecDeque::new(),
            capacity,
            max_line: max_line.max(1),
            discarding: false,
            overflows: 0,
        }
    }

    /// Appends received bytes. Returns `true` if an overflow reset happened.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> bool {
        let mut overflowed = false;
        let mut rest = bytes;

        while !rest.is_empty() {
            let newline = rest.iter().position(|&b| b == b'\n');
            let segment = match newline {
                Some(i) => &rest[..i],
                None => rest,
            };

            if !self.discarding {
                if self.partial.len() + segment.len() > self.capacity {
                    self.partial.clear();
                    self.discarding = true;
                    self.overflows += 1;
                    overflowed = true;
                    log::warn!(
                        "line buffer overflow ({} bytes without delimiter), resetting",
                        self.capacity
                    );
                } else {
                    self.partial.extend_from_slice(segment);
                }
            }

            match newline {
                Some(i) => {
                    if self.discarding {
                        self.discarding = false;
                    } else {
                        self.finish_line();
                    }
                    self.partial.clear();
                    rest = &rest[i + 1..];
                }
                None => break,
            }
        }

        overflowed
    }

    fn finish_line(&mut self) {
        let mut len = self.partial.len();
        if len > 0 && self.partial[len - 1] == b'\r' {
            len -= 1;
        }
        len = len.min(self.max_line);
        let line = String::from_utf8_lossy(&self.partial[..len]).into_owned();
        self.ready.push_back(line);
    }

    pub fn next_line(&mut self) -> Option<String> {
        self.ready.pop_front()
    }

    pub fn has_line(&self) -> bool {
        !self.ready.is_empty()
    }

    /// Bytes received since the last delimiter.
    pub fn pending_bytes(&self) -> usize {
        self.partial.len()
    }

    pub fn overflow_count(&self) -> u64 {
        self.overflows
    }

    pub fn clear(&mut self) {
        self.partial.clear();
        self.ready.clear();
        self.discarding = false;
    }
}
