pub const HISTORY_CAPACITY: usize = 256;
pub const HISTORY_LINE_MAX: usize = 255;
/// Terminal prompt; the newest history line while the terminal is idle.
pub const PROMPT: &str = ">>> ";

/// Bounded terminal history. Once full, each push overwrites the oldest
/// line in place; iteration order is always oldest to newest.
#[derive(Debug, Clone)]
pub struct LineHistory {
    lines: Vec<String>,
    head: usize,
    capacity: usize,
    max_line_chars: usize,
}

impl Default for LineHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY, HISTORY_LINE_MAX)
    }
}

impl LineHistory {
    pub fn new(capacity: usize, max_line_chars: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            lines: Vec::with_capacity(capacity),
            head: 0,
            capacity,
            max_line_chars,
        }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        let line = self.truncate(line.into());
        if self.lines.len() < self.capacity {
            self.lines.push(line);
        } else {
            self.lines[self.head] = line;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Overwrites the newest line, if any.
    pub fn replace_last(&mut self, line: impl Into<String>) {
        if self.lines.is_empty() {
            return;
        }
        let line = self.truncate(line.into());
        let last = self.physical(self.lines.len() - 1);
        self.lines[last] = line;
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        if index >= self.lines.len() {
            return None;
        }
        Some(self.lines[self.physical(index)].as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.len().checked_sub(1).and_then(|i| self.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.lines.len()).map(move |i| self.lines[self.physical(i)].as_str())
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.head = 0;
    }

    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) % self.capacity
    }

    fn truncate(&self, mut line: String) -> String {
        if let Some((byte_index, _)) = line.char_indices().nth(self.max_line_chars) {
            line.truncate(byte_index);
        }
        line
    }
}
