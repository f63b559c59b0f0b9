//! Indenting text sink for generated C

/// Accumulates generated text, indenting every line with tabs
#[derive(Debug, Default)]
pub struct Printer {
    buf: String,
    level: usize,
    at_line_start: bool,
}

impl Printer {
    pub fn new() -> Self {
        Self {
            buf: String::new(),
            level: 0,
            at_line_start: true,
        }
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn outdent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Append text; every non-empty line start gets the current indentation
    pub fn print(&mut self, text: impl AsRef<str>) {
        for chunk in text.as_ref().split_inclusive('\n') {
            if self.at_line_start && chunk != "\n" {
                for _ in 0..self.level {
                    self.buf.push('\t');
                }
            }
            self.buf.push_str(chunk);
            self.at_line_start = chunk.ends_with('\n');
        }
    }

    /// Append text followed by a newline
    pub fn line(&mut self, text: impl AsRef<str>) {
        self.print(text);
        self.print("\n");
    }

    pub fn blank(&mut self) {
        self.print("\n");
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Render `s` as a C string literal
///
/// Printable ASCII is kept as is; everything else is written as escapes,
/// with multi-byte UTF-8 sequences spelled byte by byte in octal.
pub fn c_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for b in s.bytes() {
        match b {
            b'"' => out.push_str("\\\""),
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'?' => out.push_str("\\?"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{:03o}", b)),
        }
    }
    out.push('"');
    out
}
