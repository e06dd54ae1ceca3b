//! Smart-join buffer: accumulates prose lines into one paragraph.
//!
//! Latin lines are joined with a single space; a boundary touching a CJK
//! ideograph, kana or full-width form is concatenated directly.

/// Returns true for CJK punctuation, kana, full-width forms and ideographs.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{3000}'..='\u{303f}'
        | '\u{3040}'..='\u{309f}'
        | '\u{30a0}'..='\u{30ff}'
        | '\u{ff00}'..='\u{ff9f}'
        | '\u{4e00}'..='\u{9faf}'
        | '\u{3400}'..='\u{4dbf}')
}

/// Join lines into one paragraph using language-aware spacing.
pub fn smart_join<S: AsRef<str>>(lines: &[S]) -> String {
    let mut out = String::new();
    let mut prev_last: Option<char> = None;

    for (i, line) in lines.iter().enumerate() {
        let line = line.as_ref();
        if i > 0 {
            let touches_cjk =
                prev_last.is_some_and(is_cjk) || line.chars().next().is_some_and(is_cjk);
            if !touches_cjk {
                out.push(' ');
            }
        }
        out.push_str(line);
        prev_last = line.chars().next_back();
    }

    out
}

/// Pending prose lines awaiting a flush.
#[derive(Debug, Clone, Default)]
pub struct JoinBuffer {
    lines: Vec<String>,
}

impl JoinBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Join and clear the buffer. Returns `None` when nothing was pending.
    pub fn take(&mut self) -> Option<String> {
        if self.lines.is_empty() {
            return None;
        }
        let joined = smart_join(&self.lines);
        self.lines.clear();
        Some(joined)
    }
}
