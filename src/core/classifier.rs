/// Line classifier: decides what a single raw line of chapter text is.
use regex::Regex;
use std::sync::OnceLock;

/// Close markers for an intercept block, in every accepted spelling.
pub const INTERCEPT_CLOSE_MARKERS: [&str; 3] = ["【插入结束】", "【插入結束】", "[INSERTION_END]"];

pub const DIVIDER_TOKEN: &str = "[[DIVIDER]]";
const JUMP_PREFIX: &str = "[[JUMP::";
const IMAGE_PREFIX: &str = "[[IMAGE::";
const DIRECTIVE_SUFFIX: &str = "]]";

/// Matches the opener of an intercept block, capturing its signal id.
pub(crate) fn intercept_open_regex() -> &'static Regex {
    static OPEN_RE: OnceLock<Regex> = OnceLock::new();
    OPEN_RE.get_or_init(|| Regex::new(r"([0-9]{4}\.[0-9])Void>>").expect("Invalid intercept regex"))
}

/// The kinds of multi-line block the markup supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Intercept,
}

/// A single-line directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Divider,
    Jump { target_id: String, label: String },
    Image { src: String, caption: String },
}

/// Classification of one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineClass {
    /// Empty line; flushes pending prose.
    Blank,
    Prose,
    BlockOpen {
        kind: BlockKind,
        closes_on_same_line: bool,
    },
    BlockContinue,
    BlockClose,
    Directive(Directive),
}

pub fn is_intercept_open(line: &str) -> bool {
    intercept_open_regex().is_match(line)
}

pub fn is_intercept_close(line: &str) -> bool {
    INTERCEPT_CLOSE_MARKERS.iter().any(|m| line.contains(m))
}

/// Classify a right-trimmed line. `in_block` is the parser's state: while
/// a block is open every line continues it unless it closes it or opens a
/// new one.
pub fn classify(line: &str, in_block: bool) -> LineClass {
    let trimmed = line.trim();

    if is_intercept_open(trimmed) {
        return LineClass::BlockOpen {
            kind: BlockKind::Intercept,
            closes_on_same_line: is_intercept_close(trimmed),
        };
    }

    if in_block {
        return if is_intercept_close(trimmed) {
            LineClass::BlockClose
        } else {
            LineClass::BlockContinue
        };
    }

    if let Some(directive) = parse_directive(trimmed) {
        return LineClass::Directive(directive);
    }

    if trimmed.is_empty() {
        LineClass::Blank
    } else {
        LineClass::Prose
    }
}

/// Recognise a whole-line directive on an already trimmed line.
pub fn parse_directive(trimmed: &str) -> Option<Directive> {
    if trimmed == DIVIDER_TOKEN {
        return Some(Directive::Divider);
    }

    if let Some(body) = directive_body(trimmed, JUMP_PREFIX) {
        let mut parts = body.split("::");
        let target_id = parts.next().unwrap_or_default().to_string();
        // Extra `::` segments after the label are ignored.
        let label = parts
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| target_id.clone());
        return Some(Directive::Jump { target_id, label });
    }

    if let Some(body) = directive_body(trimmed, IMAGE_PREFIX) {
        let (src, caption) = body.split_once("::").unwrap_or((body, ""));
        return Some(Directive::Image {
            src: src.to_string(),
            caption: caption.to_string(),
        });
    }

    None
}

fn directive_body<'a>(trimmed: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = trimmed.strip_prefix(prefix)?;
    rest.strip_suffix(DIRECTIVE_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prose_and_blank() {
        assert_eq!(classify("他走了。", false), LineClass::Prose);
        assert_eq!(classify("", false), LineClass::Blank);
        assert_eq!(classify("   ", false), LineClass::Blank);
    }

    #[test]
    fn intercept_open_anywhere_in_line() {
        assert_eq!(
            classify("噪声 0600.0Void>>你听得见吗", false),
            LineClass::BlockOpen {
                kind: BlockKind::Intercept,
                closes_on_same_line: false
            }
        );
    }

    #[test]
    fn intercept_open_and_close_on_one_line() {
        for close in INTERCEPT_CLOSE_MARKERS {
            let line = format!("0000.2Void>>短讯{close}");
            assert_eq!(
                classify(&line, false),
                LineClass::BlockOpen {
                    kind: BlockKind::Intercept,
                    closes_on_same_line: true
                }
            );
        }
    }

    #[test]
    fn opener_requires_ascii_digits() {
        assert_eq!(classify("000.2Void>>", false), LineClass::Prose);
        assert_eq!(classify("００００.２Void>>", false), LineClass::Prose);
    }

    #[test]
    fn inside_block_lines_continue_or_close() {
        assert_eq!(classify("anything", true), LineClass::BlockContinue);
        assert_eq!(classify("", true), LineClass::BlockContinue);
        assert_eq!(classify("[[DIVIDER]]", true), LineClass::BlockContinue);
        assert_eq!(classify("结束【插入结束】", true), LineClass::BlockClose);
    }

    #[test]
    fn stray_close_marker_is_prose() {
        assert_eq!(classify("[INSERTION_END]", false), LineClass::Prose);
    }

    #[test]
    fn divider_must_be_exact() {
        assert_eq!(
            classify("  [[DIVIDER]]  ", false),
            LineClass::Directive(Directive::Divider)
        );
        assert_eq!(classify("[[DIVIDER]] x", false), LineClass::Prose);
    }

    #[test]
    fn jump_directive() {
        assert_eq!(
            parse_directive("[[JUMP::VOL_DAILY::去日常]]"),
            Some(Directive::Jump {
                target_id: "VOL_DAILY".to_string(),
                label: "去日常".to_string()
            })
        );
    }

    #[test]
    fn jump_without_label_uses_target() {
        assert_eq!(
            parse_directive("[[JUMP::VOL_X]]"),
            Some(Directive::Jump {
                target_id: "VOL_X".to_string(),
                label: "VOL_X".to_string()
            })
        );
    }

    #[test]
    fn image_caption_is_right_greedy() {
        assert_eq!(
            parse_directive("[[IMAGE::http://x/y.png::A::B]]"),
            Some(Directive::Image {
                src: "http://x/y.png".to_string(),
                caption: "A::B".to_string()
            })
        );
        assert_eq!(
            parse_directive("[[IMAGE::pic.png]]"),
            Some(Directive::Image {
                src: "pic.png".to_string(),
                caption: String::new()
            })
        );
    }

    #[test]
    fn unterminated_directive_is_prose() {
        assert_eq!(classify("[[IMAGE::pic.png", false), LineClass::Prose);
    }
}
