/// Script linter: author-facing warnings about markup the parser will
/// silently recover from.
///
/// The parser never consults this; it exists for authoring tools.
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::core::classifier::{classify, is_intercept_close, Directive, LineClass};
use crate::schema::style::StyleVariant;

fn tag_name_regex() -> &'static Regex {
    static TAG_NAME_RE: OnceLock<Regex> = OnceLock::new();
    TAG_NAME_RE.get_or_init(|| Regex::new(r"\[\[([A-Z_]+)::").expect("Invalid tag name regex"))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintKind {
    /// An intercept block that is never closed, or is reopened first.
    UnterminatedIntercept,
    StrayCloseMarker,
    UnknownTag(String),
    /// `[[JUMP::` or `[[IMAGE::` not alone on its line; shown as text.
    InlineDirective(String),
    UnclosedTag,
    JumpWithoutLabel,
    ImageWithoutSource,
}

/// One warning, anchored to a 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintIssue {
    pub line: usize,
    pub kind: LintKind,
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: ", self.line)?;
        match &self.kind {
            LintKind::UnterminatedIntercept => write!(f, "intercept block is never closed"),
            LintKind::StrayCloseMarker => write!(f, "close marker outside an intercept block"),
            LintKind::UnknownTag(name) => write!(f, "unknown inline tag '{name}'"),
            LintKind::InlineDirective(name) => {
                write!(f, "'{name}' directive must be alone on its line")
            }
            LintKind::UnclosedTag => write!(f, "'[[' without a closing ']]'"),
            LintKind::JumpWithoutLabel => write!(f, "jump link has no label"),
            LintKind::ImageWithoutSource => write!(f, "image has no source"),
        }
    }
}

/// Lint a chapter. Issues come back in line order.
pub fn lint_script(text: &str) -> Vec<LintIssue> {
    let mut issues = Vec::new();
    let mut open_block: Option<usize> = None;

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim_end();
        match classify(line, open_block.is_some()) {
            LineClass::BlockOpen {
                closes_on_same_line,
                ..
            } => {
                if let Some(opened) = open_block.take() {
                    issues.push(LintIssue {
                        line: opened,
                        kind: LintKind::UnterminatedIntercept,
                    });
                }
                if !closes_on_same_line {
                    open_block = Some(line_no);
                }
                check_tags(line, &mut issues, line_no);
            }
            LineClass::BlockClose => {
                open_block = None;
                check_tags(line, &mut issues, line_no);
            }
            LineClass::BlockContinue => check_tags(line, &mut issues, line_no),
            LineClass::Directive(Directive::Jump { .. }) => {
                if !has_jump_label(line.trim()) {
                    issues.push(LintIssue {
                        line: line_no,
                        kind: LintKind::JumpWithoutLabel,
                    });
                }
            }
            LineClass::Directive(Directive::Image { src, .. }) => {
                if src.trim().is_empty() {
                    issues.push(LintIssue {
                        line: line_no,
                        kind: LintKind::ImageWithoutSource,
                    });
                }
            }
            LineClass::Directive(Directive::Divider) | LineClass::Blank => {}
            LineClass::Prose => {
                if is_intercept_close(line) {
                    issues.push(LintIssue {
                        line: line_no,
                        kind: LintKind::StrayCloseMarker,
                    });
                }
                check_tags(line, &mut issues, line_no);
            }
        }
    }

    if let Some(opened) = open_block {
        issues.push(LintIssue {
            line: opened,
            kind: LintKind::UnterminatedIntercept,
        });
    }
    issues.sort_by_key(|issue| issue.line);
    issues
}

fn has_jump_label(trimmed: &str) -> bool {
    trimmed
        .trim_start_matches("[[JUMP::")
        .trim_end_matches("]]")
        .split("::")
        .nth(1)
        .is_some_and(|label| !label.trim().is_empty())
}

fn check_tags(line: &str, issues: &mut Vec<LintIssue>, line_no: usize) {
    for caps in tag_name_regex().captures_iter(line) {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        let kind = match name {
            "JUMP" | "IMAGE" => LintKind::InlineDirective(name.to_string()),
            _ if StyleVariant::from_tag_name(name).is_some() => continue,
            _ => LintKind::UnknownTag(name.to_string()),
        };
        issues.push(LintIssue {
            line: line_no,
            kind,
        });
    }

    let unclosed = line
        .match_indices("[[")
        .any(|(start, _)| !line[start..].contains("]]"));
    if unclosed {
        issues.push(LintIssue {
            line: line_no,
            kind: LintKind::UnclosedTag,
        });
    }
}
