/// Inline formatter: expands `[[TAG::content]]` and `**bold**` markup in
/// a text fragment into styled runs.
///
/// One flat, non-recursive pass: tag content is taken literally, so tags do
/// not nest, and a `[[` without a matching `]]` stays as plain text.
use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

use crate::schema::style::{RunKind, StyleVariant, StyledRun};

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(
            r"\[\[(MASK|GLITCH_GREEN|GREEN|VOID_VISION|VOID|DANGER|BLUE|WHITE)::(.*?)\]\]",
        )
        .expect("Invalid inline tag regex")
    })
}

fn bold_regex() -> &'static Regex {
    static BOLD_RE: OnceLock<Regex> = OnceLock::new();
    BOLD_RE.get_or_init(|| Regex::new(r"\*\*(.*?)\*\*").expect("Invalid bold regex"))
}

/// One recognised `[[TAG::content]]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpan<'a> {
    /// Byte range of the whole tag, brackets included.
    pub range: Range<usize>,
    pub variant: StyleVariant,
    pub content: &'a str,
}

/// Every recognised tag in the fragment, left to right.
pub fn tag_spans(text: &str) -> Vec<TagSpan<'_>> {
    tag_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            // The alternation is the closed tag set, so this always resolves.
            let variant = StyleVariant::from_tag_name(caps.get(1)?.as_str())?;
            Some(TagSpan {
                range: whole.range(),
                variant,
                content: caps.get(2)?.as_str(),
            })
        })
        .collect()
}

/// Format a fragment into ordered runs. A fragment with no markup yields a
/// single plain run equal to the input.
pub fn format_inline(text: &str) -> Vec<StyledRun> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    for span in tag_spans(text) {
        push_plain_segment(&mut runs, &text[cursor..span.range.start]);
        runs.push(StyledRun::styled(span.variant, span.content));
        cursor = span.range.end;
    }
    push_plain_segment(&mut runs, &text[cursor..]);

    if runs.is_empty() {
        runs.push(StyledRun::plain(text));
    }
    runs
}

/// Split a tag-free segment on `**bold**` markers.
fn push_plain_segment(runs: &mut Vec<StyledRun>, segment: &str) {
    let mut cursor = 0;
    for caps in bold_regex().captures_iter(segment) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_plain(runs, &segment[cursor..whole.start()]);
        runs.push(StyledRun::bold(inner.as_str()));
        cursor = whole.end();
    }
    push_plain(runs, &segment[cursor..]);
}

fn push_plain(runs: &mut Vec<StyledRun>, text: &str) {
    if !text.is_empty() {
        runs.push(StyledRun::plain(text));
    }
}

/// The fragment's visible text with all recognised markup removed.
pub fn strip_markup(text: &str) -> String {
    format_inline(text).into_iter().map(|run| run.text).collect()
}

/// Whether any run needs more than plain rendering.
pub fn has_styling(runs: &[StyledRun]) -> bool {
    runs.iter().any(|run| run.kind != RunKind::Plain)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_tags_single_plain_run() {
        assert_eq!(format_inline("just text"), vec![StyledRun::plain("just text")]);
    }

    #[test]
    fn empty_fragment_is_one_empty_run() {
        assert_eq!(format_inline(""), vec![StyledRun::plain("")]);
    }

    #[test]
    fn danger_between_plain() {
        assert_eq!(
            format_inline("before[[DANGER::危险]]after"),
            vec![
                StyledRun::plain("before"),
                StyledRun::styled(StyleVariant::Danger, "危险"),
                StyledRun::plain("after"),
            ]
        );
    }

    #[test]
    fn void_vision_is_not_read_as_void() {
        assert_eq!(
            format_inline("[[VOID_VISION::看见了]]"),
            vec![StyledRun::styled(StyleVariant::SpoilerCard, "看见了")]
        );
        assert_eq!(
            format_inline("[[VOID::虚空]]"),
            vec![StyledRun::styled(StyleVariant::VoidEmphasis, "虚空")]
        );
    }

    #[test]
    fn glitch_green_and_green() {
        let runs = format_inline("[[GLITCH_GREEN::a]][[GREEN::b]]");
        assert_eq!(
            runs,
            vec![
                StyledRun::styled(StyleVariant::GlitchEmphasis, "a"),
                StyledRun::styled(StyleVariant::Emphasis, "b"),
            ]
        );
    }

    #[test]
    fn unknown_tag_is_literal() {
        assert_eq!(format_inline("[[RED::x]]"), vec![StyledRun::plain("[[RED::x]]")]);
    }

    #[test]
    fn unclosed_tag_is_literal() {
        assert_eq!(
            format_inline("a [[MASK::never closed"),
            vec![StyledRun::plain("a [[MASK::never closed")]
        );
    }

    #[test]
    fn content_stops_at_first_close() {
        assert_eq!(
            format_inline("[[MASK::a]]b]]"),
            vec![
                StyledRun::styled(StyleVariant::Masked, "a"),
                StyledRun::plain("b]]"),
            ]
        );
    }

    #[test]
    fn nested_tags_are_not_expanded() {
        let runs = format_inline("[[BLUE::x [[WHITE::y]] z]]");
        assert_eq!(runs[0], StyledRun::styled(StyleVariant::Info, "x [[WHITE::y"));
        assert_eq!(runs[1], StyledRun::plain(" z]]"));
    }

    #[test]
    fn bold_in_plain_segments() {
        assert_eq!(
            format_inline("a **b** [[MASK::**c**]] d"),
            vec![
                StyledRun::plain("a "),
                StyledRun::bold("b"),
                StyledRun::plain(" "),
                StyledRun::styled(StyleVariant::Masked, "**c**"),
                StyledRun::plain(" d"),
            ]
        );
    }

    #[test]
    fn lone_bold_marker_is_literal() {
        assert_eq!(format_inline("**open"), vec![StyledRun::plain("**open")]);
    }

    #[test]
    fn tag_spans_report_byte_ranges() {
        let text = "x[[VOID_VISION::看]]y";
        let spans = tag_spans(text);
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].variant, StyleVariant::SpoilerCard);
        assert_eq!(spans[0].content, "看");
        assert_eq!(&text[spans[0].range.clone()], "[[VOID_VISION::看]]");
    }

    #[test]
    fn strip_markup_concatenates() {
        assert_eq!(strip_markup("我[[MASK::不]]是**谁**"), "我不是谁");
        assert!(has_styling(&format_inline("**x**")));
        assert!(!has_styling(&format_inline("x")));
    }
}
