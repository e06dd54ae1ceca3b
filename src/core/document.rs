/// Document surface model: maps the node sequence onto the blocks a
/// continuous scrolling renderer lays out.
use serde::{Deserialize, Serialize};

use crate::core::classifier::{intercept_open_regex, INTERCEPT_CLOSE_MARKERS};
use crate::core::inline::{format_inline, tag_spans};
use crate::schema::node::{ScriptNode, SpeakerKey};
use crate::schema::style::{StyleVariant, StyledRun};

/// Signal id shown when an intercept block carries none.
pub const DEFAULT_SIGNAL_ID: &str = "0000.2";

/// One line inside a rendered intercept block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "runs", rename_all = "snake_case")]
pub enum InterceptLine {
    Spacer,
    Text(Vec<StyledRun>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DocumentBlock {
    /// Narration (no speaker) or dialogue.
    Paragraph {
        speaker: Option<SpeakerKey>,
        runs: Vec<StyledRun>,
    },
    Comms {
        speaker: String,
        runs: Vec<StyledRun>,
    },
    System {
        runs: Vec<StyledRun>,
    },
    Image {
        source_ref: String,
        caption: String,
    },
    Divider,
    Jump {
        target_volume_id: String,
        label: String,
    },
    Intercept {
        signal_id: String,
        lines: Vec<InterceptLine>,
    },
    /// Collapsed spoiler card; content stays hidden until expanded.
    Reveal {
        content: String,
    },
}

/// Render a node sequence for the document surface.
#[tracing::instrument(skip_all, fields(node_count = nodes.len()))]
pub fn render_document(nodes: &[ScriptNode]) -> Vec<DocumentBlock> {
    let blocks: Vec<DocumentBlock> = lift_reveals(nodes).iter().map(render_block).collect();
    tracing::debug!(block_count = blocks.len(), "Rendered document");
    blocks
}

/// Split every text node around its `[[VOID_VISION::...]]` cards, turning
/// each card into a `CollapsibleReveal` node between the two halves.
pub fn lift_reveals(nodes: &[ScriptNode]) -> Vec<ScriptNode> {
    let mut lifted = Vec::with_capacity(nodes.len());
    for node in nodes {
        let raw = match node {
            ScriptNode::Dialogue { raw_text, .. }
            | ScriptNode::Narration { raw_text }
            | ScriptNode::SystemMessage { raw_text }
            | ScriptNode::CommsMessage { raw_text, .. } => raw_text,
            other => {
                lifted.push(other.clone());
                continue;
            }
        };

        let cards: Vec<_> = tag_spans(raw)
            .into_iter()
            .filter(|span| span.variant.is_block_level())
            .collect();
        if cards.is_empty() {
            lifted.push(node.clone());
            continue;
        }

        let mut cursor = 0;
        for card in cards {
            push_segment(&mut lifted, node, &raw[cursor..card.range.start]);
            lifted.push(ScriptNode::CollapsibleReveal {
                content: card.content.to_string(),
            });
            cursor = card.range.end;
        }
        push_segment(&mut lifted, node, &raw[cursor..]);
    }
    lifted
}

fn push_segment(out: &mut Vec<ScriptNode>, template: &ScriptNode, segment: &str) {
    let segment = segment.trim();
    if segment.is_empty() {
        return;
    }
    let raw_text = segment.to_string();
    out.push(match template {
        ScriptNode::Dialogue {
            speaker_key,
            speaker_display_name,
            ..
        } => ScriptNode::Dialogue {
            speaker_key: speaker_key.clone(),
            speaker_display_name: speaker_display_name.clone(),
            raw_text,
        },
        ScriptNode::SystemMessage { .. } => ScriptNode::SystemMessage { raw_text },
        ScriptNode::CommsMessage {
            speaker_display_name,
            ..
        } => ScriptNode::CommsMessage {
            speaker_display_name: speaker_display_name.clone(),
            raw_text,
        },
        _ => ScriptNode::Narration { raw_text },
    });
}

fn render_block(node: &ScriptNode) -> DocumentBlock {
    match node {
        ScriptNode::Dialogue {
            speaker_key,
            raw_text,
            ..
        } => DocumentBlock::Paragraph {
            speaker: Some(speaker_key.clone()),
            runs: format_inline(raw_text),
        },
        ScriptNode::Narration { raw_text } => DocumentBlock::Paragraph {
            speaker: None,
            runs: format_inline(raw_text),
        },
        ScriptNode::SystemMessage { raw_text } => DocumentBlock::System {
            runs: format_inline(raw_text),
        },
        ScriptNode::CommsMessage {
            speaker_display_name,
            raw_text,
        } => DocumentBlock::Comms {
            speaker: speaker_display_name.clone(),
            runs: format_inline(raw_text),
        },
        ScriptNode::ImageCue {
            source_ref,
            caption,
        } => DocumentBlock::Image {
            source_ref: source_ref.clone(),
            caption: caption.clone(),
        },
        ScriptNode::Divider => DocumentBlock::Divider,
        ScriptNode::JumpLink {
            target_volume_id,
            label,
        } => DocumentBlock::Jump {
            target_volume_id: target_volume_id.clone(),
            label: label.clone(),
        },
        ScriptNode::InterceptBlock { lines } => render_intercept(lines),
        ScriptNode::CollapsibleReveal { content } => DocumentBlock::Reveal {
            content: content.clone(),
        },
    }
}

fn render_intercept(lines: &[String]) -> DocumentBlock {
    let signal_id = lines
        .first()
        .and_then(|first| intercept_open_regex().captures(first))
        .and_then(|caps| caps.get(1))
        .map_or(DEFAULT_SIGNAL_ID, |m| m.as_str())
        .to_string();

    let lines = lines
        .iter()
        .map(|line| {
            let cleaned = strip_intercept_markers(line);
            if cleaned.trim().is_empty() {
                InterceptLine::Spacer
            } else {
                InterceptLine::Text(format_inline(&cleaned))
            }
        })
        .collect();

    DocumentBlock::Intercept { signal_id, lines }
}

/// Remove every open and close marker from an intercept line.
pub fn strip_intercept_markers(line: &str) -> String {
    let mut cleaned = intercept_open_regex().replace_all(line, "").into_owned();
    for marker in INTERCEPT_CLOSE_MARKERS {
        cleaned = cleaned.replace(marker, "");
    }
    cleaned
}

/// Whether any block hides content behind a spoiler card.
pub fn has_reveals(blocks: &[DocumentBlock]) -> bool {
    blocks
        .iter()
        .any(|b| matches!(b, DocumentBlock::Reveal { .. }))
}

/// Variants used anywhere in the rendered blocks, in first-seen order.
pub fn styles_used(blocks: &[DocumentBlock]) -> Vec<StyleVariant> {
    let mut seen = Vec::new();
    for block in blocks {
        let variants: Vec<StyleVariant> = match block {
            DocumentBlock::Paragraph { runs, .. }
            | DocumentBlock::Comms { runs, .. }
            | DocumentBlock::System { runs } => runs.iter().filter_map(StyledRun::variant).collect(),
            DocumentBlock::Intercept { lines, .. } => lines
                .iter()
                .filter_map(|line| match line {
                    InterceptLine::Text(runs) => Some(runs),
                    InterceptLine::Spacer => None,
                })
                .flatten()
                .filter_map(StyledRun::variant)
                .collect(),
            DocumentBlock::Reveal { .. } => vec![StyleVariant::SpoilerCard],
            DocumentBlock::Image { .. } | DocumentBlock::Divider | DocumentBlock::Jump { .. } => {
                Vec::new()
            }
        };
        for variant in variants {
            if !seen.contains(&variant) {
                seen.push(variant);
            }
        }
    }
    seen
}
