/// Script parser: turns a chapter's raw text into an ordered sequence of
/// script nodes.
///
/// Single pass over lines. Prose accumulates in a smart-join buffer until a
/// blank line, block or directive flushes it; intercept blocks collect raw
/// lines until their close marker. Malformed input never fails: an
/// unterminated block is emitted as-is at end of input.
use regex::Regex;
use std::sync::OnceLock;

use crate::core::classifier::{classify, BlockKind, Directive, LineClass};
use crate::core::join::JoinBuffer;
use crate::core::speaker::SpeakerTable;
use crate::schema::node::ScriptNode;

fn comms_regex() -> &'static Regex {
    static COMMS_RE: OnceLock<Regex> = OnceLock::new();
    COMMS_RE.get_or_init(|| {
        Regex::new(r"^(.+?)[（(](?:通信频道|Comms Channel|通信頻道)[）)][:：]\s*(.*)")
            .expect("Invalid comms regex")
    })
}

/// Parse a chapter with the built-in speaker table.
pub fn parse_script(text: &str) -> Vec<ScriptNode> {
    ScriptParser::new(SpeakerTable::builtin()).parse(text)
}

/// Detect a comms-channel paragraph, returning `(speaker, message)`.
pub fn match_comms(paragraph: &str) -> Option<(String, String)> {
    let caps = comms_regex().captures(paragraph)?;
    let speaker = caps.get(1)?.as_str().trim().to_string();
    let message = caps.get(2).map_or("", |m| m.as_str()).trim().to_string();
    Some((speaker, message))
}

#[derive(Debug)]
enum ParseState {
    Scanning,
    InBlock(Vec<String>),
}

/// Reusable parser bound to a speaker table.
#[derive(Debug, Clone)]
pub struct ScriptParser<'a> {
    speakers: &'a SpeakerTable,
}

/// Per-parse working state.
struct ParseRun<'a> {
    speakers: &'a SpeakerTable,
    state: ParseState,
    buffer: JoinBuffer,
    nodes: Vec<ScriptNode>,
    recovered_blocks: usize,
}

impl<'a> ScriptParser<'a> {
    pub fn new(speakers: &'a SpeakerTable) -> Self {
        Self { speakers }
    }

    /// Parse a full chapter. Deterministic: the same text always yields the
    /// same nodes, in input line order.
    #[tracing::instrument(skip_all, fields(bytes = text.len()))]
    pub fn parse(&self, text: &str) -> Vec<ScriptNode> {
        let mut run = ParseRun {
            speakers: self.speakers,
            state: ParseState::Scanning,
            buffer: JoinBuffer::new(),
            nodes: Vec::new(),
            recovered_blocks: 0,
        };

        for line in text.lines() {
            run.feed(line.trim_end());
        }
        run.finish()
    }
}

impl ParseRun<'_> {
    fn feed(&mut self, line: &str) {
        let in_block = matches!(self.state, ParseState::InBlock(_));

        match classify(line, in_block) {
            LineClass::BlockOpen {
                kind: BlockKind::Intercept,
                closes_on_same_line,
            } => {
                self.flush_prose();
                if let ParseState::InBlock(open) =
                    std::mem::replace(&mut self.state, ParseState::Scanning)
                {
                    tracing::debug!(lines = open.len(), "Intercept reopened before close; emitting previous block");
                    self.recovered_blocks += 1;
                    self.nodes.push(ScriptNode::InterceptBlock { lines: open });
                }
                let lines = vec![line.to_string()];
                if closes_on_same_line {
                    self.nodes.push(ScriptNode::InterceptBlock { lines });
                } else {
                    self.state = ParseState::InBlock(lines);
                }
            }
            LineClass::BlockContinue => {
                if let ParseState::InBlock(lines) = &mut self.state {
                    lines.push(line.to_string());
                }
            }
            LineClass::BlockClose => {
                if let ParseState::InBlock(mut lines) =
                    std::mem::replace(&mut self.state, ParseState::Scanning)
                {
                    lines.push(line.to_string());
                    self.nodes.push(ScriptNode::InterceptBlock { lines });
                }
            }
            LineClass::Directive(directive) => {
                self.flush_prose();
                self.nodes.push(directive_node(directive));
            }
            LineClass::Blank => self.flush_prose(),
            LineClass::Prose => self.buffer.push(line.trim()),
        }
    }

    fn flush_prose(&mut self) {
        let Some(paragraph) = self.buffer.take() else {
            return;
        };
        let node = match match_comms(&paragraph) {
            Some((speaker_display_name, raw_text)) => ScriptNode::CommsMessage {
                speaker_display_name,
                raw_text,
            },
            None => self.speakers.classify_paragraph(paragraph),
        };
        self.nodes.push(node);
    }

    fn finish(mut self) -> Vec<ScriptNode> {
        self.flush_prose();
        if let ParseState::InBlock(lines) = std::mem::replace(&mut self.state, ParseState::Scanning) {
            tracing::debug!(lines = lines.len(), "Unterminated intercept block at end of input");
            self.recovered_blocks += 1;
            self.nodes.push(ScriptNode::InterceptBlock { lines });
        }
        tracing::debug!(
            node_count = self.nodes.len(),
            recovered_blocks = self.recovered_blocks,
            "Parsed script"
        );
        self.nodes
    }
}

fn directive_node(directive: Directive) -> ScriptNode {
    match directive {
        Directive::Divider => ScriptNode::Divider,
        Directive::Jump { target_id, label } => ScriptNode::JumpLink {
            target_volume_id: target_id,
            label,
        },
        Directive::Image { src, caption } => ScriptNode::ImageCue {
            source_ref: src,
            caption,
        },
    }
}
