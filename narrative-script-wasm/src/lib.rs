//! WASM bindings for narrative-script: lets a web reader parse chapters
//! and drive staged playback from JavaScript.

use wasm_bindgen::prelude::*;

use narrative_script::core::document;
use narrative_script::core::inline::{format_inline, has_styling};
use narrative_script::core::lint::lint_script;
use narrative_script::core::parser::parse_script;
use narrative_script::core::playback::{PlaybackConfig, PlaybackPhase, PlaybackState};
use narrative_script::schema::node::ScriptNode;
use narrative_script::schema::style::StyledRun;
use narrative_script::schema::theme::{ChapterTheme, CharacterIdentity};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct LintInfo {
    line: usize,
    message: String,
}

#[derive(serde::Serialize)]
struct PlayerSnapshot<'a> {
    cursor: usize,
    len: usize,
    phase: &'static str,
    auto_playing: bool,
    speaker: Option<&'a str>,
    speaker_key: Option<&'a str>,
    initials: Option<String>,
    revealed_text: &'a str,
    /// Styled runs once the node is fully shown and carries markup.
    runs: Option<Vec<StyledRun>>,
    backlog_len: usize,
    next_deadline: Option<u64>,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn phase_label(phase: PlaybackPhase) -> &'static str {
    match phase {
        PlaybackPhase::Revealing => "revealing",
        PlaybackPhase::AwaitingAdvance => "awaiting_advance",
        PlaybackPhase::AtEnd => "at_end",
    }
}

/// JS clocks are doubles; negative or NaN times clamp to zero.
fn clock_ms(now_ms: f64) -> u64 {
    if now_ms.is_finite() && now_ms > 0.0 {
        now_ms as u64
    } else {
        0
    }
}

// ---------------------------------------------------------------------------
// Stateless entry points
// ---------------------------------------------------------------------------

/// Parse chapter text into a JSON array of script nodes.
#[wasm_bindgen]
pub fn parse_chapter(text: &str) -> Result<String, JsError> {
    to_json(&parse_script(text))
}

/// Parse chapter text and return the document surface blocks as JSON.
#[wasm_bindgen]
pub fn render_document(text: &str) -> Result<String, JsError> {
    to_json(&document::render_document(&parse_script(text)))
}

/// Return a JSON array of `{ line, message }` authoring warnings.
#[wasm_bindgen]
pub fn lint_chapter(text: &str) -> Result<String, JsError> {
    let issues: Vec<LintInfo> = lint_script(text)
        .into_iter()
        .map(|issue| LintInfo {
            line: issue.line,
            message: issue.to_string(),
        })
        .collect();
    to_json(&issues)
}

/// Theme key for a chapter id, e.g. `"rain"`.
#[wasm_bindgen]
pub fn chapter_theme(chapter_id: &str) -> String {
    ChapterTheme::detect(chapter_id).key().to_string()
}

// ---------------------------------------------------------------------------
// Staged playback
// ---------------------------------------------------------------------------

/// One chapter's staged playback. The host calls `tick` from its animation
/// loop (or a timeout set to `next_deadline`) and re-renders from `snapshot`.
/// User events carry the host clock too, since nothing ticks while idle.
#[wasm_bindgen]
pub struct ScriptPlayer {
    state: PlaybackState,
    theme: ChapterTheme,
}

#[wasm_bindgen]
impl ScriptPlayer {
    /// Create a player for chapter text. `config_ron` overrides timing.
    #[wasm_bindgen(constructor)]
    pub fn new(
        chapter_id: &str,
        text: &str,
        config_ron: Option<String>,
        now_ms: f64,
    ) -> Result<ScriptPlayer, JsError> {
        let config = match config_ron {
            Some(ron) => PlaybackConfig::parse_ron(&ron)
                .map_err(|e| JsError::new(&format!("Invalid playback config: {e}")))?,
            None => PlaybackConfig::default(),
        };
        Ok(Self {
            state: PlaybackState::starting_at(parse_script(text), config, clock_ms(now_ms)),
            theme: ChapterTheme::detect(chapter_id),
        })
    }

    pub fn advance(&mut self, now_ms: f64) {
        self.state.advance_at(clock_ms(now_ms));
    }

    pub fn toggle_auto(&mut self, now_ms: f64) {
        self.state.toggle_auto_at(clock_ms(now_ms));
    }

    /// Fire due timers; returns how many fired.
    pub fn tick(&mut self, now_ms: f64) -> usize {
        self.state.tick(clock_ms(now_ms))
    }

    /// Call when the reader view unmounts.
    pub fn dispose(&mut self) {
        self.state.cancel_timers();
    }

    pub fn is_at_end(&self) -> bool {
        self.state.is_at_end()
    }

    /// Next timer deadline in ms, or -1 when nothing is pending.
    pub fn next_deadline(&self) -> f64 {
        self.state.next_deadline().map_or(-1.0, |d| d as f64)
    }

    /// JSON view of what the staged surface should show now.
    pub fn snapshot(&self) -> Result<String, JsError> {
        let node = self.state.current_node();
        let speaker_key = node.speaker_key();
        let runs = if self.state.is_revealing() {
            None
        } else {
            let runs = format_inline(self.state.display_text());
            has_styling(&runs).then_some(runs)
        };
        let snapshot = PlayerSnapshot {
            cursor: self.state.cursor(),
            len: self.state.len(),
            phase: phase_label(self.state.phase()),
            auto_playing: self.state.is_auto_playing(),
            speaker: node.speaker_display_name(),
            speaker_key: speaker_key.map(|k| k.as_str()),
            initials: speaker_key.map(|k| CharacterIdentity::resolve(k, self.theme).initials),
            revealed_text: self.state.revealed_text(),
            runs,
            backlog_len: self.state.backlog().len(),
            next_deadline: self.state.next_deadline(),
        };
        to_json(&snapshot)
    }

    /// The backlog as a JSON array of script nodes.
    pub fn backlog(&self) -> Result<String, JsError> {
        let backlog: &[ScriptNode] = self.state.backlog();
        to_json(&backlog)
    }
}
