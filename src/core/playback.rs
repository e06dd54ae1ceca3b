/// Playback state machine for the staged, turn-by-turn surface.
///
/// Owns the node sequence, the cursor, the typewriter reveal and the
/// auto-play cadence. Timers live in a [`Scheduler`] owned by the state and
/// only fire from [`PlaybackState::tick`], so a superseded timer is removed
/// before it can act on a replaced node.
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::core::scheduler::Scheduler;
use crate::schema::node::ScriptNode;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Timing for the typewriter and auto-play timers, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_interval_ms: u64,
    pub auto_base_delay_ms: u64,
    /// Base delay for nodes carrying inline markup.
    pub rich_text_base_delay_ms: u64,
    pub per_char_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            auto_base_delay_ms: 1500,
            rich_text_base_delay_ms: 2000,
            per_char_ms: 20,
        }
    }
}

impl PlaybackConfig {
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn load_from_ron(path: &Path) -> Result<Self, PlaybackError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<Self, PlaybackError> {
        Ok(ron::from_str(input)?)
    }

    /// Auto-advance delay once `node` is fully shown.
    pub fn auto_delay_ms(&self, node: &ScriptNode, display_len: usize) -> u64 {
        let base = if node.has_inline_tags() {
            self.rich_text_base_delay_ms
        } else {
            self.auto_base_delay_ms
        };
        base.saturating_add(self.per_char_ms.saturating_mul(display_len as u64))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackPhase {
    /// Typewriter in progress.
    Revealing,
    /// Current node fully shown.
    AwaitingAdvance,
    /// Cursor exhausted.
    AtEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    Typewriter,
    AutoAdvance,
}

#[derive(Debug, Clone)]
pub struct PlaybackState {
    nodes: Vec<ScriptNode>,
    cursor: usize,
    display_text: String,
    display_len: usize,
    revealed_len: usize,
    phase: PlaybackPhase,
    auto_playing: bool,
    backlog: Vec<ScriptNode>,
    timers: Scheduler<Timer>,
    now_ms: u64,
    config: PlaybackConfig,
}

impl PlaybackState {
    /// Start playback with the clock at zero.
    pub fn new(nodes: Vec<ScriptNode>, config: PlaybackConfig) -> Self {
        Self::starting_at(nodes, config, 0)
    }

    /// Start playback at host time `now_ms`. An empty sequence plays the
    /// placeholder node instead.
    pub fn starting_at(nodes: Vec<ScriptNode>, config: PlaybackConfig, now_ms: u64) -> Self {
        let nodes = if nodes.is_empty() {
            vec![ScriptNode::placeholder()]
        } else {
            nodes
        };
        let mut state = Self {
            nodes,
            cursor: 0,
            display_text: String::new(),
            display_len: 0,
            revealed_len: 0,
            phase: PlaybackPhase::Revealing,
            auto_playing: false,
            backlog: Vec::new(),
            timers: Scheduler::new(),
            now_ms,
            config,
        };
        state.enter_current();
        state
    }

    /// User advance: completes a reveal, moves to the next node, or ends.
    pub fn advance(&mut self) {
        match self.phase {
            PlaybackPhase::Revealing => {
                self.timers.cancel_all();
                self.finish_reveal();
            }
            PlaybackPhase::AwaitingAdvance => {
                self.timers.cancel_all();
                if self.cursor + 1 < self.nodes.len() {
                    let current = self.nodes[self.cursor].clone();
                    self.backlog.push(current);
                    self.cursor += 1;
                    self.enter_current();
                } else {
                    self.phase = PlaybackPhase::AtEnd;
                    self.auto_playing = false;
                    tracing::trace!(cursor = self.cursor, "Playback reached end");
                }
            }
            PlaybackPhase::AtEnd => {}
        }
    }

    /// [`advance`](Self::advance) at host time `now_ms`. Timers due by then
    /// fire first; timers armed by the advance count from `now_ms`.
    pub fn advance_at(&mut self, now_ms: u64) {
        self.tick(now_ms);
        self.advance();
    }

    /// Flip auto-play. Turning it on while waiting advances immediately.
    pub fn toggle_auto(&mut self) {
        if self.phase == PlaybackPhase::AtEnd {
            return;
        }
        if self.auto_playing {
            self.auto_playing = false;
            self.timers.cancel_where(|t| *t == Timer::AutoAdvance);
        } else {
            self.auto_playing = true;
            if self.phase == PlaybackPhase::AwaitingAdvance {
                self.advance();
            }
        }
        tracing::trace!(auto = self.auto_playing, "Auto-play toggled");
    }

    /// [`toggle_auto`](Self::toggle_auto) at host time `now_ms`.
    pub fn toggle_auto_at(&mut self, now_ms: u64) {
        self.tick(now_ms);
        self.toggle_auto();
    }

    /// Move the clock to `now_ms`, firing every due timer at its own due
    /// time. Returns the number of timers fired.
    pub fn tick(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;
        while let Some(task) = self.timers.pop_due(now_ms) {
            self.now_ms = self.now_ms.max(task.due_ms);
            fired += 1;
            match task.payload {
                Timer::Typewriter => self.typewriter_step(),
                Timer::AutoAdvance => {
                    tracing::trace!(cursor = self.cursor, "Auto-advance fired");
                    self.advance();
                }
            }
        }
        self.now_ms = self.now_ms.max(now_ms);
        fired
    }

    /// Drop every pending timer; used when the surface unmounts.
    pub fn cancel_timers(&mut self) {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            tracing::trace!(cancelled, "Playback timers cancelled");
        }
    }

    fn enter_current(&mut self) {
        self.timers.cancel_all();
        let node = &self.nodes[self.cursor];
        self.display_text = node.display_text();
        self.display_len = self.display_text.chars().count();
        self.revealed_len = 0;

        if node.is_image() || node.has_inline_tags() || self.display_len == 0 {
            self.finish_reveal();
        } else {
            self.phase = PlaybackPhase::Revealing;
            self.schedule_tick();
        }
        tracing::trace!(cursor = self.cursor, phase = ?self.phase, "Entered node");
    }

    fn typewriter_step(&mut self) {
        if self.phase != PlaybackPhase::Revealing {
            return;
        }
        self.revealed_len += 1;
        if self.revealed_len >= self.display_len {
            self.finish_reveal();
        } else {
            self.schedule_tick();
        }
    }

    fn finish_reveal(&mut self) {
        self.revealed_len = self.display_len;
        self.phase = PlaybackPhase::AwaitingAdvance;
        self.arm_auto();
    }

    fn schedule_tick(&mut self) {
        let due = self.now_ms.saturating_add(self.config.tick_interval_ms.max(1));
        self.timers.schedule(due, Timer::Typewriter);
    }

    fn arm_auto(&mut self) {
        if !self.auto_playing || self.phase != PlaybackPhase::AwaitingAdvance {
            return;
        }
        self.timers.cancel_where(|t| *t == Timer::AutoAdvance);
        let delay = self
            .config
            .auto_delay_ms(&self.nodes[self.cursor], self.display_len);
        self.timers.schedule(self.now_ms.saturating_add(delay), Timer::AutoAdvance);
    }

    pub fn nodes(&self) -> &[ScriptNode] {
        &self.nodes
    }

    pub fn current_node(&self) -> &ScriptNode {
        &self.nodes[self.cursor]
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Never true; an empty sequence is replaced by the placeholder.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The full display text of the current node.
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    /// The revealed prefix of the display text, cut on codepoints.
    pub fn revealed_text(&self) -> &str {
        match self.display_text.char_indices().nth(self.revealed_len) {
            Some((byte, _)) => &self.display_text[..byte],
            None => &self.display_text,
        }
    }

    pub fn revealed_len(&self) -> usize {
        self.revealed_len
    }

    pub fn display_len(&self) -> usize {
        self.display_len
    }

    pub fn backlog(&self) -> &[ScriptNode] {
        &self.backlog
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn is_revealing(&self) -> bool {
        self.phase == PlaybackPhase::Revealing
    }

    pub fn is_at_end(&self) -> bool {
        self.phase == PlaybackPhase::AtEnd
    }

    pub fn is_auto_playing(&self) -> bool {
        self.auto_playing
    }

    /// When the host should next call [`tick`](Self::tick), if ever.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn narration(text: &str) -> ScriptNode {
        ScriptNode::Narration {
            raw_text: text.to_string(),
        }
    }

    fn state(nodes: Vec<ScriptNode>) -> PlaybackState {
        PlaybackState::new(nodes, PlaybackConfig::default())
    }

    #[test]
    fn empty_sequence_plays_placeholder() {
        let s = state(Vec::new());
        assert_eq!(s.len(), 1);
        assert_eq!(s.current_node(), &ScriptNode::placeholder());
        assert!(s.is_revealing());
    }

    #[test]
    fn typewriter_reveals_by_codepoint() {
        let mut s = state(vec![narration("雨停了")]);
        assert_eq!(s.revealed_text(), "");
        assert_eq!(s.next_deadline(), Some(30));

        s.tick(30);
        assert_eq!(s.revealed_text(), "雨");
        s.tick(60);
        assert_eq!(s.revealed_text(), "雨停");
        s.tick(90);
        assert_eq!(s.revealed_text(), "雨停了");
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.next_deadline(), None);
    }

    #[test]
    fn clock_jump_replays_every_tick() {
        let mut s = state(vec![narration("abcd")]);
        assert_eq!(s.tick(1_000), 4);
        assert_eq!(s.revealed_len(), 4);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
    }

    #[test]
    fn advance_while_revealing_keeps_cursor() {
        let mut s = state(vec![narration("hello"), narration("world")]);
        s.tick(30);
        s.advance();
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.revealed_text(), "hello");
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn advance_moves_and_fills_backlog() {
        let nodes = vec![narration("a"), narration("b"), narration("c")];
        let mut s = state(nodes.clone());
        for expected in 1..3 {
            s.advance();
            s.advance();
            assert_eq!(s.cursor(), expected);
            assert_eq!(s.backlog(), &nodes[..expected]);
            assert_eq!(s.revealed_len(), 0);
        }
    }

    #[test]
    fn past_last_node_is_at_end_and_stays() {
        let mut s = state(vec![narration("x")]);
        s.advance();
        s.advance();
        assert!(s.is_at_end());
        s.advance();
        s.toggle_auto();
        assert!(s.is_at_end());
        assert!(!s.is_auto_playing());
        assert_eq!(s.cursor(), 0);
        assert!(s.backlog().is_empty());
    }

    #[test]
    fn image_and_tagged_nodes_skip_typewriter() {
        let image = ScriptNode::ImageCue {
            source_ref: "a.png".to_string(),
            caption: "cap".to_string(),
        };
        let s = state(vec![image]);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.revealed_text(), "cap");

        let s = state(vec![narration("see [[MASK::this]]")]);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.revealed_len(), s.display_len());
    }

    #[test]
    fn dialogue_reveals_speech_only() {
        let node = ScriptNode::Dialogue {
            speaker_key: crate::schema::node::SpeakerKey::new("point"),
            speaker_display_name: "零点".to_string(),
            raw_text: "零点：“走吧。”".to_string(),
        };
        let mut s = state(vec![node]);
        s.advance();
        assert_eq!(s.revealed_text(), "走吧。");
    }

    #[test]
    fn toggle_on_while_waiting_advances_immediately() {
        let mut s = state(vec![narration("a"), narration("b")]);
        s.advance();
        s.toggle_auto();
        assert!(s.is_auto_playing());
        assert_eq!(s.cursor(), 1);
        assert!(s.is_revealing());
    }

    #[test]
    fn auto_play_cadence() {
        let mut s = state(vec![narration("ab"), narration("cd")]);
        s.toggle_auto();
        // Still revealing; cadence starts at completion.
        assert_eq!(s.cursor(), 0);
        s.tick(60);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.next_deadline(), Some(60 + 1500 + 2 * 20));

        s.tick(60 + 1540);
        assert_eq!(s.cursor(), 1);
        s.tick(10_000);
        assert!(s.is_at_end());
        assert!(!s.is_auto_playing());
        assert_eq!(s.pending_timers(), 0);
    }

    #[test]
    fn rich_text_uses_longer_base_delay() {
        let config = PlaybackConfig::default();
        let node = narration("[[DANGER::x]]");
        assert_eq!(config.auto_delay_ms(&node, 13), 2000 + 13 * 20);
        assert_eq!(config.auto_delay_ms(&narration("x"), 1), 1520);
    }

    #[test]
    fn toggle_off_cancels_auto_timer() {
        let mut s = state(vec![narration("a"), narration("b")]);
        s.toggle_auto();
        s.tick(30);
        assert_eq!(s.pending_timers(), 1);
        s.toggle_auto();
        assert_eq!(s.pending_timers(), 0);
        s.tick(100_000);
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn manual_advance_replaces_pending_auto_timer() {
        let mut s = state(vec![narration("a"), narration("b"), narration("c")]);
        s.toggle_auto();
        s.tick(30);
        s.advance();
        assert_eq!(s.cursor(), 1);
        // Only the new node's typewriter is pending.
        assert_eq!(s.pending_timers(), 1);
        assert_eq!(s.next_deadline(), Some(60));
    }

    #[test]
    fn cancel_timers_stops_everything() {
        let mut s = state(vec![narration("long text")]);
        s.cancel_timers();
        assert_eq!(s.tick(100_000), 0);
        assert_eq!(s.revealed_len(), 0);
    }

    #[test]
    fn starting_at_offsets_deadlines() {
        let s = PlaybackState::starting_at(vec![narration("a")], PlaybackConfig::default(), 5_000);
        assert_eq!(s.next_deadline(), Some(5_030));
    }

    #[test]
    fn idle_gap_before_advance_keeps_reveal_pace() {
        let mut s = state(vec![narration("a"), narration("一二三四五六七八九十")]);
        s.tick(30);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.next_deadline(), None);

        s.advance_at(10_000);
        assert_eq!(s.cursor(), 1);
        assert_eq!(s.next_deadline(), Some(10_030));
        s.tick(10_030);
        assert_eq!(s.revealed_text(), "一");
    }

    #[test]
    fn idle_gap_before_toggle_on_keeps_reveal_pace() {
        let mut s = state(vec![narration("a"), narration("bcd")]);
        s.tick(30);
        s.toggle_auto_at(5_000);
        assert_eq!(s.cursor(), 1);
        s.tick(5_030);
        assert_eq!(s.revealed_text(), "b");
    }

    #[test]
    fn advance_at_delivers_due_timers_first() {
        let mut s = state(vec![narration("abc"), narration("d")]);
        s.advance_at(60);
        // Two characters were due before the click completed the reveal.
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.phase(), PlaybackPhase::AwaitingAdvance);
        assert_eq!(s.now_ms(), 60);
    }

    #[test]
    fn oversized_timings_saturate() {
        let config = PlaybackConfig {
            tick_interval_ms: u64::MAX,
            auto_base_delay_ms: u64::MAX,
            rich_text_base_delay_ms: u64::MAX,
            per_char_ms: u64::MAX,
        };
        assert_eq!(config.auto_delay_ms(&narration("abc"), 3), u64::MAX);

        let s = PlaybackState::starting_at(vec![narration("a")], config, u64::MAX - 5);
        assert_eq!(s.next_deadline(), Some(u64::MAX));
    }

    #[test]
    fn config_from_ron_fills_defaults() {
        let config = PlaybackConfig::parse_ron("(tick_interval_ms: 10)").unwrap();
        assert_eq!(config.tick_interval_ms, 10);
        assert_eq!(config.auto_base_delay_ms, 1500);
        assert!(PlaybackConfig::parse_ron("(tick_interval_ms: \"x\")").is_err());
    }
}
