/// Playback integration tests: staged reading of a parsed chapter under a
/// simulated host clock.

use narrative_script::core::parser::parse_script;
use narrative_script::core::playback::{PlaybackConfig, PlaybackPhase, PlaybackState};
use narrative_script::schema::node::{NodeKind, ScriptNode};
use pretty_assertions::assert_eq;
use std::path::Path;

fn rain_nodes() -> Vec<ScriptNode> {
    let text = std::fs::read_to_string("tests/fixtures/chapters/story-frag-rain-01.txt").unwrap();
    parse_script(&text)
}

/// Drive the clock from deadline to deadline until nothing is pending.
fn run_timers(state: &mut PlaybackState) -> u64 {
    while let Some(deadline) = state.next_deadline() {
        state.tick(deadline);
    }
    state.now_ms()
}

#[test]
fn manual_reading_visits_every_node_in_order() {
    let nodes = rain_nodes();
    let mut state = PlaybackState::new(nodes.clone(), PlaybackConfig::default());

    let mut steps = 0;
    while !state.is_at_end() {
        let cursor = state.cursor();
        state.advance();
        if state.is_at_end() {
            break;
        }
        if state.cursor() == cursor {
            // Completing a reveal never moves the cursor.
            assert_eq!(state.phase(), PlaybackPhase::AwaitingAdvance);
            assert_eq!(state.revealed_len(), state.display_len());
        } else {
            assert_eq!(state.cursor(), cursor + 1);
        }
        assert_eq!(state.backlog(), &nodes[..state.cursor()]);
        steps += 1;
        assert!(steps < 100);
    }

    assert_eq!(state.cursor(), nodes.len() - 1);
    assert_eq!(state.backlog().len(), nodes.len() - 1);

    state.advance();
    assert!(state.is_at_end());
    assert_eq!(state.backlog().len(), nodes.len() - 1);
}

#[test]
fn instant_nodes_skip_the_typewriter() {
    let nodes = rain_nodes();
    let mut state = PlaybackState::new(nodes, PlaybackConfig::default());

    // Walk to the image cue, then to the tagged narration.
    while state.current_node().kind() != NodeKind::ImageCue {
        state.advance();
    }
    assert_eq!(state.phase(), PlaybackPhase::AwaitingAdvance);
    assert_eq!(state.revealed_text(), "雨夜的天台");

    while !state.current_node().has_inline_tags() || state.current_node().kind() != NodeKind::Narration {
        state.advance();
    }
    assert_eq!(state.phase(), PlaybackPhase::AwaitingAdvance);
    assert!(state.revealed_text().contains("[[VOID_VISION::"));
}

#[test]
fn auto_play_runs_the_chapter_to_the_end() {
    let nodes = rain_nodes();
    let count = nodes.len();
    let mut state = PlaybackState::new(nodes, PlaybackConfig::default());
    state.toggle_auto();

    let finished_at = run_timers(&mut state);
    assert!(state.is_at_end());
    assert!(!state.is_auto_playing());
    assert_eq!(state.backlog().len(), count - 1);
    assert_eq!(state.pending_timers(), 0);
    assert!(finished_at > 0);
}

#[test]
fn auto_play_timing_follows_config() {
    let config = PlaybackConfig::load_from_ron(Path::new("tests/fixtures/playback.ron")).unwrap();
    assert_eq!(config.tick_interval_ms, 50);
    assert_eq!(config.per_char_ms, 20);

    let nodes = vec![
        ScriptNode::Narration {
            raw_text: "一二三".to_string(),
        },
        ScriptNode::Narration {
            raw_text: "四".to_string(),
        },
    ];
    let mut state = PlaybackState::new(nodes, config);
    state.toggle_auto();

    state.tick(149);
    assert_eq!(state.revealed_text(), "一二");
    state.tick(150);
    assert_eq!(state.phase(), PlaybackPhase::AwaitingAdvance);
    assert_eq!(state.next_deadline(), Some(150 + 1000 + 3 * 20));

    state.tick(1209);
    assert_eq!(state.cursor(), 0);
    state.tick(1210);
    assert_eq!(state.cursor(), 1);
    assert!(state.is_revealing());
}

#[test]
fn stale_timers_never_fire_after_cancel() {
    let mut state = PlaybackState::new(rain_nodes(), PlaybackConfig::default());
    state.toggle_auto();
    state.tick(10);
    state.cancel_timers();
    let cursor = state.cursor();
    let revealed = state.revealed_len();

    assert_eq!(state.tick(1_000_000), 0);
    assert_eq!(state.cursor(), cursor);
    assert_eq!(state.revealed_len(), revealed);
}

#[test]
fn replaced_chapter_starts_clean() {
    let mut first = PlaybackState::new(rain_nodes(), PlaybackConfig::default());
    first.toggle_auto();
    first.tick(500);
    first.cancel_timers();

    let second = PlaybackState::starting_at(Vec::new(), PlaybackConfig::default(), 500);
    assert_eq!(second.current_node(), &ScriptNode::placeholder());
    assert!(!second.is_auto_playing());
    assert!(second.backlog().is_empty());
    assert_eq!(second.next_deadline(), Some(530));
}
