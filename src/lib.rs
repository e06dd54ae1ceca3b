//! Narrative Script: chapter markup parsing and staged playback.
//!
//! Turns author-written chapter text into an ordered sequence of typed
//! script nodes, and drives turn-by-turn presentation of those nodes with
//! typewriter reveal, auto-advance and a backlog.

pub mod core;
pub mod schema;

pub use crate::core::parser::{parse_script, ScriptParser};
pub use crate::core::playback::{PlaybackConfig, PlaybackPhase, PlaybackState};
pub use crate::schema::node::{ScriptNode, SpeakerKey};
