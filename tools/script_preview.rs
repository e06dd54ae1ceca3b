/// Script Preview: renders a chapter file as a document, or steps through
/// it on the staged surface.
///
/// Usage: script_preview <chapter.txt> [--speakers <path>] [--config <path>] [--staged] [--auto]
///
/// Staged commands:
///   (enter) | next   advance
///   auto             toggle auto-play
///   wait <ms>        move the clock forward
///   run              let timers run until playback stops
///   log              print the backlog
///   help             list commands
///   quit             exit

use narrative_script::core::document::{has_reveals, render_document, styles_used, DocumentBlock, InterceptLine};
use narrative_script::core::inline::strip_markup;
use narrative_script::core::parser::ScriptParser;
use narrative_script::core::playback::{PlaybackConfig, PlaybackPhase, PlaybackState};
use narrative_script::core::speaker::SpeakerTable;
use narrative_script::schema::node::ScriptNode;
use narrative_script::schema::style::{RunKind, StyledRun};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let chapter_path = args[1].clone();
    let mut speakers_path = None;
    let mut config_path = None;
    let mut staged = false;
    let mut auto = false;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--speakers" if i + 1 < args.len() => {
                i += 1;
                speakers_path = Some(args[i].clone());
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--staged" => staged = true,
            "--auto" => auto = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    let speakers = match speakers_path {
        Some(ref path) => SpeakerTable::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load speaker table: {}", e);
            process::exit(1);
        }),
        None => SpeakerTable::default(),
    };

    let config = match config_path {
        Some(ref path) => PlaybackConfig::load_from_ron(Path::new(path)).unwrap_or_else(|e| {
            eprintln!("ERROR: Failed to load playback config: {}", e);
            process::exit(1);
        }),
        None => PlaybackConfig::default(),
    };

    let text = std::fs::read_to_string(&chapter_path).unwrap_or_else(|e| {
        eprintln!("ERROR: Failed to read {}: {}", chapter_path, e);
        process::exit(1);
    });

    let nodes = ScriptParser::new(&speakers).parse(&text);
    println!("Parsed {} nodes from {}", nodes.len(), chapter_path);

    if staged {
        run_staged(nodes, config, auto);
    } else {
        print_document(&nodes);
    }
}

fn print_usage() {
    println!("Usage: script_preview <chapter.txt> [--speakers <path>] [--config <path>] [--staged] [--auto]");
}

fn print_help() {
    println!("Commands:");
    println!("  (enter) | next   advance");
    println!("  auto             toggle auto-play");
    println!("  wait <ms>        move the clock forward");
    println!("  run              let timers run until playback stops");
    println!("  log              print the backlog");
    println!("  help             list commands");
    println!("  quit             exit");
}

fn runs_to_string(runs: &[StyledRun]) -> String {
    runs.iter()
        .map(|run| match run.kind {
            RunKind::Plain => run.text.clone(),
            RunKind::Bold => format!("**{}**", run.text),
            RunKind::Styled(variant) => format!("<{}>{}</{}>", variant.tag_name(), run.text, variant.tag_name()),
        })
        .collect()
}

fn print_document(nodes: &[ScriptNode]) {
    let blocks = render_document(nodes);
    let styles: Vec<&str> = styles_used(&blocks).iter().map(|v| v.tag_name()).collect();
    if !styles.is_empty() {
        println!("Styles: {}", styles.join(", "));
    }
    if has_reveals(&blocks) {
        println!("Contains collapsed spoiler cards");
    }
    println!();
    for block in blocks {
        match block {
            DocumentBlock::Paragraph { speaker: Some(key), runs } => {
                println!("[{}] {}", key, runs_to_string(&runs));
            }
            DocumentBlock::Paragraph { speaker: None, runs } => println!("{}", runs_to_string(&runs)),
            DocumentBlock::Comms { speaker, runs } => {
                println!("(comms) {}: {}", speaker, runs_to_string(&runs));
            }
            DocumentBlock::System { runs } => println!("[SYSTEM] {}", runs_to_string(&runs)),
            DocumentBlock::Image { source_ref, caption } => {
                println!("[image {}] {}", source_ref, caption);
            }
            DocumentBlock::Divider => println!("----------------"),
            DocumentBlock::Jump { target_volume_id, label } => {
                println!("=> {} ({})", label, target_volume_id);
            }
            DocumentBlock::Intercept { signal_id, lines } => {
                println!(">>> SYSTEM_INTERCEPT // {}_VOID", signal_id);
                for line in lines {
                    match line {
                        InterceptLine::Spacer => println!("  |"),
                        InterceptLine::Text(runs) => println!("  | {}", runs_to_string(&runs)),
                    }
                }
            }
            DocumentBlock::Reveal { content } => println!("[spoiler: {} chars hidden]", content.chars().count()),
        }
        println!();
    }
}

fn print_state(state: &PlaybackState) {
    let node = state.current_node();
    let label = node.speaker_display_name().unwrap_or("");
    let phase = match state.phase() {
        PlaybackPhase::Revealing => "revealing",
        PlaybackPhase::AwaitingAdvance => "waiting",
        PlaybackPhase::AtEnd => "end",
    };
    println!(
        "[{}/{} {} t={}ms{}] {}{}",
        state.cursor() + 1,
        state.len(),
        phase,
        state.now_ms(),
        if state.is_auto_playing() { " auto" } else { "" },
        if label.is_empty() { String::new() } else { format!("{}: ", label) },
        state.revealed_text()
    );
}

fn run_staged(nodes: Vec<ScriptNode>, config: PlaybackConfig, auto: bool) {
    let mut state = PlaybackState::new(nodes, config);
    if auto {
        state.toggle_auto();
    }
    print_help();
    print_state(&state);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("staged> ");
        stdout.flush().ok();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts.first().map(|c| c.to_lowercase()).unwrap_or_default();

        match cmd.as_str() {
            "" | "next" | "n" => state.advance(),
            "auto" | "a" => state.toggle_auto(),
            "wait" | "w" => match parts.get(1).and_then(|ms| ms.parse::<u64>().ok()) {
                Some(ms) => {
                    let fired = state.tick(state.now_ms() + ms);
                    println!("({} timers fired)", fired);
                }
                None => {
                    println!("Usage: wait <ms>");
                    continue;
                }
            },
            "run" | "r" => {
                while let Some(deadline) = state.next_deadline() {
                    let before = state.cursor();
                    state.tick(deadline);
                    if state.cursor() != before {
                        print_state(&state);
                    }
                }
            }
            "log" | "l" => {
                for (i, node) in state.backlog().iter().enumerate() {
                    println!("  {:>3}. {}", i + 1, strip_markup(&node.display_text()));
                }
                continue;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "quit" | "exit" | "q" => {
                state.cancel_timers();
                println!("Goodbye.");
                break;
            }
            other => {
                println!("Unknown command: {}", other);
                continue;
            }
        }
        print_state(&state);
    }
}
