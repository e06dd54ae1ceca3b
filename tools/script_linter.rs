/// Script Linter: reports markup problems in chapter text files.
///
/// Usage: script_linter <chapter.txt | chapter_dir> [--deny-warnings]

use narrative_script::core::lint::{lint_script, LintIssue};
use std::path::{Path, PathBuf};
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
        println!("Usage: script_linter <chapter.txt | chapter_dir> [--deny-warnings]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let deny_warnings = args[2..].iter().any(|a| a == "--deny-warnings");

    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        let mut files = Vec::new();
        collect_chapters(target, &mut files);
        files.sort();
        files
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    };

    let mut total = 0;
    let mut unreadable = 0;
    for path in &files {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!("ERROR reading {}: {}", path.display(), e);
                unreadable += 1;
                continue;
            }
        };
        let issues = lint_script(&text);
        report(path, &issues);
        total += issues.len();
    }

    println!(
        "\nSummary: {} files, {} warnings, {} unreadable",
        files.len(),
        total,
        unreadable
    );

    if unreadable > 0 || (deny_warnings && total > 0) {
        process::exit(1);
    }
}

fn collect_chapters(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_chapters(&path, files);
            } else if path.extension().and_then(|s| s.to_str()) == Some("txt") {
                files.push(path);
            }
        }
    }
}

fn report(path: &Path, issues: &[LintIssue]) {
    if issues.is_empty() {
        println!("  OK: {}", path.display());
        return;
    }
    println!("  {}:", path.display());
    for issue in issues {
        println!("    WARNING: {}", issue);
    }
}
