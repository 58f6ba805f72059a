//! Quill CLI - a line-oriented chat loop over a project directory.
//!
//! Each prompt runs one full turn: the model's reply streams in, file
//! commands embedded in it are extracted and applied to the workspace
//! as they complete, and the reply text is printed once the turn ends.

mod config;

use std::io::Write as _;
use std::path::PathBuf;
use std::{
    env,
    fs::{self, OpenOptions},
    sync::Mutex,
};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use config::QuillConfig;
use quill_engine::{GREETING, Session, SessionError};
use quill_providers::ApiConfig;
use quill_store::DiskStore;
use quill_types::{ChatTurn, TurnStatus};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    let (log_file, init_warnings) = open_quill_log_file();

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %log_path.display(), "Logging initialized");
        for warning in init_warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // If we can't open a log file, prefer "no logs" over interleaving
    // log lines with the chat transcript on stdout.
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_quill_log_file() -> (Option<(PathBuf, std::fs::File)>, Vec<String>) {
    let candidates = quill_log_file_candidates();
    let mut warnings = Vec::new();

    for candidate in candidates {
        if let Some(parent) = candidate.parent()
            && let Err(e) = fs::create_dir_all(parent)
        {
            warnings.push(format!(
                "Failed to create log dir {}: {e}",
                parent.display()
            ));
            continue;
        }

        match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&candidate)
        {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!(
                    "Failed to open log file {}: {e}",
                    candidate.display()
                ));
            }
        }
    }

    (None, warnings)
}

fn quill_log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    // Primary: ~/.quill/logs/quill.log
    if let Some(config_path) = QuillConfig::path()
        && let Some(config_dir) = config_path.parent()
    {
        candidates.push(config_dir.join("logs").join("quill.log"));
    }

    // Fallback for homeless environments. Kept outside the current
    // directory: the workspace often IS the current directory, and a
    // log file there would show up in the project snapshot.
    candidates.push(env::temp_dir().join("quill").join("quill.log"));

    candidates
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = QuillConfig::load().unwrap_or_default();
    let api_key = config.resolve_api_key().context(
        "no API key found; set [api_keys] gemini in ~/.quill/config.toml or GEMINI_API_KEY",
    )?;

    let workspace = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| config.project_root())
        .unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&workspace)
        .with_context(|| format!("creating workspace dir {}", workspace.display()))?;

    let engine_config = config.engine_config();
    let api = ApiConfig::new(api_key, engine_config.model.clone())?;
    let store = DiskStore::new(&workspace);
    let mut session = Session::open(store, api, engine_config).await?;

    println!("quill | workspace: {}", workspace.display());
    println!("model: {GREETING}");
    println!("(/quit to exit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        match session.send(line).await {
            Ok(turn) => print_turn(turn),
            Err(SessionError::EmptyMessage) => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn prompt() -> Result<()> {
    let mut out = std::io::stdout();
    out.write_all(b"you> ")?;
    out.flush()?;
    Ok(())
}

fn print_turn(turn: &ChatTurn) {
    println!("\nmodel: {}", turn.assistant_draft().trim());
    for command in turn.commands() {
        println!("  [{} {}]", command.kind().keyword(), command.path());
    }
    if turn.status() == TurnStatus::Failed {
        tracing::warn!("turn ended in failure");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::quill_log_file_candidates;

    // The log file must never land inside the workspace: the workspace
    // defaults to the current directory, and a relative candidate would
    // put the log where the store indexes it.
    #[test]
    fn log_candidates_are_absolute() {
        let candidates = quill_log_file_candidates();
        assert!(!candidates.is_empty());
        assert!(candidates.iter().all(|p| p.is_absolute()));
    }
}
