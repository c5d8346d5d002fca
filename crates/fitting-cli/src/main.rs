use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fitting_contracts::chat::{
    parse_intent, suggestion, Intent, SuggestionKind, BACKGROUND_SUGGESTIONS, CHAT_HELP_COMMANDS,
    OUTFIT_SUGGESTIONS,
};
use fitting_contracts::inputs::OutfitMode;
use fitting_contracts::session::RequestState;
use fitting_engine::{Completion, DryrunEditor, EditorConfig, FittingEngine, GeminiEditor, ImageEditor};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "fitting", version, about = "Virtual fitting room on top of Gemini image editing")]
struct Cli {
    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive session driven by slash commands
    Chat(ChatArgs),
    /// Single try-on from command-line inputs
    Run(RunArgs),
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    out: PathBuf,
    #[arg(long)]
    events: Option<PathBuf>,
    /// Overrides FITTING_MODEL
    #[arg(long)]
    model: Option<String>,
    /// Echo the subject photo back instead of calling the service
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug, Parser)]
struct RunArgs {
    #[arg(long)]
    photo: PathBuf,
    #[arg(long, conflicts_with = "outfit_image", required_unless_present = "outfit_image")]
    outfit: Option<String>,
    #[arg(long)]
    outfit_image: Option<PathBuf>,
    #[arg(long)]
    background: Option<String>,
    #[arg(long)]
    out: PathBuf,
    /// File or directory for the result; defaults to the output directory
    #[arg(long)]
    save_as: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    dryrun: bool,
}

#[derive(Debug)]
enum ChatEvent {
    Line(String),
    InputClosed,
    Completed(Completion),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Wait,
    Quit,
}

fn main() {
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("fitting error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("fitting={level},fitting_engine={level},fitting_contracts={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Chat(args) => {
            run_chat(args)?;
            Ok(0)
        }
        Command::Run(args) => run_once(args),
    }
}

/// Resolves the editor up front so a missing credential stops the process
/// before any input is accepted.
fn build_editor(dryrun: bool, model: Option<&str>) -> Result<Arc<dyn ImageEditor>> {
    if dryrun {
        return Ok(Arc::new(DryrunEditor));
    }
    let config = EditorConfig::from_env()
        .context("cannot start without an API credential")?
        .with_model(model);
    tracing::info!(model = %config.model, api_base = %config.api_base, "using Gemini editor");
    Ok(Arc::new(GeminiEditor::new(&config)?))
}

fn events_path(out: &Path, events: Option<&Path>) -> PathBuf {
    events
        .map(Path::to_path_buf)
        .unwrap_or_else(|| out.join("events.jsonl"))
}

fn run_chat(args: ChatArgs) -> Result<()> {
    let editor = build_editor(args.dryrun, args.model.as_deref())?;
    let events = events_path(&args.out, args.events.as_deref());
    let mut engine = FittingEngine::new(&args.out, &events, editor)?;

    let (tx, rx) = mpsc::channel::<ChatEvent>();
    spawn_stdin_reader(tx.clone());

    println!(
        "Fitting room ready ({} editor). Type /help for commands.",
        engine.editor_name()
    );
    show_prompt()?;

    let mut backlog: VecDeque<ChatEvent> = VecDeque::new();
    let mut waiting = false;
    let mut input_closed = false;

    loop {
        let next = if waiting { None } else { backlog.pop_front() };
        let event = match next {
            Some(event) => event,
            None => match rx.recv() {
                Ok(event) => event,
                Err(_) => break,
            },
        };

        match event {
            ChatEvent::Completed(completion) => {
                let state = engine.apply(completion);
                for line in state_lines(state) {
                    println!("{line}");
                }
                if waiting && engine.outstanding() == 0 {
                    waiting = false;
                }
                if input_closed && engine.outstanding() == 0 {
                    break;
                }
                if !waiting {
                    show_prompt()?;
                }
            }
            other if waiting => backlog.push_back(other),
            ChatEvent::InputClosed => {
                input_closed = true;
                if engine.outstanding() == 0 {
                    break;
                }
                println!(
                    "Waiting for {} submission(s) to finish...",
                    engine.outstanding()
                );
            }
            ChatEvent::Line(line) => match handle_line(&mut engine, &line, &tx) {
                Flow::Quit => break,
                Flow::Wait => waiting = true,
                Flow::Continue => show_prompt()?,
            },
        }
    }

    engine.finish()?;
    Ok(())
}

fn run_once(args: RunArgs) -> Result<i32> {
    let editor = build_editor(args.dryrun, args.model.as_deref())?;
    let events = events_path(&args.out, args.events.as_deref());
    let mut engine = FittingEngine::new(&args.out, &events, editor)?;

    engine.upload_subject(&args.photo)?;
    match (&args.outfit_image, &args.outfit) {
        (Some(path), _) => engine.choose_outfit_image(path)?,
        (None, Some(text)) => engine.describe_outfit(text),
        (None, None) => anyhow::bail!("either --outfit or --outfit-image is required"),
    }
    if let Some(background) = args.background.as_deref() {
        engine.set_background(background);
    }

    let state = engine.generate_blocking()?.clone();
    let code = match &state {
        RequestState::Succeeded(result) => {
            let path = engine.download(args.save_as.as_deref())?;
            println!("Saved {}", path.display());
            if let Some(caption) = result.caption.as_deref() {
                println!("Note: {caption}");
            }
            0
        }
        other => {
            for line in state_lines(other) {
                eprintln!("{line}");
            }
            1
        }
    };
    engine.finish()?;
    Ok(code)
}

fn spawn_stdin_reader(tx: Sender<ChatEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(ChatEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    tracing::warn!("stdin read failed: {err}");
                    break;
                }
            }
        }
        let _ = tx.send(ChatEvent::InputClosed);
    });
}

fn show_prompt() -> Result<()> {
    print!("> ");
    io::stdout().flush()?;
    Ok(())
}

fn handle_line(engine: &mut FittingEngine, line: &str, tx: &Sender<ChatEvent>) -> Flow {
    let intent = parse_intent(line);
    match intent.action.as_str() {
        "noop" => {}
        "help" => println!("Commands: {}", CHAT_HELP_COMMANDS.join(" ")),
        "describe_outfit" => match non_empty_arg(&intent, "text") {
            Some(text) => {
                engine.describe_outfit(&text);
                println!("Outfit set to: {text}");
            }
            None => println!("/outfit requires a description"),
        },
        "set_background" => {
            let text = non_empty_arg(&intent, "text").unwrap_or_default();
            engine.set_background(&text);
            if text.is_empty() {
                println!("Background cleared; the original background will be kept.");
            } else {
                println!("Background set to: {text}");
            }
        }
        "set_outfit_mode" => {
            match intent.arg_str("mode").and_then(OutfitMode::parse) {
                Some(mode) => {
                    engine.set_outfit_mode(mode);
                    println!("Outfit mode: {}", mode.as_str());
                }
                None => println!("/mode expects `text` or `image`"),
            }
        }
        "upload_subject" => match non_empty_arg(&intent, "path") {
            Some(path) => match engine.upload_subject(Path::new(&path)) {
                Ok(()) => println!("Photo loaded: {path}"),
                Err(err) => println!("Error: {err}"),
            },
            None => println!("/photo requires a path"),
        },
        "upload_outfit_image" => match non_empty_arg(&intent, "path") {
            Some(path) => match engine.choose_outfit_image(Path::new(&path)) {
                Ok(()) => println!("Outfit image loaded: {path}"),
                Err(err) => println!("Error: {err}"),
            },
            None => println!("/outfit_image requires a path"),
        },
        "ideas" => {
            println!("Outfit ideas:");
            for (idx, idea) in OUTFIT_SUGGESTIONS.iter().enumerate() {
                println!("  {}. {idea}", idx + 1);
            }
            println!("Background ideas:");
            for (idx, idea) in BACKGROUND_SUGGESTIONS.iter().enumerate() {
                println!("  {}. {idea}", idx + 1);
            }
            println!("Use /pick outfit <n> or /pick background <n>.");
        }
        "pick" => pick_suggestion(engine, &intent),
        "generate" => {
            let tx = tx.clone();
            match engine.submit(move |completion| {
                let _ = tx.send(ChatEvent::Completed(completion));
            }) {
                Ok(id) => println!("Generating your look (submission #{id})..."),
                Err(err) => println!("Error: {err}"),
            }
        }
        "wait" => {
            if engine.outstanding() == 0 {
                println!("Nothing in flight.");
            } else {
                println!("Waiting for {} submission(s)...", engine.outstanding());
                return Flow::Wait;
            }
        }
        "download" => {
            let target = non_empty_arg(&intent, "path").map(PathBuf::from);
            match engine.download(target.as_deref()) {
                Ok(path) => println!("Saved {}", path.display()),
                Err(err) => println!("Error: {err:#}"),
            }
        }
        "status" => {
            for line in status_lines(engine) {
                println!("{line}");
            }
        }
        "quit" => return Flow::Quit,
        _ => {
            let command = intent.arg_str("command").unwrap_or_default();
            println!("Unknown command /{command}. Type /help for commands.");
        }
    }
    Flow::Continue
}

fn pick_suggestion(engine: &mut FittingEngine, intent: &Intent) {
    let kind = intent.arg_str("kind").and_then(SuggestionKind::parse);
    let position = intent
        .command_args
        .get("position")
        .and_then(Value::as_u64)
        .map(|value| value as usize);
    let (Some(kind), Some(position)) = (kind, position) else {
        println!("/pick expects `outfit <n>` or `background <n>`");
        return;
    };
    let Some(text) = suggestion(kind, position) else {
        println!(
            "No {} idea #{position}; /ideas lists {} of them.",
            kind.as_str(),
            kind.all().len()
        );
        return;
    };
    match kind {
        SuggestionKind::Outfit => {
            engine.describe_outfit(text);
            println!("Outfit set to: {text}");
        }
        SuggestionKind::Background => {
            engine.set_background(text);
            println!("Background set to: {text}");
        }
    }
}

fn non_empty_arg(intent: &Intent, key: &str) -> Option<String> {
    intent
        .arg_str(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn state_lines(state: &RequestState) -> Vec<String> {
    match state {
        RequestState::Idle => Vec::new(),
        RequestState::InFlight { submission } => {
            vec![format!("Generating (submission #{submission})...")]
        }
        RequestState::Succeeded(result) => {
            let mut lines = match result.decode_image() {
                Ok(decoded) => vec![format!(
                    "Virtual try-on ready ({}, {} bytes). Use /download to save it.",
                    decoded.mime_type,
                    decoded.bytes.len()
                )],
                Err(err) => vec![format!("Virtual try-on ready, but it cannot be saved: {err}")],
            };
            if let Some(caption) = result.caption.as_deref() {
                lines.push(format!("Note: {caption}"));
            }
            lines
        }
        RequestState::Failed(message) => vec![format!("Error: {message}")],
    }
}

fn status_lines(engine: &FittingEngine) -> Vec<String> {
    let session = engine.session();
    let subject = session
        .subject()
        .map(|photo| format!("{} ({})", photo.preview(), photo.mime_type()))
        .unwrap_or_else(|| "none".to_string());
    let outfit = match session.outfit_image() {
        Some(photo) => format!("image {}", photo.preview()),
        None if session.outfit_text().trim().is_empty() => "none".to_string(),
        None => format!("\"{}\"", session.outfit_text()),
    };
    let background = if session.background().trim().is_empty() {
        "keep original".to_string()
    } else {
        session.background().to_string()
    };
    vec![
        format!("Photo: {subject}"),
        format!(
            "Outfit ({} mode): {outfit}",
            session.outfit_mode().as_str()
        ),
        format!("Background: {background}"),
        format!(
            "State: {} | in flight: {} | ready to generate: {}",
            session.state().label(),
            engine.outstanding(),
            if session.can_submit() { "yes" } else { "no" }
        ),
    ]
}
