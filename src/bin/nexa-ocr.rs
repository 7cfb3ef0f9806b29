//! CLI binary for nexa-ocr.
//!
//! A terminal chat shell over the library crate, plus a one-shot `extract`
//! command for scripts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nexa_ocr::config::{DEFAULT_API_KEY, DEFAULT_BASE_URL, DEFAULT_MODEL};
use nexa_ocr::reference::{is_remote_url, ImageReference};
use nexa_ocr::{ChatMessage, ChatShell, Element, ElementKind, OcrAssistant, OcrConfig, Reply};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_message(message.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

// ── Terminal chat shell ──────────────────────────────────────────────────────

/// Prints replies to stdout and spins while a request is in flight.
struct TerminalShell {
    spinner: Mutex<Option<ProgressBar>>,
    show_progress: bool,
}

impl TerminalShell {
    fn new(show_progress: bool) -> Self {
        Self {
            spinner: Mutex::new(None),
            show_progress,
        }
    }
}

impl ChatShell for TerminalShell {
    fn send(&self, reply: &Reply) {
        let mut slot = self.spinner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(bar) = slot.take() {
            bar.finish_and_clear();
        }

        match reply {
            Reply::RunningUpload | Reply::RunningUrl(_) => {
                println!("{}", dim(&reply.to_string()));
                if self.show_progress {
                    *slot = Some(spinner("Waiting for the OCR model…"));
                }
            }
            Reply::Extracted(text) => {
                println!("{} {}\n\n{}", green("✔"), bold("Extracted Text:"), text);
            }
            Reply::Failed(msg) => println!("{} {}", red("✘"), red(msg)),
            Reply::Welcome | Reply::Guidance => println!("{}", cyan(&reply.to_string())),
        }
        if reply.is_final() {
            println!();
        }
    }
}

/// One line typed into the chat shell.
#[derive(Debug, PartialEq, Eq)]
enum ShellInput {
    Empty,
    Quit,
    Help,
    Upload {
        path: String,
        kind: Option<ElementKind>,
        text: String,
    },
    Message(String),
}

fn parse_shell_input(line: &str) -> ShellInput {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ShellInput::Empty;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (trimmed, ""),
    };

    match command {
        "/quit" | "/exit" => ShellInput::Quit,
        "/help" => ShellInput::Help,
        "/upload" if !rest.is_empty() => {
            let (path, text) = split_word(rest);
            ShellInput::Upload {
                path: path.to_string(),
                kind: None,
                text: text.to_string(),
            }
        }
        "/attach" => {
            let (tag, rest) = split_word(rest);
            let (path, text) = split_word(rest);
            if path.is_empty() {
                return ShellInput::Help;
            }
            ShellInput::Upload {
                path: path.to_string(),
                kind: Some(ElementKind::from_tag(tag)),
                text: text.to_string(),
            }
        }
        "/upload" => ShellInput::Help,
        _ => ShellInput::Message(line.to_string()),
    }
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (s, ""),
    }
}

/// Turn a path typed by the user into a filesystem path.
///
/// `file://` references are converted; anything else is taken as a path.
fn local_path(input: &str) -> Result<PathBuf> {
    let input = input.trim();
    if input.starts_with("file://") {
        let reference = ImageReference::parse(input)?;
        return reference
            .to_file_path()
            .with_context(|| format!("'{input}' does not name a local file"));
    }
    Ok(PathBuf::from(input))
}

/// Load a local file as an attachment.
///
/// An unreadable file is still attached (as an on-disk image) so the
/// assistant reports it like any other unreadable upload. `kind`, when
/// given, overrides the sniffed element kind.
async fn attach(path: &Path, kind: Option<ElementKind>) -> Element {
    let mut element = match Element::from_file(path).await {
        Ok(element) => element,
        Err(e) => {
            tracing::debug!("Deferring read error for {}: {}", path.display(), e);
            Element::on_disk(ElementKind::Image, path)
        }
    };
    if let Some(kind) = kind {
        element.kind = kind;
    }
    element
}

// ── CLI ──────────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive chat against a local Nexa server
  nexa-ocr chat

  # OCR a pasted URL
  nexa-ocr extract https://example.com/receipt.jpg

  # OCR a local image, write the text to a file
  nexa-ocr extract ./images/table.png -o table.txt

  # Structured output with timing and token usage
  nexa-ocr extract --json ./images/table.png

  # Remote server that cannot read our files
  nexa-ocr --base-url https://ocr.example.com/v1 --embed-local-images extract scan.jpg

CHAT COMMANDS:
  /upload <path> [text]   Attach a local image and send it
  /attach <type> <path> [text]
                          Attach a file tagged as image, file, audio, ...
  /help                   Show what the assistant accepts
  /quit, /exit            Leave (Ctrl-D works too)
  anything else           Sent as the message text (paste an image URL)

ENVIRONMENT VARIABLES:
  NEXA_OCR_BASE_URL            OpenAI-compatible base URL
  NEXA_OCR_API_KEY             Bearer credential
  NEXA_OCR_MODEL               Model identifier
  NEXA_OCR_MAX_TOKENS          Output token cap
  NEXA_OCR_TIMEOUT             Whole-request timeout in seconds
  NEXA_OCR_CONNECT_TIMEOUT     Connect timeout in seconds
  NEXA_OCR_UPLOAD_DIR          Where uploads are spooled before OCR
  NEXA_OCR_EMBED_LOCAL_IMAGES  Send local files inline as data: URLs
  RUST_LOG                     Overrides the log filter
"#;

/// Extract text from images with an OCR model behind an OpenAI-compatible API.
#[derive(Parser, Debug)]
#[command(
    name = "nexa-ocr",
    version,
    about = "Chat-driven OCR against an OpenAI-compatible vision endpoint",
    long_about = "Send uploaded images or image URLs to an OCR-capable model (DeepSeek-OCR on a \
local Nexa server by default) and print the extracted text.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "NEXA_OCR_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// Bearer credential for the endpoint.
    #[arg(long, env = "NEXA_OCR_API_KEY", default_value = DEFAULT_API_KEY,
          hide_env_values = true, hide_default_value = true, global = true)]
    api_key: String,

    /// Model identifier.
    #[arg(long, env = "NEXA_OCR_MODEL", default_value = DEFAULT_MODEL, global = true)]
    model: String,

    /// Max output tokens per request.
    #[arg(long, env = "NEXA_OCR_MAX_TOKENS", default_value_t = 4096, global = true)]
    max_tokens: u32,

    /// Whole-request timeout in seconds.
    #[arg(long, env = "NEXA_OCR_TIMEOUT", default_value_t = 600, global = true)]
    timeout: u64,

    /// Connect timeout in seconds.
    #[arg(long, env = "NEXA_OCR_CONNECT_TIMEOUT", default_value_t = 10, global = true)]
    connect_timeout: u64,

    /// Directory for temporary upload files (default: system temp dir).
    #[arg(long, env = "NEXA_OCR_UPLOAD_DIR", global = true)]
    upload_dir: Option<PathBuf>,

    /// Send local images inline as base64 data URLs.
    #[arg(long, env = "NEXA_OCR_EMBED_LOCAL_IMAGES", global = true)]
    embed_local_images: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "NEXA_OCR_VERBOSE", global = true)]
    verbose: bool,

    /// Suppress everything except results and errors.
    #[arg(short, long, env = "NEXA_OCR_QUIET", global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat: paste image URLs or /upload local files.
    Chat,

    /// OCR a single image URL or local file and print the text.
    Extract {
        /// HTTP/HTTPS image URL or local image path.
        input: String,

        /// Write the text to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the full result (text, timing, token usage) as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    tracing::debug!("Using {:?}", config);
    let assistant = OcrAssistant::new(config).context("Failed to build OCR client")?;

    match &cli.command {
        Command::Chat => run_chat(&assistant, !cli.quiet).await,
        Command::Extract {
            input,
            output,
            json,
        } => {
            let show_progress = !cli.quiet && !*json;
            run_extract(&assistant, input, output.as_deref(), *json, show_progress).await
        }
    }
}

/// Map CLI args to `OcrConfig`.
fn build_config(cli: &Cli) -> Result<OcrConfig> {
    let mut builder = OcrConfig::builder()
        .base_url(&cli.base_url)
        .api_key(&cli.api_key)
        .model(&cli.model)
        .max_tokens(cli.max_tokens)
        .request_timeout_secs(cli.timeout)
        .connect_timeout_secs(cli.connect_timeout)
        .embed_local_images(cli.embed_local_images);

    if let Some(ref dir) = cli.upload_dir {
        builder = builder.upload_dir(dir);
    }

    builder.build().context("Invalid configuration")
}

async fn run_chat(assistant: &OcrAssistant, show_progress: bool) -> Result<()> {
    let shell = TerminalShell::new(show_progress);
    assistant.start(&shell);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", bold(">"));
        io::stdout().flush().ok();

        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            println!();
            break;
        };

        match parse_shell_input(&line) {
            ShellInput::Empty => {}
            ShellInput::Quit => break,
            ShellInput::Help => shell.send(&Reply::Guidance),
            ShellInput::Upload { path, kind, text } => {
                let path = match local_path(&path) {
                    Ok(path) => path,
                    Err(e) => {
                        shell.send(&Reply::Failed(format!("{e:#}")));
                        continue;
                    }
                };
                let message = ChatMessage::text(text).with_element(attach(&path, kind).await);
                assistant.handle_message(&message, &shell).await;
            }
            ShellInput::Message(text) => {
                assistant
                    .handle_message(&ChatMessage::text(text), &shell)
                    .await;
            }
        }
    }

    Ok(())
}

async fn run_extract(
    assistant: &OcrAssistant,
    input: &str,
    output: Option<&Path>,
    json: bool,
    show_progress: bool,
) -> Result<()> {
    // Bare paths and file:// references are accepted here, at the shell edge,
    // by uploading the file.
    let message = if is_remote_url(input.trim()) {
        ChatMessage::text(input)
    } else {
        let path = local_path(input)?;
        let mut element = Element::from_file(&path)
            .await
            .with_context(|| format!("Failed to read image '{}'", path.display()))?;
        element.kind = ElementKind::Image;
        ChatMessage::default().with_element(element)
    };

    let bar = show_progress.then(|| spinner("Running OCR…"));
    let result = assistant.process_message(&message).await;
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }
    let out = result.context("OCR failed")?;

    if json {
        let json = serde_json::to_string_pretty(&out).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(path) = output {
        tokio::fs::write(path, &out.text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if show_progress {
            eprintln!(
                "{}  {} chars  {}ms  →  {}",
                green("✔"),
                out.text.chars().count(),
                out.duration_ms,
                bold(&path.display().to_string()),
            );
        }
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(out.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !out.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    Ok(())
}
