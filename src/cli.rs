//! Command-line interface for codegloss.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::client::{ExplanationCache, ExplanationClient, HttpTransport};
use crate::config::{self, Settings};
use crate::document::LineRange;
use crate::language::TargetLanguage;
use crate::render::HINT_PADDING;
use crate::session::{Command, Session, SessionOptions};
use crate::terminal::{print_hints, FileHost, Output};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Default settings file written by `init`.
const DEFAULT_SETTINGS_FILE: &str = "codegloss.yaml";

/// Annotate source code with natural-language explanations.
///
/// codegloss sends lines or blocks of a source file to an explanation
/// service and writes the answers back as comments below the code, or
/// prints them as hints without touching the file.
#[derive(Parser)]
#[command(name = "codegloss")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to settings YAML file (default: auto-discover)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Explanation endpoint URL (overrides settings)
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Language explanations are written in (overrides settings)
    #[arg(short, long, global = true)]
    pub language: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Explain every line of a file as comments
    File(FileArgs),
    /// Explain the lines of one or more selections as comments
    Selection(SelectionArgs),
    /// Explain each brace-delimited block as a comment after it
    Blocks(BlocksArgs),
    /// Explain a single line
    Line(LineArgs),
    /// Print explanations as hints without editing the file
    Hints(HintsArgs),
    /// Keep hints up to date while the file changes
    Watch(WatchArgs),
    /// List supported explanation languages
    Languages,
    /// Create a settings file from the template
    Init(InitArgs),
}

/// Arguments for the file command.
#[derive(Parser)]
pub struct FileArgs {
    /// Source file to annotate
    pub path: PathBuf,

    /// Clean up and wrap long explanations over several comment lines
    #[arg(short, long)]
    pub wrap: bool,

    /// Print the annotated file instead of rewriting it
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments for the selection command.
#[derive(Parser)]
pub struct SelectionArgs {
    /// Source file to annotate
    pub path: PathBuf,

    /// Line ranges to explain, 1-based (e.g. 3-7 or 12); repeatable
    #[arg(long = "lines", required = true, num_args = 1..)]
    pub lines: Vec<LineRange>,

    /// Print the annotated file instead of rewriting it
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments for the blocks command.
#[derive(Parser)]
pub struct BlocksArgs {
    /// Source file to annotate
    pub path: PathBuf,

    /// Print the annotated file instead of rewriting it
    #[arg(long)]
    pub stdout: bool,
}

/// Arguments for the line command.
#[derive(Parser)]
pub struct LineArgs {
    /// Source file
    pub path: PathBuf,

    /// Line number, 1-based
    pub line: usize,
}

/// Arguments for the hints command.
#[derive(Parser)]
pub struct HintsArgs {
    /// Source file
    pub path: PathBuf,

    /// Only show hints for this 1-based line range
    #[arg(short, long)]
    pub range: Option<LineRange>,

    /// Output format: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,
}

/// Arguments for the watch command.
#[derive(Parser)]
pub struct WatchArgs {
    /// Source file to watch
    pub path: PathBuf,

    /// Also explain this 1-based line as a notification
    #[arg(long)]
    pub click: Option<usize>,

    /// How often the file is checked for changes, in milliseconds
    #[arg(long, default_value = "250")]
    pub interval_ms: u64,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    pub output: PathBuf,
}

type TerminalSession = Session<HttpTransport, FileHost>;

/// Run the selected command and return the process exit code.
pub async fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Languages => run_languages(),
        Commands::Init(args) => run_init(args),
        Commands::File(args) => {
            let settings = load_settings(cli)?;
            let command = Command::InterpretFile { wrapped: args.wrap };
            run_annotate(&settings, &args.path, args.stdout, command).await
        }
        Commands::Selection(args) => {
            let settings = load_settings(cli)?;
            let command = Command::InterpretSelection(args.lines.clone());
            run_annotate(&settings, &args.path, args.stdout, command).await
        }
        Commands::Blocks(args) => {
            let settings = load_settings(cli)?;
            run_annotate(&settings, &args.path, args.stdout, Command::InterpretBlocks).await
        }
        Commands::Line(args) => {
            let settings = load_settings(cli)?;
            run_line(&settings, args).await
        }
        Commands::Hints(args) => {
            let settings = load_settings(cli)?;
            run_hints(&settings, args).await
        }
        Commands::Watch(args) => {
            let settings = load_settings(cli)?;
            run_watch(cli, &settings, args).await
        }
    }
}

/// Load settings: file, then environment, then command-line flags.
pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    settings.apply_env()?;
    settings.apply_overrides(cli.endpoint.as_deref(), cli.language.as_deref())?;
    config::validate(&settings).map_err(|e| anyhow::anyhow!("invalid settings: {}", e))?;
    debug!(endpoint = %settings.endpoint, language = %settings.language, "settings loaded");
    Ok(settings)
}

fn build_session(settings: &Settings, host: FileHost) -> anyhow::Result<TerminalSession> {
    let transport = HttpTransport::new(settings.timeout())?;
    let client = ExplanationClient::new(
        transport,
        settings.endpoint.clone(),
        ExplanationCache::new(settings.cache_capacity),
    );
    Ok(Session::new(
        client,
        host,
        settings.language,
        SessionOptions::from(settings),
    ))
}

fn exit_code(failed: bool) -> i32 {
    if failed {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

/// Run one of the comment-writing commands.
async fn run_annotate(
    settings: &Settings,
    path: &Path,
    stdout: bool,
    command: Command,
) -> anyhow::Result<i32> {
    let output = if stdout {
        Output::Stdout
    } else {
        Output::WriteBack
    };
    let host = FileHost::open(path, output)?;
    let mut session = build_session(settings, host)?;

    let report = session.execute(command).await?;

    if stdout {
        print!("{}", session.host().current().text());
    }
    Ok(exit_code(report.has_failures()))
}

/// Run the line command.
async fn run_line(settings: &Settings, args: &LineArgs) -> anyhow::Result<i32> {
    if args.line == 0 {
        eprintln!("Error: line numbers start at 1");
        return Ok(EXIT_ERROR);
    }

    let host = FileHost::open(&args.path, Output::Stdout)?;
    if args.line > host.current().line_count() {
        eprintln!(
            "Error: {} has only {} lines",
            args.path.display(),
            host.current().line_count()
        );
        return Ok(EXIT_ERROR);
    }

    let mut session = build_session(settings, host)?;
    let report = session.execute(Command::InterpretLine(args.line - 1)).await?;
    Ok(exit_code(report.has_failures()))
}

/// Run the hints command.
async fn run_hints(settings: &Settings, args: &HintsArgs) -> anyhow::Result<i32> {
    if args.format != "pretty" && args.format != "json" {
        eprintln!(
            "Error: invalid format {:?}, must be 'pretty' or 'json'",
            args.format
        );
        return Ok(EXIT_ERROR);
    }

    let host = FileHost::open(&args.path, Output::Stdout)?.quiet(args.format == "json");
    let mut session = build_session(settings, host)?;
    session.toggle_auto_interpret().await?;

    let doc = session.host().current().clone();
    let range = args
        .range
        .unwrap_or_else(|| LineRange::new(0, doc.line_count().saturating_sub(1)));
    let hints = session.provide_hints(&doc, range);

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&hints)?);
    } else if hints.is_empty() {
        eprintln!("No lines to explain");
    } else {
        print_hints(&doc, &hints);
    }

    let error_label = format!("{}Error: ", HINT_PADDING);
    Ok(exit_code(
        hints.iter().any(|h| h.label.starts_with(&error_label)),
    ))
}

/// Run the watch command until Ctrl-C.
async fn run_watch(cli: &Cli, settings: &Settings, args: &WatchArgs) -> anyhow::Result<i32> {
    let host = FileHost::open(&args.path, Output::WriteBack)?;
    let mut session = build_session(settings, host)?;

    let settings_path = cli.config.clone().or_else(config::discover_settings);
    let mut settings_text = settings_path
        .as_ref()
        .and_then(|p| fs::read_to_string(p).ok());

    session.toggle_auto_interpret().await?;
    repaint(&mut session);

    if let Some(line) = args.click {
        session.toggle_click_interpret();
        session.on_cursor_moved(line.saturating_sub(1)).await;
    }

    eprintln!("Watching {} (Ctrl-C to stop)", args.path.display());

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(10)));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = ticker.tick() => {
                let now = Instant::now();

                if let Some(edited) = session.host_mut().reload()? {
                    let id = session.host().id().clone();
                    session.on_document_change(&id, &edited, now);
                }

                if let Some(path) = &settings_path {
                    let current = fs::read_to_string(path).ok();
                    if current != settings_text {
                        if let Some(language) = reload_language(cli, current.as_deref()) {
                            if language != session.language() {
                                session.on_language_changed(language, now);
                            }
                        }
                        settings_text = current;
                    }
                }

                session.run_due(now).await?;
                repaint(&mut session);
            }
        }
    }

    session.toggle_auto_interpret().await?;
    Ok(EXIT_SUCCESS)
}

/// Target language from changed settings text, with overrides applied.
fn reload_language(cli: &Cli, text: Option<&str>) -> Option<TargetLanguage> {
    let parsed = Settings::parse_str(text.unwrap_or_default()).and_then(|mut s| {
        s.apply_env()?;
        s.apply_overrides(None, cli.language.as_deref())?;
        Ok(s)
    });
    match parsed {
        Ok(settings) => Some(settings.language),
        Err(e) => {
            warn!(error = %e, "ignoring unreadable settings change");
            None
        }
    }
}

/// Print the current hints if the session asked for a repaint.
fn repaint(session: &mut TerminalSession) {
    if !session.host_mut().take_repaint() {
        return;
    }
    let doc = session.host().current().clone();
    let range = LineRange::new(0, doc.line_count().saturating_sub(1));
    let hints = session.provide_hints(&doc, range);
    if hints.is_empty() {
        return;
    }
    println!();
    print_hints(&doc, &hints);
}

/// Run the languages command.
pub fn run_languages() -> anyhow::Result<i32> {
    println!("Available languages:");
    println!();

    for language in TargetLanguage::ALL {
        let name = if language == TargetLanguage::default() {
            format!("{} (default)", language)
        } else {
            language.to_string()
        };
        println!("  {:<26} {}", name, language.native_name());
    }

    println!();
    println!("Usage:");
    println!("  codegloss --language <name> <command>");

    Ok(EXIT_SUCCESS)
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    // Check if output already exists
    if args.output.exists() {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Remove it or use --output to specify a different path");
        return Ok(EXIT_ERROR);
    }

    // Create output directory if needed
    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = fs::write(&args.output, config::SETTINGS_TEMPLATE) {
        eprintln!("Error: failed to write settings: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {}", args.output.display());
    println!();
    println!("Next steps:");
    println!("  1. Set the endpoint and language in {}", args.output.display());
    println!(
        "  2. Run: codegloss --config {} file <path>",
        args.output.display()
    );

    Ok(EXIT_SUCCESS)
}
