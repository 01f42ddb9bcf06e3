//! CLI binary for note-maker.
//!
//! A thin shim over the library crate: flags map to `NoteConfig` and
//! `NoteRequest`, results are printed as text or JSON.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use note_maker::{
    GenerationResult, NoteConfig, NoteError, NotePipeline, NoteRequest, RootTag, Stage,
    StageObserver,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── Spinner driven by pipeline stages ────────────────────────────────────────

struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StageObserver for CliObserver {
    fn on_stage(&self, stage: Stage) {
        let msg = match stage {
            Stage::Resolving => "Opening source…",
            Stage::Extracting => "Reading slides and pages…",
            Stage::Generating => "Writing the note…",
            Stage::Placing => "Saving…",
            Stage::Done | Stage::Failed => return,
        };
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(msg);
    }

    fn on_failed(&self, stage: Stage, _error: &NoteError) {
        self.bar
            .finish_with_message(red(&format!("✘ failed while {stage}")));
    }

    fn on_done(&self, result: &GenerationResult) {
        self.bar.finish_and_clear();
        eprintln!("{}  {}", green("✔"), bold(&result.note_path.display().to_string()));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Note from a local deck, in English
  note-maker generate lecture.pptx --language english

  # Pick a file under the input root and keep a copy of it
  note-maker --input-root ~/Downloads generate --select week3/slides.pdf --copy

  # Browse the roots
  note-maker browse input
  note-maker browse output notes/2025 --json

  # Show models, languages and roots
  note-maker options

  # Print a generated note
  note-maker show lecture_note_english.md
  note-maker show lecture_note_english.md --dir course/week1

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      OpenAI API key
  HOST_INPUT_PATH     Input root (files may be selected here)
  HOST_OUTPUT_PATH    Output root for notes
  HOST_COPY_PATH      Root for copies of the source file
  PDFIUM_LIB_PATH     Path to an existing libpdfium
  RUST_LOG            Log filter, overrides -v / -q

SETUP:
  1. Set API key:  export OPENAI_API_KEY=sk-...
     or write it to ~/.config/note-maker/config.env
  2. Generate:     note-maker generate lecture.pptx
"#;

/// Turn lecture slides (.pptx, .pdf) into structured study notes.
#[derive(Parser, Debug)]
#[command(
    name = "note-maker",
    version,
    about = "Turn lecture slides (.pptx, .pdf) into structured study notes",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    roots: RootArgs,

    /// Managed key file read when OPENAI_API_KEY is unset.
    #[arg(long, global = true, env = "NOTE_MAKER_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NOTE_MAKER_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NOTE_MAKER_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct RootArgs {
    /// Directory files may be selected from.
    #[arg(long, global = true, env = "HOST_INPUT_PATH")]
    input_root: Option<PathBuf>,

    /// Directory notes are written to.
    #[arg(long, global = true, env = "HOST_OUTPUT_PATH")]
    output_root: Option<PathBuf>,

    /// Directory source copies are written to. Default: {output}/copies.
    #[arg(long, global = true, env = "HOST_COPY_PATH")]
    copy_root: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a note from a deck.
    Generate(GenerateArgs),

    /// List a directory under one of the roots.
    Browse {
        /// Root to browse: input, output or copy.
        root: String,

        /// Directory relative to the root.
        #[arg(default_value = "")]
        path: String,

        /// List directories only.
        #[arg(long)]
        dirs_only: bool,

        /// Print the listing as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print models, languages and roots as JSON.
    Options,

    /// Print a generated note from the output root.
    Show {
        /// Bare file name of the note.
        note_name: String,

        /// Directory of the note relative to the output root.
        #[arg(long, default_value = "")]
        dir: String,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Local .pptx or .pdf file.
    #[arg(required_unless_present = "select", conflicts_with = "select")]
    file: Option<PathBuf>,

    /// File relative to the input root.
    #[arg(long)]
    select: Option<String>,

    /// Model ID (see `note-maker options`).
    #[arg(short, long, env = "NOTE_MAKER_MODEL")]
    model: Option<String>,

    /// Output language: nynorsk, bokmal, english.
    #[arg(short, long, env = "NOTE_MAKER_LANGUAGE")]
    language: Option<String>,

    /// Also keep a copy of the source file.
    #[arg(long)]
    copy: bool,

    /// Copy directory relative to the copy root. Default: the copy root.
    #[arg(long, requires = "copy")]
    copy_dir: Option<String>,

    /// Note directory relative to the output root.
    #[arg(long)]
    output_dir: Option<String>,

    /// Include speaker notes from .pptx slides.
    #[arg(long, env = "NOTE_MAKER_INCLUDE_NOTES")]
    notes: bool,

    /// Print the result payload as JSON instead of the note.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "NOTE_MAKER_NO_PROGRESS")]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let spinner = match &cli.command {
        Command::Generate(args) => !cli.quiet && !args.no_progress && !args.json,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || spinner {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;
    let mut pipeline = NotePipeline::new(config).context("Failed to open sandbox roots")?;
    if spinner {
        pipeline = pipeline.with_observer(CliObserver::new());
    }

    match cli.command {
        Command::Generate(args) => generate(&pipeline, args, spinner, cli.quiet).await,
        Command::Browse {
            root,
            path,
            dirs_only,
            json,
        } => {
            let tag: RootTag = root
                .parse()
                .with_context(|| format!("Unknown root '{root}' (expected input, output or copy)"))?;
            let listing = pipeline
                .sandbox()
                .root(tag)
                .list(&path, !dirs_only)
                .with_context(|| format!("Failed to list '{path}' under {tag}"))?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&listing).context("Failed to serialise listing")?
                );
            } else {
                println!("{}", dim(&format!("{}/{}", listing.root_path, listing.current_path)));
                for entry in &listing.entries {
                    match entry.kind {
                        note_maker::sandbox::EntryKind::Directory => {
                            println!("  {}/", bold(&entry.name))
                        }
                        note_maker::sandbox::EntryKind::File => println!("  {}", entry.name),
                    }
                }
            }
            Ok(())
        }
        Command::Options => {
            println!(
                "{}",
                serde_json::to_string_pretty(&pipeline.options())
                    .context("Failed to serialise options")?
            );
            Ok(())
        }
        Command::Show { note_name, dir } => {
            let note = pipeline
                .sandbox()
                .read_note_in(&dir, &note_name)
                .await
                .with_context(|| format!("Failed to read note '{note_name}'"))?;
            write_stdout(&note.content)
        }
    }
}

async fn generate(
    pipeline: &NotePipeline,
    args: GenerateArgs,
    spinner: bool,
    quiet: bool,
) -> Result<()> {
    let mut request = match (&args.file, &args.select) {
        (Some(path), _) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            NoteRequest::upload(name, bytes)
        }
        (None, Some(rel)) => NoteRequest::select(rel.clone()),
        (None, None) => anyhow::bail!("Give a FILE or --select PATH"),
    };

    request.model = args.model;
    request.language = args.language;
    request.output_dir = args.output_dir;
    if args.copy {
        // Without --copy-dir the copy goes to the copy root itself.
        request = request.copy_to(Some(args.copy_dir.unwrap_or_default()));
    }
    if args.notes {
        request = request.include_notes(true);
    }

    let result = pipeline
        .run(request)
        .await
        .context("Note generation failed")?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result.payload()).context("Failed to serialise result")?
        );
        return Ok(());
    }

    write_stdout(&result.note_text)?;
    if !quiet && !spinner {
        eprintln!("Wrote {}", result.note_path.display());
    }
    if !quiet {
        if let Some(copy) = &result.copied_path {
            eprintln!("   {} {}", dim("copy:"), copy.display());
        }
    }
    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `NoteConfig`.
fn build_config(cli: &Cli) -> Result<NoteConfig> {
    let mut builder = NoteConfig::builder();
    if let Some(ref p) = cli.roots.input_root {
        builder = builder.input_root(p);
    }
    if let Some(ref p) = cli.roots.output_root {
        builder = builder.output_root(p);
    }
    if let Some(ref p) = cli.roots.copy_root {
        builder = builder.copy_root(p);
    }
    if cli.key_file.is_some() {
        builder = builder.credential_file(cli.key_file.clone());
    }
    builder.build().context("Invalid configuration")
}
