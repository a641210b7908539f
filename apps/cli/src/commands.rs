//! CLI command definitions, routing, and tracing setup.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use flowgraph_core::{BatchProgress, Extraction, FALLBACK_SAMPLE};
use flowgraph_shared::{
    AppConfig, ExtractOptions, FlowGraphError, Graph, init_config, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// flowgraph: turn process descriptions into flowchart graphs.
#[derive(Parser)]
#[command(
    name = "flowgraph",
    version,
    about = "Extract flowchart graphs from annotated code and step procedures.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Report which grammar a document matches, with its scores.
    Classify {
        /// Input file, or `-` for stdin.
        file: PathBuf,
    },

    /// Extract the canonical graph from a document.
    Extract {
        /// Input file, or `-` for stdin.
        file: PathBuf,

        /// Fail on missing or unrecognized content instead of using the bundled sample.
        #[arg(long)]
        no_fallback: bool,

        /// Print single-line JSON.
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Normalize a foreign graph payload (raw JSON or a model response containing it).
    Adapt {
        /// Input file, or `-` for stdin.
        file: PathBuf,

        /// Print single-line JSON.
        #[arg(long)]
        compact: bool,
    },

    /// Extract many documents concurrently, writing one JSON file per graph.
    Batch {
        /// Input files.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output directory.
        #[arg(short, long)]
        out: PathBuf,

        /// Documents parsed at once (defaults to config).
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,

        #[command(flatten)]
        parse: ParseArgs,
    },

    /// Print the bundled fallback sample.
    Sample,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Lookahead overrides shared by `extract` and `batch`.
#[derive(Args)]
pub(crate) struct ParseArgs {
    /// Lines searched for `# YES:` / `# NO:` after an annotated decision.
    #[arg(long)]
    code_lookahead: Option<usize>,

    /// Lines searched for `Yes:` / `No:` after a decision step.
    #[arg(long)]
    step_lookahead: Option<usize>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
///
/// Logs go to stderr so stdout stays clean JSON.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "flowgraph=warn",
        1 => "flowgraph=info",
        2 => "flowgraph=debug",
        _ => "flowgraph=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Classify { file } => cmd_classify(&file),
        Command::Extract {
            file,
            no_fallback,
            compact,
            parse,
        } => cmd_extract(&file, no_fallback, compact, &parse),
        Command::Adapt { file, compact } => cmd_adapt(&file, compact),
        Command::Batch {
            files,
            out,
            concurrency,
            parse,
        } => cmd_batch(&files, &out, concurrency, &parse).await,
        Command::Sample => {
            print!("{FALLBACK_SAMPLE}");
            Ok(())
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_classify(file: &Path) -> Result<()> {
    let text = read_input(file)?;
    let classification = flowgraph_classifier::classify(&text);
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

fn cmd_extract(file: &Path, no_fallback: bool, compact: bool, parse: &ParseArgs) -> Result<()> {
    let mut opts = resolve_options(parse)?;
    if no_fallback {
        opts.use_fallback_sample = false;
    }

    let text = read_input(file)?;
    let graph = flowgraph_core::extract_or_fallback(&text, &opts).into_graph()?;
    print_graph(&graph, compact)
}

fn cmd_adapt(file: &Path, compact: bool) -> Result<()> {
    let response = read_input(file)?;
    let graph = flowgraph_core::adapt_response(&response)?;
    print_graph(&graph, compact)
}

async fn cmd_batch(
    files: &[PathBuf],
    out: &Path,
    concurrency: Option<usize>,
    parse: &ParseArgs,
) -> Result<()> {
    let mut opts = resolve_options(parse)?;
    if let Some(concurrency) = concurrency {
        if concurrency == 0 {
            return Err(eyre!("--concurrency must be at least 1"));
        }
        opts.batch_concurrency = concurrency;
    }

    let documents = files
        .iter()
        .map(|f| read_input(f))
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(out).map_err(|e| FlowGraphError::io(out, e))?;

    info!(files = files.len(), out = %out.display(), "starting batch");

    let progress = CliProgress::new(files.len())?;
    let outcomes = flowgraph_core::extract_batch(documents, &opts, &progress).await;
    progress.finish();

    let mut written = 0usize;
    let mut skipped = 0usize;
    for outcome in outcomes {
        let file = &files[outcome.index];
        match outcome.extraction {
            Ok(Extraction::Graph { graph, .. }) => {
                let path = output_path(out, outcome.index, file);
                std::fs::write(&path, graph.to_json_pretty()?)
                    .map_err(|e| FlowGraphError::io(&path, e))?;
                written += 1;
            }
            Ok(Extraction::Unrecognized { classification }) => {
                warn!(
                    file = %file.display(),
                    code_score = classification.code_score,
                    step_score = classification.step_score,
                    "content not recognized, skipping"
                );
                skipped += 1;
            }
            Ok(Extraction::TooShort { length, minimum }) => {
                warn!(file = %file.display(), length, minimum, "content too short, skipping");
                skipped += 1;
            }
            Err(e) => {
                warn!(file = %file.display(), error = %e, "extraction failed");
                skipped += 1;
            }
        }
    }

    println!();
    println!("  Batch complete");
    println!("  Written: {written}");
    println!("  Skipped: {skipped}");
    println!("  Output:  {}", out.display());
    println!();

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Config file values with CLI overrides applied.
fn resolve_options(parse: &ParseArgs) -> Result<ExtractOptions> {
    let config = load_config()?;
    let mut opts = ExtractOptions::from(&config);

    if let Some(n) = parse.code_lookahead {
        opts.parse.code_branch_lookahead = n;
    }
    if let Some(n) = parse.step_lookahead {
        opts.parse.step_branch_lookahead = n;
    }

    Ok(opts)
}

/// Read a whole input file; `-` reads stdin.
fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| FlowGraphError::io("<stdin>", e))?;
        return Ok(text);
    }

    let text = std::fs::read_to_string(path).map_err(|e| FlowGraphError::io(path, e))?;
    Ok(text)
}

/// `<out>/<index>-<stem>.json`; the input index keeps names unique when stems repeat.
fn output_path(out: &Path, index: usize, file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    out.join(format!("{index}-{stem}.json"))
}

fn print_graph(graph: &Graph, compact: bool) -> Result<()> {
    let json = if compact {
        graph.to_json()?
    } else {
        graph.to_json_pretty()?
    };
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Batch progress bar using indicatif.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize) -> Result<Self> {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                .map_err(|e| eyre!("invalid progress template: {e}"))?
                .progress_chars("=> "),
        );
        bar.set_message("extracting");
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl BatchProgress for CliProgress {
    fn document_done(&self, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
    }
}
