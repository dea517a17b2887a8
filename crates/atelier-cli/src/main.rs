//! Atelier CLI - edit site content documents from the shell
//!
//! Usage:
//!   atelier init                          Write a default .atelier/config.toml
//!   atelier get <doc> <path>              Print the value at a dotted path
//!   atelier set <doc> <path> <value>      Write one value
//!   atelier apply <doc> <actions>         Run a batch of actions
//!   atelier classify <text>               Test the rollback phrase detector
//!   atelier presets                       List theme presets
//!   atelier replay <doc> <script>         Drive an editing session from a script

mod script;

use anyhow::{bail, Context, Result};
use atelier_actions::{ActionExecutor, ActionProposal};
use atelier_core::{ActionResult, AtelierConfig, ChangeRecord, ContentPath, Document, PathResolver};
use atelier_intent::{IntentClassifier, RuleClassifier};
use atelier_session::{EditingSession, SubmitOutcome};
use clap::{Parser, Subcommand};
use script::{ReplayScript, ReplayStep};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(author, version, about = "Edit and version site content documents")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Site directory holding .atelier/config.toml
    #[arg(long, global = true, default_value = ".")]
    site: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init,

    /// Print the value at a path
    Get {
        /// Site content JSON file
        document: PathBuf,

        /// Dotted path, e.g. hero.title
        path: String,
    },

    /// Write one value at a path
    Set {
        /// Site content JSON file
        document: PathBuf,

        /// Dotted path, e.g. hero.title
        path: String,

        /// JSON value; anything that is not valid JSON is taken as a string
        value: String,

        /// Write the result here instead of overwriting the document
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run a batch of actions against a document
    Apply {
        /// Site content JSON file
        document: PathBuf,

        /// Action list or proposal JSON file
        actions: PathBuf,

        /// Show results and changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Write the result here instead of overwriting the document
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Check whether a message is a rollback request
    Classify {
        /// Message text
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// List theme presets, including configured ones
    Presets,

    /// Replay a scripted editing session
    Replay {
        /// Site content JSON file
        document: PathBuf,

        /// Replay script JSON file
        script: PathBuf,

        /// Write the final document here
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init => cmd_init(&cli.site).await,
        Commands::Get { document, path } => cmd_get(document, path).await,
        Commands::Set {
            document,
            path,
            value,
            out,
        } => cmd_set(&cli.site, document, path, value, out).await,
        Commands::Apply {
            document,
            actions,
            dry_run,
            out,
        } => cmd_apply(&cli.site, document, actions, dry_run, out).await,
        Commands::Classify { text } => cmd_classify(text.join(" ")),
        Commands::Presets => cmd_presets(&cli.site),
        Commands::Replay {
            document,
            script,
            out,
        } => cmd_replay(&cli.site, document, script, out).await,
    }
}

async fn cmd_init(site: &Path) -> Result<()> {
    info!("Initializing Atelier in {:?}", site);

    let config_path = site.join(".atelier/config.toml");
    if config_path.exists() {
        println!("Config already exists: {:?}", config_path);
        return Ok(());
    }

    AtelierConfig::write_default(site)?;

    println!("Initialized Atelier in {:?}", site);
    println!("Created:");
    println!("  .atelier/config.toml");
    Ok(())
}

async fn cmd_get(document: PathBuf, path: String) -> Result<()> {
    let doc = read_document(&document).await?;
    let path = ContentPath::parse(&path)?;

    match PathResolver::get(&doc, &path) {
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => bail!("Nothing at '{}'", path),
    }
    Ok(())
}

async fn cmd_set(
    site: &Path,
    document: PathBuf,
    path: String,
    value: String,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = AtelierConfig::load_or_default(site)?;
    let doc = read_document(&document).await?;
    let path = ContentPath::parse(&path)?;
    let value = serde_json::from_str(&value).unwrap_or(Value::String(value));

    let previous = PathResolver::get(&doc, &path).cloned();
    let updated = config.path_resolver().set(&doc, &path, value.clone())?;

    print_changes(&[ChangeRecord::new(path.as_str(), previous, Some(value))]);
    write_document(out.as_deref().unwrap_or(&document), &updated).await
}

async fn cmd_apply(
    site: &Path,
    document: PathBuf,
    actions: PathBuf,
    dry_run: bool,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = AtelierConfig::load_or_default(site)?;
    let doc = read_document(&document).await?;
    let payload = tokio::fs::read_to_string(&actions)
        .await
        .with_context(|| format!("Failed to read {:?}", actions))?;
    let proposal = ActionProposal::from_json_str(&payload)?;

    let executor = ActionExecutor::from_config(&config);
    let outcome = executor.execute_raw(&proposal.actions, &doc);

    print_results(&outcome.results);
    print_changes(&outcome.changes);
    println!(
        "\n{} succeeded, {} failed",
        outcome.succeeded_count(),
        outcome.failed_count()
    );

    if dry_run {
        println!("Dry run: nothing written");
        return Ok(());
    }
    if outcome.is_noop() {
        println!("No changes to write");
        return Ok(());
    }

    write_document(out.as_deref().unwrap_or(&document), &outcome.updated_content).await
}

fn cmd_classify(text: String) -> Result<()> {
    let classifier = RuleClassifier::builtin()?;
    let classification = classifier.classification(&text);
    println!("{}", serde_json::to_string_pretty(&classification)?);
    Ok(())
}

fn cmd_presets(site: &Path) -> Result<()> {
    let config = AtelierConfig::load_or_default(site)?;
    let executor = ActionExecutor::from_config(&config);

    println!("{:<12} {:<20} {:<9} {:<9}", "ID", "NAME", "PRIMARY", "SECONDARY");
    for preset in executor.presets().list() {
        println!(
            "{:<12} {:<20} {:<9} {:<9}",
            preset.id, preset.name, preset.primary, preset.secondary
        );
    }
    Ok(())
}

async fn cmd_replay(
    site: &Path,
    document: PathBuf,
    script: PathBuf,
    out: Option<PathBuf>,
) -> Result<()> {
    let config = AtelierConfig::load_or_default(site)?;
    let doc = read_document(&document).await?;
    let content = tokio::fs::read_to_string(&script)
        .await
        .with_context(|| format!("Failed to read {:?}", script))?;
    let script = ReplayScript::from_json_str(&content)?;
    let source = script.source();

    let mut session = EditingSession::from_config(doc, &config)?;

    for (i, step) in script.steps.into_iter().enumerate() {
        println!("\n[{}] {:?}", i + 1, step);
        match step {
            ReplayStep::Say(text) => match session.submit(&source, &text).await? {
                SubmitOutcome::RolledBack(report) => println!("  {}", report.message),
                SubmitOutcome::Proposed(preview) => {
                    println!("  Proposal {} awaiting confirmation", preview.batch_id);
                    print_results(&preview.results);
                    print_changes(&preview.changes);
                }
                SubmitOutcome::Applied(report) => {
                    print_results(&report.results);
                    print_changes(&report.changes);
                }
                SubmitOutcome::Failed { message } => println!("  Failed: {}", message),
            },
            ReplayStep::Confirm(selection) => {
                let report = session.confirm(selection.as_deref())?;
                print_results(&report.results);
                print_changes(&report.changes);
            }
            ReplayStep::Cancel => {
                session.cancel()?;
                println!("  Proposal discarded");
            }
            ReplayStep::Undo => println!("  {}", session.undo()?.message),
            ReplayStep::Redo => match session.redo()? {
                Some(batch) => println!("  Redid \"{}\"", batch.description),
                None => println!("  Nothing to redo"),
            },
            ReplayStep::Apply(proposal) => {
                let report = session.apply_proposal(proposal)?;
                print_results(&report.results);
                print_changes(&report.changes);
            }
        }
    }

    println!(
        "\n{}",
        session.history().history_summary().to_prompt_context()
    );

    if let Some(out) = out {
        write_document(&out, session.document()).await?;
    }
    Ok(())
}

async fn read_document(path: &Path) -> Result<Document> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read document {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse document {:?}", path))
}

async fn write_document(path: &Path, doc: &Document) -> Result<()> {
    tokio::fs::write(path, serde_json::to_string_pretty(doc)?)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    println!("Wrote {:?}", path);
    Ok(())
}

fn print_results(results: &[ActionResult]) {
    for result in results {
        let mark = if result.success { "ok" } else { "FAILED" };
        match &result.error {
            Some(error) => println!("  {:<6} {}: {}", mark, result.label, error),
            None => println!("  {:<6} {}", mark, result.label),
        }
    }
}

fn print_changes(changes: &[ChangeRecord]) {
    for change in changes {
        println!(
            "  {}: {} -> {}",
            change.path,
            render(change.old_value.as_ref()),
            render(change.new_value.as_ref())
        );
    }
}

fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "(none)".to_string(), Value::to_string)
}
