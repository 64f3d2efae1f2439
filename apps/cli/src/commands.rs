//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};

use qnasync_core::{BatchSummary, Pipeline, ProgressReporter};
use qnasync_shared::AppConfig;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// qnasync — migrate Confluence knowledge-base articles into a QnA project.
#[derive(Parser)]
#[command(
    name = "qnasync",
    version,
    about = "Migrate Confluence pages into a QnA knowledge base.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
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
    /// Migrate every page in the configured space as one batch.
    Ingest {
        /// Build payloads but skip the final submission.
        #[arg(long)]
        dry_run: bool,
    },

    /// Migrate a single page by id.
    Page {
        /// Confluence content id.
        #[arg(long)]
        id: String,

        /// Page title, used as the QnA question.
        #[arg(long)]
        title: String,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Show the resolved configuration with secrets redacted.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "qnasync=info",
        1 => "qnasync=debug",
        _ => "qnasync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ingest { dry_run } => cmd_ingest(dry_run).await,
        Command::Page { id, title } => cmd_page(&id, &title).await,
        Command::Config { action } => match action {
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Build the pipeline from the environment.
fn load_pipeline() -> Result<Pipeline> {
    let config = AppConfig::from_env()?;
    Ok(Pipeline::from_config(&config)?)
}

// ---------------------------------------------------------------------------
// ingest
// ---------------------------------------------------------------------------

/// Progress bar adapter for batch runs.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} {pos}/{len}")
                .expect("valid progress template"),
        );
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn page_migrated(&self, title: &str, current: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
        self.bar.set_message(title.to_string());
    }

    fn done(&self, _summary: &BatchSummary) {
        self.bar.finish_and_clear();
    }
}

async fn cmd_ingest(dry_run: bool) -> Result<()> {
    let pipeline = load_pipeline()?;
    let progress = CliProgress::new();

    let summary = pipeline.run_batch(dry_run, &progress).await?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &BatchSummary) {
    match summary.status {
        Some(status) => println!(
            "Migrated {} of {} page(s) ({} excluded); knowledge base answered HTTP {status}.",
            summary.migrated, summary.discovered, summary.excluded
        ),
        None => println!(
            "Dry run: built {} payload(s) from {} discovered page(s); nothing submitted.",
            summary.migrated, summary.discovered
        ),
    }
    println!("Done in {:.1}s.", summary.elapsed.as_secs_f64());
}

// ---------------------------------------------------------------------------
// page
// ---------------------------------------------------------------------------

async fn cmd_page(id: &str, title: &str) -> Result<()> {
    let pipeline = load_pipeline()?;
    let status = pipeline.run_single(id, title).await?;
    println!("{id} is sent to the knowledge base with status code {status}.");
    Ok(())
}

// ---------------------------------------------------------------------------
// config show
// ---------------------------------------------------------------------------

fn cmd_config_show() -> Result<()> {
    let config = AppConfig::from_env()?;

    println!("confluence.endpoint   = {}", config.confluence.endpoint);
    println!("confluence.token      = ********");
    println!("storage.account_name  = {}", config.storage.account_name);
    println!("storage.endpoint      = {}", config.storage.endpoint);
    println!("storage.container     = {}", config.storage.container);
    println!("storage.account_key   = ********");
    println!("qna.endpoint          = {}", config.qna.endpoint);
    println!("qna.key               = ********");
    println!("qna.project           = {}", config.qna.project);
    println!("batch.space_key       = {}", config.batch.space_key);
    println!("batch.excluded_titles = {:?}", config.batch.excluded_titles);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_structure_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
