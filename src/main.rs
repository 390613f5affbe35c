use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use delta::config::{format_config, Config, DEFAULT_PORT};
use delta::consent::{format_consent, ConsentPreferences};
use delta::export::{export, format_entry_time, ExportFormat};
use delta::library::{filter_prompts, load_prompt_csv, LibraryStatus, PreviewTable};
use delta::logging::{init_logging, LogConfig, Verbosity};
use delta::server::{run_server, ServerConfig};
use delta::session::{FileStorage, PromptMode, SessionStore, Storage};
use delta::steps::{Variant, STEPS};

#[derive(Parser)]
#[command(name = "delta")]
#[command(version)]
#[command(about = "A guided \"What is my Delta?\" reflection workbook")]
#[command(
    long_about = "Work through the ten-stage \"What is my Delta?\" questionnaire in a local web UI or from the command line. Answers are saved as you go and can be exported as Markdown, JSON or a transcript."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write debug logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<String>,

    /// Directory holding the saved session (overrides the config)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the workbook in your browser
    Serve {
        /// Port to start the server on (default: 3000)
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Don't open browser automatically
        #[arg(long)]
        no_browser: bool,

        /// Prompt library CSV to load at startup (overrides the config)
        #[arg(long, value_name = "PATH")]
        csv: Option<PathBuf>,

        /// Variant shown when the URL does not choose one
        #[arg(long, value_parser = parse_variant)]
        variant: Option<Variant>,
    },
    /// Print the saved value of a key, e.g. `problem.challenge`
    Get {
        key: String,
    },
    /// Save a value under a key
    Set {
        key: String,
        value: String,
    },
    /// Record a question in the "ask" log
    Ask {
        /// Question text (prompted for when omitted)
        text: Option<String>,
    },
    /// Record a clarifying input in the "clarify" log
    Clarify {
        /// Input text (prompted for when omitted)
        text: Option<String>,
    },
    /// Export the session
    Export(ExportArgs),
    /// Clear the saved session
    Reset {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// List the questionnaire stages
    Steps {
        /// Also list each stage's field keys
        #[arg(long)]
        fields: bool,
    },
    /// Manage the prompt library
    Prompts {
        #[command(subcommand)]
        action: PromptsAction,
    },
    /// Show or change data-use preferences
    Consent {
        #[command(subcommand)]
        action: ConsentAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
struct ExportArgs {
    /// Document to produce
    #[arg(value_enum, default_value_t = FormatArg::Markdown)]
    format: FormatArg,

    /// Output file (default: the format's download name in the current directory)
    #[arg(short, long, conflicts_with_all = ["stdout", "copy"])]
    output: Option<PathBuf>,

    /// Print to stdout instead of writing a file
    #[arg(long, conflicts_with = "copy")]
    stdout: bool,

    /// Copy to the clipboard instead of writing a file
    #[arg(long)]
    copy: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Markdown,
    Json,
    Transcript,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => ExportFormat::Markdown,
            FormatArg::Json => ExportFormat::Json,
            FormatArg::Transcript => ExportFormat::Transcript,
        }
    }
}

#[derive(Subcommand)]
enum PromptsAction {
    /// Load a CSV file with `prompt` and `completion` columns
    Load { path: PathBuf },
    /// Search prompts and completions (case-insensitive)
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// Remove the loaded prompt library
    Clear,
}

#[derive(Subcommand)]
enum ConsentAction {
    /// Show current preferences
    Show,
    /// Change one or more preferences
    Set {
        #[arg(long)]
        personal: Option<bool>,
        #[arg(long)]
        share: Option<bool>,
        #[arg(long)]
        email: Option<bool>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Set a configuration value (an empty value unsets it)
    Set { key: String, value: String },
    /// Print the config file path
    Path,
}

fn parse_variant(value: &str) -> Result<Variant, String> {
    match value.trim().to_ascii_uppercase().as_str() {
        "A" => Ok(Variant::A),
        "B" => Ok(Variant::B),
        other => Err(format!("expected A or B, got {}", other)),
    }
}

/// Storage rooted at the data directory chosen by flag, config, or platform default.
fn open_storage(config: &Config, cli_dir: Option<PathBuf>) -> Result<Arc<dyn Storage>> {
    let storage = match config.effective_data_dir(cli_dir) {
        Some(dir) => FileStorage::new(dir),
        None => FileStorage::open_default().context("Could not determine data directory")?,
    };
    tracing::debug!(dir = %storage.dir().display(), "using data directory");
    Ok(Arc::new(storage))
}

fn open_store(storage: &Arc<dyn Storage>) -> Result<SessionStore> {
    SessionStore::open(Arc::clone(storage)).context("Failed to load saved session")
}

/// Prompt entry text from the argument, or interactively when omitted.
fn prompt_text(mode: PromptMode, text: Option<String>) -> Result<String> {
    let text = match text {
        Some(text) => text,
        None => inquire::Text::new(mode.input_prompt())
            .prompt()
            .context("Failed to read input")?,
    };
    Ok(text.trim().to_string())
}

fn record_prompt(storage: &Arc<dyn Storage>, mode: PromptMode, text: Option<String>) -> Result<()> {
    let text = prompt_text(mode, text)?;
    if text.is_empty() {
        println!("Nothing recorded.");
        return Ok(());
    }

    let mut store = open_store(storage)?;
    let entry = store
        .append_prompt_entry(mode, text)
        .context("Failed to save prompt entry")?;
    println!(
        "Recorded in {} at {}",
        mode.heading(),
        format_entry_time(entry.timestamp)
    );
    Ok(())
}

fn run_export(storage: &Arc<dyn Storage>, args: ExportArgs) -> Result<()> {
    let store = open_store(storage)?;
    let format = ExportFormat::from(args.format);
    let document = export(store.state(), format, chrono::Utc::now())
        .with_context(|| format!("Failed to export {}", format))?;

    if args.stdout {
        print!("{}", document.content);
        if !document.content.ends_with('\n') {
            println!();
        }
        return Ok(());
    }

    if args.copy {
        let mut clipboard = arboard::Clipboard::new().context("Clipboard is not available")?;
        clipboard
            .set_text(document.content)
            .context("Failed to copy to clipboard")?;
        println!("Copied {} export to clipboard", format);
        return Ok(());
    }

    let path = args
        .output
        .unwrap_or_else(|| PathBuf::from(document.file_name));
    std::fs::write(&path, &document.content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!(format = %format, path = %path.display(), "export written");
    println!("Wrote {}", path.display());
    Ok(())
}

fn run_reset(storage: &Arc<dyn Storage>, yes: bool) -> Result<()> {
    if !yes {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("Refusing to reset without confirmation; pass --yes");
        }
        let confirmed = inquire::Confirm::new("Clear saved session?")
            .with_default(false)
            .prompt()
            .context("Failed to read confirmation")?;
        if !confirmed {
            println!("Reset cancelled.");
            return Ok(());
        }
    }

    open_store(storage)?
        .reset()
        .context("Failed to clear saved session")?;
    println!("Session cleared.");
    Ok(())
}

fn print_steps(fields: bool) {
    for step in STEPS.iter() {
        println!("{}  ({})", step.title, step.id);
        if fields {
            for field in step.fields {
                println!("    {:<28} {}", step.field_key(field), field.label);
            }
        }
    }
}

fn run_prompts(storage: &Arc<dyn Storage>, action: PromptsAction) -> Result<()> {
    let mut store = open_store(storage)?;

    match action {
        PromptsAction::Load { path } => {
            let rows = match load_prompt_csv(&path) {
                Ok(rows) => rows,
                Err(e) => anyhow::bail!("{}", LibraryStatus::ParseError(e.to_string())),
            };
            let count = rows.len();
            store
                .set_prompt_rows(rows)
                .context("Failed to save prompt library")?;
            tracing::info!(rows = count, path = %path.display(), "prompt library loaded");
            println!("{}", LibraryStatus::Loaded(count));

            if let Some(preview) = PreviewTable::from_rows(&store.state().prompt_rows) {
                println!();
                println!("{}", preview.columns.join(" | "));
                for row in &preview.rows {
                    println!("{}", row.join(" | "));
                }
            }
        }
        PromptsAction::Search { query } => {
            let rows = &store.state().prompt_rows;
            if rows.is_empty() {
                println!("{}", LibraryStatus::Empty);
                return Ok(());
            }
            let filter = filter_prompts(rows, &query);
            println!("{}", filter.count_text());
            for row in &filter.rows {
                println!("- {} -> {}", row.prompt(), row.completion());
            }
        }
        PromptsAction::Clear => {
            store
                .clear_prompt_rows()
                .context("Failed to clear prompt library")?;
            println!("{}", LibraryStatus::Cleared);
        }
    }
    Ok(())
}

fn run_consent(storage: &Arc<dyn Storage>, action: ConsentAction) -> Result<()> {
    let mut prefs =
        ConsentPreferences::load(storage.as_ref()).context("Failed to read preferences")?;

    if let ConsentAction::Set {
        personal,
        share,
        email,
    } = action
    {
        prefs.update(personal, share, email);
        prefs
            .save(storage.as_ref())
            .context("Failed to save preferences")?;
    }

    println!("{}", format_consent(&prefs));
    Ok(())
}

fn run_config(mut config: Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", format_config(&config));
        }
        ConfigAction::Set { key, value } => {
            config.set_value(&key, &value)?;
            config.save().context("Failed to save configuration")?;
            if value.trim().is_empty() {
                println!("Unset {}", key);
            } else {
                println!("Set {} = {}", key, value.trim());
            }
        }
        ConfigAction::Path => {
            println!("{}", Config::config_path()?.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&LogConfig {
        verbosity: Verbosity::from_occurrences(cli.verbose),
        log_file: cli.log_file.clone(),
    });

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring unreadable config file");
        Config::default()
    });

    let data_dir = cli.data_dir;
    let storage = || open_storage(&config, data_dir.clone());

    match cli.command {
        Commands::Serve {
            port,
            no_browser,
            csv,
            variant,
        } => {
            let server_config = ServerConfig {
                base_port: config.effective_port(port),
                open_browser: !no_browser,
                bundled_csv: csv.or_else(|| config.bundled_csv.clone()),
                default_variant: variant.unwrap_or_else(|| config.default_variant()),
            };
            run_server(storage()?, server_config).await?;
        }
        Commands::Get { key } => {
            let store = open_store(&storage()?)?;
            println!("{}", store.get(&key));
        }
        Commands::Set { key, value } => {
            let mut store = open_store(&storage()?)?;
            store
                .set(&key, value)
                .with_context(|| format!("Failed to save {}", key))?;
        }
        Commands::Ask { text } => record_prompt(&storage()?, PromptMode::Ask, text)?,
        Commands::Clarify { text } => record_prompt(&storage()?, PromptMode::Clarify, text)?,
        Commands::Export(args) => run_export(&storage()?, args)?,
        Commands::Reset { yes } => run_reset(&storage()?, yes)?,
        Commands::Steps { fields } => print_steps(fields),
        Commands::Prompts { action } => run_prompts(&storage()?, action)?,
        Commands::Consent { action } => run_consent(&storage()?, action)?,
        Commands::Config { action } => run_config(config.clone(), action)?,
    }

    Ok(())
}
