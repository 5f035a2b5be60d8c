//! ClipSense command line
//!
//! Thin shell over the `ClipHistoryApi`: `watch` runs the capture loop until
//! interrupted, every other subcommand performs one operation and prints
//! the result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clipsense::clipboard::{ClipboardBackend, MemoryClipboard};
use clipsense::{
    ClipHistoryApi, ClipSense, ClipSenseConfig, ContentType, NewTemplate, SearchFilters, TemplatePatch,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "clipsense")]
#[command(about = "Clipboard history with content detection", long_about = None)]
struct Cli {
    /// History database path
    #[arg(long, env = "CLIPSENSE_DB")]
    db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watch the clipboard and record changes until interrupted
    Watch {
        /// Poll interval in milliseconds
        #[arg(long, default_value = "500")]
        poll_ms: u64,

        /// Debounce period in milliseconds
        #[arg(long, default_value = "500")]
        debounce_ms: u64,
    },
    /// Most recent clips
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Search clip content
    Search {
        query: String,

        /// Restrict to a content type (only `text` is captured)
        #[arg(long = "type")]
        content_types: Vec<String>,

        /// Restrict to a detected type, e.g. url or email
        #[arg(long = "detected")]
        detected_types: Vec<String>,

        /// Require a tag
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Only favorites
        #[arg(long)]
        favorites: bool,
    },
    /// One clip with its suggestions
    Show { id: String },
    /// Put a stored clip back on the clipboard
    Copy { id: String },
    /// Add tags to a clip
    Tag {
        id: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Remove tags from a clip
    Untag {
        id: String,
        #[arg(required = true)]
        tags: Vec<String>,
    },
    /// Toggle the favorite flag
    Favorite { id: String },
    /// Delete a clip
    Delete { id: String },
    /// Show settings, or set `key=value` pairs (values parsed as JSON)
    Settings { assignments: Vec<String> },
    #[command(subcommand)]
    Templates(TemplateCommand),
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// List templates
    List,
    /// Create a template; variables are taken from `{{name}}` placeholders
    Create { name: String, body: String },
    /// Change a template's name or body
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        body: Option<String>,
    },
    /// Delete a template
    Delete { id: String },
    /// Render a template with `name=value` pairs
    Render { id: String, values: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let database_path = match cli.db {
        Some(path) => path,
        None => default_database_path()?,
    };

    let mut config = ClipSenseConfig {
        database_path: Some(database_path),
        ..Default::default()
    };
    if let Command::Watch { poll_ms, debounce_ms } = &cli.command {
        config.watcher.poll_interval = Duration::from_millis(*poll_ms);
        config.watcher.debounce = Duration::from_millis(*debounce_ms);
        config.watcher.suppression_window = config.watcher.poll_interval;
    }

    let clipboard = open_clipboard(&cli.command)?;
    let store = ClipSense::open(config.clone(), clipboard)
        .with_context(|| format!("failed to open history at {:?}", config.database_path))?;

    match cli.command {
        Command::Watch { .. } => watch(&store).await?,
        Command::History { limit } => print_json(&store.get_history(limit)?)?,
        Command::Search {
            query,
            content_types,
            detected_types,
            tags,
            favorites,
        } => {
            let filters = SearchFilters {
                content_types: non_empty(content_types)
                    .map(|types| types.iter().map(|t| parse_content_type(t)).collect::<Result<_>>())
                    .transpose()?,
                detected_types: non_empty(detected_types),
                tags: non_empty(tags),
                is_favorite: favorites.then_some(true),
                ..Default::default()
            };
            print_json(&store.search(query, filters).await?)?;
        }
        Command::Show { id } => {
            let clip = store
                .get_item(&id)?
                .with_context(|| format!("no clip with id {}", id))?;
            let suggestions = store.suggestions(&id)?;
            print_json(&serde_json::json!({ "clip": clip, "suggestions": suggestions }))?;
        }
        Command::Copy { id } => {
            let clip = store
                .get_item(&id)?
                .with_context(|| format!("no clip with id {}", id))?;
            store.copy_to_clipboard(&clip.content)?;
        }
        Command::Tag { id, tags } => store.add_tags(&id, &tags)?,
        Command::Untag { id, tags } => store.remove_tags(&id, &tags)?,
        Command::Favorite { id } => {
            let is_favorite = store.toggle_favorite(&id)?;
            print_json(&serde_json::json!({ "id": id, "isFavorite": is_favorite }))?;
        }
        Command::Delete { id } => store.delete_item(&id)?,
        Command::Settings { assignments } => {
            if !assignments.is_empty() {
                store.update_settings(parse_settings(&assignments)?)?;
            }
            print_json(&store.get_settings()?)?;
        }
        Command::Templates(command) => templates(&store, command)?,
    }

    Ok(())
}

async fn watch(store: &ClipSense) -> Result<()> {
    store.start_watching()?;
    info!("Watching clipboard, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    store.stop_watching().await;
    Ok(())
}

fn templates(store: &ClipSense, command: TemplateCommand) -> Result<()> {
    match command {
        TemplateCommand::List => print_json(&store.get_templates()?)?,
        TemplateCommand::Create { name, body } => {
            let template = store.create_template(NewTemplate {
                name,
                template: body,
                variables: None,
            })?;
            print_json(&template)?;
        }
        TemplateCommand::Update { id, name, body } => store.update_template(
            &id,
            TemplatePatch {
                name,
                template: body,
                variables: None,
            },
        )?,
        TemplateCommand::Delete { id } => store.delete_template(&id)?,
        TemplateCommand::Render { id, values } => {
            let values: HashMap<String, String> = values
                .iter()
                .map(|pair| split_assignment(pair).map(|(k, v)| (k.to_string(), v.to_string())))
                .collect::<Result<_>>()?;
            println!("{}", store.render_template(&id, &values)?);
        }
    }
    Ok(())
}

/// Only `watch` touches the desktop clipboard on startup; the other
/// commands get a process-local one unless they write to it.
fn open_clipboard(command: &Command) -> Result<Arc<dyn ClipboardBackend>> {
    let needs_system = matches!(command, Command::Watch { .. } | Command::Copy { .. });
    if needs_system {
        return system_clipboard();
    }
    Ok(Arc::new(MemoryClipboard::new()))
}

#[cfg(feature = "system-clipboard")]
fn system_clipboard() -> Result<Arc<dyn ClipboardBackend>> {
    let clipboard = clipsense::clipboard::SystemClipboard::new().context("system clipboard unavailable")?;
    Ok(Arc::new(clipboard))
}

#[cfg(not(feature = "system-clipboard"))]
fn system_clipboard() -> Result<Arc<dyn ClipboardBackend>> {
    anyhow::bail!("built without the system-clipboard feature")
}

fn default_database_path() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no data directory for this platform")?;
    Ok(base.join("clipsense").join("clipsense.db"))
}

fn parse_settings(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut partial = Map::new();
    for assignment in assignments {
        let (key, raw) = split_assignment(assignment)?;
        // Bare words are taken as strings
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        partial.insert(key.to_string(), value);
    }
    Ok(partial)
}

fn split_assignment(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .with_context(|| format!("expected key=value, got {:?}", pair))
}

fn parse_content_type(raw: &str) -> Result<ContentType> {
    match raw {
        "text" => Ok(ContentType::Text),
        other => anyhow::bail!("unknown content type {:?}", other),
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("clipsense=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("clipsense=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
