//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use draftwright_artifacts::{document_filename, document_markdown, keywords_csv, write_export};
use draftwright_core::generation::parse_options;
use draftwright_core::{
    BridgeGenerator, DraftStore, Part, ProgressReporter, Selection, Workspace, WorkspaceState,
};
use draftwright_shared::{
    AppConfig, ArtifactId, GenerationOptions, Language, ParentRef, Payload, Preferences, Slot,
    SlotKind, Stage, Theme, WritingStyle, expand_home, init_config, load_config,
    validate_api_key,
};
use draftwright_storage::Storage;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Draftwright: from product brief to publishable article, one stage at a time.
#[derive(Parser)]
#[command(
    name = "draftwright",
    version,
    about = "Generate, choose and assemble SEO article drafts stage by stage.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Workspace database (overrides `defaults.state_path`).
    #[arg(long, global = true)]
    pub state: Option<PathBuf>,

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
    /// Show the current selection of every slot.
    Status,

    /// List the artifact sets of a stage.
    History {
        stage: Stage,

        /// Include sets recorded under other upstream selections.
        #[arg(long)]
        all: bool,
    },

    /// Change a selection. Downstream selections are cleared.
    Select {
        slot: Slot,

        /// Artifact ids (one for single slots, any number for list slots).
        ids: Vec<ArtifactId>,

        /// Clear the slot instead.
        #[arg(long, conflicts_with = "ids")]
        clear: bool,
    },

    /// Record options for a stage from a JSON file.
    Import {
        stage: Stage,
        file: PathBuf,

        /// Explicit parent ids (defaults to the current upstream selection).
        #[arg(long)]
        parent: Vec<ArtifactId>,
    },

    /// Generate options for a stage with the bridge.
    Generate { stage: Stage },

    /// Generate one article part into the drafts directory.
    Write {
        part: Part,

        #[command(flatten)]
        article: ArticleArgs,
    },

    /// Merge the current drafts and print the article.
    Publish,

    /// Save the merged article to the document library.
    Save {
        #[command(flatten)]
        article: ArticleArgs,
    },

    /// List saved documents, newest first.
    Library,

    /// Replace the body of a saved document with the contents of a file.
    EditDocument { id: ArtifactId, file: PathBuf },

    /// Write exports to disk.
    Export {
        #[command(subcommand)]
        what: ExportAction,
    },

    /// Word count and reading time of a text file.
    Metrics { file: PathBuf },

    /// Show or change user preferences.
    Prefs {
        #[arg(long)]
        language: Option<Language>,
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        wpm: Option<u32>,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

impl Command {
    /// Commands that only inspect the workspace open storage read-only.
    fn is_read_only(&self) -> bool {
        matches!(
            self,
            Self::Status
                | Self::History { .. }
                | Self::Publish
                | Self::Library
                | Self::Export { .. }
                | Self::Metrics { .. }
        )
    }
}

/// Writing style and generation switches shared by `write` and `save`.
#[derive(Args, Clone, Debug)]
pub(crate) struct ArticleArgs {
    #[arg(long, default_value = "default")]
    pub style: WritingStyle,
    #[arg(long)]
    pub no_faq: bool,
    #[arg(long)]
    pub no_tables: bool,
    #[arg(long)]
    pub no_quotes: bool,
    #[arg(long)]
    pub no_wikipedia_links: bool,
    #[arg(long)]
    pub no_inverted_pyramid: bool,
    #[arg(long)]
    pub no_ai_overview: bool,
    #[arg(long = "internal-link")]
    pub internal_links: Vec<String>,
    #[arg(long = "external-link")]
    pub external_links: Vec<String>,
}

impl ArticleArgs {
    fn options(&self) -> GenerationOptions {
        GenerationOptions {
            include_faq: !self.no_faq,
            use_tables: !self.no_tables,
            use_quotes: !self.no_quotes,
            add_wikipedia_links: !self.no_wikipedia_links,
            use_inverted_pyramid: !self.no_inverted_pyramid,
            optimize_for_ai_overview: !self.no_ai_overview,
            internal_links: self.internal_links.clone(),
            external_links: self.external_links.clone(),
        }
    }
}

#[derive(Subcommand)]
pub(crate) enum ExportAction {
    /// Keyword CSV of the selected keyword set.
    Keywords {
        /// Only the selected keywords.
        #[arg(long)]
        selected: bool,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
    /// Markdown of a saved document (defaults to the selected article).
    Document {
        id: Option<ArtifactId>,
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
    },
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
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "draftwright=info",
        1 => "draftwright=debug",
        _ => "draftwright=trace",
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
    let config = load_config()?;
    let state_path = cli
        .state
        .clone()
        .unwrap_or_else(|| expand_home(&config.defaults.state_path));
    let drafts = DraftStore::new(expand_home(&config.defaults.drafts_dir));

    match cli.command {
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&config),
        },
        command => {
            let mut ws = open_workspace(&config, &state_path, command.is_read_only()).await?;
            match command {
                Command::Status => cmd_status(&ws),
                Command::History { stage, all } => cmd_history(&ws, stage, all),
                Command::Select { slot, ids, clear } => cmd_select(&mut ws, slot, ids, clear).await,
                Command::Import {
                    stage,
                    file,
                    parent,
                } => cmd_import(&mut ws, stage, &file, parent).await,
                Command::Generate { stage } => cmd_generate(&mut ws, &config, stage).await,
                Command::Write { part, article } => {
                    cmd_write(&ws, &config, &drafts, part, &article).await
                }
                Command::Publish => cmd_publish(&ws, &drafts),
                Command::Save { article } => cmd_save(&mut ws, &drafts, &article).await,
                Command::Library => cmd_library(&ws),
                Command::EditDocument { id, file } => cmd_edit_document(&mut ws, id, &file).await,
                Command::Export { what } => cmd_export(&ws, what),
                Command::Metrics { file } => {
                    cmd_metrics(&file, ws.state().preferences.words_per_minute)
                }
                Command::Prefs {
                    language,
                    theme,
                    name,
                    wpm,
                } => cmd_prefs(&mut ws, language, theme, name, wpm).await,
                Command::Config { .. } => Ok(()),
            }
        }
    }
}

/// Open the persisted workspace. Read-only commands never create the state
/// file; without one they see an empty workspace.
async fn open_workspace(
    config: &AppConfig,
    state_path: &Path,
    read_only: bool,
) -> Result<Workspace> {
    let defaults = Preferences {
        words_per_minute: config.defaults.words_per_minute,
        ..Preferences::default()
    };
    let storage = if !read_only {
        Storage::open(state_path).await?
    } else if state_path.exists() {
        Storage::open_readonly(state_path).await?
    } else {
        info!(path = %state_path.display(), "no state file yet");
        return Ok(Workspace::detached(defaults));
    };
    Ok(Workspace::open(storage, &config.defaults.state_key, defaults).await?)
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, summary: &str) {
        self.spinner.finish_and_clear();
        println!("  {summary}");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn shorten(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn describe(state: &WorkspaceState, slot: Slot) -> String {
    let selection = state.selection.get(slot);
    if selection.is_empty() {
        return "-".to_string();
    }
    selection
        .ids()
        .iter()
        .map(|id| match state.store.get(slot.stage(), *id) {
            Some(draftwright_core::Lookup::Artifact { artifact, .. }) => {
                format!("{id} {}", shorten(&artifact.payload.label(), 48))
            }
            Some(draftwright_core::Lookup::Set(set)) => {
                format!("{id} ({} options)", set.options.len())
            }
            None => format!("{id} (missing)"),
        })
        .collect::<Vec<_>>()
        .join("\n                         ")
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

fn cmd_status(ws: &Workspace) -> Result<()> {
    let state = ws.state();
    println!();
    for slot in Slot::ALL {
        println!("  {:<22} {}", slot.as_str(), describe(state, slot));
    }
    println!();
    println!(
        "  {} set(s), {} document(s), language {}, {} wpm",
        state.store.len(),
        state.store.list_documents().len(),
        state.preferences.language.as_str(),
        state.preferences.words_per_minute
    );
    Ok(())
}

fn cmd_history(ws: &Workspace, stage: Stage, all: bool) -> Result<()> {
    let state = ws.state();
    let sets = if all {
        state.store.list_by_stage(stage)
    } else {
        state.store.list_by_parent(stage, &state.parent_for(stage))
    };

    if sets.is_empty() {
        println!("No {stage} sets for the current selection.");
        return Ok(());
    }

    let active: Vec<ArtifactId> = draftwright_core::graph::descriptor(stage)
        .slots()
        .into_iter()
        .flat_map(|slot| state.selection.get(slot).ids().to_vec())
        .collect();

    for set in sets {
        let marker = if active.contains(&set.id) { "*" } else { " " };
        println!(
            "{marker} set {}  {}",
            set.id,
            set.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        for option in &set.options {
            let marker = if active.contains(&option.id) { "*" } else { " " };
            println!(
                "    {marker} {}  {}",
                option.id,
                shorten(&option.payload.label(), 70)
            );
        }
    }
    Ok(())
}

async fn cmd_select(
    ws: &mut Workspace,
    slot: Slot,
    ids: Vec<ArtifactId>,
    clear: bool,
) -> Result<()> {
    let value = if clear {
        Selection::Unset
    } else {
        match (slot.kind(), ids.as_slice()) {
            (SlotKind::Single, [id]) => Selection::Single(*id),
            (SlotKind::Single, _) => {
                return Err(eyre!("{slot} takes exactly one id (or --clear)"));
            }
            (SlotKind::Multi, _) => Selection::Multi(ids),
        }
    };

    let cleared = ws.select(slot, value).await?;
    info!(%slot, cleared = cleared.len(), "selection changed");
    println!("Selected {slot}.");
    if !cleared.is_empty() {
        let names: Vec<&str> = cleared.iter().map(Slot::as_str).collect();
        println!("Cleared: {}", names.join(", "));
    }
    Ok(())
}

async fn cmd_import(
    ws: &mut Workspace,
    stage: Stage,
    file: &Path,
    parent: Vec<ArtifactId>,
) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| eyre!("{} is not valid JSON: {e}", file.display()))?;
    let options = parse_options(stage, value)
        .ok_or_else(|| eyre!("no {stage} options found in {}", file.display()))?;

    let parent = (!parent.is_empty()).then(|| ParentRef::from_ids(parent));
    let count = options.len();
    let set_id = ws.record_set(stage, parent, options).await?;
    println!("Recorded {count} {stage} option(s) as set {set_id}.");
    Ok(())
}

async fn cmd_generate(ws: &mut Workspace, config: &AppConfig, stage: Stage) -> Result<()> {
    validate_api_key(config)?;
    let mut bridge = BridgeGenerator::spawn(&config.bridge)?;
    let progress = CliProgress::new();
    let result = ws.run_stage(&mut bridge, stage, &progress).await;
    progress.spinner.finish_and_clear();
    bridge.shutdown();

    let set_id = result?;
    println!("Recorded {stage} set {set_id}. Run `draftwright history {stage}` to review.");
    Ok(())
}

async fn cmd_write(
    ws: &Workspace,
    config: &AppConfig,
    drafts: &DraftStore,
    part: Part,
    article: &ArticleArgs,
) -> Result<()> {
    validate_api_key(config)?;
    let mut bridge = BridgeGenerator::spawn(&config.bridge)?;
    let progress = CliProgress::new();
    let result = ws
        .generate_part(
            &mut bridge,
            drafts,
            part,
            article.style,
            &article.options(),
            &progress,
        )
        .await;
    progress.spinner.finish_and_clear();
    bridge.shutdown();

    let path = result?;
    println!("Draft written to {}. Edit it freely, then run `draftwright publish`.", path.display());
    Ok(())
}

fn cmd_publish(ws: &Workspace, drafts: &DraftStore) -> Result<()> {
    let published = ws.publish(drafts)?;
    println!("{}", published.body);
    eprintln!();
    eprintln!(
        "  {} words, {} min read",
        published.word_count, published.reading_minutes
    );
    Ok(())
}

async fn cmd_save(ws: &mut Workspace, drafts: &DraftStore, article: &ArticleArgs) -> Result<()> {
    let id = ws
        .save_document(drafts, article.style, article.options())
        .await?;
    println!("Saved document {id}.");
    Ok(())
}

fn cmd_library(ws: &Workspace) -> Result<()> {
    let docs = ws.state().store.list_documents();
    if docs.is_empty() {
        println!("The library is empty.");
        return Ok(());
    }
    for artifact in docs {
        if let Payload::Document(doc) = &artifact.payload {
            let edited = if doc.edited_at.is_some() { " (edited)" } else { "" };
            println!(
                "  {}  {}  {:>5} words  {}{edited}",
                artifact.id,
                artifact.created_at.format("%Y-%m-%d"),
                doc.word_count,
                shorten(&doc.title, 60)
            );
        }
    }
    Ok(())
}

async fn cmd_edit_document(ws: &mut Workspace, id: ArtifactId, file: &Path) -> Result<()> {
    let body = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
    if ws.edit_document_body(id, body).await? {
        println!("Updated document {id}.");
        Ok(())
    } else {
        Err(eyre!("no document with id {id}"))
    }
}

fn cmd_export(ws: &Workspace, what: ExportAction) -> Result<()> {
    let state = ws.state();
    let meta = match what {
        ExportAction::Keywords { selected, out } => {
            let set = state
                .selected_set(Slot::KeywordSet)
                .ok_or_else(|| eyre!("no keyword set selected"))?;
            let chosen = state.selection.multi(Slot::Keywords);
            let keywords: Vec<_> = set
                .options
                .iter()
                .filter(|a| !selected || chosen.contains(&a.id))
                .filter_map(|a| match &a.payload {
                    Payload::Keyword(k) => Some(k.clone()),
                    _ => None,
                })
                .collect();
            write_export(&out, &format!("keywords-{}.csv", set.id), &keywords_csv(&keywords))?
        }
        ExportAction::Document { id, out } => {
            let id = id
                .or_else(|| state.selection.single(Slot::Article))
                .ok_or_else(|| eyre!("no document given and none selected"))?;
            let artifact = state
                .store
                .artifact(Stage::Article, id)
                .ok_or_else(|| eyre!("no document with id {id}"))?;
            let Payload::Document(doc) = &artifact.payload else {
                return Err(eyre!("artifact {id} is not a document"));
            };
            write_export(
                &out,
                &document_filename(doc),
                &document_markdown(doc, artifact.created_at),
            )?
        }
    };
    println!(
        "Wrote {} ({} bytes, sha256 {})",
        meta.filename, meta.size_bytes, meta.sha256
    );
    Ok(())
}

fn cmd_metrics(file: &Path, words_per_minute: u32) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| eyre!("cannot read {}: {e}", file.display()))?;
    let words = draftwright_markdown::word_count(&text);
    let minutes = draftwright_markdown::reading_time(words, words_per_minute);
    println!("{words} words, {minutes} min read");
    Ok(())
}

async fn cmd_prefs(
    ws: &mut Workspace,
    language: Option<Language>,
    theme: Option<Theme>,
    name: Option<String>,
    wpm: Option<u32>,
) -> Result<()> {
    let mut prefs = ws.state().preferences.clone();
    let changed = language.is_some() || theme.is_some() || name.is_some() || wpm.is_some();
    if let Some(language) = language {
        prefs.language = language;
    }
    if let Some(theme) = theme {
        prefs.theme = theme;
    }
    if let Some(name) = name {
        prefs.user_name = name;
    }
    if let Some(wpm) = wpm {
        prefs.words_per_minute = wpm;
    }
    if changed {
        ws.set_preferences(prefs.clone()).await?;
    }
    println!("{}", serde_json::to_string_pretty(&prefs)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_with_ids() {
        let id = ArtifactId::new();
        let cli = Cli::try_parse_from(["draftwright", "select", "keywords", &id.to_string()])
            .unwrap();
        match cli.command {
            Command::Select { slot, ids, clear } => {
                assert_eq!(slot, Slot::Keywords);
                assert_eq!(ids, vec![id]);
                assert!(!clear);
            }
            _ => panic!("expected select"),
        }
    }

    #[test]
    fn parses_write_flags() {
        let cli = Cli::try_parse_from([
            "draftwright",
            "write",
            "2",
            "--style",
            "3s",
            "--no-faq",
            "--internal-link",
            "https://example.com/a",
        ])
        .unwrap();
        match cli.command {
            Command::Write { part, article } => {
                assert_eq!(part, Part::Part2);
                assert_eq!(article.style, WritingStyle::ThreeS);
                let options = article.options();
                assert!(!options.include_faq);
                assert!(options.use_tables);
                assert_eq!(options.internal_links.len(), 1);
            }
            _ => panic!("expected write"),
        }
    }

    #[test]
    fn rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["draftwright", "generate", "poems"]).is_err());
    }

    #[test]
    fn inspection_commands_are_read_only() {
        let read_only = |args: &[&str]| {
            let mut argv = vec!["draftwright"];
            argv.extend_from_slice(args);
            Cli::try_parse_from(argv).unwrap().command.is_read_only()
        };
        assert!(read_only(&["status"]));
        assert!(read_only(&["history", "titles"]));
        assert!(read_only(&["publish"]));
        assert!(read_only(&["library"]));
        assert!(read_only(&["export", "keywords"]));
        assert!(read_only(&["metrics", "a.md"]));
        assert!(!read_only(&["generate", "persona"]));
        assert!(!read_only(&["prefs", "--wpm", "200"]));
        assert!(!read_only(&["save"]));
    }

    fn temp_db(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dw-cli-{}-{name}.db", std::process::id()))
    }

    #[tokio::test]
    async fn read_only_open_sees_persisted_preferences() {
        let path = temp_db("prefs");
        let config = AppConfig::default();

        let mut ws = open_workspace(&config, &path, false).await.unwrap();
        let prefs = Preferences {
            words_per_minute: 100,
            ..ws.state().preferences.clone()
        };
        ws.set_preferences(prefs).await.unwrap();
        drop(ws);

        let ws = open_workspace(&config, &path, true).await.unwrap();
        assert_eq!(ws.state().preferences.words_per_minute, 100);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn read_only_open_without_state_file_is_empty() {
        let path = temp_db("missing");
        let mut config = AppConfig::default();
        config.defaults.words_per_minute = 180;

        let ws = open_workspace(&config, &path, true).await.unwrap();
        assert!(ws.state().store.is_empty());
        assert_eq!(ws.state().preferences.words_per_minute, 180);
        assert!(!path.exists());
    }

    #[test]
    fn shorten_truncates_long_lines() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("first line\nsecond", 20), "first line");
        assert_eq!(shorten("abcdefghij", 5).chars().count(), 5);
    }
}
