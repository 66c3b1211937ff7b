use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use crossref_search::config::{default_config_path, find_config_file, load_config, Config};
use crossref_search::models::{SearchFilters, SortBy};
use crossref_search::session::{Outcome, SearchController, SearchSession, SearchState};
use crossref_search::sources::{CrossRefSource, Source};
use crossref_search::ui::{self, Spinner, Status};
use crossref_search::utils::display::{is_terminal, plain_line, terminal_width};
use crossref_search::utils::{format_citation, CitationStyle, SearchHistory};
use std::future::Future;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// CrossRef Search - find scholarly papers in the CrossRef works index
#[derive(Parser, Debug)]
#[command(name = "crossref-search")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Search the CrossRef works index and page through the results", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search timeout in seconds (overrides the configuration)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Do not read or record the search history
    #[arg(long, global = true, default_value_t = false)]
    no_history: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Styled result cards (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

impl OutputFormat {
    fn resolve(self) -> Self {
        match self {
            OutputFormat::Auto if is_terminal() => OutputFormat::Table,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Sort field for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    /// Sort by relevance
    Relevance,
    /// Newest first
    Newest,
    /// Oldest first
    Oldest,
    /// Most cited first
    Citations,
}

impl From<SortField> for SortBy {
    fn from(field: SortField) -> Self {
        match field {
            SortField::Relevance => SortBy::Relevance,
            SortField::Newest => SortBy::Newest,
            SortField::Oldest => SortBy::Oldest,
            SortField::Citations => SortBy::Citations,
        }
    }
}

/// Filter options shared by `search` and `browse`
#[derive(Args, Debug, Clone, Default)]
struct FilterArgs {
    /// Earliest publication year
    #[arg(long)]
    year_from: Option<i32>,

    /// Latest publication year
    #[arg(long)]
    year_to: Option<i32>,

    /// Sort order (defaults to the configured one)
    #[arg(long, value_enum)]
    sort: Option<SortField>,

    /// Results per page (1-1000, defaults to the configured size)
    #[arg(long, short = 'n')]
    rows: Option<u32>,
}

impl FilterArgs {
    fn apply(&self, base: SearchFilters) -> SearchFilters {
        let mut filters = base;
        filters.year_from = self.year_from;
        filters.year_to = self.year_to;
        if let Some(sort) = self.sort {
            filters.sort_by = sort.into();
        }
        if let Some(rows) = self.rows {
            filters.results_per_page = rows;
        }
        filters
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for papers by query string
    #[command(alias = "s")]
    Search {
        /// Search query string
        query: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Page to open
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Also print a citation for every result (apa, mla, chicago, bibtex)
        #[arg(long)]
        cite: Option<CitationStyle>,
    },

    /// Browse results interactively, reading commands from stdin
    #[command(alias = "b")]
    Browse {
        /// Initial query
        query: Option<String>,

        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show the details of a single work by DOI
    #[command(alias = "doi")]
    Show {
        /// DOI of the work
        doi: String,

        /// Print a citation in this style instead of the details view
        #[arg(long)]
        cite: Option<CitationStyle>,
    },

    /// Show or clear the search history
    History {
        /// Show at most this many entries
        #[arg(long, short)]
        limit: Option<usize>,

        /// Delete every entry
        #[arg(long)]
        clear: bool,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Write a configuration file with default values
    Init {
        /// Target path (defaults to the platform config directory)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

/// A command typed at the `browse` prompt
#[derive(Debug, Clone, PartialEq, Eq)]
enum BrowseCommand {
    Next,
    Previous,
    PageSize(u32),
    Details(usize),
    Cite(usize, CitationStyle),
    RemoveYear,
    RemoveSort,
    Retry,
    Search(String),
    History,
    Help,
    Quit,
}

const BROWSE_HELP: &str = "\
Commands:
  n              next page
  p              previous page
  s <size>       change results per page
  d <i>          details of result i
  c <i> [style]  citation of result i (apa, mla, chicago, bibtex)
  y              remove the year filter
  o              remove the sort filter
  r              retry the last request
  / <query>      new search
  h              search history
  ?              this help
  q              quit";

fn parse_index(arg: Option<&str>, what: &str) -> Result<usize, String> {
    arg.ok_or_else(|| format!("{} needs a result number", what))?
        .parse::<usize>()
        .ok()
        .filter(|i| *i > 0)
        .ok_or_else(|| format!("{} needs a result number starting at 1", what))
}

fn parse_browse_command(line: &str) -> Result<BrowseCommand, String> {
    let line = line.trim();
    if let Some(query) = line.strip_prefix('/') {
        return Ok(BrowseCommand::Search(query.trim().to_string()));
    }

    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let arg = parts.next();

    match command {
        "n" | "next" => Ok(BrowseCommand::Next),
        "p" | "prev" | "previous" => Ok(BrowseCommand::Previous),
        "s" | "size" => arg
            .and_then(|a| a.parse().ok())
            .map(BrowseCommand::PageSize)
            .ok_or_else(|| "usage: s <size>".to_string()),
        "d" | "details" => parse_index(arg, "details").map(BrowseCommand::Details),
        "c" | "cite" => {
            let index = parse_index(arg, "cite")?;
            let style = match parts.next() {
                Some(style) => style.parse()?,
                None => CitationStyle::default(),
            };
            Ok(BrowseCommand::Cite(index, style))
        }
        "y" => Ok(BrowseCommand::RemoveYear),
        "o" => Ok(BrowseCommand::RemoveSort),
        "r" | "retry" => Ok(BrowseCommand::Retry),
        "h" | "history" => Ok(BrowseCommand::History),
        "?" | "help" => Ok(BrowseCommand::Help),
        "q" | "quit" | "exit" => Ok(BrowseCommand::Quit),
        "" => Err("type ? for help".to_string()),
        other => Err(format!("unknown command '{}', type ? for help", other)),
    }
}

/// Everything a command needs to talk to CrossRef
struct App {
    controller: SearchController<CrossRefSource>,
    config: Config,
    format: OutputFormat,
    quiet: bool,
}

impl App {
    async fn with_spinner<F: Future>(&self, msg: &str, fut: F) -> F::Output {
        let spinner = if self.quiet || !is_terminal() {
            Spinner::hidden()
        } else {
            Spinner::new(msg)
        };
        let output = fut.await;
        spinner.finish();
        output
    }

    fn searching(&self) -> String {
        format!("Searching {}...", self.controller.source().name())
    }

    fn render(&self, session: &SearchSession) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(session)?),
            OutputFormat::Plain => {
                for record in &session.results {
                    println!("{}", plain_line(record));
                    if let Some(link) = record.doi_link() {
                        println!("  DOI: {}", link);
                    }
                    if record.has_pdf() {
                        println!("  PDF: {}", record.pdf_url);
                    }
                }
            }
            _ => ui::print_results(session, terminal_width()),
        }
        Ok(())
    }

    /// Render an outcome inside the interactive loop
    fn report(&self, state: &SearchState, outcome: Outcome) -> Result<()> {
        match outcome {
            Outcome::Updated => self.render(state.session()),
            Outcome::Notice(message) => {
                ui::print_notice(&message);
                Ok(())
            }
            Outcome::Unchanged => Ok(()),
        }
    }

    fn print_history(&self, limit: Option<usize>) -> Result<()> {
        let mut entries = self.controller.history().entries();
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Plain => {
                for entry in &entries {
                    println!("{}\t{}", entry.timestamp, entry.query);
                }
            }
            _ => ui::print_history(&entries, terminal_width()),
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        filters: SearchFilters,
        page: u32,
        cite: Option<CitationStyle>,
    ) -> Result<()> {
        let mut state = SearchState::default();
        if let Outcome::Notice(message) = state.set_filters(filters) {
            bail!(message.text);
        }

        let outcome = self
            .with_spinner(&self.searching(), state.search_at(&self.controller, query, page))
            .await;
        if let Outcome::Notice(message) = outcome {
            bail!(message.text);
        }

        self.render(state.session())?;
        if let Some(style) = cite {
            for record in &state.session().results {
                println!();
                println!("{}", format_citation(record, style));
            }
        }
        Ok(())
    }

    async fn show(&self, doi: &str, cite: Option<CitationStyle>) -> Result<()> {
        let record = self
            .with_spinner("Looking up DOI...", self.controller.lookup_doi(doi))
            .await
            .map_err(|e| match e.user_message() {
                Some(message) => anyhow::anyhow!(message.text),
                None => anyhow::anyhow!(e),
            })?;

        match (cite, self.format) {
            (Some(style), OutputFormat::Json) => {
                let citation = serde_json::json!({
                    "style": style,
                    "citation": format_citation(&record, style),
                });
                println!("{}", serde_json::to_string_pretty(&citation)?);
            }
            (Some(style), OutputFormat::Plain) => println!("{}", format_citation(&record, style)),
            (Some(style), _) => ui::print_citation(style, &format_citation(&record, style)),
            (None, OutputFormat::Json) => println!("{}", serde_json::to_string_pretty(&record)?),
            (None, OutputFormat::Plain) => println!("{}", plain_line(&record)),
            (None, _) => ui::print_details(&record),
        }
        Ok(())
    }

    async fn browse(&self, query: Option<String>, filters: SearchFilters) -> Result<()> {
        let mut state = SearchState::default();
        if let Outcome::Notice(message) = state.set_filters(filters) {
            ui::print_notice(&message);
        }

        if let Some(query) = query {
            let outcome = self
                .with_spinner(&self.searching(), state.search(&self.controller, &query))
                .await;
            self.report(&state, outcome)?;
        }

        if !self.quiet {
            ui::print_status(Status::Info, "Type ? for help, q to quit");
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let command = match parse_browse_command(&line) {
                Ok(command) => command,
                Err(e) => {
                    ui::print_status(Status::Warning, &e);
                    continue;
                }
            };

            let outcome = match command {
                BrowseCommand::Quit => break,
                BrowseCommand::Help => {
                    println!("{}", BROWSE_HELP);
                    continue;
                }
                BrowseCommand::History => {
                    self.print_history(None)?;
                    continue;
                }
                BrowseCommand::Details(index) => {
                    match state.session().results.get(index - 1) {
                        Some(record) => ui::print_details(record),
                        None => ui::print_status(Status::Warning, "No result with that number"),
                    }
                    continue;
                }
                BrowseCommand::Cite(index, style) => {
                    match state.session().results.get(index - 1) {
                        Some(record) => ui::print_citation(style, &format_citation(record, style)),
                        None => ui::print_status(Status::Warning, "No result with that number"),
                    }
                    continue;
                }
                BrowseCommand::Next => {
                    self.with_spinner("Loading next page...", state.next_page(&self.controller))
                        .await
                }
                BrowseCommand::Previous => {
                    self.with_spinner("Loading previous page...", state.previous_page(&self.controller))
                        .await
                }
                BrowseCommand::PageSize(size) => {
                    self.with_spinner(&self.searching(), state.change_page_size(&self.controller, size))
                        .await
                }
                BrowseCommand::RemoveYear => {
                    self.with_spinner(&self.searching(), state.remove_year_filter(&self.controller))
                        .await
                }
                BrowseCommand::RemoveSort => {
                    self.with_spinner(&self.searching(), state.remove_sort_filter(&self.controller))
                        .await
                }
                BrowseCommand::Retry => {
                    self.with_spinner("Retrying...", state.retry(&self.controller)).await
                }
                BrowseCommand::Search(query) => {
                    self.with_spinner(&self.searching(), state.search(&self.controller, &query))
                        .await
                }
            };
            self.report(&state, outcome)?;
        }
        Ok(())
    }
}

fn init_tracing(cli: &Cli, config: &Config) {
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("crossref_search={}", log_level)),
    );
    let registry = tracing_subscriber::registry().with(env_filter);

    if config.logging.is_json() {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn build_app(cli: &Cli, config: Config) -> Result<App> {
    let timeout = cli
        .timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.crossref.timeout());

    let source = CrossRefSource::with_base_url(
        &config.crossref.base_url,
        &config.crossref.mailto,
        timeout.max(Duration::from_secs(30)),
    )?;

    let capacity = config.history.max_entries;
    let history = if cli.no_history || !config.history.enabled {
        SearchHistory::in_memory(capacity)
    } else {
        let store = config.history.store();
        tracing::debug!("Using history directory: {}", store.dir().display());
        SearchHistory::load(Arc::new(store), capacity)
    };

    let controller = SearchController::new(Arc::new(source), Arc::new(history))
        .timeout(timeout)
        .mailto(config.crossref.mailto.clone());

    Ok(App {
        controller,
        config,
        format: cli.output.resolve(),
        quiet: cli.quiet,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let config = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config file {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;

    init_tracing(&cli, &config);
    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    match &cli.command {
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "crossref-search", &mut std::io::stdout());
            return Ok(());
        }
        Commands::Config {
            action: ConfigAction::Init { path, force },
        } => {
            let path = path.clone().unwrap_or_else(default_config_path);
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            Config::default().save(&path)?;
            if !cli.quiet {
                ui::print_status(Status::Success, &format!("Wrote {}", path.display()));
            }
            return Ok(());
        }
        _ => {}
    }

    let app = build_app(&cli, config)?;

    match cli.command {
        Commands::Search {
            query,
            filters,
            page,
            cite,
        } => {
            let filters = filters.apply(app.config.search.filters());
            app.search(&query, filters, page, cite).await?;
        }

        Commands::Browse { query, filters } => {
            let filters = filters.apply(app.config.search.filters());
            app.browse(query, filters).await?;
        }

        Commands::Show { doi, cite } => {
            app.show(&doi, cite).await?;
        }

        Commands::History { limit, clear } => {
            if clear {
                app.controller.history().clear();
                if !app.quiet {
                    ui::print_status(Status::Success, "Search history cleared");
                }
            } else {
                app.print_history(limit)?;
            }
        }

        Commands::Config {
            action: ConfigAction::Show,
        } => {
            println!("{}", toml::to_string_pretty(&app.config)?);
        }

        Commands::Config {
            action: ConfigAction::Init { .. },
        }
        | Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_values() {
        assert_eq!(OutputFormat::Auto as i32, 0);
        assert_eq!(OutputFormat::Table as i32, 1);
        assert_eq!(OutputFormat::Json as i32, 2);
        assert_eq!(OutputFormat::Plain as i32, 3);
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["crossref-search", "history"]);
        assert_eq!(cli.verbose, 0);
        assert!(!cli.quiet);
        assert_eq!(cli.output, OutputFormat::Auto);
        assert_eq!(cli.timeout, None);
        assert!(!cli.no_history);
    }

    #[test]
    fn test_cli_verbose_flag() {
        let cli = Cli::parse_from(["crossref-search", "-vv", "history"]);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_search_with_options() {
        let cli = Cli::parse_from([
            "crossref-search",
            "search",
            "machine learning",
            "--year-from",
            "2020",
            "--year-to",
            "2023",
            "--sort",
            "newest",
            "--rows",
            "10",
            "--cite",
            "bibtex",
        ]);
        match cli.command {
            Commands::Search {
                query,
                filters,
                page,
                cite,
            } => {
                assert_eq!(query, "machine learning");
                assert_eq!(page, 1);
                assert_eq!(cite, Some(CitationStyle::Bibtex));

                let filters = filters.apply(SearchFilters::default());
                assert_eq!(filters.year_from, Some(2020));
                assert_eq!(filters.year_to, Some(2023));
                assert_eq!(filters.sort_by, SortBy::Newest);
                assert_eq!(filters.results_per_page, 10);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_filter_args_keep_configured_defaults() {
        let base = SearchFilters::new(25).sort_by(SortBy::Citations);
        let filters = FilterArgs::default().apply(base.clone());
        assert_eq!(filters, base);
    }

    #[test]
    fn test_cli_show_command() {
        let cli = Cli::parse_from(["crossref-search", "doi", "10.1234/test"]);
        match cli.command {
            Commands::Show { doi, cite } => {
                assert_eq!(doi, "10.1234/test");
                assert_eq!(cite, None);
            }
            _ => panic!("Expected Show command"),
        }
    }

    #[test]
    fn test_cli_config_init() {
        let cli = Cli::parse_from(["crossref-search", "config", "init", "/tmp/c.toml", "--force"]);
        match cli.command {
            Commands::Config {
                action: ConfigAction::Init { path, force },
            } => {
                assert_eq!(path, Some(PathBuf::from("/tmp/c.toml")));
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }

    #[test]
    fn test_parse_browse_commands() {
        assert_eq!(parse_browse_command("n"), Ok(BrowseCommand::Next));
        assert_eq!(parse_browse_command(" p "), Ok(BrowseCommand::Previous));
        assert_eq!(parse_browse_command("s 50"), Ok(BrowseCommand::PageSize(50)));
        assert_eq!(parse_browse_command("d 3"), Ok(BrowseCommand::Details(3)));
        assert_eq!(
            parse_browse_command("c 2 mla"),
            Ok(BrowseCommand::Cite(2, CitationStyle::Mla))
        );
        assert_eq!(
            parse_browse_command("c 2"),
            Ok(BrowseCommand::Cite(2, CitationStyle::Apa))
        );
        assert_eq!(
            parse_browse_command("/ graph theory"),
            Ok(BrowseCommand::Search("graph theory".to_string()))
        );
        assert_eq!(parse_browse_command("q"), Ok(BrowseCommand::Quit));
    }

    #[test]
    fn test_parse_browse_command_errors() {
        assert!(parse_browse_command("s").is_err());
        assert!(parse_browse_command("d 0").is_err());
        assert!(parse_browse_command("c 1 harvard").is_err());
        assert!(parse_browse_command("zzz").is_err());
        assert!(parse_browse_command("").is_err());
    }
}
