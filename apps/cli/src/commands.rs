//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use themis_core::{AssignmentTree, BuildObserver, TreeBuilder, load_tree_from_file, save_tree};
use themis_crawler::PortalClient;
use themis_shared::{AppConfig, PullConfig, init_config, load_config, parse_url};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Themis: mirror a portal's assignment hierarchy into a local tree file.
#[derive(Parser)]
#[command(
    name = "themis",
    version,
    about = "Crawl an assignment portal and save its assignment tree.",
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
    /// Crawl assignments below a page and save the tree.
    Pull {
        /// Start page (defaults to portal.base_url).
        url: Option<String>,

        /// Root node name (defaults to the URL hostname).
        #[arg(short, long)]
        name: Option<String>,

        /// Levels to expand below the root (defaults to tree.depth).
        #[arg(short, long, allow_negative_numbers = true)]
        depth: Option<i32>,

        /// Output file (defaults to tree.output_file).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Levels below the root to save (defaults to everything built).
        #[arg(long, allow_negative_numbers = true)]
        save_depth: Option<i32>,
    },

    /// Print a saved assignment tree.
    Show {
        /// Tree file (defaults to tree.output_file).
        file: Option<PathBuf>,

        /// Only print this many levels below the root.
        #[arg(short, long)]
        depth: Option<usize>,
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
        0 => "themis=info",
        1 => "themis=debug",
        _ => "themis=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
        Command::Pull {
            url,
            name,
            depth,
            out,
            save_depth,
        } => {
            let config = load_config()?;
            let pull = resolve_pull_config(&config, url.as_deref(), depth, save_depth, out)?;
            cmd_pull(&pull, name.as_deref()).await
        }
        Command::Show { file, depth } => cmd_show(file, depth),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// Merge config file values with CLI overrides.
fn resolve_pull_config(
    config: &AppConfig,
    url: Option<&str>,
    depth: Option<i32>,
    save_depth: Option<i32>,
    out: Option<PathBuf>,
) -> Result<PullConfig> {
    let mut pull = PullConfig::try_from(config)?;

    if let Some(url) = url {
        pull.start_url = parse_url(url)?;
    }
    if let Some(depth) = depth {
        pull.depth = depth;
        pull.save_depth = depth.saturating_add(1);
    }
    if let Some(save_depth) = save_depth {
        pull.save_depth = save_depth;
    }
    if let Some(out) = out {
        pull.output_file = out;
    }

    Ok(pull)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_pull(pull: &PullConfig, name: Option<&str>) -> Result<()> {
    let root_name = name.map(String::from).unwrap_or_else(|| {
        pull.start_url
            .host_str()
            .unwrap_or("portal")
            .to_string()
    });
    let start_url = pull.start_url.as_str();

    info!(
        url = start_url,
        name = %root_name,
        depth = pull.depth,
        "pulling assignment tree"
    );

    let client = PortalClient::from_config(pull)?;
    let reporter = CliProgress::new();

    let mut tree = AssignmentTree::new(root_name.clone(), start_url);
    let root = tree.root();
    let built = TreeBuilder::new(&client)
        .with_observer(&reporter)
        .pull_and_build(&mut tree, root, start_url, pull.depth)
        .await;
    reporter.finish();
    let built = built?;

    let records = save_tree(&tree, built, pull.save_depth, &pull.output_file)?;

    println!();
    println!("  Assignment tree saved!");
    println!("  Root:    {root_name}");
    println!("  Nodes:   {}", tree.len());
    println!("  Height:  {}", tree.height());
    println!("  Records: {records}");
    println!("  Fetches: {}", reporter.pages());
    println!("  File:    {}", pull.output_file.display());
    println!();

    Ok(())
}

fn cmd_show(file: Option<PathBuf>, depth: Option<usize>) -> Result<()> {
    let path = match file {
        Some(path) => path,
        None => PathBuf::from(load_config()?.tree.output_file),
    };
    if !path.exists() {
        return Err(eyre!(
            "no tree file at '{}'; run `themis pull` first",
            path.display()
        ));
    }

    let tree = load_tree_from_file(&path)?;
    print!("{}", tree.render(depth));
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config written to {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let content = toml::to_string_pretty(&config)?;
    print!("{content}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Build observer driving an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
    pages: AtomicUsize,
    nodes: AtomicUsize,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self {
            spinner,
            pages: AtomicUsize::new(0),
            nodes: AtomicUsize::new(0),
        }
    }

    fn pages(&self) -> usize {
        self.pages.load(Ordering::Relaxed)
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl BuildObserver for CliProgress {
    fn page_fetched(&self, url: &str, _links: usize) {
        let pages = self.pages.fetch_add(1, Ordering::Relaxed) + 1;
        let nodes = self.nodes.load(Ordering::Relaxed);
        self.spinner
            .set_message(format!("Fetched [{pages} pages, {nodes} nodes] {url}"));
    }

    fn node_built(&self, _name: &str, _url: &str) {}

    fn child_appended(&self, _parent: &str, _child: &str) {
        self.nodes.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_pull_flags() {
        let cli = Cli::try_parse_from([
            "themis",
            "pull",
            "https://portal.example.com/cs101",
            "-n",
            "CS101",
            "-d",
            "3",
            "--save-depth",
            "1",
        ])
        .unwrap();

        match cli.command {
            Command::Pull {
                url,
                name,
                depth,
                save_depth,
                out,
            } => {
                assert_eq!(url.as_deref(), Some("https://portal.example.com/cs101"));
                assert_eq!(name.as_deref(), Some("CS101"));
                assert_eq!(depth, Some(3));
                assert_eq!(save_depth, Some(1));
                assert!(out.is_none());
            }
            _ => panic!("expected pull"),
        }
    }

    #[test]
    fn cli_accepts_negative_depth() {
        let cli = Cli::try_parse_from(["themis", "pull", "--depth", "-1"]).unwrap();
        assert!(matches!(cli.command, Command::Pull { depth: Some(-1), .. }));
    }

    #[test]
    fn depth_flag_saves_everything_built() {
        let config = AppConfig::default();
        let pull = resolve_pull_config(&config, None, Some(4), None, None).unwrap();
        assert_eq!(pull.depth, 4);
        assert_eq!(pull.save_depth, 5);
    }

    #[test]
    fn max_depth_flag_does_not_overflow_save_depth() {
        let config = AppConfig::default();
        let pull = resolve_pull_config(&config, None, Some(i32::MAX), None, None).unwrap();
        assert_eq!(pull.depth, i32::MAX);
        assert_eq!(pull.save_depth, i32::MAX);
    }

    #[test]
    fn overrides_replace_config_values() {
        let config = AppConfig::default();
        let pull = resolve_pull_config(
            &config,
            Some("https://portal.example.com/cs101"),
            None,
            Some(0),
            Some(PathBuf::from("out.json")),
        )
        .unwrap();

        assert_eq!(pull.start_url.as_str(), "https://portal.example.com/cs101");
        assert_eq!(pull.depth, 2);
        assert_eq!(pull.save_depth, 0);
        assert_eq!(pull.output_file, PathBuf::from("out.json"));
    }

    #[test]
    fn rejects_non_http_start_url() {
        let config = AppConfig::default();
        assert!(resolve_pull_config(&config, Some("file:///etc/passwd"), None, None, None).is_err());
    }
}
