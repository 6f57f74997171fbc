mod config;
mod judge;
mod output;
mod simulate;
mod store;

use clap::Parser;
use std::io::{self, BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use versus_core::SessionState;

use crate::config::VersusConfig;
use crate::judge::{parse_answer, Answer};

pub fn bail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    std::process::exit(1);
}

#[derive(Parser)]
#[command(name = "versus", version, about = "Rank items by pairwise human judgments")]
struct Cli {
    /// Show debug logs on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: ~/.config/versus/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Create a session from a list of items and show the first comparison
    Start(StartArgs),
    /// Show the outstanding comparison, or the results if the session is complete
    Next(SessionArgs),
    /// Answer the outstanding comparison: 1 for the first item, 2 for the second
    Choose(ChooseArgs),
    /// Rank interactively in the terminal
    Rank(RankArgs),
    /// Measure the method with a synthetic judge
    Simulate(SimulateArgs),
    /// Create a default config file at ~/.config/versus/config.toml
    Init,
}

#[derive(clap::Args)]
struct SessionArgs {
    /// Session file (default: versus-session.json, or `session` in config)
    #[arg(long)]
    session: Option<PathBuf>,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct ItemArgs {
    /// File with one item per line, or a JSON array of strings
    #[arg(long)]
    items: Option<PathBuf>,

    /// Inline item (repeatable)
    #[arg(long = "item")]
    inline_items: Vec<String>,
}

#[derive(clap::Args)]
struct StartArgs {
    #[command(flatten)]
    items: ItemArgs,

    #[command(flatten)]
    session: SessionArgs,

    /// Overwrite an existing session file
    #[arg(long)]
    force: bool,
}

#[derive(clap::Args)]
struct ChooseArgs {
    /// 1 (first item shown) or 2 (second item shown)
    answer: String,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(clap::Args)]
struct RankArgs {
    #[command(flatten)]
    items: ItemArgs,

    /// Persist after every answer so the session can be resumed
    #[arg(long)]
    session: Option<PathBuf>,

    /// Continue the session stored at --session instead of starting a new one
    #[arg(long, requires = "session", conflicts_with_all = ["items", "inline_items"])]
    resume: bool,

    /// Output JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args)]
struct SimulateArgs {
    /// Number of items
    #[arg(long)]
    count: usize,

    /// RNG seed (default: 42, or `seed` in config)
    #[arg(long)]
    seed: Option<u64>,

    /// Probability that the judge answers against the true order
    #[arg(long)]
    noise: Option<f64>,

    /// Output JSON instead of text
    #[arg(long)]
    json: bool,
}

/// Install the stderr log subscriber. RUST_LOG wins over --verbose.
fn init_tracing(verbose: bool) {
    let default = if verbose { "versus_core=debug,versus_cli=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Parse a string as either a JSON array of strings or plain text (one item per line).
fn parse_items_from_str(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    if trimmed.starts_with('[') {
        let items: Vec<String> = serde_json::from_str(trimmed)
            .unwrap_or_else(|e| bail(format!("File looks like JSON but failed to parse: {e}")));
        items.into_iter().filter(|s| !s.trim().is_empty()).collect()
    } else {
        trimmed
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Load items from all sources: --items file, --item inline args, or stdin.
fn load_items(args: &ItemArgs, allow_stdin: bool) -> Vec<String> {
    let mut items = Vec::new();

    if let Some(ref path) = args.items {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|e| bail(format!("Failed to read items file {}: {e}", path.display())));
        items = parse_items_from_str(&content);
    }

    items.extend(args.inline_items.iter().cloned());

    // stdin is the judge's channel during `rank`, so items can only come from it for `start`.
    if items.is_empty() && allow_stdin {
        let stdin = io::stdin();
        if stdin.is_terminal() {
            bail("No items provided. Use --items <file>, --item <name>, or pipe items via stdin.");
        }
        let content: String = stdin
            .lock()
            .lines()
            .map(|l| l.unwrap_or_else(|e| bail(format!("Failed to read from stdin: {e}"))))
            .collect::<Vec<_>>()
            .join("\n");
        items = parse_items_from_str(&content);
    }

    items
}

fn session_path(arg: Option<&PathBuf>, cfg: &VersusConfig) -> PathBuf {
    arg.cloned()
        .or_else(|| cfg.session.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_SESSION_FILE))
}

fn create_session(items: Vec<String>) -> SessionState {
    SessionState::new(items).unwrap_or_else(|e| bail(e))
}

fn open_session(path: &Path) -> SessionState {
    store::load_session(path)
        .unwrap_or_else(|e| bail(format!("Failed to load session {}: {e}", path.display())))
}

fn persist(path: &Path, session: &SessionState) {
    store::save_session(path, session)
        .unwrap_or_else(|e| bail(format!("Failed to save session {}: {e}", path.display())));
}

/// Print the next comparison, or the results once complete.
fn show_state(session: &mut SessionState, json: bool) {
    if session.is_complete() {
        output::print_results(session, json);
    } else {
        let comparison = session.next_comparison().unwrap_or_else(|e| bail(e));
        output::print_comparison(session, &comparison, json);
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(config::config_path);
    let cfg = if matches!(cli.command, Commands::Init) {
        VersusConfig::default()
    } else {
        config::load_config(&config_path)
    };

    match cli.command {
        Commands::Start(args) => run_start(args, &cfg),
        Commands::Next(args) => run_next(args, &cfg),
        Commands::Choose(args) => run_choose(args, &cfg),
        Commands::Rank(args) => run_rank(args, &cfg),
        Commands::Simulate(args) => run_simulate(args, &cfg),
        Commands::Init => {
            let path = config::create_default_config();
            println!("Created config at {}", path.display());
            println!("Edit it to set your default session file, output mode, etc.");
        }
    }
}

fn run_start(args: StartArgs, cfg: &VersusConfig) {
    let path = session_path(args.session.session.as_ref(), cfg);
    if path.exists() && !args.force {
        bail(format!(
            "Session file {} already exists. Use --force to replace it, or `versus next` to continue.",
            path.display()
        ));
    }

    let mut session = create_session(load_items(&args.items, true));
    info!(
        items = session.num_items(),
        budget = session.comparison_budget(),
        path = %path.display(),
        "session started"
    );
    persist(&path, &session);

    let json = args.session.json || cfg.json.unwrap_or(false);
    show_state(&mut session, json);
}

fn run_next(args: SessionArgs, cfg: &VersusConfig) {
    let path = session_path(args.session.as_ref(), cfg);
    let mut session = open_session(&path);
    let was_complete = session.outcome().is_some();

    let json = args.json || cfg.json.unwrap_or(false);
    show_state(&mut session, json);

    if !was_complete && session.outcome().is_some() {
        persist(&path, &session);
    }
}

fn run_choose(args: ChooseArgs, cfg: &VersusConfig) {
    let path = session_path(args.session.session.as_ref(), cfg);
    let answer = match parse_answer(&args.answer) {
        Some(Answer::First) => Answer::First,
        Some(Answer::Second) => Answer::Second,
        _ => bail(format!("Invalid answer \"{}\". Use 1 or 2.", args.answer)),
    };

    let mut session = answer_and_persist(&path, answer);

    let json = args.session.json || cfg.json.unwrap_or(false);
    show_state(&mut session, json);
}

/// Apply `answer` to the outstanding comparison and save before anything is shown.
fn answer_and_persist(path: &Path, answer: Answer) -> SessionState {
    let mut session = open_session(path);
    if session.is_complete() {
        bail("The session is already complete. Run `versus next` to see the results.");
    }

    let comparison = session.next_comparison().unwrap_or_else(|e| bail(e));
    let choice = judge::choice_for(&comparison, answer).unwrap_or_else(|| bail("No choice given"));
    session
        .apply_choice(comparison.with_choice(choice))
        .unwrap_or_else(|e| bail(e));

    // Score now so the saved file already holds the results shown next.
    session.is_complete();
    persist(path, &session);
    session
}

fn run_rank(args: RankArgs, cfg: &VersusConfig) {
    let mut session = if args.resume {
        let path = session_path(args.session.as_ref(), cfg);
        open_session(&path)
    } else {
        if let Some(ref path) = args.session {
            if path.exists() {
                bail(format!(
                    "Session file {} already exists. Use --resume to continue it.",
                    path.display()
                ));
            }
        }
        let items = load_items(&args.items, false);
        if items.is_empty() {
            bail("No items provided. Use --items <file> or --item <name>.");
        }
        create_session(items)
    };
    let path = args.session.clone();

    if let Some(ref path) = path {
        persist(path, &session);
    }

    eprintln!(
        "Ranking {} items (about {} comparisons). Answer 1 or 2, q to stop.",
        session.num_items(),
        session.comparison_budget(),
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    while !session.is_complete() {
        let comparison = session.next_comparison().unwrap_or_else(|e| bail(e));
        let progress = output::progress_line(&session);
        let choice = judge::ask(&comparison, &progress, &mut input, &mut out)
            .unwrap_or_else(|e| bail(format!("Failed to read answer: {e}")));

        let Some(choice) = choice else {
            match path {
                Some(ref path) => eprintln!(
                    "Stopped. Resume with `versus rank --resume --session {}`.",
                    path.display()
                ),
                None => eprintln!("Stopped. Pass --session to keep progress between runs."),
            }
            return;
        };

        session
            .apply_choice(comparison.with_choice(choice))
            .unwrap_or_else(|e| bail(e));
        if let Some(ref path) = path {
            persist(path, &session);
        }
    }

    if let Some(scores) = session.outcome().map(|o| o.scores.clone()) {
        for score in scores {
            debug!(
                item = score.item,
                chosen = score.chosen,
                seen = score.seen,
                agreement = %output::agreement_label(score.agreement),
                "score"
            );
        }
    }
    if let Some(ref path) = path {
        persist(path, &session);
    }

    let json = args.json || cfg.json.unwrap_or(false);
    println!();
    output::print_results(&session, json);
}

fn run_simulate(args: SimulateArgs, cfg: &VersusConfig) {
    let seed = args.seed.or(cfg.seed).unwrap_or(42);
    let noise = args.noise.or(cfg.noise).unwrap_or(0.0);
    if !(0.0..=1.0).contains(&noise) {
        bail(format!("--noise must be between 0.0 and 1.0, got {noise}"));
    }

    let report = simulate::run_simulation(args.count, seed, noise).unwrap_or_else(|e| bail(e));

    if args.json || cfg.json.unwrap_or(false) {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|e| bail(e))
        );
    } else {
        simulate::print_report(&report);
    }
}
