use anyhow::{Context, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
};

use rapidkeys::{
    app::{Action, App},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    controller::TypingSession,
    difficulty::Difficulty,
    persist::StoreWorker,
    runtime::{CrosstermEventSource, FixedTicker, Runner},
    stats::UserStats,
    store::{ResultsStore, SqliteResultsStore},
    typing_policy::MismatchPolicy,
    words::WordBank,
};

/// timed typing speed test with a local leaderboard
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A timed typing speed test for the terminal. Type the shuffled words before the clock runs out; signed-in results go to a local leaderboard and personal statistics."
)]
pub struct Cli {
    /// length of the test in seconds
    #[clap(short = 'd', long)]
    duration: Option<u32>,

    /// word list to draw from
    #[clap(short = 'l', long, value_enum)]
    difficulty: Option<Difficulty>,

    /// use the dark palette
    #[clap(long, conflicts_with = "light")]
    dark: bool,

    /// use the light palette
    #[clap(long)]
    light: bool,

    /// turn music on
    #[clap(long, conflicts_with = "no_music")]
    music: bool,

    /// turn music off
    #[clap(long)]
    no_music: bool,

    /// what a mistyped word does to the cursor
    #[clap(long, value_enum)]
    policy: Option<MismatchPolicy>,

    /// name to record results under; anonymous runs are not saved
    #[clap(short = 'u', long)]
    user: Option<String>,

    /// results database location
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,

    /// write the effective settings back to the config file
    #[clap(long)]
    save_config: bool,

    /// print the top N results and exit
    #[clap(long, value_name = "N", num_args = 0..=1, default_missing_value = "10")]
    leaderboard: Option<usize>,

    /// print statistics for --user and exit
    #[clap(long)]
    stats: bool,
}

impl Cli {
    /// Flags win over whatever the config file holds
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(duration) = self.duration {
            cfg.duration = duration;
        }
        if let Some(difficulty) = self.difficulty {
            cfg.difficulty = difficulty;
        }
        if self.dark {
            cfg.dark_mode = true;
        }
        if self.light {
            cfg.dark_mode = false;
        }
        if self.music {
            cfg.music_enabled = true;
        }
        if self.no_music {
            cfg.music_enabled = false;
        }
        if let Some(policy) = self.policy {
            cfg.policy = policy;
        }
        if let Some(user) = &self.user {
            cfg.user = Some(user.clone());
        }
        cfg
    }

    fn db_path(&self) -> Option<PathBuf> {
        self.db.clone().or_else(AppDirs::db_path)
    }
}

fn init_logger() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
}

fn open_store(cli: &Cli) -> Result<SqliteResultsStore> {
    let path = cli.db_path().context("no location for the results database")?;
    let store = SqliteResultsStore::open(&path)
        .with_context(|| format!("opening results database {}", path.display()))?;
    log::info!("opened results database {}", path.display());
    Ok(store)
}

fn print_leaderboard(cli: &Cli, limit: usize) -> Result<()> {
    let store = open_store(cli)?;
    let entries = store.top_results(limit).context("reading leaderboard")?;
    if entries.is_empty() {
        println!("No results yet.");
    }
    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{:>3}. {:<20} {:>4} wpm {:>4}%",
            i + 1,
            entry.display_name,
            entry.wpm,
            entry.accuracy
        );
    }
    Ok(())
}

fn print_stats(cli: &Cli, cfg: &Config) -> Result<()> {
    let identity = cfg
        .app_context()
        .identity
        .context("--stats needs a user, pass --user <name>")?;
    let store = open_store(cli)?;
    let records = store
        .results_for_identity(&identity)
        .context("reading results")?;
    match UserStats::from_records(&records) {
        Some(stats) => {
            println!("Stats for {}", identity.display_name);
            println!("  Best WPM       {}", stats.best_wpm);
            println!("  Avg. WPM       {}", stats.average_wpm);
            println!("  Avg. Accuracy  {}%", stats.average_accuracy);
            println!("  Total Tests    {}", stats.total_tests);
            println!("  Time Typed     {}", stats.total_time_text());
        }
        None => println!("No tests completed yet. Start typing to see your stats!"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger();

    let config_store = FileConfigStore::new();
    let cfg = cli.apply(config_store.load());
    let session_config = cfg.session_config().context("invalid settings")?;

    if cli.save_config {
        config_store
            .save(&cfg)
            .with_context(|| format!("saving {}", config_store.path().display()))?;
    }

    if let Some(limit) = cli.leaderboard {
        return print_leaderboard(&cli, limit);
    }
    if cli.stats {
        return print_stats(&cli, &cfg);
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    // the test still runs without a store, nothing gets saved
    let worker = match open_store(&cli) {
        Ok(store) => Some(StoreWorker::spawn(store)),
        Err(e) => {
            log::error!("{e:#}");
            None
        }
    };

    let context = cfg.app_context();
    let session = TypingSession::new(WordBank::builtin(), &context);
    let mut app = App::new(context, session_config, session, worker);

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    loop {
        if let Ok(size) = terminal.size() {
            app.set_viewport(size.width, size.height);
        }
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        if app.handle_event(runner.step()) == Action::Quit {
            return Ok(());
        }
    }
}
