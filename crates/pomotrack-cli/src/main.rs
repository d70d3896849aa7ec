use clap::{Parser, Subcommand};
use pomotrack_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "pomotrack", version, about = "Pomodoro timer and session tracker")]
struct Cli {
    /// Act as this user instead of the configured default
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Per-user timer settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Application configuration
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session records
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Session statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Interactive timer
    Timer {
        #[command(subcommand)]
        action: commands::timer::TimerAction,
    },
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_env("POMOTRACK_LOG")
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(command: Commands, user: Option<String>, config: &AppConfig) -> commands::CmdResult {
    let user = user.unwrap_or_else(|| config.default_user.clone());
    match command {
        Commands::Settings { action } => commands::settings::run(action, &user, config),
        Commands::Session { action } => commands::session::run(action, &user, config),
        Commands::Stats { action } => commands::stats::run(action, &user, config),
        Commands::Timer { action } => commands::timer::run(action, &user, config),
        // Handled before the config is needed, so a broken file can be repaired.
        Commands::Config { action } => commands::config::run(action),
    }
}

fn main() {
    let Cli { user, command } = Cli::parse();
    let config = AppConfig::load();
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.as_str())
        .unwrap_or("warn");
    init_logging(log_level);

    let result = match command {
        Commands::Config { action } => commands::config::run(action),
        command => match &config {
            Ok(config) => dispatch(command, user, config),
            Err(e) => Err(format!("cannot load config: {e}").into()),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
