//! ocsync CLI
//!
//! Syncs OpenCode configuration through a git repository from the terminal.

mod cli;
mod error;
mod notify;

use clap::Parser;
use colored::Colorize;
use ocsync_core::{
    EnvSnapshot, InitOptions, OfflineSessions, Platform, StartupOutcome, SyncContext,
    SyncLocations, SyncOrchestrator,
};
use ocsync_git::GitGateway;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cli::{Cli, Commands};
use error::Result;
use notify::TerminalNotifier;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let result = if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    };
    if let Err(e) = result {
        eprintln!("{}: tracing disabled: {}", "warning".yellow().bold(), e);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::debug!("Verbose mode enabled");

    let Some(command) = cli.command else {
        println!("{} OpenCode config sync", "ocsync".green().bold());
        println!();
        println!("Run {} for available commands.", "ocsync --help".cyan());
        return Ok(());
    };

    let platform = Platform::current();
    let locations = SyncLocations::resolve(&EnvSnapshot::from_process(), platform)?;
    let gateway = GitGateway::system();
    let notifier = TerminalNotifier;
    let ctx = SyncContext::new(locations, platform, &gateway, &OfflineSessions, &notifier);
    let orchestrator = SyncOrchestrator::new(&ctx);

    let message = execute_command(&orchestrator, command)?;
    println!("{message}");
    Ok(())
}

fn execute_command(orchestrator: &SyncOrchestrator<'_>, command: Commands) -> Result<String> {
    let message = match command {
        Commands::Init {
            repo,
            branch,
            include_secrets,
            extra_secrets,
            repo_path,
        } => {
            let mut options = InitOptions::new(repo.identity()?);
            options.branch = branch;
            options.include_secrets = include_secrets;
            options.extra_secret_paths = extra_secrets;
            options.local_repo_path = repo_path;
            orchestrator.init(options)?
        }
        Commands::Status => orchestrator.status()?,
        Commands::Pull => orchestrator.pull()?,
        Commands::Push => orchestrator.push()?,
        Commands::EnableSecrets { extra_secrets } => {
            let paths = (!extra_secrets.is_empty()).then_some(extra_secrets);
            orchestrator.enable_secrets(paths)?
        }
        Commands::Startup => describe_startup(&orchestrator.startup()),
    };
    Ok(message)
}

fn describe_startup(outcome: &StartupOutcome) -> String {
    match outcome {
        StartupOutcome::Unconfigured => "Sync is not configured on this machine.".to_string(),
        StartupOutcome::SkippedDirty => "Skipped: the sync repo has uncommitted changes.".to_string(),
        StartupOutcome::Pulled => "Pulled latest config. Restart OpenCode to apply.".to_string(),
        StartupOutcome::Pushed { message } => format!("Pushed changes: {message}"),
        StartupOutcome::UpToDate => "Already up to date.".to_string(),
        StartupOutcome::Failed { message, .. } => format!("Startup sync failed: {message}"),
    }
}
