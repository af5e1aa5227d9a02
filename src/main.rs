use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gitfleet::app::RepoPicker;
use gitfleet::cli::{CliArgs, Command, ConfigAction, FilterArgs};
use gitfleet::config::{self, Config};
use gitfleet::exec::{GhCli, GitCli};
use gitfleet::git::clone_repository;
use gitfleet::github;
use gitfleet::orchestrator::Orchestrator;
use gitfleet::render::Renderer;
use gitfleet::scan::{find_repositories, RepoQuery};
use gitfleet_core::app::Operation;
use gitfleet_core::ports::GitExecutor;
use gitfleet_core::Repository;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Logs go to stderr so reports on stdout stay clean.
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match run(args) {
        Ok(code) => code,
        Err(err) => {
            error!("Application error: {err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<ExitCode> {
    let CliArgs {
        root_dir,
        config: config_path,
        command,
        ..
    } = args;

    match command {
        Command::Version => {
            println!("gitfleet {}", env!("CARGO_PKG_VERSION"));
            Ok(ExitCode::SUCCESS)
        }
        Command::Config { action } => run_config(action, config_path),
        Command::Clone { url } => {
            let config = Config::from_cli_and_file(root_dir, config_path)?;
            let executor = git_executor(&config);
            let repo = clone_repository(executor, &config.root_dir, &url, &config.clone.options())
                .with_context(|| format!("Failed to clone {url}"))?;
            println!("Cloned {} into {}", repo.full_name(), repo.path.display());
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { filter, display_all } => {
            let config = Config::from_cli_and_file(root_dir, config_path)?;
            fan_out(&config, &filter, Operation::Status, display_all)
        }
        Command::Update {
            filter,
            fetch_only,
            prune,
        } => {
            let config = Config::from_cli_and_file(root_dir, config_path)?;
            fan_out(&config, &filter, Operation::Update { fetch_only, prune }, false)
        }
        Command::Prune { ref filter, .. } => {
            let config = Config::from_cli_and_file(root_dir, config_path)?;
            let opts = command.prune_options().context("prune options")?;
            fan_out(&config, filter, Operation::Prune(opts), false)
        }
        Command::GhClone { owner, limit, all } => {
            let config = Config::from_cli_and_file(root_dir, config_path)?;
            gh_clone(&config, owner.as_deref(), limit, all)
        }
    }
}

fn git_executor(config: &Config) -> Arc<dyn GitExecutor> {
    Arc::new(GitCli::new().with_timeout(config.git.timeout))
}

fn fan_out(config: &Config, filter: &FilterArgs, operation: Operation, display_all: bool) -> Result<ExitCode> {
    let query = RepoQuery {
        root_dir: config.root_dir.clone(),
        path: filter.path.clone(),
        filter: filter.repo_filter(),
    };
    let repos = find_repositories(&query)?;
    if repos.is_empty() {
        println!("No repositories found under {}", config.root_dir.display());
        return Ok(ExitCode::SUCCESS);
    }
    info!(count = repos.len(), ?operation, "running");

    let orchestrator = Orchestrator::new(git_executor(config), config.git.jobs);
    let report = orchestrator.run(&repos, operation)?;

    let stdout = io::stdout();
    let renderer = Renderer::new(stdout.is_terminal()).with_display_all(display_all);
    let mut out = stdout.lock();
    renderer.render(&mut out, &report)?;
    out.flush()?;

    Ok(if report.summary().failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn gh_clone(config: &Config, owner: Option<&str>, limit: usize, all: bool) -> Result<ExitCode> {
    let gh = GhCli::new().with_timeout(config.git.timeout);
    let listed = github::list_repositories(&gh, owner, limit)?;
    if listed.is_empty() {
        println!("No repositories listed");
        return Ok(ExitCode::SUCCESS);
    }

    let picked = if all { listed } else {
        match pick(listed)? {
            Some(picked) => picked,
            None => {
                println!("Cancelled");
                return Ok(ExitCode::SUCCESS);
            }
        }
    };

    let executor = git_executor(config);
    let options = config.clone.options();
    let mut failed = 0;
    for repo in &picked {
        let url = github::clone_url(repo);
        match clone_repository(Arc::clone(&executor), &config.root_dir, &url, &options) {
            Ok(cloned) => println!("Cloned {} into {}", cloned.full_name(), cloned.path.display()),
            Err(gitfleet_core::GitError::AlreadyExists { path }) => {
                println!("Skipping {}: already exists at {}", repo.full_name(), path.display());
            }
            Err(err) => {
                failed += 1;
                eprintln!("{}: {err}", repo.full_name());
            }
        }
    }

    Ok(if failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

fn pick(listed: Vec<Repository>) -> Result<Option<Vec<Repository>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut picker = RepoPicker::new(listed);
    let res = picker.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_config(action: ConfigAction, config_path: Option<std::path::PathBuf>) -> Result<ExitCode> {
    let path = config::resolve_path(config_path)?;
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!("Config file already exists: {} (use --force to overwrite)", path.display());
            }
            Config::default().save(&path)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Get { key: None } => {
            let config = Config::load(Some(path))?;
            print!("{}", toml::to_string_pretty(&config).context("Failed to serialize config to TOML")?);
        }
        ConfigAction::Get { key: Some(key) } => {
            let config = Config::load(Some(path))?;
            println!("{}", config.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(Some(path.clone()))?;
            config.set(&key, &value)?;
            config.save(&path)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
