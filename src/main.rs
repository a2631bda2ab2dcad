mod ai;
mod config;
mod constants;
mod mail;
mod portfolio;
mod retry;
mod server;

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

const ENV_LOG_FILE: &str = "FOLIO_LOG_FILE";

fn setup_logging() {
    use std::fs::OpenOptions;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,folio=debug"));

    // Optional log file, appended across restarts
    let log_file = env::var_os(ENV_LOG_FILE).and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(PathBuf::from(path))
            .ok()
    });

    if let Some(file) = log_file {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::sync::Mutex::new(file))
                    .with_ansi(false),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn print_usage() {
    eprintln!(
        r#"folio - Portfolio API server

Usage: folio [command] [--config PATH]

Commands:
    serve       Start the API server (default)
    check       Print the effective configuration and exit
    help        Show this help message

Configuration file: ~/.config/folio/config.toml (or $FOLIO_CONFIG)
Environment: OPENROUTER_API_KEY, OPENROUTER_MODEL, EMAIL_USER, EMAIL_PASSWORD,
             PORT, FRONTEND_URL, NODE_ENV, RUST_LOG, FOLIO_LOG_FILE
"#
    );
}

enum Command {
    Serve,
    Check,
    Help,
}

struct Args {
    command: Command,
    config: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut command = None;
    let mut config = None;
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = iter.next().context("--config requires a path")?;
                config = Some(PathBuf::from(path));
            }
            "help" | "--help" | "-h" => command = Some(Command::Help),
            "serve" => command = Some(Command::Serve),
            "check" => command = Some(Command::Check),
            other => anyhow::bail!("Unknown command: {}", other),
        }
    }

    Ok(Args {
        command: command.unwrap_or(Command::Serve),
        config,
    })
}

/// Print what the server would run with, secrets redacted
fn run_check(config: &Config) -> Result<()> {
    let portfolio = server::load_portfolio(&config.server)?;

    println!("Listen:        {}", config.server.socket_addr());
    println!("Environment:   {}", config.server.environment.as_str());
    println!("CORS origins:  {}", config.server.origins().join(", "));
    match &config.server.static_dir {
        Some(dir) => println!("Static files:  {}", dir.display()),
        None => println!("Static files:  (none)"),
    }
    println!(
        "Chat model:    {} ({})",
        config.ai.model,
        if config.ai.api_key().is_some() {
            "API key set"
        } else {
            "no API key, greetings only"
        }
    );
    match config.mail.credentials() {
        Some((username, _)) => println!(
            "Contact mail:  {} -> {} via {}:{}",
            username,
            config.mail.recipient.as_deref().unwrap_or(&portfolio.email),
            config.mail.server,
            config.mail.port
        ),
        None => println!("Contact mail:  log only (EMAIL_USER/EMAIL_PASSWORD not set)"),
    }
    println!(
        "Portfolio:     {} - {} ({} positions, {} skills)",
        portfolio.name,
        portfolio.title,
        portfolio.experience.len(),
        portfolio.skills.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Help => {
            print_usage();
            Ok(())
        }
        Command::Check => {
            let config = Config::load(args.config.as_deref())?;
            run_check(&config)
        }
        Command::Serve => {
            setup_logging();

            let config = Config::load(args.config.as_deref())?;
            tracing::debug!("Loaded configuration: {:?}", config);

            server::serve(config).await
        }
    }
}
