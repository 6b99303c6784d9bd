mod cli;
mod commands;
mod output;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use circle::config::Config;
use circle::error::Result;
use circle::repository::open_repository;
use circle::tracker::Tracker;
use cli::{Cli, Commands, DbCommands, IssueCommands};

fn init_tracing() {
    // Warnings about unknown priorities or statuses surface by default;
    // RUST_LOG widens or silences that.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");

        // Show error chain if verbose flag was passed
        if std::env::args().any(|arg| arg == "--verbose" || arg == "-v") {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    output::set_format(cli.output_format());
    output::set_quiet(cli.quiet);

    match cli.command {
        // Commands that don't open storage
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "circle", &mut io::stdout());
        }
        Commands::Init => {
            commands::init::run()?;
        }
        Commands::Db {
            action: DbCommands::Migrate,
        } => {
            commands::db::migrate(&Config::load()?)?;
        }
        Commands::Db {
            action: DbCommands::Status,
        } => {
            commands::db::status(&Config::load()?)?;
        }
        command => {
            let config = Config::load()?;
            let tracker = Tracker::new(open_repository(&config)?);
            tracing::debug!(backend = %tracker.backend(), "storage opened");

            match command {
                Commands::Issues(args) => {
                    commands::issues::list(&tracker, &config, args).await?;
                }
                Commands::Issue { action } => match action {
                    IssueCommands::List(args) => {
                        commands::issues::list(&tracker, &config, args).await?;
                    }
                    IssueCommands::Show { id } => {
                        commands::issues::show(&tracker, &id).await?;
                    }
                    IssueCommands::Create(args) => {
                        commands::issues::create(&tracker, &config, args).await?;
                    }
                    IssueCommands::Update(args) => {
                        commands::issues::update(&tracker, args).await?;
                    }
                    IssueCommands::Move(args) => {
                        commands::issues::move_issue(&tracker, args).await?;
                    }
                    IssueCommands::Delete { id } => {
                        commands::issues::delete(&tracker, &id).await?;
                    }
                    IssueCommands::Parent { id, parent_id } => {
                        commands::issues::set_parent(&tracker, &id, &parent_id).await?;
                    }
                    IssueCommands::Unparent { id } => {
                        commands::issues::remove_parent(&tracker, &id).await?;
                    }
                },
                Commands::Board(args) => {
                    commands::board::show(&tracker, &config, args).await?;
                }
                Commands::Teams => {
                    commands::teams::list(&tracker).await?;
                }
                Commands::Projects { team } => {
                    commands::projects::list(&tracker, &config, team).await?;
                }
                Commands::Labels => {
                    commands::labels::list(&tracker).await?;
                }
                Commands::Users { team } => {
                    commands::users::list(&tracker, team).await?;
                }
                Commands::Statuses => {
                    commands::workflow::statuses(&tracker).await?;
                }
                Commands::Priorities => {
                    commands::workflow::priorities(&tracker).await?;
                }
                Commands::Counts { kind } => {
                    commands::counts::show(&tracker, kind).await?;
                }
                Commands::Db {
                    action: DbCommands::Seed,
                } => {
                    commands::db::seed(&tracker).await?;
                }
                Commands::Db { .. } | Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                }
            }
        }
    }

    Ok(())
}
