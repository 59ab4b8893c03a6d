mod api;
mod cli;
mod commands;
mod config;
mod output;
mod prompt;
mod runtime;
mod ui;

use anyhow::{Context, Result};
use api::inventory::InventoryBackend;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cleanupkit::{PlanOptions, RowSet};
use cli::{CfnCommand, Cli, Command, IamCommand, SageMakerCommand};
use config::Config;
use output::OutputFormat;
use runtime::CommandRuntime;
use std::io::{self, IsTerminal, Write};
use std::time::Duration;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    if let Command::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "awstbx", &mut io::stdout());
        return Ok(());
    }

    let global = cli.global;
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(page_size) = global.page_size {
        config.page_size = page_size as usize;
    }
    if let Some(output) = global.output {
        config.output = output;
    }
    let format = config.output;

    let inventory_path = global
        .inventory
        .context("No inventory given; pass --inventory or set AWSTBX_INVENTORY")?;
    let backend = InventoryBackend::load(&inventory_path, config.page_size)?;

    let opts = PlanOptions {
        dry_run: global.dry_run,
        no_confirm: global.no_confirm,
    };
    let mut rt = CommandRuntime::new(opts, config, global.timeout.map(Duration::from_secs));

    let rows = dispatch(cli.command, &backend, &mut rt)?;

    if !opts.dry_run {
        backend.save()?;
    }

    let mut stdout = io::stdout().lock();
    let color = format == OutputFormat::Table && io::stdout().is_terminal();
    output::render(&rows, format, &mut stdout, color)?;
    stdout.flush()?;

    if !cli.quiet {
        ui::summary(&rows.summary(), opts.dry_run);
    }
    Ok(())
}

fn dispatch(command: Command, backend: &InventoryBackend, rt: &mut CommandRuntime) -> Result<RowSet> {
    match command {
        Command::Iam(IamCommand::DeleteUser { username }) => {
            commands::iam::delete_user(backend, &username, rt)
        }
        Command::Sagemaker(SageMakerCommand::DeleteUserProfile {
            domain_id,
            user_profile,
        }) => commands::sagemaker::delete_user_profile(backend, &domain_id, &user_profile, rt),
        Command::Sagemaker(SageMakerCommand::CleanupSpaces { domain_id, spaces }) => {
            commands::sagemaker::cleanup_spaces(backend, domain_id.as_deref(), &spaces, rt)
        }
        Command::Cfn(CfnCommand::DeleteStackSet { stackset_name }) => {
            commands::cloudformation::delete_stackset(backend, &stackset_name, rt)
        }
        Command::Completions { .. } => anyhow::bail!("completions are generated before dispatch"),
    }
}
