//! TaskTimer - per-task countdown CLI
//!
//! CLI entry point driving a file-backed timer store.

use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use tasktimer::cli::{Cli, Command};
use tasktimer::config::Config;
use tasktimer::{TimerEvent, TimerStore};

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("tasktimer starting");

    let store = TimerStore::open(&config).context("Failed to open timer store")?;

    match cli.command {
        Command::Start {
            task_id,
            user_id,
            duration_secs,
        } => {
            let timer = store.start_timer(task_id, user_id, duration_secs).await?;
            println!(
                "{} {} counting down, {}s remaining",
                "✓".green(),
                timer.task_id.cyan(),
                store.get_remaining_time(&timer.task_id).await?
            );
        }
        Command::Pause { task_id } => {
            store.pause_timer(&task_id).await?;
            let remaining = store.get_remaining_time(&task_id).await?;
            println!("{} {} paused at {}s", "✓".green(), task_id.cyan(), remaining);
        }
        Command::Resume { task_id } => {
            store.resume_timer(&task_id).await?;
            let remaining = store.get_remaining_time(&task_id).await?;
            println!("{} {} resumed with {}s left", "✓".green(), task_id.cyan(), remaining);
        }
        Command::Complete { task_id } => {
            store.complete_timer(&task_id).await?;
            println!("{} {} completed", "✓".green(), task_id.cyan());
        }
        Command::Remaining { task_id } => {
            let remaining = store.get_remaining_time(&task_id).await?;
            println!("{}", remaining);
        }
        Command::List { user_id } => {
            let timers = store.get_active_timers(&user_id).await?;
            if timers.is_empty() {
                println!("{}", "no active timers".dimmed());
            }
            for timer in timers {
                let remaining = store.get_remaining_time(&timer.task_id).await?;
                println!(
                    "{} {:>6}s remaining of {}s",
                    timer.task_id.yellow(),
                    remaining,
                    timer.duration
                );
            }
        }
        Command::Watch { user_id } => {
            watch(&store, &user_id).await?;
        }
    }

    store.destroy().await;
    Ok(())
}

/// Poll the read-only accessors once a second and render countdowns
async fn watch(store: &TimerStore, user_id: &str) -> Result<()> {
    let mut events = store.subscribe_events();
    let mut interval = tokio::time::interval(Duration::from_secs(1));

    println!("{}", format!("watching timers for {} (Ctrl-C to stop)", user_id).dimmed());

    loop {
        tokio::select! {
            _ = interval.tick() => {
                for timer in store.get_active_timers(user_id).await? {
                    let remaining = store.get_remaining_time(&timer.task_id).await?;
                    println!("{} {:>6}s", timer.task_id.yellow(), remaining);
                }
            }
            event = events.recv() => {
                if let Ok(TimerEvent::Expired { task_id }) = event {
                    println!("{} {} expired", "!".red(), task_id.cyan());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }

    Ok(())
}
