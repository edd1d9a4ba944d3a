use anyhow::Result;
use clap::Parser;

mod access;
mod catalog;
mod cli;
mod clock;
mod config;
mod fsutil;

use access::{AccessScheduler, AccessStore, SubjectKey};
use catalog::FixedCatalog;
use cli::{Args, Commands, SubjectArgs};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose);

    let config = config::load_config(&args.config)?;
    let store = AccessStore::new(config.store_path()?);
    let catalog = FixedCatalog::new(config.catalog_days);
    let scheduler = AccessScheduler::new(store, config.reset_hour, &catalog)?;

    match args.command {
        Commands::Check(subject) => check(&scheduler, &subject),
        Commands::Grant { subject, day } => grant(&scheduler, &subject, day),
        Commands::Remaining(subject) => remaining(&scheduler, &subject),
        Commands::Reset(subject) => reset(&scheduler, &subject),
        Commands::Status(subject) => status(&scheduler, &subject),
    }
}

/// Initialize logging
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn subject_key(subject: &SubjectArgs) -> Result<SubjectKey> {
    SubjectKey::new(subject.user.clone(), subject.topic)
}

fn check(scheduler: &AccessScheduler, subject: &SubjectArgs) -> Result<()> {
    let key = subject_key(subject)?;
    let decision = scheduler.evaluate(&key);

    if decision.granted() {
        println!(
            "{key}: eligible now (next window opens {})",
            decision.next_reset.format("%Y-%m-%d %H:%M")
        );
    } else {
        println!(
            "{key}: waiting until {}",
            decision.next_reset.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn grant(scheduler: &AccessScheduler, subject: &SubjectArgs, day: u32) -> Result<()> {
    let key = subject_key(subject)?;
    scheduler.record_grant(&key, day)?;
    println!("Recorded grant of day {day} for {key}");
    Ok(())
}

fn remaining(scheduler: &AccessScheduler, subject: &SubjectArgs) -> Result<()> {
    let key = subject_key(subject)?;
    let (seconds, text) = scheduler.remaining_time(&key);
    println!("{key}: {text} ({seconds}s)");
    Ok(())
}

fn reset(scheduler: &AccessScheduler, subject: &SubjectArgs) -> Result<()> {
    let key = subject_key(subject)?;
    scheduler.reset(&key)?;
    println!("Reset {key}; sequence restarts from day one");
    Ok(())
}

fn status(scheduler: &AccessScheduler, subject: &SubjectArgs) -> Result<()> {
    let key = subject_key(subject)?;
    let info = scheduler.describe(&key);

    println!("Subject:     {key}");
    println!("Can access:  {}", if info.granted { "yes" } else { "no" });
    if let Some(day) = info.last_day {
        println!("Last day:    {day}");
    }
    if let Some(last) = &info.last_access_human {
        println!("Last access: {last}");
    }
    println!("Next reset:  {}", info.next_reset.format("%Y-%m-%d %H:%M"));
    println!(
        "Remaining:   {} ({}s)",
        info.remaining_text, info.remaining_seconds
    );

    Ok(())
}
