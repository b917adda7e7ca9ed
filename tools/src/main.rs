//! larpreg-runner: headless operator CLI for the registration engine.
//!
//! Usage:
//!   larpreg-runner --db reg.db [--config engine.json] [--today YYYY-MM-DD]
//!                  <command> [flags]
//!
//! Commands:
//!   accounting  --run N
//!   refresh     --run N --member M
//!   deadlines   --run N [--run N ...] [--notify]
//!   status      --run N --member M
//!   validate    --reg R --to N [transfer flags]
//!   transfer    --reg R --to N [--move] [--no-choices] [--no-answers]
//!               [--no-accounting] [--map SRC:DST ...]
//!   counts      --run N
//!   leaderboard --assoc A
//!
//! `--today` pins the clock to midnight UTC of that day, for replaying
//! deadline checks as of an earlier date.
//!
//! Output is pretty-printed JSON on stdout; logs go to stderr (RUST_LOG).

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use larpreg_core::{
    cache::SqliteCache,
    clock::{Clock, FixedClock, SystemClock},
    config::EngineConfig,
    engine::RegistrationEngine,
    store::RegStore,
    transfer::TransferOptions,
};
use serde::Serialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

const COMMANDS: [&str; 8] = [
    "accounting",
    "refresh",
    "deadlines",
    "status",
    "validate",
    "transfer",
    "counts",
    "leaderboard",
];

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").ok_or_else(|| anyhow!("--db PATH is required"))?;
    let config = match arg_value(&args, "--config") {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let command = args
        .iter()
        .skip(1)
        .find(|a| COMMANDS.contains(&a.as_str()))
        .map(String::as_str)
        .ok_or_else(|| anyhow!("expected one of: {}", COMMANDS.join(", ")))?;

    let store = RegStore::open(db)?;
    store.migrate()?;
    // The cache backend gets its own connection to the same file.
    let cache_store = store.reopen()?;
    let clock: Arc<dyn Clock> = match arg_value(&args, "--today") {
        Some(day) => {
            let date = NaiveDate::parse_from_str(day, "%Y-%m-%d")
                .with_context(|| format!("--today expects YYYY-MM-DD, got {day}"))?;
            Arc::new(FixedClock::at_date(date))
        }
        None => Arc::new(SystemClock),
    };
    let cache = SqliteCache::new(cache_store, clock.clone());
    let purged = cache.purge_expired()?;
    if purged > 0 {
        log::debug!("purged {purged} expired cache entries");
    }
    let engine = RegistrationEngine::build(store, Box::new(cache), clock.clone(), config);
    log::info!("larpreg-runner {command} on {db} (today {})", clock.today());

    match command {
        "accounting" => {
            let run = required(&args, "--run")?;
            print_json(&engine.get_registration_accounting_cache(run)?)
        }
        "refresh" => {
            let run = required(&args, "--run")?;
            let member = required(&args, "--member")?;
            engine.refresh_member_accounting_cache(run, member)?;
            print_json(&engine.get_registration_accounting_cache(run)?)
        }
        "deadlines" => {
            let runs: Vec<i64> = all_values(&args, "--run")?;
            if runs.is_empty() {
                bail!("deadlines needs at least one --run");
            }
            let reports = engine.check_run_deadlines(&runs)?;
            if args.iter().any(|a| a == "--notify") {
                let queued = engine.queue_deadline_notifications(&reports)?;
                log::info!("queued {queued} notifications");
            }
            print_json(&reports)
        }
        "status" => {
            let run = required(&args, "--run")?;
            let member = required(&args, "--member")?;
            print_json(&engine.registration_status(run, member)?)
        }
        "validate" => {
            let reg = required(&args, "--reg")?;
            let to = required(&args, "--to")?;
            let options = transfer_options(&args)?;
            print_json(&engine.validate_transfer_feasibility(reg, to, &options)?)
        }
        "transfer" => {
            let reg = required(&args, "--reg")?;
            let to = required(&args, "--to")?;
            let options = transfer_options(&args)?;
            print_json(&engine.transfer_registration_between_runs(reg, to, &options)?)
        }
        "counts" => {
            let run = required(&args, "--run")?;
            print_json(&engine.get_reg_counts(run)?)
        }
        "leaderboard" => {
            let assoc = required(&args, "--assoc")?;
            print_json(&engine.get_leaderboard(assoc)?)
        }
        other => bail!("unknown command {other}"),
    }
}

fn transfer_options(args: &[String]) -> Result<TransferOptions> {
    let has = |flag: &str| args.iter().any(|a| a == flag);
    let mut options = TransferOptions {
        preserve_choices: !has("--no-choices"),
        preserve_answers: !has("--no-answers"),
        preserve_accounting: !has("--no-accounting"),
        move_registration: has("--move"),
        ..TransferOptions::default()
    };
    for pair in args.windows(2).filter(|w| w[0] == "--map") {
        let (src, dst) = pair[1]
            .split_once(':')
            .ok_or_else(|| anyhow!("--map expects SRC:DST, got {}", pair[1]))?;
        options.ticket_mapping.insert(
            src.parse().with_context(|| format!("bad source ticket {src}"))?,
            dst.parse().with_context(|| format!("bad target ticket {dst}"))?,
        );
    }
    Ok(options)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn required<T: FromStr>(args: &[String], flag: &str) -> Result<T> {
    let raw = arg_value(args, flag).ok_or_else(|| anyhow!("{flag} is required"))?;
    raw.parse()
        .map_err(|_| anyhow!("{flag} expects a number, got {raw}"))
}

/// Every value of a repeatable flag; each may also be a comma list.
fn all_values<T: FromStr>(args: &[String], flag: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    for w in args.windows(2).filter(|w| w[0] == flag) {
        for part in w[1].split(',').filter(|p| !p.is_empty()) {
            out.push(
                part.parse()
                    .map_err(|_| anyhow!("{flag} expects a number, got {part}"))?,
            );
        }
    }
    Ok(out)
}
