use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use recall_core::time::parse_instant;
use recall_core::{ReviewOutcome, ReviewScheduler, ScheduleState};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;
mod replay;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "recall",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("RECALL_BUILD_SHA"), ")"),
    about = "Spaced-repetition review scheduler"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Stored schedule columns for one item.
#[derive(Args, Debug)]
struct StateArgs {
    /// new | learn | review | relearn
    #[arg(long, default_value = "new")]
    phase: String,

    /// Current interval in days
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    interval: i64,

    /// Current ease factor (omit or 0 for unset)
    #[arg(long)]
    ease: Option<f64>,

    /// Position in the active step ladder
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    step: i64,

    /// Scheduling anchor: RFC3339, or "YYYY-MM-DD HH:MM" in --tz (default: now)
    #[arg(long)]
    now: Option<String>,

    /// IANA zone for --now without an offset (default: config clock.timezone)
    #[arg(long)]
    tz: Option<String>,

    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply one rating and print the new schedule
    Review {
        #[command(flatten)]
        state: StateArgs,

        /// 0=Again 1=Hard 2=Difficult 3=Good 4=Easy
        #[arg(long, short, allow_negative_numbers = true)]
        quality: i64,
    },

    /// Show what every rating would do to a schedule
    Preview {
        #[command(flatten)]
        state: StateArgs,
    },

    /// Replay a review-log CSV and summarize the resulting schedules
    Replay {
        /// CSV with item_kind,item_id,quality,response_ms,reviewed_at
        #[arg(long)]
        csv: PathBuf,

        /// Count items due at this instant (default: now)
        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        tz: Option<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Manage ~/.recall/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
    /// Print the effective config (file + SRS_* overrides)
    Show,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config()?;

    match cli.command {
        Command::Review { state, quality } => {
            let scheduler = build_scheduler(&cfg)?;
            let now = resolve_now(state.now.as_deref(), state.tz.as_deref(), &cfg)?;
            let outcome = scheduler.review_raw(
                now,
                &state.phase,
                state.interval,
                state.ease,
                state.step,
                quality,
            )?;

            if state.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome, now);
            }
        }

        Command::Preview { state } => {
            let scheduler = build_scheduler(&cfg)?;
            let now = resolve_now(state.now.as_deref(), state.tz.as_deref(), &cfg)?;
            let current = ScheduleState::from_raw(&state.phase, state.interval, state.ease, state.step)?;
            let preview = scheduler.preview(now, &current);

            if state.json {
                println!("{}", serde_json::to_string_pretty(&preview)?);
            } else {
                println!("# Preview from {} at {}\n", current.phase, now.to_rfc3339());
                for (q, out) in preview.outcomes.iter().enumerate() {
                    println!(
                        "q={} -> {} step={} ease={:.2} interval={}d due in {}",
                        q,
                        out.phase,
                        out.step_index,
                        out.ease_factor,
                        out.interval_days,
                        humanize(out.due_at - now)
                    );
                }
            }
        }

        Command::Replay { csv, at, tz, json } => {
            if !csv.exists() {
                anyhow::bail!("CSV not found: {}", csv.display());
            }
            let scheduler = build_scheduler(&cfg)?;
            let at = resolve_now(at.as_deref(), tz.as_deref(), &cfg)?;
            let summary = replay::replay(&csv, &scheduler, &cfg.mastery, at)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                replay::print_summary(&summary, at);
            }
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => {
                let effective = config::Config {
                    scheduler: cfg.effective_scheduler(),
                    ..cfg.clone()
                };
                effective
                    .scheduler
                    .validate()
                    .context("effective scheduler config is invalid")?;
                println!("# {}\n", config::config_path()?.display());
                print!("{}", toml::to_string_pretty(&effective)?);
            }
        },
    }

    Ok(())
}

fn build_scheduler(cfg: &config::Config) -> Result<ReviewScheduler> {
    let scheduler = ReviewScheduler::new(cfg.effective_scheduler())
        .context("building scheduler from config + SRS_* environment")?;
    debug!(config = ?scheduler.config(), "scheduler ready");
    Ok(scheduler)
}

fn resolve_now(raw: Option<&str>, tz: Option<&str>, cfg: &config::Config) -> Result<DateTime<Utc>> {
    match raw {
        Some(raw) => {
            let tz = tz.unwrap_or(cfg.clock.timezone.as_str());
            parse_instant(raw, tz).with_context(|| format!("parsing --now {raw:?}"))
        }
        None => Ok(Utc::now()),
    }
}

fn print_outcome(out: &ReviewOutcome, now: DateTime<Utc>) {
    println!("phase:     {}", out.phase);
    println!("step:      {}", out.step_index);
    println!("ease:      {:.2}", out.ease_factor);
    println!("interval:  {}d", out.interval_days);
    println!("due:       {} (in {})", out.due_at.to_rfc3339(), humanize(out.due_at - now));
}

fn humanize(d: chrono::Duration) -> String {
    let minutes = d.num_minutes();
    if minutes < 60 {
        format!("{minutes}m")
    } else if minutes < 60 * 24 {
        format!("{}h", d.num_hours())
    } else {
        format!("{}d", d.num_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn cli_parses_review() {
        let cli = Cli::try_parse_from([
            "recall", "review", "--phase", "review", "--interval", "10", "--ease", "2.5",
            "--quality", "3", "--now", "2026-03-01T09:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Review { state, quality } => {
                assert_eq!(state.phase, "review");
                assert_eq!(state.interval, 10);
                assert_eq!(state.ease, Some(2.5));
                assert_eq!(quality, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn resolve_now_uses_config_zone() {
        let mut cfg = config::Config::default();
        cfg.clock.timezone = "Asia/Tokyo".to_string();
        let now = resolve_now(Some("2026-03-01 09:00"), None, &cfg).unwrap();
        assert_eq!(now, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn humanize_picks_unit() {
        assert_eq!(humanize(Duration::minutes(10)), "10m");
        assert_eq!(humanize(Duration::hours(5)), "5h");
        assert_eq!(humanize(Duration::days(25)), "25d");
    }
}
