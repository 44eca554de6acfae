//! tasknag CLI
//!
//! Thin shell over the routing engine. Detectors call `intake` from
//! scripts; an external scheduler (cron, launchd) calls `run-batch`
//! and `run-weekly` at the configured wall-clock times. The engine has
//! no timer of its own.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tasknag::{IntakeOutcome, IntakeRequest, Priority, RouterBuilder, RouterConfig};

#[derive(Parser)]
#[command(name = "tasknag")]
#[command(about = "Priority-routed notifications for your task manager")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Hand one event to the router
    Intake {
        /// Notification text
        message: String,
        /// Priority tier: immediate | batched | weekly | silent
        #[arg(long, short)]
        priority: String,
        /// Event kind, open string space (e.g. blocker_resolved)
        #[arg(long, short = 'k')]
        event_kind: String,
        /// Related entity id
        #[arg(long, short)]
        source: Option<String>,
        /// Extra context, JSON object
        #[arg(long)]
        extra: Option<String>,
        /// Route but skip real channel sends
        #[arg(long)]
        dry_run: bool,
    },
    /// Send the due batched items as one digest
    RunBatch {
        /// Override "now" (RFC 3339), mostly for rehearsing a schedule
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Send the pending weekly report
    RunWeekly {
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the most recent notifications
    Recent {
        #[arg(long, short, default_value = "20")]
        count: usize,
        /// Output JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Write a default config file to edit
    ConfigInit,
    /// Print the effective configuration
    ConfigShow,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Intake {
            message,
            priority,
            event_kind,
            source,
            extra,
            dry_run,
        } => {
            let priority: Priority = priority.parse()?;
            let mut req = IntakeRequest::new(priority, message, event_kind);
            req.source_entity_id = source;
            if let Some(extra) = extra {
                req.extra = Some(serde_json::from_str(&extra)?);
            }

            let (router, _) = RouterBuilder::from_default_config()?.dry_run(dry_run).build()?;
            match router.intake(req)? {
                IntakeOutcome::Created(record) => {
                    println!("created {} (scheduled: {})", record.id, fmt_opt(record.scheduled_for))
                }
                IntakeOutcome::Suppressed => println!("suppressed"),
                IntakeOutcome::Logged => println!("logged"),
            }
        }
        Commands::RunBatch { at, dry_run } => {
            let now = parse_at(at)?;
            let (_, processor) = RouterBuilder::from_default_config()?.dry_run(dry_run).build()?;
            let sent = processor.run_batch(now)?;
            println!("sent {} batched notification(s)", sent);
        }
        Commands::RunWeekly { at, dry_run } => {
            let now = parse_at(at)?;
            let (_, processor) = RouterBuilder::from_default_config()?.dry_run(dry_run).build()?;
            if processor.run_weekly(now)? {
                println!("weekly report sent");
            } else {
                println!("nothing to send");
            }
        }
        Commands::Recent { count, json } => {
            let config = RouterConfig::load()?;
            let store = tasknag::NotificationStore::new(config.data_dir().join("notifications.jsonl"));
            for record in store.read_recent(count) {
                if json {
                    println!("{}", serde_json::to_string(&record)?);
                } else {
                    println!(
                        "{}  {:<9}  {:<20}  {}  {}",
                        record.created_at.format("%Y-%m-%d %H:%M"),
                        record.priority.to_string(),
                        record.context.event_kind,
                        if record.sent_at.is_some() { "sent" } else { "pending" },
                        record.message
                    );
                }
            }
        }
        Commands::ConfigInit => {
            let path = RouterConfig::config_path();
            if path.exists() {
                anyhow::bail!("config already exists at {}", path.display());
            }
            RouterConfig::default().save()?;
            println!("wrote {}", path.display());
        }
        Commands::ConfigShow => {
            let config = RouterConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn parse_at(at: Option<String>) -> Result<DateTime<Utc>> {
    match at {
        Some(s) => Ok(DateTime::parse_from_rfc3339(&s)?.with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

fn fmt_opt(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "now".to_string())
}
