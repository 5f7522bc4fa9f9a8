//! zortex CLI: season lifecycle, XP inspection, and notification
//! scheduling/delivery.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use zortex::App;
use zortex_notify::{Channel, LogChannel};

#[derive(Parser)]
#[command(name = "zortex")]
#[command(about = "Personal-knowledge gamification engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding zortex's state files (defaults to ~/.zortex)
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Season lifecycle
    Season {
        #[command(subcommand)]
        action: SeasonAction,
    },
    /// XP ledger inspection
    Xp {
        #[command(subcommand)]
        action: XpAction,
    },
    /// Notification scheduling and delivery
    Notify {
        #[command(subcommand)]
        action: NotifyAction,
    },
    /// Run the persistence and notification loops until interrupted
    Serve,
}

#[derive(Subcommand)]
enum SeasonAction {
    /// Start a new season, ending on the given date (YYYY-MM-DD)
    Start {
        name: String,
        #[arg(long)]
        end: String,
    },
    /// End the active season, archiving it to history
    End,
}

#[derive(Subcommand)]
enum XpAction {
    /// Print current season level and area totals
    Show,
}

#[derive(Subcommand)]
enum NotifyAction {
    /// Deliver every notification due right now
    Tick,
    /// Parse a calendar file and schedule its reminders
    Sync { file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => zortex::app::default_data_dir()?,
    };
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

    let app = App::bootstrap(&data_dir)?;

    match cli.command {
        Commands::Season { action } => run_season(&app, action)?,
        Commands::Xp { action } => run_xp(&app, action),
        Commands::Notify { action } => run_notify(&app, action)?,
        Commands::Serve => run_serve(app).await,
    }

    app.persistence.flush_all().context("failed to flush stores")?;
    Ok(())
}

fn run_season(app: &App, action: SeasonAction) -> anyhow::Result<()> {
    match action {
        SeasonAction::Start { name, end } => {
            let end_date = chrono::NaiveDate::parse_from_str(&end, "%Y-%m-%d")
                .with_context(|| format!("invalid end date {end}"))?;
            app.xp_store.start_season(name.clone(), end_date)?;
            app.bus.emit(zortex_xp::Event::SeasonStarted { name: name.clone() });
            println!("season '{name}' started, ending {end_date}");
        }
        SeasonAction::End => {
            let ended = app.xp_store.end_season()?;
            app.bus.emit(zortex_xp::Event::SeasonEnded { name: ended.clone() });
            println!("season '{ended}' ended");
        }
    }
    Ok(())
}

fn run_xp(app: &App, action: XpAction) {
    match action {
        XpAction::Show => {
            let snapshot = app.xp_store.snapshot();
            println!("season_xp: {}", snapshot.season_xp);
            println!("season_level: {}", snapshot.season_level);
            if let Some(tier) =
                zortex_xp::calculator::current_tier(snapshot.season_level, &app.config.xp.seasons.tiers)
            {
                println!("tier: {}", tier.name);
            }
            for (area, xp) in &snapshot.area_xp {
                println!("area {area}: {xp} xp");
            }
        }
    }
}

fn run_notify(app: &App, action: NotifyAction) -> anyhow::Result<()> {
    match action {
        NotifyAction::Tick => {
            let channels = default_channels();
            let report = app.notify_manager.tick(chrono::Utc::now(), &channels);
            println!(
                "delivered: {}, rescheduled: {}, failed: {}",
                report.delivered.len(),
                report.rescheduled.len(),
                report.failed.len()
            );
        }
        NotifyAction::Sync { file } => {
            let source = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let entries = zortex_calendar::parse(&source)?;
            let count = zortex_notify::sync(
                &app.notify_manager,
                &entries,
                app.config.notifications.calendar.default_advance_minutes as i64,
            );
            println!("scheduled {count} new reminder(s)");
        }
    }
    Ok(())
}

fn default_channels() -> HashMap<String, Arc<dyn Channel>> {
    let mut map: HashMap<String, Arc<dyn Channel>> = HashMap::new();
    map.insert("log".to_string(), Arc::new(LogChannel::default()));
    map
}

async fn run_serve(app: App) {
    let app = Arc::new(app);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let persistence = app.persistence.clone();
    let persistence_task = tokio::spawn(persistence.run(zortex_store::DEFAULT_BATCH_WINDOW, shutdown_rx.clone()));

    let notify_manager = app.notify_manager.clone();
    let interval =
        std::time::Duration::from_secs(app.config.notifications.check_interval_minutes * 60);
    let channels = Arc::new(default_channels());
    let notify_task = tokio::spawn(notify_manager.run(interval, channels, shutdown_rx));

    info!("zortex serve: running, press ctrl-c to stop");
    let _ = tokio::signal::ctrl_c().await;
    let _ = shutdown_tx.send(true);
    let _ = persistence_task.await;
    let _ = notify_task.await;
}
