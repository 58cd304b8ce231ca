use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use dealwatch::cli::{Cli, Commands};
use dealwatch::models::ScheduleContinuation;
use dealwatch::plugins::adapters::extract_page;
use dealwatch::plugins::NotificationDispatcher;
use dealwatch::pricing::format_price;
use dealwatch::scheduler::{CronDelayQueue, Worker};
use dealwatch::scraper::{ChromeFetcher, PageFetcher};
use dealwatch::storage::{PriceLedger, SqliteStore, TargetStore};
use dealwatch::utils::telemetry::init_tracing;
use dealwatch::{AppConfig, CycleReport, Monitor};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let _log_guard = init_tracing(&config.logging)?;

    let store = Arc::new(
        SqliteStore::connect(&config.database)
            .await
            .context("Failed to open database")?,
    );
    let fetcher = Arc::new(ChromeFetcher::new(config.scraper.clone()));
    let (queue, mut receiver) = CronDelayQueue::new().await?;
    let queue = Arc::new(queue);

    let monitor = Arc::new(
        Monitor::new(
            store.clone(),
            store.clone(),
            fetcher.clone(),
            NotificationDispatcher::from_config(&config.notifications),
            queue.clone(),
            &config.scheduler,
        )
        .with_concurrency(config.scraper.max_concurrent_checks),
    );

    match cli.command {
        Commands::Run => {
            info!("Starting Dealwatch...");
            queue.start().await?;
            let resumed = monitor.resume_all().await?;
            info!(targets = resumed, "Monitoring resumed");

            let worker = Worker::new(Arc::clone(&monitor), config.scraper.max_concurrent_checks);
            let worker_handle = tokio::spawn(worker.run(receiver));

            tokio::signal::ctrl_c().await?;
            info!("Shutting down...");
            queue.shutdown().await?;
            worker_handle.abort();

            let stats = monitor.get_stats().await;
            info!(
                completed = stats.completed_runs,
                failed = stats.failed_runs,
                uptime_secs = stats.uptime_seconds,
                "Scheduler stopped"
            );
        }
        Commands::Track { url, target_price, owner } => {
            let target = monitor.track(&owner, &url, target_price).await?;
            println!("Tracking {} as {}", target.url, target.id);
            // The first continuation is due now; run it here. The daemon picks the
            // target up on its next start.
            if let Some(first) = drain_immediate(&mut receiver) {
                print_report(&monitor.run_cycle(&first).await);
            }
        }
        Commands::Untrack { id } => {
            if monitor.untrack(&id).await? {
                println!("Deleted {}", id);
            } else {
                println!("No target with id {}", id);
            }
        }
        Commands::List => {
            let targets = store.list_targets().await?;
            if targets.is_empty() {
                println!("No tracked targets");
            }
            for target in targets {
                let current = store.latest(&target.id).await?.map(|o| o.price);
                let threshold = target
                    .target_price
                    .map(|p| format_price(Some(p)))
                    .unwrap_or_else(|| "unset".to_string());
                println!(
                    "{}  {:>12}  target {:>10}  {}  ({})",
                    target.id,
                    format_price(current),
                    threshold,
                    target.url,
                    target.owner_id
                );
            }
        }
        Commands::Check { id: Some(id) } => {
            print_report(&monitor.check_now(&id).await?);
        }
        Commands::Check { id: None } => {
            let summary = monitor.check_all().await?;
            println!(
                "Checked {}, notified {}, failed {}",
                summary.checked, summary.notified, summary.failed
            );
        }
        Commands::Extract { url } => {
            let rendered = fetcher.fetch(&url).await?;
            let (adapter, result) = extract_page(&url, &rendered.html);
            println!("adapter: {}", adapter);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}

fn drain_immediate(receiver: &mut mpsc::UnboundedReceiver<ScheduleContinuation>) -> Option<ScheduleContinuation> {
    receiver.try_recv().ok()
}

fn print_report(report: &CycleReport) {
    println!("{}: {}", report.extraction.title, report.extraction.price_text);
    if let Some(threshold) = report.threshold {
        println!("  target price {}", format_price(Some(threshold)));
    }
    if report.notified {
        println!("  notification sent");
    }
    for failure in &report.failures {
        println!("  {} error: {}", failure.kind, failure.message);
    }
}
