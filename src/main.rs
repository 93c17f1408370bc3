//! sensor-summary: ingest change-capture events and query sensor summaries
//!
//! Usage:
//!   sensor-summary [--config <file>] ingest
//!       Reads newline-delimited change events from stdin and applies them.
//!   sensor-summary [--config <file>] query <sensor-id> [types] [kinds]
//!       Prints the summary as JSON (`null` for an unknown sensor).
//!       `types`/`kinds` are comma separated, e.g. `temperature,humidity`
//!       and `min,max`; omit or pass `-` for all.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use sensor_summary::config::{ServiceConfig, StoreBackend, StoreConfig};
use sensor_summary::observability::init_tracing;
use sensor_summary::{
    CdcEventConsumer, InMemoryStore, MeasurementType, RedisStore, StoreSummaryRepository,
    SummaryRepository, SummaryStore, SummaryType,
};

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

type Repository = StoreSummaryRepository<Box<dyn SummaryStore>>;

enum Mode {
    Ingest,
    Query {
        sensor_id: u64,
        measurement_types: Vec<MeasurementType>,
        summary_types: Vec<SummaryType>,
    },
}

struct Args {
    config: Option<PathBuf>,
    mode: Mode,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut config = None;
    let mut positional = Vec::new();
    while let Some(arg) = args.next() {
        if arg == "--config" {
            config = Some(PathBuf::from(args.next().ok_or("--config requires a path")?));
        } else {
            positional.push(arg);
        }
    }

    let mode = match positional.first().map(String::as_str) {
        Some("ingest") => Mode::Ingest,
        Some("query") => {
            let sensor_id = positional
                .get(1)
                .ok_or("query requires a sensor id")?
                .parse()
                .map_err(|_| "sensor id must be a non-negative integer")?;
            Mode::Query {
                sensor_id,
                measurement_types: parse_filter(positional.get(2))?,
                summary_types: parse_filter(positional.get(3))?,
            }
        }
        Some(other) => return Err(format!("unknown command: {}", other)),
        None => return Err("expected `ingest` or `query`".to_string()),
    };

    Ok(Args { config, mode })
}

fn parse_filter<T: std::str::FromStr<Err = String>>(arg: Option<&String>) -> Result<Vec<T>, String> {
    match arg.map(String::as_str) {
        None | Some("") | Some("-") => Ok(Vec::new()),
        Some(list) => list.split(',').map(|s| s.trim().parse()).collect(),
    }
}

fn build_store(config: &StoreConfig) -> sensor_summary::Result<Box<dyn SummaryStore>> {
    match config.backend {
        StoreBackend::Memory => {
            warn!("using in-memory store; state is lost on exit");
            Ok(Box::new(InMemoryStore::new()))
        }
        StoreBackend::Redis => {
            let store = RedisStore::connect(config.redis())?;
            info!(addr = %config.redis_addr, pool_size = config.pool_size, "connected to store");
            Ok(Box::new(store))
        }
    }
}

async fn run_ingest(
    consumer: Arc<CdcEventConsumer<Repository>>,
    workers: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let worker_permits = u32::try_from(workers)?;
    let permits = Arc::new(Semaphore::new(workers));
    let unavailable = Arc::new(AtomicU64::new(0));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut received = 0u64;

    while let Some(line) = lines.next_line().await? {
        let message = line.trim().to_string();
        if message.is_empty() {
            continue;
        }
        received += 1;

        let permit = permits.clone().acquire_owned().await?;
        let consumer = consumer.clone();
        let unavailable = unavailable.clone();
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            // Failures are counted and logged by the consumer; outages are
            // tracked separately from bad messages.
            if let Err(e) = consumer.handle(&message) {
                if e.is_unavailable() {
                    unavailable.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
    }

    // Every worker holds a permit until it finishes.
    let _all = permits.acquire_many(worker_permits).await?;

    let (applied, skipped, failed) = consumer.stats().snapshot();
    let unavailable = unavailable.load(Ordering::Relaxed);
    if unavailable > 0 {
        error!(unavailable, "observations lost to store outages");
    }
    info!(received, applied, skipped, failed, "ingest finished");
    println!(
        "{}",
        serde_json::json!({
            "received": received,
            "applied": applied,
            "skipped": skipped,
            "failed": failed,
            "unavailable": unavailable,
        })
    );
    Ok(())
}

fn run_query(
    repository: &Repository,
    sensor_id: u64,
    measurement_types: &[MeasurementType],
    summary_types: &[SummaryType],
) -> sensor_summary::Result<()> {
    let summary = repository.find_by_sensor_id(sensor_id, measurement_types, summary_types)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("usage: sensor-summary [--config <file>] ingest");
            eprintln!("       sensor-summary [--config <file>] query <sensor-id> [types] [kinds]");
            std::process::exit(2);
        }
    };

    let config = ServiceConfig::load(args.config.as_deref())?;
    init_tracing(&config.log)?;

    let store = build_store(&config.store)?;
    let repository = StoreSummaryRepository::new(store);

    match args.mode {
        Mode::Ingest => {
            info!(workers = config.ingest.workers, "ingesting change events from stdin");
            let consumer = Arc::new(CdcEventConsumer::new(repository));
            run_ingest(consumer, config.ingest.workers).await
        }
        Mode::Query {
            sensor_id,
            measurement_types,
            summary_types,
        } => {
            // Store calls block; keep them off the runtime threads
            tokio::task::spawn_blocking(move || {
                run_query(&repository, sensor_id, &measurement_types, &summary_types)
            })
            .await??;
            Ok(())
        }
    }
}
