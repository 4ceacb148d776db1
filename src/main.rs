//! tillflow - ECR receipt-stream summariser
//!
//! Reads the register's printer stream off the serial line, reconstructs
//! transactions, and appends one summary row per business hour to the
//! per-day site CSV.
//!
//! ## Environment Variables
//!
//! - ECR_DIALECT - 420 or 520 (default 420; marker file config/520 overrides)
//! - SERIAL_PORT - serial device (default /dev/ttyS0)
//! - OPENING_HOUR / CLOSING_HOUR - business hours gate (default 6 / 23)
//! - QUIET_SECONDS - inactivity threshold for the clock-based flush (default 1200)
//! - SINGLE_ITEM_CAP - reject item prices at or above this (default 200)
//! - CURRENCY_SYMBOL - default £
//! - MONITOR_MODE - persist raw chunks, skip parsing (default false)
//! - LOGGING_ENABLED - send log output to tillflow.log (default false)
//! - PLU_CATALOG_PATH / SHOPS_CSV_PATH / OUTPUT_DIR / CHECKPOINT_DIR / CAPTURE_PATH
//! - RUST_LOG - logging level (optional, default: info)

use chrono::Local;
use std::time::Duration;
use tillflow::catalog::PluCatalog;
use tillflow::config::Config;
use tillflow::engine_core::{Checkpointer, Engine, EngineOptions, RawCaptureWriter, RowWriter};
use tillflow::gate::BusinessHours;
use tillflow::serial::{ChunkSource, SerialChunkSource};
use tillflow::sites::{local_hostname, SiteMap};
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::sleep;

fn init_logger(config: &Config) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if config.logging_enabled {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("tillflow.log")
        {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open tillflow.log ({}); logging to stderr", e);
                builder.target(env_logger::Target::Stderr);
            }
        }
    } else {
        builder.target(env_logger::Target::Stderr);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let config = Config::from_env()?;
    init_logger(&config);

    log::info!("🚀 Starting tillflow");
    log::info!("   Dialect: {}", config.dialect.as_str());
    log::info!("   Serial port: {} @ {}", config.serial_port, config.dialect.baud_rate());
    log::info!("   Hours: {:02}:00-{:02}:00", config.opening_hour, config.closing_hour);
    log::info!("   Output dir: {}", config.output_dir.display());
    if config.monitor_mode {
        log::info!("   Monitor mode: raw capture to {}", config.capture_path.display());
    }

    let catalog = PluCatalog::load(&config.plu_catalog_path)?;
    let sites = SiteMap::load(&config.shops_csv_path)?;
    let hostname = local_hostname();
    let site_id = sites.resolve(&hostname);
    log::info!("   Site: {} (host '{}')", site_id, hostname);

    let source = SerialChunkSource::open(&config.serial_port, config.dialect)?;

    log::info!("✅ Pipeline configured, reading stream...");
    run(config, catalog, site_id, source).await
}

async fn run(
    config: Config,
    catalog: PluCatalog,
    site_id: String,
    mut source: impl ChunkSource,
) -> Result<(), Box<dyn std::error::Error>> {
    let gate = BusinessHours::new(config.opening_hour, config.closing_hour);
    let mut engine = Engine::new(
        EngineOptions::from(&config),
        catalog,
        Checkpointer::new(&config.checkpoint_dir),
        RowWriter::new(
            &config.output_dir,
            &site_id,
            Duration::from_secs(config.quiet_seconds.max(0) as u64),
        ),
    );
    let mut capture = config
        .monitor_mode
        .then(|| RawCaptureWriter::new(&config.capture_path));

    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut idle = false;

    loop {
        let now = Local::now().naive_local();

        if !gate.is_open(now) {
            if !idle {
                log::info!("🌙 Closing time, entering idle");
                engine.enter_idle();
                idle = true;
            }
            // Check once per minute so opening is picked up promptly.
            tokio::select! {
                _ = sleep(Duration::from_secs(60)) => {}
                _ = usr1.recv() => engine.dump(),
            }
            continue;
        }
        if idle {
            log::info!("☀️ Opening time, resuming");
            idle = false;
        }

        // At most one chunk per iteration; a read failure is logged and the
        // loop carries on with the line treated as quiet.
        let chunk = match source.next_chunk().await {
            Ok(chunk) => chunk,
            Err(e) => {
                log::error!("Serial read failed: {}", e);
                None
            }
        };

        match capture.as_mut() {
            Some(capture) => {
                if let Some(raw) = &chunk {
                    if let Err(e) = capture.capture(now, raw) {
                        log::warn!("Raw capture write failed: {}", e);
                    }
                }
            }
            None => engine.tick(chunk.as_deref()),
        }

        tokio::select! {
            _ = sleep(Duration::from_millis(200)) => {}
            _ = usr1.recv() => engine.dump(),
        }
    }
}
