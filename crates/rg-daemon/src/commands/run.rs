//! Run command: the sampling thread plus the HTTP API.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use anyhow::{Context, Result};
use rg_core::{Collector, GpioSensor, SysfsGpio, clock};
use tokio::signal;
use tracing::{error, info, warn};

use super::open_database;
use crate::Config;
use crate::http::{AppState, HttpServer};

/// Starts the daemon and blocks until SIGINT or SIGTERM.
pub fn run(config: &Config) -> Result<()> {
    let settings = config.validate()?;

    // The collector writes through its own connection; handlers read through a second one.
    let writer = open_database(config)?;
    let reader = open_database(config)?;

    let gpio = SysfsGpio::new(&config.gpio_root, config.gpio_base);
    let sensor = GpioSensor::open(gpio, settings.sensor_line)
        .with_context(|| format!("failed to allocate sensor line {}", settings.sensor_line))?;

    let mut collector = Collector::new(writer, sensor, settings.collector.clone());
    match collector.hydrate(clock::now_secs()) {
        Ok(hydration) => info!(
            minutes = hydration.minutes,
            hours = hydration.hours,
            "loaded stored rain"
        ),
        Err(err) => warn!(%err, "unable to load stored rain, starting with empty buckets"),
    }
    let view = collector.view();

    let shutdown = Arc::new(AtomicBool::new(false));
    let sampler = thread::Builder::new()
        .name("rain-collector".to_string())
        .spawn({
            let shutdown = shutdown.clone();
            move || collector.run(&shutdown)
        })
        .context("failed to spawn collector thread")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build async runtime")?;
    let server = HttpServer::new(settings.listen_addr, AppState::new(view, reader));
    let result = runtime.block_on(server.run(shutdown_signal()));

    shutdown.store(true, Ordering::Relaxed);
    if sampler.join().is_err() {
        error!("collector thread panicked");
    }
    result
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown requested");
}
