//! Thin demonstration binary: builds a `ScanConfig` from the process
//! environment, runs the Orchestrator, narrates its Event Channel to
//! stdout, and prints the final Device Record snapshot as JSON.
//!
//! This binary does no flag parsing of its own — `ScanConfig` is this
//! crate's only configuration surface, and a real deployment populates it
//! from a CLI layer and/or `$HOME/.nscancfg.json` that lives outside this
//! crate. Here we read a handful of env vars as a stand-in for that layer.

use std::env;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use tokio::sync::oneshot;
use tracing::{error, info};

use netcensus::config::{ScanConfig, ScanLevel};
use netcensus::events::{Event, EventBus};
use netcensus::orchestrator::Orchestrator;

fn config_from_env() -> ScanConfig {
    let mut cfg = ScanConfig::default();

    if let Ok(cidr) = env::var("NETCENSUS_CIDR") {
        cfg.target_cidr = Some(cidr);
    }
    if let Ok(iface) = env::var("NETCENSUS_INTERFACE") {
        cfg.interface = Some(iface);
    }
    if let Ok(level) = env::var("NETCENSUS_LEVEL") {
        if let Some(parsed) = ScanLevel::parse(&level) {
            cfg.scan_level = parsed;
        } else {
            error!(level = %level, "unrecognised NETCENSUS_LEVEL, keeping default");
        }
    }
    if env::var("NETCENSUS_PASSIVE_ONLY").is_ok() {
        cfg.passive_only = true;
    }
    if env::var("NETCENSUS_WATCH").is_ok() {
        cfg.watch = true;
    }
    if env::var("NETCENSUS_NO_IPV6").is_ok() {
        cfg.ipv6_enabled = false;
    }

    cfg
}

async fn narrate(mut rx: tokio::sync::broadcast::Receiver<Event>) {
    loop {
        match rx.recv().await {
            Ok(Event::ScanStarted) => info!("scan started"),
            Ok(Event::PhaseChange { phase }) => info!(phase, "entering phase"),
            Ok(Event::Progress { phase, scanned, total, message }) => {
                info!(phase, scanned, total, message = %message, "progress")
            }
            Ok(Event::DeviceDiscovered(record)) => {
                info!(mac = ?record.mac, ipv4 = ?record.ipv4, "device discovered")
            }
            Ok(Event::DeviceUpdated(record)) => {
                info!(mac = ?record.mac, ipv4 = ?record.ipv4, "device updated")
            }
            Ok(Event::DeviceEnriched(record)) => {
                info!(mac = ?record.mac, usage = ?record.usage, "device enriched")
            }
            Ok(Event::ScanCompleted { stats, .. }) => {
                info!(devices = stats.devices_found, elapsed_ms = stats.elapsed_ms, "scan completed");
                break;
            }
            Ok(Event::ScanError { message }) => error!(%message, "scan error"),
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                error!(skipped, "event observer lagged, events dropped")
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = config_from_env();
    let events = Arc::new(EventBus::default());
    let narrator = tokio::spawn(narrate(events.subscribe()));

    let (stop_tx, stop_rx) = oneshot::channel();
    let stop_tx = Arc::new(Mutex::new(Some(stop_tx)));
    ctrlc::set_handler(move || {
        if let Some(tx) = stop_tx.lock().unwrap().take() {
            let _ = tx.send(());
        }
    })
    .context("failed to install Ctrl+C handler")?;

    let orchestrator = Orchestrator::new(cfg, events.clone());
    let records = orchestrator
        .run(stop_rx)
        .await
        .context("scan failed to initialise")?;

    let _ = narrator.await;

    let json = serde_json::to_string_pretty(&records).context("failed to serialise records")?;
    println!("{json}");

    Ok(())
}
