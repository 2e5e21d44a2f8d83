//! Neighbour-table driver (ARP/NDP). One-shot: invokes the platform
//! neighbour tool, feeds its stdout to the pure parser, and emits one
//! Observation per discovered entry. For IPv6, primes the neighbour cache
//! first with a small ICMPv6 echo to `ff02::1`.

use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{info_span, warn};

use crate::model::{Ipv6Address, Observation, Source};
use crate::parsers::neighbour;

pub struct NeighbourTableDriver {
    tx: mpsc::Sender<Observation>,
    interface: Option<String>,
}

impl NeighbourTableDriver {
    pub fn new(tx: mpsc::Sender<Observation>, interface: Option<String>) -> Self {
        Self { tx, interface }
    }

    /// Reads the IPv4 ARP table and emits one Observation per entry.
    /// Failure to invoke the platform tool is logged and the driver
    /// completes with zero Observations.
    pub async fn run_arp(&self) {
        let span = info_span!("driver", source = "arp");
        let _enter = span.enter();

        match run_tool("ip", &["neigh", "show"]).await {
            Ok(output) => self.emit_entries(&output, Source::Arp).await,
            Err(_) => match run_tool("arp", &["-a"]).await {
                Ok(output) => self.emit_entries(&output, Source::Arp).await,
                Err(err) => warn!(error = %err, "neighbour tool unavailable, arp driver idle"),
            },
        }
    }

    /// Primes the IPv6 neighbour cache with a link-local multicast echo,
    /// then reads the resulting NDP entries.
    pub async fn run_ndp(&self) {
        let span = info_span!("driver", source = "ndp");
        let _enter = span.enter();

        self.prime_ndp_cache().await;

        match run_tool("ip", &["-6", "neigh", "show"]).await {
            Ok(output) => self.emit_entries(&output, Source::Ndp).await,
            Err(err) => warn!(error = %err, "ndp neighbour tool unavailable"),
        }
    }

    async fn prime_ndp_cache(&self) {
        let mut args = vec!["-6".to_string(), "-c".to_string(), "1".to_string()];
        if let Some(iface) = &self.interface {
            args.push("-I".to_string());
            args.push(iface.clone());
        }
        args.push("ff02::1".to_string());
        let _ = run_tool("ping", &args.iter().map(String::as_str).collect::<Vec<_>>()).await;
    }

    async fn emit_entries(&self, output: &str, source: Source) {
        for entry in neighbour::parse(output) {
            if !entry.reachable {
                continue;
            }
            // The IPv4 neighbour-table parser discards broadcast-MAC rows
            // outright; NDP carries no such exclusion.
            if source == Source::Arp && entry.mac == "FF:FF:FF:FF:FF:FF" {
                continue;
            }
            let mut obs = Observation::new(source, now());
            if entry.ip.contains(':') {
                obs.ipv6 = vec![Ipv6Address::new(&entry.ip)];
            } else {
                obs.ipv4 = Some(entry.ip.clone());
            }
            obs.mac = Some(entry.mac.clone());
            let _ = self.tx.send(obs).await;
        }
    }
}

async fn run_tool(tool: &str, args: &[&str]) -> std::io::Result<String> {
    let output = Command::new(tool).args(args).output().await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
