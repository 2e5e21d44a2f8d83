//! Passive packet-capture driver. Long-running: spawns the platform
//! sniffer with a filter covering ARP, IPv4/IPv6, DHCP/DHCPv6, ICMPv6, and
//! NetBIOS name service traffic, streams its stdout through the pure
//! `parsers::capture` line parser, and emits Observations continuously
//! until `stop()` is called.
//!
//! A MAC→hostname side-table learnt from DHCP/NetBIOS traffic enriches
//! later frame Observations by emitting an *additional* Observation,
//! never by mutating the Correlator's store directly.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};
use tracing::{info_span, warn};

use crate::model::{Observation, Source};
use crate::parsers::capture::{parse_line, CaptureKind};

const CAPTURE_FILTER: &str =
    "arp or ip or ip6 or (udp and (port 67 or port 68 or port 546 or port 547 or port 137)) or icmp6";

pub struct CaptureDriver {
    tx: mpsc::Sender<Observation>,
    interface: Option<String>,
    hostname_table: Arc<Mutex<HashMap<String, String>>>,
}

impl CaptureDriver {
    pub fn new(tx: mpsc::Sender<Observation>, interface: Option<String>) -> Self {
        Self {
            tx,
            interface,
            hostname_table: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Runs until `stop_rx` resolves or the child process exits on its
    /// own. Intended to be spawned as its own task by the Orchestrator.
    pub async fn run(&self, mut stop_rx: tokio::sync::oneshot::Receiver<()>) {
        let span = info_span!("driver", source = "capture");
        let _enter = span.enter();

        let mut args = vec!["-l".to_string(), "-n".to_string()];
        if let Some(iface) = &self.interface {
            args.push("-i".to_string());
            args.push(iface.clone());
        }
        args.push(CAPTURE_FILTER.to_string());

        let mut child = match Command::new("tcpdump")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(err) => {
                warn!(error = %err, "tcpdump unavailable, capture driver idle");
                return;
            }
        };

        let Some(stdout) = child.stdout.take() else {
            return;
        };
        let mut lines = BufReader::new(stdout).lines();

        loop {
            tokio::select! {
                _ = &mut stop_rx => {
                    terminate(&mut child).await;
                    break;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => self.handle_line(&line).await,
                        Ok(None) => break,
                        Err(_) => break,
                    }
                }
            }
        }
    }

    async fn handle_line(&self, line: &str) {
        let Some(record) = parse_line(line) else {
            return;
        };

        // DHCP and NetBIOS traffic are the only sources that name a host
        // alongside its MAC; learn the pairing so later frames bearing
        // only that MAC (no hostname) can be enriched via a fresh
        // Observation, never a direct store mutation.
        let learns_hostname = matches!(
            record.kind,
            Some(CaptureKind::Dhcp4Request) | Some(CaptureKind::Dhcp6Request) | Some(CaptureKind::NetBiosNameQuery)
        );
        if learns_hostname {
            let hostname = record.hostname.clone().or_else(|| record.fqdn.clone());
            if let (Some(mac), Some(hostname)) = (&record.mac, hostname) {
                self.hostname_table.lock().await.insert(mac.clone(), hostname);
            }
        }

        let mut obs = Observation::new(Source::PacketCapture, now());
        obs.mac = record.mac.clone();
        obs.ipv4 = record.ipv4.clone();
        obs.ipv6 = record
            .ipv6
            .iter()
            .map(|addr| crate::model::Ipv6Address::new(addr))
            .collect();
        obs.hostname = record.hostname.clone();
        obs.fqdn = record.fqdn.clone();
        if record.vendor_class.is_some() {
            obs.os_hint = record.vendor_class.clone();
        }

        if obs.hostname.is_none() {
            if let Some(mac) = &obs.mac {
                if let Some(known) = self.hostname_table.lock().await.get(mac) {
                    obs.hostname = Some(known.clone());
                }
            }
        }

        let has_src_identifier = obs.mac.is_some() || obs.ipv4.is_some() || !obs.ipv6.is_empty();
        if has_src_identifier {
            let _ = self.tx.send(obs).await;
        }

        // A generic frame also names a second device at the destination
        // (when not broadcast/multicast); emit it as its own Observation
        // rather than folding it into the source's record.
        if record.kind == Some(CaptureKind::GenericFrame)
            && (record.dst_mac.is_some() || record.dst_ipv4.is_some() || record.dst_ipv6.is_some())
        {
            let mut dst_obs = Observation::new(Source::PacketCapture, now());
            dst_obs.mac = record.dst_mac.clone();
            dst_obs.ipv4 = record.dst_ipv4.clone();
            if let Some(ipv6) = &record.dst_ipv6 {
                dst_obs.ipv6 = vec![crate::model::Ipv6Address::new(ipv6)];
            }
            if let Some(mac) = &dst_obs.mac {
                if let Some(known) = self.hostname_table.lock().await.get(mac) {
                    dst_obs.hostname = Some(known.clone());
                }
            }
            let _ = self.tx.send(dst_obs).await;
        }
    }
}

async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(id) = child.id() {
            unsafe {
                libc_kill(id as i32);
            }
        }
    }
    let _ = tokio::time::timeout(std::time::Duration::from_secs(2), child.wait()).await;
    let _ = child.kill().await;
}

#[cfg(unix)]
unsafe fn libc_kill(pid: i32) {
    extern "C" {
        fn kill(pid: i32, sig: i32) -> i32;
    }
    const SIGTERM: i32 = 15;
    kill(pid, SIGTERM);
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
