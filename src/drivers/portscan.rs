//! Active port-scanner driver. Two phases: an ICMP ping sweep to find live
//! hosts (reusing the raw-socket echo logic below), then a detailed
//! external-tool pass on each live host whose stdout is fed to the pure
//! `parsers::portscan` parser.

use std::mem::MaybeUninit;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info_span, warn};

use crate::config::ScanConfig;
use crate::error::DriverError;
use crate::events::{Event, EventBus};
use crate::model::{Observation, Protocol, ServiceDescriptor, Source};
use crate::parsers::portscan::PortScanParser;

/// A curated, descending-popularity subset of ports (the crate's analogue
/// of nmap's top-1000 list) used at the "thorough" scan level.
pub const TOP_1000_PORTS: &[u16] = &[
    80, 23, 443, 21, 22, 25, 3389, 110, 445, 139, 143, 53, 135, 3306, 8080, 1723, 111, 995, 993,
    5900, 1025, 587, 8888, 199, 1720, 465, 548, 113, 81, 6001, 10000, 514, 5060, 179, 1026, 2000,
    8443, 8000, 32768, 554, 26, 1433, 49152, 2001, 515, 8008, 49154, 1027, 5666, 646, 5000, 5631,
    631, 49153, 8081, 2049, 88, 79, 5800, 106, 2121, 1110, 49155, 6000, 513, 990, 5357, 427, 49156,
    543, 544, 5101, 144, 7, 389, 8009, 3128, 444, 9999, 5009, 7070, 5190, 3000, 5432, 1900, 3986,
    13, 1029, 9, 5051, 6646, 49157, 1028, 873, 1755, 2717, 4899, 9100, 119, 37, 6646, 8010, 9200,
    6379, 27017, 5353, 161, 162, 500, 4500, 5938, 5222, 3478, 3479, 3074, 9295, 9296, 9297, 8009,
];

pub struct PortScanDriver {
    cfg: ScanConfig,
    tx: mpsc::Sender<Observation>,
    events: Option<Arc<EventBus>>,
}

impl PortScanDriver {
    pub fn new(cfg: ScanConfig, tx: mpsc::Sender<Observation>) -> Self {
        Self { cfg, tx, events: None }
    }

    /// Same as [`Self::new`] but publishes `Event::Progress` on `events` as
    /// each host's detailed scan completes.
    pub fn with_events(cfg: ScanConfig, tx: mpsc::Sender<Observation>, events: Arc<EventBus>) -> Self {
        Self { cfg, tx, events: Some(events) }
    }

    /// Runs the ping sweep + detailed pass over every host address in
    /// `targets`. Errors invoking the external tool are logged and
    /// degrade that single host's scan rather than aborting the driver.
    pub async fn run(&self, targets: Vec<IpAddr>) -> Result<(), DriverError> {
        let span = info_span!("driver", source = "portscan");
        let _enter = span.enter();

        let live_hosts = self.ping_sweep(targets).await;
        debug!(count = live_hosts.len(), "ping sweep found live hosts");

        let ports = self.cfg.scan_level.ports();
        let concurrency = self.cfg.concurrent_host_scans.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let total = live_hosts.len();
        let scanned = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        if let Some(events) = &self.events {
            events.publish(Event::Progress {
                phase: "phase2",
                scanned: 0,
                total,
                message: "detailed port scan starting".to_string(),
            });
        }

        for ip in live_hosts {
            let sem = semaphore.clone();
            let tx = self.tx.clone();
            let ports = ports.to_vec();
            let timeout = Duration::from_secs(self.cfg.scan_level.host_timeout_secs());
            let os_detection = self.cfg.scan_level.os_detection();
            let scanned = scanned.clone();
            let events = self.events.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire().await;
                if let Err(err) = scan_one_host(ip, &ports, timeout, os_detection, &tx).await {
                    warn!(%ip, error = %err, "detailed port scan failed for host");
                }
                let done = scanned.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(events) = &events {
                    events.publish(Event::Progress {
                        phase: "phase2",
                        scanned: done,
                        total,
                        message: format!("scanned {ip}"),
                    });
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        Ok(())
    }

    async fn ping_sweep(&self, targets: Vec<IpAddr>) -> Vec<IpAddr> {
        let semaphore = Arc::new(Semaphore::new(self.cfg.concurrent_host_scans.max(1)));
        let mut handles = Vec::with_capacity(targets.len());

        for ip in targets {
            if let IpAddr::V4(ipv4) = ip {
                let sem = semaphore.clone();
                handles.push(tokio::task::spawn_blocking(move || {
                    let rt = tokio::runtime::Handle::current();
                    let _permit = rt.block_on(sem.acquire());
                    if ping_once(ipv4, Duration::from_millis(800)) {
                        Some(IpAddr::V4(ipv4))
                    } else {
                        None
                    }
                }));
            }
        }

        let mut alive = Vec::new();
        for handle in handles {
            if let Ok(Some(ip)) = handle.await {
                alive.push(ip);
            }
        }
        alive
    }
}

/// Sends one raw ICMP echo request and waits for a reply. Kept minimal
/// since the driver only needs a liveness signal, not RTT/TTL.
fn ping_once(ip: Ipv4Addr, timeout: Duration) -> bool {
    let Ok(socket) = Socket::new(Domain::IPV4, Type::RAW, Some(SockProtocol::ICMPV4)) else {
        return false;
    };
    let _ = socket.set_read_timeout(Some(timeout));
    let _ = socket.set_write_timeout(Some(timeout));

    let packet = build_echo_request(std::process::id() as u16, 1);
    let addr = SocketAddr::new(IpAddr::V4(ip), 0);
    if socket.send_to(&packet, &addr.into()).is_err() {
        return false;
    }

    let start = Instant::now();
    let mut buffer: [MaybeUninit<u8>; 1024] = unsafe { MaybeUninit::uninit().assume_init() };
    match socket.recv(&mut buffer) {
        Ok(len) if len >= 28 && start.elapsed() <= timeout => {
            let buffer: &[u8] =
                unsafe { std::slice::from_raw_parts(buffer.as_ptr() as *const u8, len) };
            buffer[20] == 0
        }
        _ => false,
    }
}

fn build_echo_request(identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; 8];
    packet[0] = 8;
    packet[4] = (identifier >> 8) as u8;
    packet[5] = (identifier & 0xff) as u8;
    packet[6] = (sequence >> 8) as u8;
    packet[7] = (sequence & 0xff) as u8;
    let checksum = icmp_checksum(&packet);
    packet[2] = (checksum >> 8) as u8;
    packet[3] = (checksum & 0xff) as u8;
    packet
}

fn icmp_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;
    while i < data.len() {
        let word = if i + 1 < data.len() {
            ((data[i] as u32) << 8) | (data[i + 1] as u32)
        } else {
            (data[i] as u32) << 8
        };
        sum = sum.wrapping_add(word);
        i += 2;
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !sum as u16
}

/// Invokes the external port-scanning tool against a single host and
/// emits one Observation per host with whatever ports/services/OS guess
/// its output yielded.
async fn scan_one_host(
    ip: IpAddr,
    ports: &[u16],
    timeout: Duration,
    os_detection: bool,
    tx: &mpsc::Sender<Observation>,
) -> Result<(), DriverError> {
    let port_spec = ports
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut args = vec!["-p".to_string(), port_spec, "-Pn".to_string()];
    if os_detection {
        args.push("-O".to_string());
    }
    args.push(ip.to_string());

    let output = tokio::time::timeout(timeout, Command::new("nmap").args(&args).output())
        .await
        .map_err(|_| DriverError::Timeout)?
        .map_err(|e| DriverError::Spawn {
            tool: "nmap".to_string(),
            source: e,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut parser = PortScanParser::new();
    parser.feed(&stdout);

    for host in parser.finish() {
        let mut obs = Observation::new(Source::PortScan, now());
        obs.ipv4 = Some(host.ip.clone());
        obs.os_hint = host.os_guess.clone();
        obs.mac = host.mac.clone();
        obs.manufacturer_hint = host.manufacturer.clone();
        obs.hostname = host.hostname.clone();
        obs.workgroup = host.workgroup.clone();
        obs.fqdn = host.fqdn.clone();
        for finding in &host.ports {
            obs.ports.push(finding.port);
            obs.services.push(ServiceDescriptor {
                port: finding.port,
                protocol: if finding.protocol == "udp" {
                    Protocol::Udp
                } else {
                    Protocol::Tcp
                },
                service_name: finding.service_name.clone(),
                version: finding.version.clone(),
            });
        }
        let _ = tx.send(obs).await;
    }

    Ok(())
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_1000_ports_is_nonempty_and_contains_common_ports() {
        assert!(TOP_1000_PORTS.contains(&80));
        assert!(TOP_1000_PORTS.contains(&443));
        assert!(TOP_1000_PORTS.contains(&22));
        assert!(!TOP_1000_PORTS.is_empty());
    }

    #[test]
    fn echo_request_checksum_is_nonzero() {
        let packet = build_echo_request(1, 1);
        let checksum = ((packet[2] as u16) << 8) | packet[3] as u16;
        assert!(checksum > 0);
    }
}
