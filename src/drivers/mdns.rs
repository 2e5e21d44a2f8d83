//! mDNS driver. Prefers the platform-native `mdns-sd` browser when
//! present; falls back to a raw multicast query/response loop feeding the
//! pure wire parser in `parsers::mdns`.

use std::net::{IpAddr, Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent};
use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use tokio::sync::mpsc;
use tracing::{info_span, warn};

use crate::model::{Observation, Source};
use crate::parsers::mdns as mdns_parser;

const MDNS_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
const MDNS_PORT: u16 = 5353;

/// A curated set of service types worth browsing for, trimmed to the
/// entries that carry the most usage-classification signal.
const SERVICE_TYPES: &[&str] = &[
    "_services._dns-sd._udp.local.",
    "_http._tcp.local.",
    "_ipp._tcp.local.",
    "_printer._tcp.local.",
    "_afpovertcp._tcp.local.",
    "_smb._tcp.local.",
    "_airplay._tcp.local.",
    "_raop._tcp.local.",
    "_googlecast._tcp.local.",
    "_homekit._tcp.local.",
    "_hap._tcp.local.",
    "_companion-link._tcp.local.",
];

pub struct MdnsDriver {
    tx: mpsc::Sender<Observation>,
    timeout: Duration,
}

impl MdnsDriver {
    pub fn new(tx: mpsc::Sender<Observation>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    pub async fn run(&self) {
        let span = info_span!("driver", source = "mdns");
        let _enter = span.enter();

        match ServiceDaemon::new() {
            Ok(daemon) => self.run_platform_native(daemon).await,
            Err(err) => {
                warn!(error = %err, "mdns-sd daemon unavailable, falling back to raw query");
                self.run_pure_fallback().await;
            }
        }
    }

    async fn run_platform_native(&self, daemon: ServiceDaemon) {
        let deadline = tokio::time::Instant::now() + self.timeout;
        for service_type in SERVICE_TYPES {
            let Ok(receiver) = daemon.browse(service_type) else {
                continue;
            };
            while tokio::time::Instant::now() < deadline {
                let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
                let recv = tokio::task::spawn_blocking({
                    let receiver = receiver.clone();
                    move || receiver.recv_timeout(remaining.min(Duration::from_millis(250)))
                });
                match recv.await {
                    Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                        self.emit_resolved(info.get_hostname(), info.get_addresses().iter().map(|a| a.to_string()).collect(), service_type)
                            .await;
                    }
                    _ => break,
                }
            }
        }
        let _ = daemon.shutdown();
    }

    async fn emit_resolved(&self, hostname: &str, addresses: Vec<String>, service_type: &str) {
        let mut obs = Observation::new(Source::Mdns, now());
        obs.hostname = Some(hostname.trim_end_matches('.').to_string());
        obs.service_types = vec![service_type.trim_end_matches('.').to_string()];
        for addr in addresses {
            if let Ok(ip) = addr.parse::<IpAddr>() {
                match ip {
                    IpAddr::V4(v4) => obs.ipv4 = Some(v4.to_string()),
                    IpAddr::V6(_) => obs.ipv6.push(crate::model::Ipv6Address::new(&addr)),
                }
            }
        }
        let _ = self.tx.send(obs).await;
    }

    /// Raw-socket fallback: send a single mDNS PTR query per service type
    /// over UDP multicast and parse whatever responses arrive before the
    /// deadline.
    async fn run_pure_fallback(&self) {
        let timeout = self.timeout;
        let tx = self.tx.clone();
        let _ = tokio::task::spawn_blocking(move || run_pure_fallback_blocking(timeout, tx)).await;
    }
}

fn run_pure_fallback_blocking(timeout: Duration, tx: mpsc::Sender<Observation>) {
    let Ok(socket) = Socket::new(Domain::IPV4, Type::DGRAM, Some(SockProtocol::UDP)) else {
        return;
    };
    let _ = socket.set_reuse_address(true);
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, MDNS_PORT);
    if socket.bind(&bind_addr.into()).is_err() {
        return;
    }
    let _ = socket.join_multicast_v4(&MDNS_MULTICAST_ADDR, &Ipv4Addr::UNSPECIFIED);
    let _ = socket.set_read_timeout(Some(Duration::from_millis(300)));

    for service_type in SERVICE_TYPES {
        let query = build_ptr_query(service_type);
        let dest = SocketAddrV4::new(MDNS_MULTICAST_ADDR, MDNS_PORT);
        let _ = socket.send_to(&query, &dest.into());
    }

    let deadline = std::time::Instant::now() + timeout;
    let mut buf = [std::mem::MaybeUninit::uninit(); 4096];
    while std::time::Instant::now() < deadline {
        match socket.recv(&mut buf) {
            Ok(len) => {
                let data: Vec<u8> = buf[..len]
                    .iter()
                    .map(|b| unsafe { b.assume_init() })
                    .collect();
                for record in mdns_parser::parse_message(&data) {
                    let mut obs = Observation::new(Source::Mdns, chrono::Utc::now().timestamp_millis());
                    obs.hostname = Some(record.name.trim_end_matches('.').to_string());
                    if let Some(ipv4) = record.a_record {
                        obs.ipv4 = Some(ipv4);
                    }
                    if let Some(ipv6) = record.aaaa_record {
                        obs.ipv6.push(crate::model::Ipv6Address::new(&ipv6));
                    }
                    let _ = tx.blocking_send(obs);
                }
            }
            Err(_) => break,
        }
    }
}

/// Builds a minimal DNS query message asking for the PTR record of a
/// service type.
fn build_ptr_query(service_type: &str) -> Vec<u8> {
    let mut msg = Vec::new();
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&1u16.to_be_bytes()); // qdcount
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());
    msg.extend_from_slice(&0u16.to_be_bytes());

    for label in service_type.trim_end_matches('.').split('.') {
        msg.push(label.len() as u8);
        msg.extend_from_slice(label.as_bytes());
    }
    msg.push(0);
    msg.extend_from_slice(&12u16.to_be_bytes()); // QTYPE PTR
    msg.extend_from_slice(&1u16.to_be_bytes()); // QCLASS IN
    msg
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ptr_query_encodes_service_type_labels() {
        let query = build_ptr_query("_ipp._tcp.local.");
        assert_eq!(query[12], 4); // "_ipp" length
        assert_eq!(&query[13..17], b"_ipp");
    }

    #[test]
    fn service_types_list_includes_printer_signal() {
        assert!(SERVICE_TYPES.contains(&"_ipp._tcp.local."));
    }
}
