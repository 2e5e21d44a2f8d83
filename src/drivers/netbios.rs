//! NetBIOS lookup driver. Two variants: a broadcast discovery against
//! well-known workgroup names, and a per-IP resolution pass over hosts
//! that already have an IPv4 address but no hostname.
//!
//! Builds raw NBSTAT request/response handling directly, adapted to the
//! Observation-channel contract, with a broadcast variant added on top of
//! the per-IP query.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info_span, warn};

use crate::model::{Observation, Source};

static TRANSACTION_ID: AtomicU16 = AtomicU16::new(1);
const NETBIOS_PORT: u16 = 137;

/// Workgroup/group names broadcast discovery probes for.
const WELL_KNOWN_WORKGROUPS: &[&str] = &["WORKGROUP", "MSHOME", "HOME"];

pub struct NetBiosDriver {
    tx: mpsc::Sender<Observation>,
    timeout_ms: u64,
}

impl NetBiosDriver {
    pub fn new(tx: mpsc::Sender<Observation>) -> Self {
        Self {
            tx,
            timeout_ms: 1000,
        }
    }

    /// Broadcasts NBSTAT queries for well-known workgroup names on the
    /// local subnet's broadcast address and emits one Observation per
    /// responder.
    pub async fn run_broadcast(&self, broadcast_addr: Ipv4Addr) {
        let span = info_span!("driver", source = "netbios_broadcast");
        let _enter = span.enter();

        for workgroup in WELL_KNOWN_WORKGROUPS {
            let timeout_ms = self.timeout_ms;
            let workgroup = workgroup.to_string();
            let result = tokio::task::spawn_blocking(move || {
                query_broadcast(broadcast_addr, &workgroup, timeout_ms)
            })
            .await;

            match result {
                Ok(Some(result)) => self.emit(result).await,
                Ok(None) => {}
                Err(err) => warn!(error = %err, "netbios broadcast task failed"),
            }
        }
    }

    /// Queries each IPv4 address directly for its NetBIOS computer name
    /// and workgroup. Intended to run against hosts already known to the
    /// Correlator but lacking a hostname.
    pub async fn run_per_ip(&self, ips: Vec<Ipv4Addr>) {
        let span = info_span!("driver", source = "netbios_per_ip");
        let _enter = span.enter();

        let mut handles = Vec::with_capacity(ips.len());
        for ip in ips {
            let timeout_ms = self.timeout_ms;
            handles.push(tokio::task::spawn_blocking(move || {
                query_ip(ip, timeout_ms)
            }));
        }

        for handle in handles {
            if let Ok(Some(result)) = handle.await {
                self.emit(result).await;
            }
        }
    }

    async fn emit(&self, result: NetBiosResult) {
        let mut obs = Observation::new(Source::NetBios, now());
        obs.ipv4 = Some(result.ip.to_string());
        obs.hostname = Some(result.netbios_name);
        obs.workgroup = result.group_name;
        obs.mac = result.mac;
        let _ = self.tx.send(obs).await;
    }
}

struct NetBiosResult {
    ip: Ipv4Addr,
    netbios_name: String,
    group_name: Option<String>,
    mac: Option<String>,
}

fn build_nbstat_request(transaction_id: u16, query_name: &str) -> Vec<u8> {
    let mut packet = Vec::with_capacity(50);
    packet.push((transaction_id >> 8) as u8);
    packet.push(transaction_id as u8);
    packet.extend_from_slice(&[0x00, 0x00]); // flags
    packet.extend_from_slice(&[0x00, 0x01]); // questions
    packet.extend_from_slice(&[0x00, 0x00]); // answer rrs
    packet.extend_from_slice(&[0x00, 0x00]); // authority rrs
    packet.extend_from_slice(&[0x00, 0x00]); // additional rrs

    packet.push(0x20);
    let padded = format!("{:<16}", query_name.to_ascii_uppercase());
    for byte in padded.bytes().take(16) {
        packet.push(0x41 + (byte >> 4));
        packet.push(0x41 + (byte & 0x0f));
    }
    packet.push(0x00);

    packet.extend_from_slice(&[0x00, 0x21]); // NBSTAT
    packet.extend_from_slice(&[0x00, 0x01]); // class IN
    packet
}

fn parse_nbstat_response(data: &[u8]) -> Option<(String, Option<String>, Option<String>)> {
    if data.len() < 57 {
        return None;
    }
    let mut pos = 50;
    if data.len() < pos + 6 {
        return None;
    }
    let rdlength = u16::from_be_bytes([data[pos + 4], data[pos + 5]]) as usize;
    pos += 6;
    if data.len() < pos + rdlength || rdlength < 1 {
        return None;
    }

    let num_names = data[pos] as usize;
    pos += 1;
    if data.len() < pos + (num_names * 18) {
        return None;
    }

    let mut computer_name = None;
    let mut group_name = None;

    for _ in 0..num_names {
        if pos + 18 > data.len() {
            break;
        }
        let name_bytes = &data[pos..pos + 15];
        let suffix = data[pos + 15];
        let flags = u16::from_be_bytes([data[pos + 16], data[pos + 17]]);
        let name = String::from_utf8_lossy(name_bytes).trim_end().to_string();
        let is_group = (flags & 0x8000) != 0;

        if suffix == 0x00 {
            if is_group {
                if group_name.is_none() && !name.is_empty() {
                    group_name = Some(name.clone());
                }
            } else if computer_name.is_none() && !name.is_empty() {
                computer_name = Some(name.clone());
            }
        }
        pos += 18;
    }

    let mac = if pos + 6 <= data.len() {
        Some(format!(
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            data[pos], data[pos + 1], data[pos + 2], data[pos + 3], data[pos + 4], data[pos + 5]
        ))
    } else {
        None
    };

    computer_name.map(|name| (name, group_name, mac))
}

fn query_ip(ip: Ipv4Addr, timeout_ms: u64) -> Option<NetBiosResult> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket
        .set_read_timeout(Some(Duration::from_millis(timeout_ms)))
        .ok()?;
    let target = SocketAddr::new(IpAddr::V4(ip), NETBIOS_PORT);
    let request = build_nbstat_request(TRANSACTION_ID.fetch_add(1, Ordering::Relaxed), "*");
    socket.send_to(&request, target).ok()?;

    let mut buf = [0u8; 512];
    let (len, _) = socket.recv_from(&mut buf).ok()?;
    let (netbios_name, group_name, mac) = parse_nbstat_response(&buf[..len])?;
    Some(NetBiosResult {
        ip,
        netbios_name,
        group_name,
        mac,
    })
}

fn query_broadcast(broadcast_addr: Ipv4Addr, workgroup: &str, timeout_ms: u64) -> Option<NetBiosResult> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.set_broadcast(true).ok()?;
    socket
        .set_read_timeout(Some(Duration::from_millis(timeout_ms)))
        .ok()?;
    let target = SocketAddr::new(IpAddr::V4(broadcast_addr), NETBIOS_PORT);
    let request = build_nbstat_request(
        TRANSACTION_ID.fetch_add(1, Ordering::Relaxed),
        workgroup,
    );
    socket.send_to(&request, target).ok()?;

    let mut buf = [0u8; 512];
    let (len, from) = socket.recv_from(&mut buf).ok()?;
    let (netbios_name, group_name, mac) = parse_nbstat_response(&buf[..len])?;
    let ip = match from.ip() {
        IpAddr::V4(v4) => v4,
        IpAddr::V6(_) => return None,
    };
    Some(NetBiosResult {
        ip,
        netbios_name,
        group_name,
        mac,
    })
}

fn now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nbstat_request_encodes_star_query_correctly() {
        let request = build_nbstat_request(0x1234, "*");
        assert_eq!(request[0], 0x12);
        assert_eq!(request[1], 0x34);
        assert_eq!(request[12], 0x20);
        assert_eq!(&request[request.len() - 4..request.len() - 2], &[0x00, 0x21]);
    }

    #[test]
    fn nbstat_request_encodes_workgroup_query() {
        let request = build_nbstat_request(1, "WORKGROUP");
        // Encoded name occupies 32 bytes starting at offset 13.
        assert_eq!(request[12], 0x20);
        assert_eq!(request.len(), 12 + 1 + 32 + 1 + 2 + 2);
    }
}
