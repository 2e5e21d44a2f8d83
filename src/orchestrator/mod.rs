//! Orchestrator: the phase state machine that coordinates Source Drivers
//! against a single Correlator, broadcasting progress on the Event
//! Channel. IDLE → INIT → PHASE0 → PHASE1 → PHASE2 → (PHASE3 | COMPLETE).

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{info, info_span, warn};

use crate::config::ScanConfig;
use crate::correlator::Correlator;
use crate::drivers::{capture, mdns, netbios, neighbour_table, portscan, ssdp};
use crate::error::InitError;
use crate::events::{Event, EventBus, ScanStats};
use crate::model::{DeviceRecord, Observation};
use crate::net::iface;

const OBSERVATION_CHANNEL_CAPACITY: usize = 1000;
const WATCH_MERGE_TICK: Duration = Duration::from_secs(5);
const DRIVER_STOP_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Init,
    Phase0,
    Phase1,
    Phase2,
    Phase3,
    Complete,
    Failed,
}

impl Phase {
    fn label(self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Init => "init",
            Phase::Phase0 => "phase0",
            Phase::Phase1 => "phase1",
            Phase::Phase2 => "phase2",
            Phase::Phase3 => "phase3",
            Phase::Complete => "complete",
            Phase::Failed => "failed",
        }
    }
}

pub struct Orchestrator {
    cfg: ScanConfig,
    events: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(cfg: ScanConfig, events: Arc<EventBus>) -> Self {
        Self { cfg, events }
    }

    /// Runs the full scan to completion (or, in watch mode, until an
    /// external stop signal arrives on `stop_rx`) and returns the final
    /// set of Device Records.
    pub async fn run(&self, stop_rx: oneshot::Receiver<()>) -> Result<Vec<DeviceRecord>, InitError> {
        let start = Instant::now();
        let span = info_span!("orchestrator");
        let _enter = span.enter();

        self.events.publish(Event::ScanStarted);

        let (interface, cidr) = self.init_phase()?;
        let (tx, mut rx) = mpsc::channel::<Observation>(OBSERVATION_CHANNEL_CAPACITY);
        let correlator = Arc::new(Mutex::new(Correlator::new()));

        let merge_task = {
            let correlator = correlator.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                while let Some(obs) = rx.recv().await {
                    let mut guard = correlator.lock().await;
                    let Some((handle, created)) = guard.on_observation(obs) else {
                        continue;
                    };
                    if let Some(record) = guard.get_record(handle) {
                        let event = if created {
                            Event::DeviceDiscovered(Box::new(record))
                        } else {
                            Event::DeviceUpdated(Box::new(record))
                        };
                        events.publish(event);
                    }
                }
            })
        };

        self.run_phase0(&tx).await;
        let (ipv4_targets, capture_stop_tx) = self.run_phase1(&tx, &interface, &cidr).await;

        if !self.cfg.passive_only && matches!(self.cfg.scan_level, crate::config::ScanLevel::Standard | crate::config::ScanLevel::Thorough) {
            self.run_phase2(&tx, &cidr, &ipv4_targets).await;
        }

        if self.cfg.watch {
            self.run_phase3(stop_rx).await;
        }

        // COMPLETE: stop every still-running driver. The capture driver is
        // the only one left running past its own phase; signalling its
        // stop channel here, not at the end of PHASE1, is what lets it
        // continue observing through PHASE2/PHASE3.
        if let Some(stop_tx) = capture_stop_tx {
            let _ = stop_tx.send(());
        }

        drop(tx);
        let _ = merge_task.await;

        self.set_phase(Phase::Complete);
        let records = correlator.lock().await.get_devices();
        let stats = ScanStats {
            devices_found: records.len(),
            elapsed_ms: start.elapsed().as_millis() as u64,
        };
        self.events.publish(Event::ScanCompleted {
            records: records.clone(),
            stats,
        });

        Ok(records)
    }

    fn init_phase(&self) -> Result<(Option<String>, Option<crate::net::cidr::Cidr>), InitError> {
        self.set_phase(Phase::Init);

        let interfaces = iface::enumerate();
        let primary = iface::select_primary(&interfaces);

        let interface_name = self
            .cfg
            .interface
            .clone()
            .or_else(|| primary.map(|i| i.name.clone()));

        if interface_name.is_none() && self.cfg.target_cidr.is_none() {
            return Err(InitError::NoInterface);
        }

        let cidr = self
            .cfg
            .target_cidr
            .as_deref()
            .and_then(crate::net::cidr::Cidr::parse)
            .or_else(|| primary.and_then(|i| i.ipv4));

        Ok((interface_name, cidr))
    }

    async fn run_phase0(&self, tx: &mpsc::Sender<Observation>) {
        self.set_phase(Phase::Phase0);
        let deadline = Duration::from_secs(self.cfg.scan_level.phase_deadline_secs());

        let mdns_driver = mdns::MdnsDriver::new(tx.clone(), deadline);
        let ssdp_driver = ssdp::SsdpDriver::new(tx.clone(), deadline);

        let mdns_enabled = self.cfg.enabled_sources.contains(&crate::model::Source::Mdns);
        let ssdp_enabled = self.cfg.enabled_sources.contains(&crate::model::Source::Ssdp);

        let mdns_fut = async {
            if mdns_enabled {
                mdns_driver.run().await;
            }
        };
        let ssdp_fut = async {
            if ssdp_enabled {
                ssdp_driver.run().await;
            }
        };
        let _ = tokio::join!(
            tokio::time::timeout(deadline + Duration::from_secs(1), mdns_fut),
            tokio::time::timeout(deadline + Duration::from_secs(1), ssdp_fut),
        );
    }

    /// Launches the passive capture driver (left running — its stop signal
    /// is held by the caller and fired only at COMPLETE), awaits ARP and
    /// NDP neighbour reads, then runs NetBIOS enrichment. Returns the set
    /// of IPv4 addresses discovered so far for use by PHASE2, plus the
    /// capture driver's stop sender (`None` if the driver is disabled).
    async fn run_phase1(
        &self,
        tx: &mpsc::Sender<Observation>,
        interface: &Option<String>,
        cidr: &Option<crate::net::cidr::Cidr>,
    ) -> (Vec<Ipv4Addr>, Option<oneshot::Sender<()>>) {
        self.set_phase(Phase::Phase1);

        let capture_stop_tx = if self.cfg.enabled_sources.contains(&crate::model::Source::PacketCapture) {
            let capture_driver = capture::CaptureDriver::new(tx.clone(), interface.clone());
            let (stop_tx, stop_rx) = oneshot::channel();
            tokio::spawn(async move {
                capture_driver.run(stop_rx).await;
            });
            Some(stop_tx)
        } else {
            None
        };

        let neighbour_driver =
            neighbour_table::NeighbourTableDriver::new(tx.clone(), interface.clone());

        let arp_enabled = self.cfg.enabled_sources.contains(&crate::model::Source::Arp);
        let ndp_enabled = self.cfg.enabled_sources.contains(&crate::model::Source::Ndp);

        tokio::join!(
            async {
                if arp_enabled {
                    neighbour_driver.run_arp().await;
                }
            },
            async {
                if ndp_enabled && self.cfg.ipv6_enabled {
                    neighbour_driver.run_ndp().await;
                }
            },
        );

        let targets: Vec<Ipv4Addr> = cidr.map(|c| c.hosts().collect()).unwrap_or_default();

        if self.cfg.enabled_sources.contains(&crate::model::Source::NetBios) {
            let netbios_driver = netbios::NetBiosDriver::new(tx.clone());
            if let Some(c) = cidr {
                netbios_driver.run_broadcast(c.broadcast()).await;
            }
            netbios_driver.run_per_ip(targets.clone()).await;
        }

        (targets, capture_stop_tx)
    }

    async fn run_phase2(
        &self,
        tx: &mpsc::Sender<Observation>,
        cidr: &Option<crate::net::cidr::Cidr>,
        ipv4_targets: &[Ipv4Addr],
    ) {
        self.set_phase(Phase::Phase2);

        if !self.cfg.enabled_sources.contains(&crate::model::Source::PortScan) {
            return;
        }

        let targets: Vec<IpAddr> = if !ipv4_targets.is_empty() {
            ipv4_targets.iter().map(|ip| IpAddr::V4(*ip)).collect()
        } else if let Some(c) = cidr {
            c.hosts().map(IpAddr::V4).collect()
        } else {
            Vec::new()
        };

        let driver = portscan::PortScanDriver::with_events(self.cfg.clone(), tx.clone(), self.events.clone());
        if let Err(err) = driver.run(targets).await {
            warn!(error = %err, "port scan driver failed");
        }
    }

    async fn run_phase3(&self, stop_rx: oneshot::Receiver<()>) {
        self.set_phase(Phase::Phase3);
        let mut ticker = tokio::time::interval(WATCH_MERGE_TICK);
        tokio::select! {
            _ = stop_rx => {
                info!("watch mode stopped by external signal");
            }
            _ = async {
                loop {
                    ticker.tick().await;
                }
            } => {}
        }
        tokio::time::sleep(DRIVER_STOP_GRACE).await;
    }

    fn set_phase(&self, phase: Phase) {
        self.events.publish(Event::PhaseChange {
            phase: phase.label(),
        });
    }
}
