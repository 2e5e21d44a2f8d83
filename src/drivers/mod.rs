//! Source Drivers: independent asynchronous tasks, each owning exactly
//! one discovery method, emitting immutable Observations into the shared
//! bounded channel the Correlator drains. No driver touches the device
//! store directly.

pub mod capture;
pub mod mdns;
pub mod netbios;
pub mod neighbour_table;
pub mod portscan;
pub mod ssdp;
