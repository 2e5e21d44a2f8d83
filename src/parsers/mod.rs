//! Pure, total text/wire parsers. Each module here turns one external
//! source's raw output into plain data structures without performing any
//! I/O itself; the Drivers own the I/O and feed these parsers. No parser
//! in this module panics on malformed input — worst case is an empty or
//! partial result.

pub mod capture;
pub mod mdns;
pub mod neighbour;
pub mod portscan;
pub mod ssdp;
