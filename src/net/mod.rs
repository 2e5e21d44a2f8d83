//! Net primitives: MAC normalisation, IPv6 classification, CIDR arithmetic,
//! and interface enumeration. Pure, allocation-light, no I/O beyond the
//! interface-enumeration syscall wrapper.

pub mod cidr;
pub mod iface;
pub mod ipv6;
pub mod mac;
