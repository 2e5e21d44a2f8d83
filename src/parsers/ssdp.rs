//! Pure parser for SSDP response/NOTIFY text (RFC-ish HTTP headers over
//! UDP). Headers are matched case-insensitively per the SSDP convention of
//! mixed-case wire text; total and never panics on malformed datagrams.

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SsdpMessage {
    pub is_notify: bool,
    pub location: Option<String>,
    pub usn: Option<String>,
    pub search_target: Option<String>,
    pub notification_type: Option<String>,
    pub server: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Parses one complete SSDP datagram (already decoded to text). Returns
/// `None` when the first line isn't a recognised SSDP status/method line.
pub fn parse(datagram: &str) -> Option<SsdpMessage> {
    let mut lines = datagram.split("\r\n").flat_map(|l| l.split('\n'));
    let first = lines.next()?.trim();

    let is_notify = first.starts_with("NOTIFY");
    let is_response = first.starts_with("HTTP/");
    if !is_notify && !is_response {
        return None;
    }

    let mut message = SsdpMessage {
        is_notify,
        ..Default::default()
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_uppercase();
        let value = value.trim().to_string();
        match key.as_str() {
            "LOCATION" => message.location = Some(value),
            "USN" => message.usn = Some(value),
            "ST" => message.search_target = Some(value),
            "NT" => message.notification_type = Some(value),
            "SERVER" => message.server = Some(value),
            _ => {}
        }
    }

    if let Some(location) = &message.location {
        if let Ok(url) = Url::parse(location) {
            message.host = url.host_str().map(str::to_string);
            message.port = url.port_or_known_default();
        }
    }

    Some(message)
}
