//! Pure, stateful parser for nmap-style scan-report text. Consumes
//! complete or partial tool output a line at a time and accumulates
//! per-host results; never panics on malformed input.

/// One open port found for a host, plus whatever service/version fields
/// the tool reported alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortFinding {
    pub port: u16,
    pub protocol: String,
    pub service_name: String,
    pub version: String,
}

/// Everything the parser recovered for a single scanned host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostScanResult {
    pub ip: String,
    pub ports: Vec<PortFinding>,
    pub os_guess: Option<String>,
    pub mac: Option<String>,
    pub manufacturer: Option<String>,
    pub hostname: Option<String>,
    pub workgroup: Option<String>,
    pub fqdn: Option<String>,
}

/// Incremental parser. Drivers feed it line-by-line as an external tool's
/// stdout streams in; `finish()` flushes the last in-progress host.
#[derive(Debug, Default)]
pub struct PortScanParser {
    results: Vec<HostScanResult>,
    current: Option<HostScanResult>,
}

impl PortScanParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line of tool output.
    pub fn feed_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        if let Some(ip) = parse_scan_report_header(line) {
            self.flush_current();
            self.current = Some(HostScanResult {
                ip,
                ..Default::default()
            });
            return;
        }

        let Some(current) = self.current.as_mut() else {
            return;
        };

        if let Some(finding) = parse_port_line(line) {
            current.ports.push(finding);
        } else if let Some(os) = parse_os_details_line(line) {
            current.os_guess = Some(os);
        } else if let Some((mac, vendor)) = parse_mac_line(line) {
            current.mac = Some(mac);
            if !vendor.is_empty() {
                current.manufacturer = Some(vendor);
            }
        } else if let Some((name, fqdn)) = parse_dns_computer_name_line(line) {
            if current.hostname.is_none() {
                current.hostname = Some(name);
            }
            if let Some(fqdn) = fqdn {
                current.fqdn = Some(fqdn);
            }
        } else if let Some(name) = parse_hostname_line(line) {
            if current.hostname.is_none() {
                current.hostname = Some(name);
            }
        } else if let Some(workgroup) = parse_workgroup_line(line) {
            current.workgroup = Some(workgroup);
        } else if let Some(domain) = parse_dns_domain_name_line(line) {
            if current.fqdn.is_none() {
                if let Some(hostname) = &current.hostname {
                    current.fqdn = Some(format!("{hostname}.{domain}"));
                } else {
                    current.fqdn = Some(domain);
                }
            }
        }
    }

    fn flush_current(&mut self) {
        if let Some(result) = self.current.take() {
            self.results.push(result);
        }
    }

    /// Feeds a complete block of tool output, one line per call.
    pub fn feed(&mut self, output: &str) {
        for line in output.lines() {
            self.feed_line(line);
        }
    }

    /// Flushes any in-progress host and returns every host parsed so far.
    pub fn finish(mut self) -> Vec<HostScanResult> {
        self.flush_current();
        self.results
    }
}

/// Matches `Nmap scan report for 192.168.1.5` or
/// `Nmap scan report for host.example.com (192.168.1.5)`.
fn parse_scan_report_header(line: &str) -> Option<String> {
    let rest = line.strip_prefix("Nmap scan report for ")?;
    if let Some(open) = rest.find('(') {
        let close = rest[open..].find(')')? + open;
        Some(rest[open + 1..close].to_string())
    } else {
        Some(rest.trim().to_string())
    }
}

/// Matches a port-table row, e.g. `80/tcp   open  http    Apache httpd 2.4.41`.
fn parse_port_line(line: &str) -> Option<PortFinding> {
    let mut fields = line.split_whitespace();
    let port_proto = fields.next()?;
    let (port_str, protocol) = port_proto.split_once('/')?;
    let port: u16 = port_str.parse().ok()?;

    let state = fields.next()?;
    if state != "open" {
        return None;
    }

    let service_name = fields.next().unwrap_or_default().to_string();
    let version = fields.collect::<Vec<_>>().join(" ");

    Some(PortFinding {
        port,
        protocol: protocol.to_string(),
        service_name,
        version,
    })
}

/// Finds `key` anywhere in `line` (script-output lines are commonly
/// prefixed with nmap's `|` / `|_` host-script markup, e.g.
/// `|_Workgroup: WORKGROUP`) and returns the trimmed text after it.
fn after_key(line: &str, key: &str) -> Option<String> {
    let idx = line.find(key)?;
    let rest = line[idx + key.len()..].trim().trim_end_matches('\0');
    if rest.is_empty() {
        None
    } else {
        Some(rest.to_string())
    }
}

/// Matches `OS details: Linux 5.4 - 5.15`, `Running: Linux 5.X`, or
/// `OS CPE: cpe:/o:microsoft:windows_10`.
fn parse_os_details_line(line: &str) -> Option<String> {
    after_key(line, "OS details: ")
        .or_else(|| after_key(line, "Running: "))
        .or_else(|| after_key(line, "OS CPE: "))
}

/// Matches `MAC Address: AA:BB:CC:DD:EE:FF (Vendor Name)`.
fn parse_mac_line(line: &str) -> Option<(String, String)> {
    let rest = after_key(line, "MAC Address: ")?;
    let mut parts = rest.splitn(2, ' ');
    let mac = parts.next()?.trim().to_string();
    let vendor = parts
        .next()
        .map(|s| s.trim().trim_start_matches('(').trim_end_matches(')').to_string())
        .unwrap_or_default();
    Some((mac, vendor))
}

/// Matches any of the hostname-bearing script-output lines: NetBIOS
/// computer name (nbstat), SMB-discovery computer name, RDP NTLM target
/// name. First match wins per host; callers only call this when
/// `current.hostname` is still unset.
fn parse_hostname_line(line: &str) -> Option<String> {
    let candidates = [
        "NetBIOS computer name: ",
        "NetBIOS name: ",
        "Computer name: ",
        "NTLM_Target_Name: ",
        "NTLM Target Name: ",
    ];
    for key in candidates {
        if let Some(rest) = after_key(line, key) {
            // nbstat runs several comma-separated fields onto one line
            // (`NetBIOS name: X, NetBIOS user: ...`); keep only the name.
            let name = rest.split(',').next()?.trim().split('.').next()?.trim();
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Matches `Workgroup: WORKGROUP` (nbstat/smb-os-discovery).
fn parse_workgroup_line(line: &str) -> Option<String> {
    after_key(line, "Workgroup: ")
        .or_else(|| after_key(line, "NetBIOS Domain Name: "))
        .map(|s| s.split(',').next().unwrap_or(&s).trim().to_string())
}

/// Matches `DNS Computer Name: host.corp.example.com`, returning the short
/// hostname and, when the value is dotted, the full string as an FQDN.
fn parse_dns_computer_name_line(line: &str) -> Option<(String, Option<String>)> {
    let value = after_key(line, "DNS Computer Name: ")?;
    let name = value.split('.').next()?.to_string();
    if name.is_empty() {
        return None;
    }
    let fqdn = if value.contains('.') {
        Some(value.clone())
    } else {
        None
    };
    Some((name, fqdn))
}

/// Matches `DNS Domain Name: corp.example.com`, used to build a best-effort
/// FQDN when only a short hostname and a separate domain line are present.
fn parse_dns_domain_name_line(line: &str) -> Option<String> {
    after_key(line, "DNS Domain Name: ")
}
