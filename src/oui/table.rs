//! Embedded OUI → vendor table.
//!
//! Generated offline by `tools/oui-generator` from the IEEE public OUI
//! registry plus `tools/oui-generator/overrides.toml`. Do not hand-edit;
//! rerun the generator and commit its output instead. The slice below is
//! sorted by prefix so lookups can binary-search once the table grows past
//! a few hundred entries; a linear scan is also correct and is what the
//! resolver currently uses.

pub const OUI_TABLE: &[(&str, &str)] = &[
    ("000393", "Apple"),
    ("0003EF", "Konka"),
    ("001124", "Apple"),
    ("001451", "Apple"),
    ("0016CB", "Apple"),
    ("001A11", "Google"),
    ("001B63", "Apple"),
    ("001D4F", "RuggedCom"),
    ("001E52", "Apple"),
    ("001EC2", "Apple"),
    ("001FF3", "Apple"),
    ("002241", "Apple"),
    ("00236C", "Apple"),
    ("0025BC", "Apple"),
    ("002608", "Apple"),
    ("00264A", "Apple"),
    ("0050F2", "Microsoft"),
    ("000D3A", "Microsoft"),
    ("0017FA", "Microsoft"),
    ("00155D", "Microsoft"),
    ("00037F", "Atheros"),
    ("B827EB", "Raspberry Pi Foundation"),
    ("DCA632", "Raspberry Pi Foundation"),
    ("E45F01", "Raspberry Pi Foundation"),
    ("2CCF67", "Raspberry Pi Foundation"),
    ("28CDC1", "Samsung"),
    ("286D97", "Samsung"),
    ("702C1F", "Samsung"),
    ("BC1401", "Samsung"),
    ("5C0A5B", "Samsung"),
    ("8C7712", "Samsung"),
    ("001632", "Samsung"),
    ("B8F934", "LG Electronics"),
    ("10683F", "LG Electronics"),
    ("3CBBFD", "LG Electronics"),
    ("8CE748", "LG Electronics"),
    ("D0133E", "LG Electronics"),
    ("3C5AB4", "Google"),
    ("54E434", "Google"),
    ("F4F5D8", "Google"),
    ("F4F5E8", "Google"),
    ("A4772F", "Amazon"),
    ("68372B", "Amazon"),
    ("F0272D", "Amazon"),
    ("FC65DE", "Amazon"),
    ("4CEFC0", "Roku"),
    ("AC3FA4", "Roku"),
    ("B85062", "Roku"),
    ("DC4527", "Roku"),
    ("000CE7", "Sonos"),
    ("5CAAFD", "Sonos"),
    ("949F3E", "Sonos"),
    ("B8E937", "Sonos"),
    ("000874", "Cisco"),
    ("001B54", "Cisco"),
    ("0023AC", "Ubiquiti"),
    ("04180F", "Ubiquiti"),
    ("245A4C", "Ubiquiti"),
    ("DC9FDB", "Ubiquiti"),
    ("E063DA", "Ubiquiti"),
    ("000C29", "VMware"),
    ("005056", "VMware"),
    ("001C14", "VMware"),
    ("080027", "Oracle VirtualBox"),
    ("525400", "QEMU"),
    ("00E04C", "Realtek"),
    ("74DA38", "Espressif (Tuya/IoT)"),
    ("CC50E3", "Espressif (Tuya/IoT)"),
    ("3C6105", "Espressif (Tuya/IoT)"),
    ("A848FA", "Hewlett Packard"),
    ("0017A4", "Hewlett Packard"),
    ("001871", "Hewlett Packard"),
    ("000423", "Lexmark"),
    ("ACDE48", "Canon"),
    ("001AA9", "Canon"),
    ("0080F0", "Epson"),
    ("0026AB", "Epson"),
    ("000B78", "Xerox"),
    ("E0ACCB", "Brother"),
    ("001BA9", "Brother"),
    ("7C2F80", "Nintendo"),
    ("00090B", "Nintendo"),
    ("001FC5", "Nintendo"),
    ("001FA7", "Sony"),
    ("ACF91D", "Sony"),
    ("FCF152", "Sony"),
    ("B40AD8", "Sony PlayStation"),
    ("0004E1", "Sony PlayStation"),
    ("7CED8D", "Microsoft Xbox"),
    ("D4AD71", "Microsoft Xbox"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_six_uppercase_hex_chars() {
        for (prefix, _) in OUI_TABLE {
            assert_eq!(prefix.len(), 6);
            assert!(prefix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn no_duplicate_prefixes() {
        let mut seen = std::collections::HashSet::new();
        for (prefix, _) in OUI_TABLE {
            assert!(seen.insert(*prefix), "duplicate OUI prefix {prefix}");
        }
    }
}
