//! RAOP service names and how they map to receivers

use std::net::IpAddr;

use crate::types::ReceiverInfo;

/// RAOP service type for mDNS discovery
pub const RAOP_SERVICE_TYPE: &str = "_raop._tcp.local.";

/// Parse RAOP service instance name
///
/// RAOP service names follow the format: `{MAC_ADDRESS}@{DEVICE_NAME}`
/// Example: "0050C212A23F@Living Room"
#[must_use]
pub fn parse_raop_service_name(name: &str) -> Option<(String, String)> {
    let (mac, device_name) = name.split_once('@')?;
    let mac = mac.to_uppercase();
    (mac.len() == 12 && mac.chars().all(|c| c.is_ascii_hexdigit()))
        .then(|| (mac, device_name.to_string()))
}

/// Format MAC address with colons
#[must_use]
pub fn format_mac_address(mac: &str) -> String {
    mac.chars()
        .collect::<Vec<_>>()
        .chunks(2)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// Instance part of a full service name
///
/// `0050C212A23F@Den._raop._tcp.local.` gives `0050C212A23F@Den`.
#[must_use]
pub fn instance_name(fullname: &str) -> &str {
    fullname
        .strip_suffix(RAOP_SERVICE_TYPE)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(fullname)
}

/// Build a receiver from a resolved service
///
/// IPv4 addresses are preferred. Returns `None` when the service resolved
/// without any address.
pub fn receiver_from_service<'a>(
    fullname: &str,
    addresses: impl IntoIterator<Item = &'a IpAddr>,
    port: u16,
) -> Option<ReceiverInfo> {
    let mut addresses: Vec<IpAddr> = addresses.into_iter().copied().collect();
    addresses.sort_by_key(|addr| (addr.is_ipv6(), *addr));
    let host = addresses.first()?;

    let instance = instance_name(fullname);
    let name = parse_raop_service_name(instance)
        .map_or_else(|| instance.to_string(), |(_, name)| name);
    Some(ReceiverInfo::new(name, host.to_string(), port))
}
