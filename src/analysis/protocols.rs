use serde::{Deserialize, Serialize};

/// IANA protocol numbers the analyzer knows by name.
pub const PROTOCOL_NUMBERS: &[(&str, ProtocolType)] = &[
    ("6", ProtocolType::Tcp),
    ("17", ProtocolType::Udp),
    ("1", ProtocolType::Icmp),
];

/// Name used for any protocol number outside `PROTOCOL_NUMBERS`.
pub const UNKNOWN_PROTOCOL: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolType {
    Tcp,
    Udp,
    Icmp,
    Unknown,
}

impl ProtocolType {
    /// Resolve a raw protocol number field, e.g. "6" -> Tcp.
    pub fn from_number(number: &str) -> Self {
        PROTOCOL_NUMBERS
            .iter()
            .find(|(n, _)| *n == number)
            .map(|(_, protocol)| *protocol)
            .unwrap_or(ProtocolType::Unknown)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ProtocolType::Tcp => "tcp",
            ProtocolType::Udp => "udp",
            ProtocolType::Icmp => "icmp",
            ProtocolType::Unknown => UNKNOWN_PROTOCOL,
        }
    }

    /// ICMP carries no ports, so its destination port is normalized to "0".
    pub fn has_ports(&self) -> bool {
        !matches!(self, ProtocolType::Icmp)
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lowercase protocol name for a raw protocol number field.
pub fn protocol_name(number: &str) -> &'static str {
    ProtocolType::from_number(number).name()
}
