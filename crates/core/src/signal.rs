use serde::{Deserialize, Serialize};

/// Four-valued logic level carried on pins and wires.
///
/// Serialized as `"1"` / `"0"` / `"Z"` / `"X"` everywhere (snapshots and
/// WebSocket payloads alike).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Signal {
    #[serde(rename = "1")]
    High,
    #[serde(rename = "0")]
    Low,
    /// High-impedance: the pin is not driven.
    #[serde(rename = "Z")]
    Floating,
    /// Unknown or contradictory.
    #[serde(rename = "X")]
    Undefined,
}

impl Signal {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Signal::High
        } else {
            Signal::Low
        }
    }

    /// `Some(true)` / `Some(false)` for driven levels, `None` for Z and X.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Signal::High => Some(true),
            Signal::Low => Some(false),
            Signal::Floating | Signal::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Signal::High | Signal::Low)
    }

    /// Logical inversion; Z and X invert to X.
    pub fn invert(self) -> Self {
        match self {
            Signal::High => Signal::Low,
            Signal::Low => Signal::High,
            _ => Signal::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_single_characters() {
        assert_eq!(serde_json::to_string(&Signal::High).unwrap(), "\"1\"");
        assert_eq!(serde_json::to_string(&Signal::Low).unwrap(), "\"0\"");
        assert_eq!(serde_json::to_string(&Signal::Floating).unwrap(), "\"Z\"");
        assert_eq!(serde_json::to_string(&Signal::Undefined).unwrap(), "\"X\"");
    }

    #[test]
    fn invert_maps_unknowns_to_undefined() {
        assert_eq!(Signal::High.invert(), Signal::Low);
        assert_eq!(Signal::Low.invert(), Signal::High);
        assert_eq!(Signal::Floating.invert(), Signal::Undefined);
        assert_eq!(Signal::Undefined.invert(), Signal::Undefined);
    }
}
