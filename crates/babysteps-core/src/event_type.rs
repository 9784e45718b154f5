//! Event type enum as the single source of truth for event type strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical care event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Feed,
    Diaper,
    Sleep,
    Pump,
    Med,
    Note,
    Misc,
}

impl EventType {
    /// All event types in display order.
    pub const ALL: [Self; 7] = [
        Self::Feed,
        Self::Diaper,
        Self::Sleep,
        Self::Pump,
        Self::Med,
        Self::Note,
        Self::Misc,
    ];

    /// Stored string for this type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Feed => "feed",
            Self::Diaper => "diaper",
            Self::Sleep => "sleep",
            Self::Pump => "pump",
            Self::Med => "med",
            Self::Note => "note",
            Self::Misc => "misc",
        }
    }

    /// Human-readable label used in confirmations and listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Feed => "Feed",
            Self::Diaper => "Diaper",
            Self::Sleep => "Sleep",
            Self::Pump => "Pump",
            Self::Med => "Medication",
            Self::Note => "Note",
            Self::Misc => "Misc",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feed" => Ok(Self::Feed),
            "diaper" => Ok(Self::Diaper),
            "sleep" => Ok(Self::Sleep),
            "pump" => Ok(Self::Pump),
            "med" | "medication" => Ok(Self::Med),
            "note" => Ok(Self::Note),
            "misc" => Ok(Self::Misc),
            _ => Err(UnknownEventType(s.to_string())),
        }
    }
}

impl Serialize for EventType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown event type strings.
#[derive(Debug, Clone)]
pub struct UnknownEventType(String);

impl fmt::Display for UnknownEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown event type: {}", self.0)
    }
}

impl std::error::Error for UnknownEventType {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_stored_string() {
        for variant in EventType::ALL {
            let parsed: EventType = variant.as_str().parse().expect("should parse");
            assert_eq!(parsed, variant, "parse failed for {variant:?}");
        }
    }

    #[test]
    fn medication_alias_parses() {
        let med: EventType = "medication".parse().expect("should parse");
        assert_eq!(med, EventType::Med);
        assert_eq!(med.label(), "Medication");
    }

    #[test]
    fn unknown_type_errors() {
        let err = "bath".parse::<EventType>().unwrap_err();
        assert_eq!(err.to_string(), "unknown event type: bath");
    }
}
