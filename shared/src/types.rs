//! Common types used across the ledger

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Returned when a submitted or stored enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Place where finished goods are held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Manufacturing,
    Transit,
    Wholesale,
}

impl Location {
    pub const ALL: [Location; 3] = [Location::Manufacturing, Location::Transit, Location::Wholesale];

    pub fn as_str(&self) -> &'static str {
        match self {
            Location::Manufacturing => "manufacturing",
            Location::Transit => "transit",
            Location::Wholesale => "wholesale",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Location {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manufacturing" => Ok(Location::Manufacturing),
            "transit" => Ok(Location::Transit),
            "wholesale" => Ok(Location::Wholesale),
            _ => Err(UnknownVariant::new("location", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse_is_case_insensitive() {
        assert_eq!("Transit".parse::<Location>(), Ok(Location::Transit));
        assert_eq!(" wholesale ".parse::<Location>(), Ok(Location::Wholesale));
    }

    #[test]
    fn test_location_parse_rejects_unknown() {
        let err = "warehouse".parse::<Location>().unwrap_err();
        assert_eq!(err.kind, "location");
        assert_eq!(err.value, "warehouse");
    }

    #[test]
    fn test_location_round_trips_through_display() {
        for location in Location::ALL {
            assert_eq!(location.to_string().parse::<Location>(), Ok(location));
        }
    }
}
