//! Session coordinates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TelemetryError;

/// One timed track activity within a race weekend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub enum SessionType {
    FP1,
    FP2,
    FP3,
    Q,
    Sprint,
    Race,
}

impl SessionType {
    /// All session types in weekend order.
    pub const ALL: [SessionType; 6] = [
        SessionType::FP1,
        SessionType::FP2,
        SessionType::FP3,
        SessionType::Q,
        SessionType::Sprint,
        SessionType::Race,
    ];

    /// Canonical name used in URLs and fixture file names.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionType::FP1 => "FP1",
            SessionType::FP2 => "FP2",
            SessionType::FP3 => "FP3",
            SessionType::Q => "Q",
            SessionType::Sprint => "Sprint",
            SessionType::Race => "Race",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionType {
    type Err = TelemetryError;

    /// Accepts canonical names case-insensitively plus the provider's
    /// short and long forms (`R`, `S`, `Qualifying`, `Practice 1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let session = match normalized.as_str() {
            "fp1" | "practice 1" => SessionType::FP1,
            "fp2" | "practice 2" => SessionType::FP2,
            "fp3" | "practice 3" => SessionType::FP3,
            "q" | "qualifying" => SessionType::Q,
            "s" | "sprint" => SessionType::Sprint,
            "r" | "race" => SessionType::Race,
            _ => {
                return Err(TelemetryError::validation(
                    "session",
                    format!("unknown session '{}'", s),
                ));
            }
        };
        Ok(session)
    }
}

/// Identifies one timing session: (year, round, session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "typescript", derive(specta::Type))]
pub struct SessionKey {
    pub year: u16,
    pub round: u8,
    pub session: SessionType,
}

impl SessionKey {
    pub const fn new(year: u16, round: u8, session: SessionType) -> Self {
        Self { year, round, session }
    }

    /// Stem used for fixture documents, e.g. `2024_1_Race`.
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.year, self.round, self.session)
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.year, self.round, self.session)
    }
}
