//! # Wire format for remote executors.
//!
//! When executors live in another process, the coordinator sends a
//! [`UnitAssignment`] and gets back a [`UnitReport`]. Both carry the [`RunId`] so a
//! report that arrives after its run was reset can be recognised and dropped.
//!
//! Encoding is JSON; big integers travel as decimal strings.
//!
//! ```text
//! {"run":7,"unit":{"id":2,"start":3,"end":4}}
//! {"run":7,"result":{"outcome":"success","unit_id":2,"value":"12","elapsed":{"secs":0,"nanos":41000}}}
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::units::{RunId, WorkResult, WorkUnit};

/// Malformed or unencodable wire message.
#[derive(Debug, Error)]
#[error("wire codec error: {0}")]
pub struct WireError(#[from] serde_json::Error);

/// A unit handed to a (remote) executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitAssignment {
    pub run: RunId,
    pub unit: WorkUnit,
}

/// The result of an attempt, sent back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub run: RunId,
    pub result: WorkResult,
}

impl UnitAssignment {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(raw)?)
    }
}

impl UnitReport {
    pub fn to_json(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// `true` if the report answers `assignment` (same run and unit).
    pub fn answers(&self, assignment: &UnitAssignment) -> bool {
        self.run == assignment.run && self.result.unit_id() == assignment.unit.id()
    }
}
