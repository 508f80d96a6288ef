//! Technology data structures.
//!
//! Technologies are pure reference data shipped to clients with the
//! ruleset. Nothing in the simulation researches them.

use serde::{Deserialize, Serialize};

use crate::economy::Resources;

/// A single technology definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechData {
    /// Stable key.
    pub key: String,

    /// Display name.
    pub name: String,

    /// Research cost, normally science only.
    #[serde(default)]
    pub cost: Resources,

    /// Human readable effect description.
    #[serde(default)]
    pub description: String,
}
