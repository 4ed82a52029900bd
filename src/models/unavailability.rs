use serde::{Deserialize, Serialize};

use super::DateRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailabilityBlock {
    pub id: String,
    pub vehicle_id: String,
    pub range: DateRange,
    pub reason: Option<String>,
    pub kind: BlockKind,
    pub created_by: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Maintenance,
    Hold,
    Manual,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Maintenance => "maintenance",
            BlockKind::Hold => "hold",
            BlockKind::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "hold" => BlockKind::Hold,
            "manual" => BlockKind::Manual,
            _ => BlockKind::Maintenance,
        }
    }
}
