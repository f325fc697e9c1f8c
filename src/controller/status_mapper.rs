//! Mapping of Camunda Cloud readiness strings onto local conditions.
//!
//! The table is closed: a readiness value not listed here maps to
//! `Unavailable` and marks the observation as not up to date. New remote
//! values must be added explicitly.

use crate::crd::ClusterCondition;

pub const READY_HEALTHY: &str = "Healthy";
pub const READY_CREATING: &str = "Creating";
pub const READY_NOT_HEALTHY: &str = "Not Healthy";

/// Condition derived from a remote readiness value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StatusMapping {
    pub condition: ClusterCondition,
    pub up_to_date: bool,
}

/// Map a remote readiness value to a condition.
pub fn map(ready: &str) -> StatusMapping {
    let condition = match ready {
        READY_HEALTHY => ClusterCondition::Available,
        READY_CREATING => ClusterCondition::Creating,
        READY_NOT_HEALTHY => ClusterCondition::Unavailable,
        _ => return unknown(),
    };
    StatusMapping {
        condition,
        up_to_date: true,
    }
}

/// Mapping used when the readiness could not be determined.
pub fn unknown() -> StatusMapping {
    StatusMapping {
        condition: ClusterCondition::Unavailable,
        up_to_date: false,
    }
}
