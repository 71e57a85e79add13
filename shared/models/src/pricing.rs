//! Pricing value objects shared by the catalog and work orders.
//!
//! Every priced quantity is split into two billing channels: non-remote and
//! remote sites.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// A single channel rate with its human-readable label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Rate {
    pub amount: f64,
    pub description: String,
}

impl Rate {
    pub fn new(amount: f64, description: impl Into<String>) -> Self {
        Self {
            amount,
            description: description.into(),
        }
    }
}

/// Non-remote / remote rate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RatePair {
    pub non_remote: Rate,
    pub remote: Rate,
}

impl RatePair {
    pub fn new(non_remote: Rate, remote: Rate) -> Self {
        Self { non_remote, remote }
    }

    /// Price a BOQ volume against this pair.
    pub fn amount_for(&self, volume: &BoqVolume) -> f64 {
        volume.non_remote * self.non_remote.amount + volume.remote * self.remote.amount
    }

    /// True when both channel amounts match, ignoring labels.
    pub fn same_amounts(&self, other: &RatePair) -> bool {
        self.non_remote.amount == other.non_remote.amount
            && self.remote.amount == other.remote.amount
    }
}

/// Contracted quantity per billing channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BoqVolume {
    #[validate(range(min = 0.0, message = "Non-remote volume must be non-negative"))]
    pub non_remote: f64,
    #[validate(range(min = 0.0, message = "Remote volume must be non-negative"))]
    pub remote: f64,
}

impl BoqVolume {
    pub fn new(non_remote: f64, remote: f64) -> Self {
        Self { non_remote, remote }
    }
}
