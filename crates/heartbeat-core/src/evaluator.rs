//! Active/inactive classification of hotspots.

use crate::types::HotspotStatus;

/// Outcome of evaluating one hotspot for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
    pub staleness: u64,
    pub status: HotspotStatus,
    pub changed: bool,
}

/// An evaluated hotspot together with the status it had before this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotEvaluation {
    pub address: String,
    pub name: String,
    pub activity_height: u64,
    pub previous: Option<HotspotStatus>,
    pub evaluation: Evaluation,
}

/// Classify a hotspot by how far its last activity trails the chain.
///
/// `staleness == threshold` still counts as active. An activity height ahead
/// of the chain snapshot (the two are fetched at different moments) yields a
/// staleness of zero. A hotspot with no previous status is never `changed`.
pub fn evaluate(
    activity_height: u64,
    chain_height: u64,
    threshold: u64,
    previous: Option<HotspotStatus>,
) -> Evaluation {
    let staleness = chain_height.saturating_sub(activity_height);
    let status = if staleness <= threshold {
        HotspotStatus::Active
    } else {
        HotspotStatus::Inactive
    };

    Evaluation {
        staleness,
        status,
        changed: previous.is_some_and(|p| p != status),
    }
}
