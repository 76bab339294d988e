//! Video quality discovery and best video track selection.

use std::cmp::Reverse;
use std::collections::HashSet;

use super::quality::CANONICAL_QUALITIES;
use crate::catalog::StreamDescriptor;

/// Distinct canonical quality labels present in `candidates`, lowest first.
pub fn unique_qualities(candidates: &[StreamDescriptor]) -> Vec<&'static str> {
    let present: HashSet<&str> = candidates
        .iter()
        .filter_map(|candidate| candidate.quality_label.as_deref())
        .collect();

    CANONICAL_QUALITIES
        .iter()
        .copied()
        .filter(|label| present.contains(label))
        .collect()
}

/// Picks the best video track carrying exactly `label`.
///
/// Ranks matches by frame rate, then bitrate, both descending. Equal
/// candidates keep their input order.
pub fn select_best_video<'a>(
    candidates: &'a [StreamDescriptor],
    label: &str,
) -> Option<&'a StreamDescriptor> {
    let mut matching: Vec<&StreamDescriptor> = candidates
        .iter()
        .filter(|candidate| candidate.quality_label.as_deref() == Some(label))
        .collect();

    matching.sort_by_key(|candidate| {
        Reverse((candidate.frame_rate_or_zero(), candidate.bitrate_or_zero()))
    });

    matching.first().copied()
}
