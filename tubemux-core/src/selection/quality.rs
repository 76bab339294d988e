//! Canonical quality label table.

/// Recognized quality labels, lowest resolution first.
///
/// Labels outside this table (`"1080p60"`, `"4320p"`, `"720p HDR"`) are not
/// offered for selection.
pub const CANONICAL_QUALITIES: [&str; 8] = [
    "144p", "240p", "360p", "480p", "720p", "1080p", "1440p", "2160p",
];

/// Quality requested when a client names none and the fallback policy
/// is active.
pub const DEFAULT_QUALITY: &str = "720p";

/// Returns the canonical entry matching `label`, if any.
pub fn canonical_label(label: &str) -> Option<&'static str> {
    CANONICAL_QUALITIES
        .iter()
        .copied()
        .find(|canonical| *canonical == label)
}

/// Position of `label` in the canonical table.
pub fn canonical_rank(label: &str) -> Option<usize> {
    CANONICAL_QUALITIES.iter().position(|canonical| *canonical == label)
}
