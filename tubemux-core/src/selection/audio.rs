//! Best audio track selection.

use std::cmp::Reverse;

use crate::catalog::{AudioQualityTier, StreamDescriptor};

/// Codec substring that identifies Opus audio.
const OPUS_CODEC: &str = "opus";

/// Picks the best audio track from `candidates`.
///
/// Candidates are narrowed to medium/high tier default tracks, then to Opus
/// if any survivor is Opus, then ranked by bitrate, sample rate and channel
/// count (descending, stable). When no candidate passes the tier filter the
/// first input candidate is returned as-is.
///
/// Returns `None` only for an empty input.
pub fn select_best_audio(candidates: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    let decent: Vec<&StreamDescriptor> = candidates
        .iter()
        .filter(|candidate| {
            matches!(
                candidate.audio_quality_tier,
                Some(AudioQualityTier::Medium | AudioQualityTier::High)
            ) && candidate.is_default_track != Some(false)
        })
        .collect();

    if decent.is_empty() {
        return candidates.first();
    }

    let opus: Vec<&StreamDescriptor> = decent
        .iter()
        .copied()
        .filter(|candidate| candidate.codec_id.contains(OPUS_CODEC))
        .collect();
    let mut ranked = if opus.is_empty() { decent } else { opus };

    // sort_by_key is stable, ties keep input order
    ranked.sort_by_key(|candidate| {
        Reverse((
            candidate.effective_audio_bitrate(),
            candidate.sample_rate_or_zero(),
            candidate.channel_count_or_zero(),
        ))
    });

    ranked.first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn high(locator: &str) -> StreamDescriptor {
        StreamDescriptor::audio(locator).with_tier(AudioQualityTier::High)
    }

    #[test]
    fn test_empty_input_is_absent() {
        assert!(select_best_audio(&[]).is_none());
    }

    #[test]
    fn test_higher_bitrate_wins_over_sample_rate_and_channels() {
        let candidates = vec![
            high("low-bitrate")
                .with_audio_bitrate(64_000)
                .with_sample_rate(96_000)
                .with_channels(6),
            high("high-bitrate")
                .with_audio_bitrate(128_000)
                .with_sample_rate(44_100)
                .with_channels(2),
        ];

        let best = select_best_audio(&candidates).unwrap();
        assert_eq!(best.locator, "high-bitrate");
    }

    #[test]
    fn test_sample_rate_then_channels_break_bitrate_ties() {
        let candidates = vec![
            high("a").with_audio_bitrate(128_000).with_sample_rate(44_100).with_channels(6),
            high("b").with_audio_bitrate(128_000).with_sample_rate(48_000).with_channels(1),
            high("c").with_audio_bitrate(128_000).with_sample_rate(48_000).with_channels(2),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "c");
    }

    #[test]
    fn test_opus_preferred_over_equal_quality() {
        let candidates = vec![
            high("aac").with_codec("mp4a.40.2").with_audio_bitrate(128_000),
            high("opus").with_codec("opus").with_audio_bitrate(128_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "opus");
    }

    #[test]
    fn test_opus_preferred_even_at_lower_bitrate() {
        let candidates = vec![
            high("aac").with_codec("mp4a.40.2").with_audio_bitrate(256_000),
            high("opus").with_codec("opus").with_audio_bitrate(160_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "opus");
    }

    #[test]
    fn test_falls_back_to_first_candidate_when_no_tier_matches() {
        let candidates = vec![
            StreamDescriptor::audio("first").with_audio_bitrate(32_000),
            StreamDescriptor::audio("second")
                .with_tier(AudioQualityTier::Low)
                .with_audio_bitrate(320_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "first");
    }

    #[test]
    fn test_low_tier_never_beats_medium() {
        let candidates = vec![
            StreamDescriptor::audio("low")
                .with_tier(AudioQualityTier::Low)
                .with_audio_bitrate(320_000),
            StreamDescriptor::audio("medium")
                .with_tier(AudioQualityTier::Medium)
                .with_audio_bitrate(64_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "medium");
    }

    #[test]
    fn test_non_default_tracks_are_skipped() {
        let candidates = vec![
            high("dubbed").with_audio_bitrate(256_000).with_default_track(false),
            high("original").with_audio_bitrate(128_000).with_default_track(true),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "original");
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = vec![
            high("first").with_audio_bitrate(128_000),
            high("second").with_audio_bitrate(128_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "first");
    }

    #[test]
    fn test_bitrate_falls_back_when_audio_bitrate_missing() {
        let candidates = vec![
            high("audio-bitrate").with_audio_bitrate(96_000),
            high("plain-bitrate").with_bitrate(160_000),
        ];

        assert_eq!(select_best_audio(&candidates).unwrap().locator, "plain-bitrate");
    }
}
