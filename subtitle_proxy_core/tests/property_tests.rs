//! Property tests for cache keys and subtitle conversion

use proptest::prelude::*;
use subtitle_proxy_core::format::{Timestamp, convert, validate_srt, validate_vtt};
use subtitle_proxy_core::{CacheKey, SearchCriteria, SubtitleFormat};

fn srt_time(ms: u64) -> String {
    Timestamp::from_millis(ms).to_srt()
}

prop_compose! {
    fn cue()(start in 0u64..36_000_000, length in 1u64..10_000,
             lines in prop::collection::vec("[A-Za-z][A-Za-z ,.!?']{0,30}", 1..3))
             -> (u64, u64, Vec<String>) {
        (start, start + length, lines)
    }
}

fn srt_document(cues: &[(u64, u64, Vec<String>)]) -> String {
    cues.iter()
        .enumerate()
        .map(|(i, (start, end, lines))| {
            format!(
                "{}\n{} --> {}\n{}\n",
                i + 1,
                srt_time(*start),
                srt_time(*end),
                lines.join("\n")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

proptest! {
    #[test]
    fn prop_cache_key_ignores_parameter_order(
        params in prop::collection::btree_map("[a-z]{1,8}", "[ -~]{0,16}", 1..6),
        seed in any::<u64>(),
    ) {
        let forward: Vec<(&str, &str)> =
            params.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let mut shuffled = forward.clone();
        let len = shuffled.len();
        shuffled.rotate_left((seed as usize) % len);
        shuffled.reverse();

        prop_assert_eq!(
            CacheKey::from_params("search", &forward),
            CacheKey::from_params("search", &shuffled)
        );
    }

    #[test]
    fn prop_cache_key_separates_fields(a in "[a-z]{1,6}", b in "[a-z]{1,6}") {
        let joined = format!("{a}{b}");
        let split = CacheKey::from_params("content", &[("k", a.as_str()), ("v", b.as_str())]);
        let merged = CacheKey::from_params("content", &[("k", joined.as_str()), ("v", "")]);
        prop_assert_ne!(split, merged);
    }

    #[test]
    fn prop_language_order_does_not_change_search_key(
        languages in prop::collection::vec("[a-z]{2,3}", 1..5),
    ) {
        let mut reversed = languages.clone();
        reversed.reverse();

        let a = SearchCriteria::imdb_id("tt0120338").with_languages(languages.clone());
        let b = SearchCriteria::imdb_id("120338").with_languages(reversed);
        prop_assert_eq!(a.normalized().cache_key(), b.normalized().cache_key());
    }

    #[test]
    fn prop_timestamp_millis_round_trip(ms in 0u64..360_000_000) {
        let ts = Timestamp::from_millis(ms);
        prop_assert_eq!(ts.as_millis(), ms);
        prop_assert_eq!(Timestamp::parse(&ts.to_vtt()), Some(ts));
        prop_assert_eq!(Timestamp::parse(&ts.to_srt()), Some(ts));
    }

    #[test]
    fn prop_srt_vtt_round_trip(cues in prop::collection::vec(cue(), 1..8)) {
        let srt = srt_document(&cues);
        let vtt = convert(&srt, SubtitleFormat::Srt, SubtitleFormat::Vtt);

        prop_assert!(validate_vtt(&vtt));
        prop_assert!(!vtt.lines().any(|line| line.contains("-->") && line.contains(',')));

        let back = convert(&vtt, SubtitleFormat::Vtt, SubtitleFormat::Srt);
        prop_assert!(validate_srt(&back));
        prop_assert_eq!(back, srt);
    }

    #[test]
    fn prop_same_format_is_identity(text in "[ -~\n]{0,200}") {
        prop_assert_eq!(convert(&text, SubtitleFormat::Srt, SubtitleFormat::Srt), text.clone());
        prop_assert_eq!(convert(&text, SubtitleFormat::Vtt, SubtitleFormat::Vtt), text);
    }
}
