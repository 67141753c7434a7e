use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

/// Label used for streams without a recognizable quality token
pub const UNKNOWN_QUALITY: &str = "Unknown";

/// Display priority of quality buckets, compared case-insensitively
pub const QUALITY_ORDER: &[&str] = &["4K", "2160P", "1080P", "720P", "480P", "UNKNOWN"];

static QUALITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(4K|2160p|1080p|720p|480p|HDR|DV|Dolby Vision)\b").unwrap()
});
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*(GB|MB)").unwrap());
static CODEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(HEVC|H\.?265|H\.?264|x265|x264|AV1)\b").unwrap());
static AUDIO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(Atmos|DTS-HD|DTS|TrueHD|DD\+?5\.1|AAC|AC3)\b").unwrap()
});
static SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(BluRay|BDRip|WEB-DL|WEBRip|HDTV|DVDRip|Remux)\b").unwrap()
});

// Evaluated in this order; every matching pattern contributes one entry.
static LANGUAGE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\b(Russian|Русский|RUS|Рус)\b",
        r"(?i)\b(English|ENG|Англ)\b",
        r"(?i)\b(Ukrainian|Ukr|Укр)\b",
        r"(?i)\b(Multi|Dual|Много)\b",
        r"(?i)\b(German|Ger|Deu)\b",
        r"(?i)\b(French|Fre|Fra)\b",
        r"(?i)\b(Spanish|Spa|Esp)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Tags extracted from a free-text stream title
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedTag {
    pub full: String,
    pub quality: Option<String>,
    pub size: Option<String>,
    pub codec: Option<String>,
    pub audio: Option<String>,
    pub languages: Vec<String>,
    pub source: Option<String>,
}

impl ParsedTag {
    /// Quality bucket this title sorts into
    pub fn bucket(&self) -> &str {
        self.quality.as_deref().unwrap_or(UNKNOWN_QUALITY)
    }

    /// "1080P • X265 • 4.2 GB • Atmos"
    pub fn summary(&self) -> String {
        [&self.quality, &self.codec, &self.size, &self.audio]
            .into_iter()
            .flatten()
            .join(" • ")
    }
}

fn first_capture(re: &Regex, title: &str) -> Option<String> {
    re.captures(title)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub fn parse(raw_title: &str) -> ParsedTag {
    let size = SIZE_RE
        .captures(raw_title)
        .map(|caps| format!("{} {}", &caps[1], caps[2].to_uppercase()));

    let languages = LANGUAGE_RES
        .iter()
        .filter_map(|re| first_capture(re, raw_title))
        .collect();

    ParsedTag {
        full: raw_title.to_string(),
        quality: first_capture(&QUALITY_RE, raw_title).map(|q| q.to_uppercase()),
        size,
        codec: first_capture(&CODEC_RE, raw_title).map(|c| c.to_uppercase()),
        audio: first_capture(&AUDIO_RE, raw_title),
        languages,
        source: first_capture(&SOURCE_RE, raw_title),
    }
}

/// Position of a bucket label in the display priority; unknown labels go last
pub fn quality_rank(label: &str) -> usize {
    QUALITY_ORDER
        .iter()
        .position(|q| q.eq_ignore_ascii_case(label))
        .unwrap_or(QUALITY_ORDER.len())
}

/// Bucket labels in order of first appearance
pub fn quality_buckets(tags: &[ParsedTag]) -> Vec<String> {
    tags.iter().map(|t| t.bucket().to_string()).unique().collect()
}

/// Indices of `tags` grouped by bucket, buckets ordered by priority.
///
/// Both the bucket sort and the grouping are stable, so equal buckets keep
/// first-appearance order and items keep response order inside a bucket.
pub fn display_order(tags: &[ParsedTag]) -> Vec<usize> {
    let mut buckets = quality_buckets(tags);
    buckets.sort_by_key(|b| quality_rank(b));

    buckets
        .iter()
        .flat_map(|bucket| {
            tags.iter()
                .enumerate()
                .filter(move |(_, t)| t.bucket() == bucket)
                .map(|(i, _)| i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_title() {
        let tag = parse("Dune.Part.Two.2024.2160p.WEB-DL.DDP5.1.Atmos.HEVC 💾 18.5 GB English");
        assert_eq!(tag.quality.as_deref(), Some("2160P"));
        assert_eq!(tag.size.as_deref(), Some("18.5 GB"));
        assert_eq!(tag.codec.as_deref(), Some("HEVC"));
        assert_eq!(tag.audio.as_deref(), Some("Atmos"));
        assert_eq!(tag.source.as_deref(), Some("WEB-DL"));
        assert_eq!(tag.languages, vec!["English".to_string()]);
    }

    #[test]
    fn test_quality_uppercased_regardless_of_context() {
        assert_eq!(parse("movie 1080p x264").quality.as_deref(), Some("1080P"));
        assert_eq!(parse("[720P]").quality.as_deref(), Some("720P"));
        assert_eq!(parse("Some 4k remux").quality.as_deref(), Some("4K"));
        assert_eq!(parse("Film Dolby Vision").quality.as_deref(), Some("DOLBY VISION"));
    }

    #[test]
    fn test_missing_dimensions_are_empty() {
        let tag = parse("Just a plain name");
        assert_eq!(tag.quality, None);
        assert_eq!(tag.size, None);
        assert_eq!(tag.codec, None);
        assert_eq!(tag.audio, None);
        assert_eq!(tag.source, None);
        assert!(tag.languages.is_empty());
        assert_eq!(tag.bucket(), UNKNOWN_QUALITY);
        assert_eq!(tag.summary(), "");

        let empty = parse("");
        assert_eq!(empty.full, "");
        assert_eq!(empty.quality, None);
    }

    #[test]
    fn test_quality_needs_word_boundary() {
        assert_eq!(parse("abc1080pxyz").quality, None);
    }

    #[test]
    fn test_size_unit_uppercased() {
        assert_eq!(parse("700mb").size.as_deref(), Some("700 MB"));
        assert_eq!(parse("size 1.4 gb").size.as_deref(), Some("1.4 GB"));
    }

    #[test]
    fn test_codec_variants() {
        assert_eq!(parse("H.265 10bit").codec.as_deref(), Some("H.265"));
        assert_eq!(parse("x265").codec.as_deref(), Some("X265"));
        assert_eq!(parse("av1 opus").codec.as_deref(), Some("AV1"));
    }

    #[test]
    fn test_languages_accumulate_in_pattern_order() {
        let tag = parse("ENG RUS Multi subs");
        assert_eq!(tag.languages, vec!["RUS", "ENG", "Multi"]);
    }

    #[test]
    fn test_cyrillic_language_tokens() {
        let tag = parse("Фильм 1080p Рус Укр");
        assert_eq!(tag.languages, vec!["Рус", "Укр"]);
    }

    #[test]
    fn test_summary_skips_missing_parts() {
        let tag = parse("1080p 2.1 GB AAC");
        assert_eq!(tag.summary(), "1080P • 2.1 GB • AAC");
    }

    #[test]
    fn test_quality_rank() {
        assert_eq!(quality_rank("4K"), 0);
        assert_eq!(quality_rank("1080P"), 2);
        assert_eq!(quality_rank("Unknown"), 5);
        assert_eq!(quality_rank("HDR"), QUALITY_ORDER.len());
    }

    #[test]
    fn test_display_order_groups_and_sorts() {
        let tags: Vec<ParsedTag> = ["a 720p", "b", "c 1080p", "d 720p", "e 2160p", "f HDR"]
            .iter()
            .map(|t| parse(t))
            .collect();

        // 2160P, 1080P, 720P (a, d), Unknown, then unrecognized HDR
        assert_eq!(display_order(&tags), vec![4, 2, 0, 3, 1, 5]);
    }

    #[test]
    fn test_display_order_is_stable_for_unrecognized_labels() {
        let tags: Vec<ParsedTag> = ["x DV", "y HDR", "z DV", "w 480p"]
            .iter()
            .map(|t| parse(t))
            .collect();

        assert_eq!(display_order(&tags), vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_quality_buckets_first_appearance() {
        let tags: Vec<ParsedTag> = ["720p", "none", "1080p", "720p"]
            .iter()
            .map(|t| parse(t))
            .collect();
        assert_eq!(quality_buckets(&tags), vec!["720P", "Unknown", "1080P"]);
    }
}
