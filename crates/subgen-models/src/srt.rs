//! SRT subtitle document formatting.

use std::fmt::Write;

use crate::segment::Segment;

/// Render a millisecond offset as `HH:MM:SS.mmm`.
pub fn format_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Render segments as an SRT document.
///
/// Entries are 1-based and every entry, including the last, is followed by a
/// blank line.
pub fn format_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (index, segment) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(segment.start_ms),
            format_timestamp(segment.end_ms),
            segment.text
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_timestamp(raw: &str) -> u64 {
        let (hms, millis) = raw.split_once('.').expect("millisecond separator");
        let parts: Vec<u64> = hms.split(':').map(|p| p.parse().unwrap()).collect();
        assert_eq!(parts.len(), 3);
        (parts[0] * 3600 + parts[1] * 60 + parts[2]) * 1000 + millis.parse::<u64>().unwrap()
    }

    #[test]
    fn single_segment_body() {
        let srt = format_srt(&[Segment::new("hi", 0, 1000)]);
        assert_eq!(srt, "1\n00:00:00.000 --> 00:00:01.000\nhi\n\n");
    }

    #[test]
    fn entries_are_numbered_and_separated() {
        let srt = format_srt(&[
            Segment::new("first", 0, 1500),
            Segment::new("second", 1500, 62_030),
        ]);
        assert_eq!(
            srt,
            "1\n00:00:00.000 --> 00:00:01.500\nfirst\n\n\
             2\n00:00:01.500 --> 00:01:02.030\nsecond\n\n"
        );
    }

    #[test]
    fn timestamp_zero_padding() {
        assert_eq!(format_timestamp(0), "00:00:00.000");
        assert_eq!(format_timestamp(7), "00:00:00.007");
        assert_eq!(format_timestamp(59_999), "00:00:59.999");
        assert_eq!(format_timestamp(3_600_000), "01:00:00.000");
        assert_eq!(format_timestamp(10 * 3_600_000 + 42_017), "10:00:42.017");
    }

    #[test]
    fn timestamps_round_trip_milliseconds() {
        for ms in [0, 1, 999, 1000, 61_001, 3_599_999, 3_600_000, 86_399_999] {
            assert_eq!(parse_timestamp(&format_timestamp(ms)), ms);
        }
    }

    #[test]
    fn segment_count_matches_entry_count() {
        let segments: Vec<Segment> = (0..5)
            .map(|i| Segment::new(format!("line {i}"), i * 1000, i * 1000 + 900))
            .collect();
        let srt = format_srt(&segments);
        let entries = srt.split("\n\n").filter(|e| !e.is_empty()).count();
        assert_eq!(entries, segments.len());
    }

    #[test]
    fn empty_transcript_renders_empty_document() {
        assert_eq!(format_srt(&[]), "");
    }
}
