//! Boundary conditions and failure-path behavior.

use chatstitch::prelude::*;

fn parser() -> TranscriptParser {
    TranscriptParser::new(ParserConfig::new())
}

fn parse(text: &str, file_idx: usize) -> Vec<Msg> {
    parser()
        .parse_str(text, "g", file_idx, &MediaTable::new())
        .unwrap()
}

#[test]
fn empty_transcript_parses_to_empty() {
    assert!(parse("", 0).is_empty());
    assert!(parse("\n\n\n", 0).is_empty());
}

#[test]
fn continuation_only_transcript_parses_to_empty() {
    assert!(parse("no header here\nnor here", 0).is_empty());
}

#[test]
fn action_only_transcript_parses_to_empty() {
    let text = "\
28/07/20, 7:18 pm - Messages to this group are now secured with end-to-end encryption. Tap for more info.
28/07/20, 7:30 pm - Someone joined using this group's invite link";
    assert!(parse(text, 0).is_empty());
}

#[test]
fn action_line_closes_open_message_without_a_record() {
    let text = "\
28/07/20, 7:50 pm - A: last words
28/07/20, 8:31 pm - A left";
    let msgs = parse(text, 0);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].content, "last words");
}

#[test]
fn bad_time_is_fatal_even_mid_file() {
    let text = "\
28/07/20, 7:50 pm - A: fine so far
28/07/20, 77:99 pm - A: broken clock";
    let err = parser()
        .parse_str(text, "g", 0, &MediaTable::new())
        .unwrap_err();
    assert!(err.is_timestamp());
}

#[test]
fn disjoint_time_ranges_merge_to_concatenation() {
    let morning = "\
28/07/20, 9:00 am - A: early
28/07/20, 9:01 am - B: very early";
    let evening = "\
28/07/20, 9:00 pm - A: late
28/07/20, 9:01 pm - B: very late";

    let mut msgs = parse(morning, 0);
    msgs.extend(parse(evening, 1));
    let merged = merge_all(msgs).unwrap();

    let contents: Vec<&str> = merged.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["early", "very early", "late", "very late"]);
    let orders: Vec<usize> = merged.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![0, 1, 2, 3]);
}

#[test]
fn deleted_message_restored_from_other_capture() {
    let with_deleted = format!(
        "28/07/20, 7:35 pm - A: Hi\n28/07/20, 7:36 pm - B: {}\n28/07/20, 7:37 pm - A: Bye",
        MSG_DELETED
    );
    let intact = "\
28/07/20, 7:35 pm - A: Hi
28/07/20, 7:36 pm - B: the real text
28/07/20, 7:37 pm - A: Bye";

    let mut msgs = parse(&with_deleted, 0);
    msgs.extend(parse(intact, 1));
    let merged = merge_all(msgs).unwrap();

    assert_eq!(merged.len(), 3);
    assert_eq!(merged[1].content, "the real text");
}

#[test]
fn omitted_media_does_not_block_alignment() {
    let capture_a = format!(
        "28/07/20, 7:35 pm - A: Hi\n28/07/20, 7:36 pm - A: {}\n28/07/20, 7:37 pm - A: Bye",
        MEDIA_OMITTED
    );
    let capture_b = "\
28/07/20, 7:35 pm - A: Hi
28/07/20, 7:36 pm - A: IMG-1.jpg (file attached)
28/07/20, 7:37 pm - A: Bye";

    let mut msgs = parse(&capture_a, 0);
    msgs.extend(parse(capture_b, 1));
    let merged = merge_all(msgs).unwrap();

    assert_eq!(merged.len(), 3);
    // The attachment beats the omitted sentinel.
    assert_eq!(merged[1].content, "IMG-1.jpg (file attached)");
    assert!(merged[1].has_media);
}

#[test]
fn overlap_with_too_few_matches_is_unreconcilable() {
    // Timestamps interleave, senders agree, but no content ever matches:
    // no offset reaches the acceptance thresholds.
    let a = "\
28/07/20, 7:35 pm - A: one
28/07/20, 7:35 pm - A: two
28/07/20, 7:36 pm - A: three";
    let b = "\
28/07/20, 7:35 pm - A: four
28/07/20, 7:35 pm - A: five
28/07/20, 7:36 pm - A: six";

    let mut msgs = parse(a, 0);
    msgs.extend(parse(b, 1));
    let err = merge_all(msgs).unwrap_err();
    assert!(err.is_unreconcilable());
}

#[test]
fn merging_empty_batch_is_empty() {
    assert!(merge_all(vec![]).unwrap().is_empty());
}

#[test]
fn single_message_captures_merge() {
    let mut msgs = parse("28/07/20, 7:35 pm - A: only", 0);
    msgs.extend(parse("28/07/20, 7:35 pm - A: only", 1));
    let merged = merge_all(msgs).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].content, "only");
    assert_eq!(merged[0].order, 0);
}
