//! The merger: reconciling multiple captures of one conversation.
//!
//! Exports of the same conversation taken at different times overlap:
//! the tail of an older export reappears at the head of a newer one, with
//! messages deleted, media resolved differently, or truncated at either
//! end. The merger aligns such sequences by an integer *offset* between
//! their order values, verifies the alignment by fuzzy matching (equal
//! senders, timestamps within 61 seconds, exact content for original
//! messages), and folds the aligned pairs into single records.
//!
//! The merger is strict where the parser is lenient: when overlapping
//! sequences cannot be aligned it fails with
//! [`UnreconcilableOverlap`](crate::ChatstitchError::UnreconcilableOverlap)
//! instead of guessing, and after every group merge it verifies that no
//! original content was lost and that orders are contiguous from zero.
//!
//! # Example
//!
//! ```
//! use chatstitch::media::MediaTable;
//! use chatstitch::merge::merge_all;
//! use chatstitch::parser::{ParserConfig, TranscriptParser};
//!
//! let parser = TranscriptParser::new(ParserConfig::default());
//! let table = MediaTable::new();
//! let text = "28/07/20, 7:35 pm - Alice: Hi\n28/07/20, 7:36 pm - Bob: Hello";
//!
//! // The same transcript captured twice merges back to itself.
//! let mut msgs = parser.parse_str(text, "g", 0, &table)?;
//! msgs.extend(parser.parse_str(text, "g", 1, &table)?);
//! let merged = merge_all(msgs)?;
//! assert_eq!(merged.len(), 2);
//! # Ok::<(), chatstitch::ChatstitchError>(())
//! ```

use std::collections::{BTreeMap, HashSet};

use chrono::Duration;

use crate::error::{ChatstitchError, Result};
use crate::group::{canonical_sort, group_messages};
use crate::message::Msg;

/// Candidate offsets are only derived from record pairs this close in
/// time.
const CANDIDATE_WINDOW_SECS: i64 = 60;

/// Aligned records may disagree on time by at most this much.
const MATCH_TOLERANCE_SECS: i64 = 61;

/// More than this many positional matches accepts an offset outright.
const DEFINITE_MATCHES: usize = 20;

/// Minimum positional matches for an offset to stay a candidate (unless
/// the sequences are short; see [`score_offset`]).
const MIN_MATCHES: usize = 3;

/// How well an offset aligned two sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffsetScore {
    /// Enough consecutive matches to stop searching.
    Definite,
    /// Acceptable; the match count is the tie-break weight.
    Partial(usize),
}

/// Merges a whole batch: groups records by conversation and merges each
/// group, concatenating the per-group results in deterministic group
/// order.
pub fn merge_all(msgs: Vec<Msg>) -> Result<Vec<Msg>> {
    let mut merged = Vec::new();
    for group in group_messages(msgs).into_values() {
        merged.extend(merge_group(group)?);
    }
    Ok(merged)
}

/// Merges all records of one conversation, possibly spanning several
/// originating files, into one deduplicated contiguously-ordered
/// sequence.
pub fn merge_group(msgs: Vec<Msg>) -> Result<Vec<Msg>> {
    if msgs.is_empty() {
        return Ok(msgs);
    }
    let group_id = msgs[0].group_id.clone();
    if let Some(stray) = msgs.iter().find(|m| m.group_id != group_id) {
        return Err(ChatstitchError::MixedGroup {
            first: group_id,
            second: stray.group_id.clone(),
        });
    }

    // Snapshot for the completeness check: no original content may be
    // lost by merging.
    let content_in: HashSet<String> = msgs
        .iter()
        .filter(|m| m.is_original())
        .map(|m| m.content.clone())
        .collect();

    let mut buckets = bucket_by_file(msgs);
    if buckets.len() == 1 {
        log::info!("Only one file in group '{}'. No need to merge.", group_id);
        let only = buckets.pop().unwrap_or_default();
        check_contiguous_orders(&only, &group_id)?;
        return Ok(only);
    }

    log::info!("Merging {} files from group '{}'...", buckets.len(), group_id);

    // Deterministic reduction order: the accumulator starts at the
    // highest file index and folds downward. The matching heuristic is
    // not proven order-independent for 3+ buckets, so the order is fixed
    // here rather than left to container iteration.
    let mut merged = buckets.pop().unwrap_or_default();
    while let Some(next) = buckets.pop() {
        merged = merge_pair(merged, next)?;
    }

    let content_out: HashSet<&str> = merged
        .iter()
        .filter(|m| m.is_original())
        .map(|m| m.content.as_str())
        .collect();
    let missing: Vec<String> = content_in
        .iter()
        .filter(|c| !content_out.contains(c.as_str()))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ChatstitchError::content_loss(group_id, missing));
    }
    check_contiguous_orders(&merged, &group_id)?;

    log::info!("Merged group '{}' to {} messages", group_id, merged.len());
    Ok(merged)
}

/// Merges two per-file sequences of the same conversation.
///
/// Each input must be internally consistent (unique order values). The
/// output has orders reassigned to `{0..n-1}`.
pub fn merge_pair(mut a: Vec<Msg>, mut b: Vec<Msg>) -> Result<Vec<Msg>> {
    check_unique_orders(&a)?;
    check_unique_orders(&b)?;

    let mut merged = if a.is_empty() || b.is_empty() {
        a.append(&mut b);
        a
    } else {
        // The alignment code assumes A starts no later than B.
        if a[0].timestamp > b[0].timestamp {
            std::mem::swap(&mut a, &mut b);
        }
        if a[a.len() - 1].timestamp < b[0].timestamp {
            // Disjoint in time: plain concatenation.
            a.append(&mut b);
            a
        } else {
            let offset = find_offset(&a, &b)?;
            merge_with_offset(&a, &b, offset)?
        }
    };

    for (i, msg) in merged.iter_mut().enumerate() {
        msg.order = i;
    }
    Ok(merged)
}

/// Buckets one group's records by originating file, each bucket in
/// canonical order, ascending file index.
fn bucket_by_file(mut msgs: Vec<Msg>) -> Vec<Vec<Msg>> {
    canonical_sort(&mut msgs);
    let mut by_file: BTreeMap<usize, Vec<Msg>> = BTreeMap::new();
    for msg in msgs {
        by_file.entry(msg.file_idx).or_default().push(msg);
    }
    by_file.into_values().collect()
}

/// Finds the offset `o` such that `b[i]` describes the same real message
/// as `a[i + o]`.
///
/// Candidates come only from record pairs within a minute of each other;
/// each untried candidate is scored and the search returns as soon as one
/// scores a definite match, otherwise the best-scoring candidate wins
/// (first tried wins ties). No acceptable candidate at all is the fatal
/// unreconcilable-overlap failure.
fn find_offset(a: &[Msg], b: &[Msg]) -> Result<i64> {
    let window = Duration::seconds(CANDIDATE_WINDOW_SECS);
    let mut checked: HashSet<i64> = HashSet::new();
    let mut best: Option<(i64, usize)> = None;

    for ma in a {
        // Records ending more than a minute before B starts cannot pair
        // with anything.
        if b[0].timestamp - ma.timestamp > window {
            continue;
        }
        for mb in b {
            if ma.timestamp - mb.timestamp > window {
                continue; // mb too early
            }
            if mb.timestamp - ma.timestamp > window {
                break; // B is sorted; the rest are later still
            }
            let offset = ma.order as i64 - mb.order as i64;
            if !checked.insert(offset) {
                continue;
            }
            match score_offset(a, b, offset) {
                Some(OffsetScore::Definite) => return Ok(offset),
                Some(OffsetScore::Partial(score)) => {
                    if best.is_none_or(|(_, s)| score > s) {
                        best = Some((offset, score));
                    }
                }
                None => {}
            }
        }
    }

    match best {
        Some((offset, _)) => Ok(offset),
        None => Err(ChatstitchError::unreconcilable(&a[0].group_id)),
    }
}

/// Scores one candidate offset.
///
/// Walks every aligned position where both sides exist. Senders must be
/// equal and timestamps within 61 seconds, or the offset is rejected
/// outright; content must match exactly unless either side is a
/// deleted/omitted sentinel. More than 20 matches accepts immediately;
/// otherwise the offset is kept when it matched at least 3 positions, or
/// at least half of the shorter sequence (and at least one).
fn score_offset(a: &[Msg], b: &[Msg], offset: i64) -> Option<OffsetScore> {
    let la = a.len() as i64;
    let lb = b.len() as i64;
    let start = 0.max(-offset);
    let end = lb.min(la - offset);
    let mut matches = 0usize;

    for i in start..end {
        let ma = &a[(i + offset) as usize];
        let mb = &b[i as usize];

        if ma.sender_id != mb.sender_id {
            return None;
        }
        if (ma.timestamp - mb.timestamp).num_seconds().abs() > MATCH_TOLERANCE_SECS {
            return None;
        }
        if !ma.is_original() || !mb.is_original() {
            continue;
        }
        if ma.content != mb.content {
            return None;
        }
        matches += 1;
        if matches > DEFINITE_MATCHES {
            return Some(OffsetScore::Definite);
        }
    }

    let half_shorter = a.len().min(b.len()) / 2;
    if matches >= MIN_MATCHES || (matches > 0 && matches >= half_shorter) {
        Some(OffsetScore::Partial(matches))
    } else {
        None
    }
}

/// Produces the merged sequence for a verified offset, walking the full
/// union of valid indices on either side.
fn merge_with_offset(a: &[Msg], b: &[Msg], offset: i64) -> Result<Vec<Msg>> {
    let la = a.len() as i64;
    let lb = b.len() as i64;
    let start = 0.min(-offset);
    let end = lb.max(la - offset);
    let mut merged = Vec::with_capacity(a.len().max(b.len()));

    for i in start..end {
        let ai = i + offset;
        let ma = (ai >= 0 && ai < la).then(|| &a[ai as usize]);
        let mb = (i >= 0 && i < lb).then(|| &b[i as usize]);
        match (ma, mb) {
            (Some(ma), Some(mb)) => merged.push(combine(ma, mb)?),
            (Some(ma), None) => merged.push(ma.clone()),
            (None, Some(mb)) => merged.push(mb.clone()),
            (None, None) => {}
        }
    }
    Ok(merged)
}

/// Folds one aligned pair into a single record.
///
/// The sender must agree, as a correctness check on the alignment. The
/// record ranking higher under the content-preference order contributes
/// timestamp, source, content, and media fields; the B side wins ties,
/// so a later capture's resolved media beats an earlier bare one.
fn combine(a: &Msg, b: &Msg) -> Result<Msg> {
    if a.sender_id != b.sender_id {
        return Err(ChatstitchError::alignment_mismatch(&a.sender_id, &b.sender_id));
    }
    let winner = if b.content_rank() >= a.content_rank() { b } else { a };
    let mut merged = winner.clone();
    merged.sender_id = a.sender_id.clone();
    merged.group_id = a.group_id.clone();
    Ok(merged)
}

fn check_unique_orders(msgs: &[Msg]) -> Result<()> {
    let orders: HashSet<usize> = msgs.iter().map(|m| m.order).collect();
    if orders.len() != msgs.len() {
        return Err(ChatstitchError::DuplicateOrder {
            file_idx: msgs.first().map_or(0, |m| m.file_idx),
        });
    }
    Ok(())
}

fn check_contiguous_orders(msgs: &[Msg], group_id: &str) -> Result<()> {
    let mut orders: Vec<usize> = msgs.iter().map(|m| m.order).collect();
    orders.sort_unstable();
    if orders.iter().enumerate().any(|(i, &o)| i != o) {
        return Err(ChatstitchError::order_gap(group_id));
    }
    Ok(())
}
