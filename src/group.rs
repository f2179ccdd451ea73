//! Grouping records by conversation and the canonical staging sort.
//!
//! A conversation group is everything sharing the same
//! (source kind, source location, group id) triple: the same conversation
//! observed from the same place. Groups are kept in a `BTreeMap` so the
//! grouping order, and with it the multi-file merge reduction downstream,
//! is deterministic rather than whatever a hash map iterates.

use std::collections::BTreeMap;

use crate::message::{Msg, Source};

/// Identity of one conversation group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Where the transcripts came from.
    pub source: Source,

    /// The conversation id shared by the group's records.
    pub group_id: String,
}

impl GroupKey {
    /// Key for one message.
    pub fn of(msg: &Msg) -> Self {
        Self {
            source: msg.source.clone(),
            group_id: msg.group_id.clone(),
        }
    }
}

/// Buckets records by conversation group, each group canonically sorted.
pub fn group_messages(msgs: Vec<Msg>) -> BTreeMap<GroupKey, Vec<Msg>> {
    let mut by_group: BTreeMap<GroupKey, Vec<Msg>> = BTreeMap::new();
    for msg in msgs {
        by_group.entry(GroupKey::of(&msg)).or_default().push(msg);
    }
    for group in by_group.values_mut() {
        canonical_sort(group);
    }
    by_group
}

/// Canonical chronological order within a group: ascending timestamp,
/// ties broken by assigned order, remaining ties put deleted content
/// after non-deleted.
///
/// This is only a staging sort; the merger reassigns final orders.
pub fn canonical_sort(msgs: &mut [Msg]) {
    msgs.sort_by_key(|m| (m.timestamp, m.order, m.is_deleted()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MSG_DELETED, Source};
    use chrono::{NaiveDate, NaiveDateTime};

    fn ts(mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, 28)
            .unwrap()
            .and_hms_opt(19, mi, 0)
            .unwrap()
    }

    fn msg(mi: u32, order: usize, content: &str) -> Msg {
        Msg::new(ts(mi), "a", "g", content).with_order(order)
    }

    #[test]
    fn test_canonical_sort_by_timestamp_then_order() {
        let mut msgs = vec![msg(10, 1, "b"), msg(5, 0, "a"), msg(10, 0, "c")];
        canonical_sort(&mut msgs);
        let contents: Vec<&str> = msgs.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_canonical_sort_deleted_last_on_full_tie() {
        let mut msgs = vec![msg(10, 0, MSG_DELETED), msg(10, 0, "kept")];
        canonical_sort(&mut msgs);
        assert_eq!(msgs[0].content, "kept");
        assert_eq!(msgs[1].content, MSG_DELETED);
    }

    #[test]
    fn test_grouping_splits_on_source_and_group() {
        let drive = Source::new("GOOGLE_DRIVE", "dir-a");
        let other_dir = Source::new("GOOGLE_DRIVE", "dir-b");

        let msgs = vec![
            msg(1, 0, "x").with_source(drive.clone()),
            msg(2, 0, "y").with_source(drive.clone()),
            msg(1, 0, "z").with_source(other_dir.clone()),
            Msg::new(ts(1), "a", "other-group", "w").with_source(drive.clone()),
        ];

        let groups = group_messages(msgs);
        assert_eq!(groups.len(), 3);
        let same = groups
            .get(&GroupKey {
                source: drive,
                group_id: "g".into(),
            })
            .unwrap();
        assert_eq!(same.len(), 2);
    }

    #[test]
    fn test_group_iteration_is_deterministic() {
        let msgs: Vec<Msg> = (0..5)
            .map(|i| {
                Msg::new(ts(1), "a", format!("group-{}", 4 - i), "x")
                    .with_source(Source::new("S", "loc"))
            })
            .collect();
        let keys: Vec<String> = group_messages(msgs)
            .keys()
            .map(|k| k.group_id.clone())
            .collect();
        assert_eq!(keys, vec!["group-0", "group-1", "group-2", "group-3", "group-4"]);
    }
}
