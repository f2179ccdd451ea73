//! The message record, the unit of the whole pipeline.
//!
//! This module provides [`Msg`], one parsed transcript message, plus the
//! [`Source`] descriptor saying where its transcript came from. Parsers
//! produce `Msg` values, the grouper buckets them, and the merger combines
//! them into a single deduplicated timeline.
//!
//! # Identity
//!
//! Two records are content-equal iff timestamp, sender id, group id, and
//! content are all equal. `order`, `file_idx`, and the provenance fields
//! are positional metadata and excluded from equality, so the same real
//! message captured in two different export files compares equal.
//!
//! ```
//! use chatstitch::Msg;
//! use chrono::NaiveDate;
//!
//! let ts = NaiveDate::from_ymd_opt(2020, 7, 28)
//!     .unwrap()
//!     .and_hms_opt(19, 35, 0)
//!     .unwrap();
//! let a = Msg::new(ts, "alice", "grp", "Hi").with_file_idx(0);
//! let b = Msg::new(ts, "alice", "grp", "Hi").with_file_idx(1);
//! assert_eq!(a, b);
//! ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::media::MediaRecord;

/// Placeholder content WhatsApp substitutes for a deleted message.
pub const MSG_DELETED: &str = "This message was deleted";

/// Placeholder content WhatsApp substitutes for media excluded from the
/// export.
pub const MEDIA_OMITTED: &str = "<Media omitted>";

/// An opaque (kind, location) pair identifying where a transcript came
/// from, e.g. a cloud-storage provider and a folder id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Source {
    /// The kind of backing store the transcript was retrieved from.
    pub kind: String,

    /// Provider-specific location, such as a folder or bucket id.
    pub location: String,
}

impl Source {
    /// Creates a source descriptor.
    pub fn new(kind: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            location: location.into(),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new("", "")
    }
}

/// One message from a chat transcript.
///
/// Created by the parser from a block of lines; `order` and
/// `file_timestamp` are assigned once the whole file has been scanned.
/// The grouper and merger consume records read-only; the merger produces
/// new, derived records with freshly assigned order values.
///
/// Serialization is the persisted form handed to storage collaborators,
/// and `Deserialize` reconstructs a record from that form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Msg {
    /// When the message was sent (transcript-local, no timezone).
    pub timestamp: NaiveDateTime,

    /// Sender id: a pseudonym when an anonymization key was supplied,
    /// otherwise the display name from the export.
    pub sender_id: String,

    /// Conversation (group) id, pseudonymized like the sender.
    pub group_id: String,

    /// Where the originating transcript came from.
    #[serde(default)]
    pub source: Source,

    /// Message text, possibly multi-line.
    pub content: String,

    /// 0-based position within the parsed file, or within the merged
    /// result once the merger has run.
    #[serde(default)]
    pub order: usize,

    /// Which transcript file within a batch produced this record.
    #[serde(default)]
    pub file_idx: usize,

    /// Timestamp of the last message in the originating file.
    /// Provenance metadata only; never consulted by the merge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_timestamp: Option<NaiveDateTime>,

    /// Whether the content denotes an attachment
    /// (`<name> (file attached)`).
    #[serde(default)]
    pub has_media: bool,

    /// Media metadata resolved from the lookup table, when the attachment
    /// filename was present there at parse time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaRecord>,
}

impl Msg {
    /// Creates a record with the fields every message has; positional and
    /// media metadata start at their defaults.
    pub fn new(
        timestamp: NaiveDateTime,
        sender_id: impl Into<String>,
        group_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            sender_id: sender_id.into(),
            group_id: group_id.into(),
            source: Source::default(),
            content: content.into(),
            order: 0,
            file_idx: 0,
            file_timestamp: None,
            has_media: false,
            media: None,
        }
    }

    /// Builder method to set the source descriptor.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Builder method to set the originating-file index.
    #[must_use]
    pub fn with_file_idx(mut self, file_idx: usize) -> Self {
        self.file_idx = file_idx;
        self
    }

    /// Builder method to set the assigned order.
    #[must_use]
    pub fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }

    /// Returns `true` unless the content is one of the two sentinel
    /// placeholders ("deleted" / "media omitted").
    ///
    /// Only original messages are compared for exact content equality
    /// during offset matching.
    pub fn is_original(&self) -> bool {
        self.content != MSG_DELETED && self.content != MEDIA_OMITTED
    }

    /// Returns `true` if the content is the deleted-message sentinel.
    pub fn is_deleted(&self) -> bool {
        self.content == MSG_DELETED
    }

    /// Appends a continuation line to the content.
    pub fn push_content_line(&mut self, line: &str) {
        self.content.push('\n');
        self.content.push_str(line);
    }

    /// Marks this record as an attachment, with whatever metadata the
    /// lookup table had for it (possibly nothing).
    pub fn set_media(&mut self, media: Option<MediaRecord>) {
        self.has_media = true;
        self.media = media;
    }

    /// Ranking used when merging two aligned records into one: higher is
    /// better. Prefers non-deleted content, then an attachment with
    /// resolved media over one without, over plain text.
    pub fn content_rank(&self) -> (bool, bool, bool, bool) {
        (
            self.is_original(),
            self.has_media,
            self.media
                .as_ref()
                .is_some_and(|m| m.upload_location.is_some()),
            self.media.is_some(),
        )
    }
}

/// Content identity: timestamp, sender, group, and content only.
/// Positional metadata (order, file index, provenance, media resolution)
/// is excluded.
impl PartialEq for Msg {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.sender_id == other.sender_id
            && self.group_id == other.group_id
            && self.content == other.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 7, 28)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_msg_new_defaults() {
        let msg = Msg::new(ts(19, 35), "alice", "grp", "Hi");
        assert_eq!(msg.order, 0);
        assert_eq!(msg.file_idx, 0);
        assert!(!msg.has_media);
        assert!(msg.media.is_none());
        assert!(msg.file_timestamp.is_none());
    }

    #[test]
    fn test_equality_ignores_positional_metadata() {
        let a = Msg::new(ts(19, 35), "alice", "grp", "Hi")
            .with_file_idx(0)
            .with_order(4);
        let b = Msg::new(ts(19, 35), "alice", "grp", "Hi")
            .with_file_idx(1)
            .with_order(9);
        assert_eq!(a, b);

        let c = Msg::new(ts(19, 36), "alice", "grp", "Hi");
        assert_ne!(a, c);
        let d = Msg::new(ts(19, 35), "bob", "grp", "Hi");
        assert_ne!(a, d);
        let e = Msg::new(ts(19, 35), "alice", "grp", "Hello");
        assert_ne!(a, e);
    }

    #[test]
    fn test_is_original() {
        assert!(Msg::new(ts(1, 0), "a", "g", "Hello").is_original());
        assert!(!Msg::new(ts(1, 0), "a", "g", MSG_DELETED).is_original());
        assert!(!Msg::new(ts(1, 0), "a", "g", MEDIA_OMITTED).is_original());
        // Sentinel must match exactly
        assert!(Msg::new(ts(1, 0), "a", "g", "this message was deleted").is_original());
    }

    #[test]
    fn test_push_content_line() {
        let mut msg = Msg::new(ts(1, 0), "a", "g", "Yea");
        msg.push_content_line("Let me write");
        msg.push_content_line("Three lines");
        assert_eq!(msg.content, "Yea\nLet me write\nThree lines");
    }

    #[test]
    fn test_set_media_without_record() {
        let mut msg = Msg::new(ts(1, 0), "a", "g", "IMG.jpg (file attached)");
        msg.set_media(None);
        assert!(msg.has_media);
        assert!(msg.media.is_none());
    }

    #[test]
    fn test_content_rank_ordering() {
        let deleted = Msg::new(ts(1, 0), "a", "g", MSG_DELETED);
        let plain = Msg::new(ts(1, 0), "a", "g", "Hi");
        let mut attached = Msg::new(ts(1, 0), "a", "g", "IMG.jpg (file attached)");
        attached.set_media(None);
        let mut resolved = attached.clone();
        resolved.media = Some(MediaRecord::new("IMG.jpg", "image/jpeg", "uuid0"));
        let mut uploaded = resolved.clone();
        if let Some(m) = uploaded.media.as_mut() {
            m.upload_location = Some("abc123".to_string());
        }

        assert!(deleted.content_rank() < plain.content_rank());
        assert!(plain.content_rank() < attached.content_rank());
        assert!(attached.content_rank() < resolved.content_rank());
        assert!(resolved.content_rank() < uploaded.content_rank());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut msg = Msg::new(ts(19, 35), "alice", "grp", "Hi")
            .with_source(Source::new("GOOGLE_DRIVE", "/g/drive/url"))
            .with_file_idx(2)
            .with_order(7);
        msg.file_timestamp = Some(ts(19, 52));

        let json = serde_json::to_string(&msg).unwrap();
        let back: Msg = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
        assert_eq!(back.order, 7);
        assert_eq!(back.file_idx, 2);
        assert_eq!(back.source, msg.source);
    }

    #[test]
    fn test_deserialize_from_minimal_persisted_form() {
        // Persisted records may predate the positional fields.
        let json = r#"{"timestamp":"2020-07-28T19:35:00","sender_id":"alice","group_id":"grp","content":"Hi"}"#;
        let msg: Msg = serde_json::from_str(json).unwrap();
        assert_eq!(msg.order, 0);
        assert!(!msg.has_media);
        assert!(msg.media.is_none());
    }
}
