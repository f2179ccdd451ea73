//! Media metadata and the attachment-filename lookup table.
//!
//! Transcripts reference attachments by filename only
//! (`IMG-0001.jpg (file attached)`). An external downloader supplies a
//! [`MediaTable`] mapping those filenames to [`MediaRecord`] metadata; the
//! core performs an exact-key lookup during the parser post-pass and
//! attaches whatever is present at that moment.
//!
//! The downloader learns the content hash (and with it the upload
//! location) only after fetching the bytes. [`MediaTable::set_hash`]
//! enriches the table entry and [`MediaTable::refresh`] updates a
//! message's snapshot from the enriched entry, so no message is ever
//! re-parsed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::message::Msg;

/// Metadata for one attachment file, keyed by its exact filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Attachment filename exactly as it appears in the transcript.
    pub name: String,

    /// MIME type reported by the provider.
    pub mime_type: String,

    /// Provider-side identifier for the file.
    pub external_id: String,

    /// Content hash, available once the downloader has fetched the bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Where the bytes were uploaded. The downloader keys uploads by
    /// content hash, so this mirrors `hash` once set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_location: Option<String>,
}

impl MediaRecord {
    /// Creates a record as known before any bytes have been downloaded.
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            external_id: external_id.into(),
            hash: None,
            upload_location: None,
        }
    }
}

/// Exact-filename lookup table for attachment metadata.
///
/// # Example
///
/// ```
/// use chatstitch::media::{MediaRecord, MediaTable};
///
/// let mut table = MediaTable::new();
/// table.insert(MediaRecord::new("IMG-W0.jpg", "image/jpeg", "uuid0"));
/// assert!(table.get("IMG-W0.jpg").is_some());
/// assert!(table.get("IMG-W1.jpg").is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct MediaTable {
    by_name: HashMap<String, MediaRecord>,
}

impl MediaTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from the records an external collaborator listed.
    pub fn from_records(records: impl IntoIterator<Item = MediaRecord>) -> Self {
        Self {
            by_name: records.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }

    /// Inserts or replaces the record for its filename.
    pub fn insert(&mut self, record: MediaRecord) {
        self.by_name.insert(record.name.clone(), record);
    }

    /// Looks up a record by exact filename.
    pub fn get(&self, name: &str) -> Option<&MediaRecord> {
        self.by_name.get(name)
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` if the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Records the content hash the downloader computed for `name`, which
    /// also becomes the upload location.
    ///
    /// Returns `false` when no record exists for that filename.
    pub fn set_hash(&mut self, name: &str, hash: impl Into<String>) -> bool {
        match self.by_name.get_mut(name) {
            Some(record) => {
                let hash = hash.into();
                record.upload_location = Some(hash.clone());
                record.hash = Some(hash);
                true
            }
            None => false,
        }
    }

    /// Re-resolves a media message's snapshot against the (possibly
    /// enriched) table entry for its attachment.
    ///
    /// Non-media messages are left untouched. The message keeps its
    /// parse-time snapshot when its attachment never resolved or the
    /// entry has since disappeared.
    pub fn refresh(&self, msg: &mut Msg) {
        if !msg.has_media {
            return;
        }
        let name = match msg.media.as_ref() {
            Some(media) => media.name.clone(),
            None => return,
        };
        if let Some(record) = self.get(&name) {
            msg.media = Some(record.clone());
        }
    }

    /// Drops records no media message references.
    ///
    /// Some exports contain media files referenced by no message; the
    /// downloader has no reason to fetch those.
    pub fn retain_referenced<'a>(&mut self, media_msgs: impl IntoIterator<Item = &'a Msg>) {
        let referenced: std::collections::HashSet<&str> = media_msgs
            .into_iter()
            .filter_map(|m| m.media.as_ref().map(|media| media.name.as_str()))
            .collect();
        let before = self.by_name.len();
        self.by_name.retain(|name, _| referenced.contains(name.as_str()));
        log::info!(
            "Filtered out {}/{} media files",
            before - self.by_name.len(),
            before
        );
    }
}
