//! # Chatstitch
//!
//! A Rust library for reconciling exported WhatsApp-style chat
//! transcripts into one deduplicated, chronologically ordered timeline.
//!
//! ## Overview
//!
//! Chat exports of the same conversation taken at different times
//! overlap and disagree: later exports repeat earlier history, messages
//! get deleted in between, attachments resolve in one capture but not
//! another. Chatstitch parses each export, buckets records by
//! conversation, and aligns overlapping captures with a fuzzy
//! time/content matcher so every message appears exactly once.
//!
//! The library is pure computation over in-memory text: retrieval of
//! exports, media downloading, and persistence of the merged result
//! belong to external collaborators.
//!
//! ## Quick Start
//!
//! ```rust
//! use chatstitch::media::MediaTable;
//! use chatstitch::merge::merge_all;
//! use chatstitch::parser::{DateOrder, ParserConfig, TranscriptParser};
//!
//! fn main() -> chatstitch::Result<()> {
//!     let parser = TranscriptParser::new(
//!         ParserConfig::new().with_date_order(DateOrder::DayMonthYear),
//!     );
//!     let media = MediaTable::new();
//!
//!     // One call per export file, then merge the batch.
//!     let mut msgs = parser.parse_str(
//!         "28/07/20, 7:35 pm - Alice: Hi",
//!         "holiday plans",
//!         0,
//!         &media,
//!     )?;
//!     msgs.extend(parser.parse_str(
//!         "28/07/20, 7:35 pm - Alice: Hi\n28/07/20, 7:36 pm - Bob: Hello",
//!         "holiday plans",
//!         1,
//!         &media,
//!     )?);
//!
//!     let timeline = merge_all(msgs)?;
//!     assert_eq!(timeline.len(), 2);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - [`parser`] — transcript text to ordered [`Msg`] records
//! - [`group`] — bucketing by conversation and the canonical sort
//! - [`merge`] — offset alignment, deduplication, integrity checks
//! - [`media`] — attachment metadata lookup table
//! - [`anonymize`] — pseudonymization contract and HMAC implementation
//! - [`message`] — the [`Msg`] record and [`Source`](message::Source)
//! - [`error`] — [`ChatstitchError`] and [`Result`]

pub mod anonymize;
pub mod error;
pub mod group;
pub mod media;
pub mod merge;
pub mod message;
pub mod parser;

// Re-export the main types at the crate root for convenience
pub use error::{ChatstitchError, Result};
pub use message::Msg;

/// Convenient re-exports for common usage.
///
/// ```rust
/// use chatstitch::prelude::*;
/// ```
pub mod prelude {
    pub use crate::Msg;

    pub use crate::error::{ChatstitchError, Result};

    pub use crate::anonymize::{Anonymizer, KeyedAnonymizer};
    pub use crate::group::{GroupKey, group_messages};
    pub use crate::media::{MediaRecord, MediaTable};
    pub use crate::merge::{merge_all, merge_group, merge_pair};
    pub use crate::message::{MEDIA_OMITTED, MSG_DELETED, Source};
    pub use crate::parser::{DateOrder, ParserConfig, TranscriptParser};
}
