//! Error types for chatstitch.
//!
//! Every failure is fatal to its operation: a bad header timestamp
//! aborts the parse of that file, and any integrity violation aborts the
//! merge of that group. The merger never guesses; ambiguity surfaces as
//! an error for a human to resolve.

use thiserror::Error;

/// All errors that can occur while parsing or merging transcripts.
#[derive(Debug, Error)]
pub enum ChatstitchError {
    /// A header date or time failed to parse.
    #[error("Invalid timestamp '{input}' (expected format '{format}')")]
    Timestamp {
        /// The date or time text as it appeared in the header.
        input: String,
        /// The chrono format it was expected to match.
        format: String,
    },

    /// Two overlapping captures could not be aligned at any offset.
    #[error(
        "Messages in group '{group_id}' overlap in time but cannot be aligned at any offset"
    )]
    UnreconcilableOverlap {
        /// The conversation whose captures failed to align.
        group_id: String,
    },

    /// An accepted alignment paired records from different senders.
    #[error("Aligned messages disagree on sender: expected '{expected}', found '{found}'")]
    AlignmentMismatch {
        /// Sender of the record on one side of the pair.
        expected: String,
        /// Sender of the record it was aligned with.
        found: String,
    },

    /// Merging lost original message content.
    #[error("Merging group '{group_id}' lost {} original message(s)", missing.len())]
    ContentLoss {
        /// The conversation whose merge lost content.
        group_id: String,
        /// The content values present before merging but absent after.
        missing: Vec<String>,
    },

    /// A merged group's orders are not exactly `{0..n-1}`.
    #[error("Group '{group_id}' has a gap in its message orders")]
    OrderGap {
        /// The conversation with non-contiguous orders.
        group_id: String,
    },

    /// One file produced two records with the same order value.
    #[error("File {file_idx} contains duplicate message orders")]
    DuplicateOrder {
        /// Index of the offending file within its batch.
        file_idx: usize,
    },

    /// Records from different conversations reached one group merge.
    #[error("Cannot merge across groups: '{first}' and '{second}'")]
    MixedGroup {
        /// Group id of the first record seen.
        first: String,
        /// The differing group id.
        second: String,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChatstitchError>;

impl ChatstitchError {
    /// Creates a [`ChatstitchError::Timestamp`].
    pub fn timestamp(input: impl Into<String>, format: impl Into<String>) -> Self {
        Self::Timestamp {
            input: input.into(),
            format: format.into(),
        }
    }

    /// Creates a [`ChatstitchError::UnreconcilableOverlap`].
    pub fn unreconcilable(group_id: impl Into<String>) -> Self {
        Self::UnreconcilableOverlap {
            group_id: group_id.into(),
        }
    }

    /// Creates a [`ChatstitchError::AlignmentMismatch`].
    pub fn alignment_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::AlignmentMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Creates a [`ChatstitchError::ContentLoss`].
    pub fn content_loss(group_id: impl Into<String>, missing: Vec<String>) -> Self {
        Self::ContentLoss {
            group_id: group_id.into(),
            missing,
        }
    }

    /// Creates a [`ChatstitchError::OrderGap`].
    pub fn order_gap(group_id: impl Into<String>) -> Self {
        Self::OrderGap {
            group_id: group_id.into(),
        }
    }

    /// Returns `true` for a header timestamp parse failure.
    pub fn is_timestamp(&self) -> bool {
        matches!(self, Self::Timestamp { .. })
    }

    /// Returns `true` for the no-acceptable-offset merge failure.
    pub fn is_unreconcilable(&self) -> bool {
        matches!(self, Self::UnreconcilableOverlap { .. })
    }

    /// Returns `true` for any post-merge integrity violation.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Self::AlignmentMismatch { .. }
                | Self::ContentLoss { .. }
                | Self::OrderGap { .. }
                | Self::DuplicateOrder { .. }
                | Self::MixedGroup { .. }
        )
    }
}
