//! Transcript parser: raw export text to ordered message records.
//!
//! WhatsApp exports are line-oriented. Three line shapes exist:
//!
//! - message header: `28/07/20, 7:35 pm - Sender: text` — starts a new
//!   message;
//! - action line: `28/07/20, 7:30 pm - Someone joined the group` — a
//!   system notification; it closes any open message and is itself
//!   dropped;
//! - anything else is a continuation of the open message, or discarded
//!   when no message is open yet (e.g. blank leading lines).
//!
//! The date format depends on the locale the export was made from and is
//! supplied explicitly as a [`DateOrder`]; a header whose date or time
//! fails to parse is a fatal error. Times are 12-hour with am/pm.
//!
//! # Example
//!
//! ```
//! use chatstitch::media::MediaTable;
//! use chatstitch::parser::{ParserConfig, TranscriptParser};
//!
//! let parser = TranscriptParser::new(ParserConfig::default());
//! let msgs = parser.parse_str(
//!     "28/07/20, 7:35 pm - Alice: Hi",
//!     "my group",
//!     0,
//!     &MediaTable::new(),
//! )?;
//! assert_eq!(msgs.len(), 1);
//! assert_eq!(msgs[0].content, "Hi");
//! # Ok::<(), chatstitch::ChatstitchError>(())
//! ```

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::anonymize::{Anonymizer, KeyedAnonymizer};
use crate::error::{ChatstitchError, Result};
use crate::media::MediaTable;
use crate::message::{Msg, Source};

/// 12-hour time with am/pm, e.g. `7:35 pm`.
const TIME_FORMAT: &str = "%I:%M %p";

/// Which way round the day and month appear in header dates.
///
/// Determined by the locale the conversation was exported from; the core
/// supports exactly these two and never guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// Day/month/year, e.g. `28/07/20`.
    #[default]
    DayMonthYear,
    /// Month/day/year, e.g. `07/28/20`.
    MonthDayYear,
}

impl DateOrder {
    /// Returns the chrono format string for header dates.
    fn date_format(self) -> &'static str {
        match self {
            DateOrder::DayMonthYear => "%d/%m/%y",
            DateOrder::MonthDayYear => "%m/%d/%y",
        }
    }
}

/// Configuration for transcript parsing.
///
/// # Example
///
/// ```
/// use chatstitch::message::Source;
/// use chatstitch::parser::{DateOrder, ParserConfig};
///
/// let config = ParserConfig::new()
///     .with_date_order(DateOrder::MonthDayYear)
///     .with_source(Source::new("GOOGLE_DRIVE", "folder-id"))
///     .with_anon_key("a long random string");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ParserConfig {
    /// Date format of the export's header lines.
    pub date_order: DateOrder,

    /// Source descriptor stamped on every parsed record.
    pub source: Source,

    /// Pseudonymization key. When absent, sender and group names are
    /// used verbatim.
    pub anon_key: Option<String>,
}

impl ParserConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the header date format.
    #[must_use]
    pub fn with_date_order(mut self, date_order: DateOrder) -> Self {
        self.date_order = date_order;
        self
    }

    /// Sets the source descriptor.
    #[must_use]
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// Sets the pseudonymization key.
    #[must_use]
    pub fn with_anon_key(mut self, key: impl Into<String>) -> Self {
        self.anon_key = Some(key.into());
        self
    }
}

/// Parser for one batch of WhatsApp transcript exports.
///
/// One instance holds the compiled patterns and configuration; call
/// [`parse_str`](TranscriptParser::parse_str) once per transcript file.
pub struct TranscriptParser {
    config: ParserConfig,
    anonymizer: Option<Box<dyn Anonymizer>>,
    header_re: Regex,
    action_re: Regex,
    attached_re: Regex,
}

impl TranscriptParser {
    /// Creates a parser. When the config carries an anonymization key,
    /// sender and group names are pseudonymized with [`KeyedAnonymizer`].
    pub fn new(config: ParserConfig) -> Self {
        let anonymizer: Option<Box<dyn Anonymizer>> = config
            .anon_key
            .as_ref()
            .map(|key| Box::new(KeyedAnonymizer::new(key.clone())) as Box<dyn Anonymizer>);

        Self {
            anonymizer,
            config,
            // An action line is a header whose tail has no colon, so the
            // two patterns are disjoint.
            header_re: Regex::new(
                r"^(?P<day>[0-9]+/[0-9]+/[0-9]+), (?P<tm>[0-9]+:[0-9]+ (?i:am|pm)) - (?P<sn>[^:]+): (?P<tail>.*)$",
            )
            .expect("valid header pattern"),
            action_re: Regex::new(
                r"^(?P<day>[0-9]+/[0-9]+/[0-9]+), (?P<tm>[0-9]+:[0-9]+ (?i:am|pm)) - (?P<tail>[^:]+)$",
            )
            .expect("valid action pattern"),
            attached_re: Regex::new(r"^(?P<name>.+?) \(file attached\)$")
                .expect("valid attachment pattern"),
        }
    }

    /// Replaces the shipped anonymizer with a caller-supplied one.
    #[must_use]
    pub fn with_anonymizer(mut self, anonymizer: Box<dyn Anonymizer>) -> Self {
        self.anonymizer = Some(anonymizer);
        self
    }

    /// Returns the parser configuration.
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses one transcript into ordered message records.
    ///
    /// `group_name` names the conversation (pseudonymized when a key is
    /// configured), `file_idx` identifies this file within the batch, and
    /// `media` resolves attachment filenames to metadata.
    ///
    /// Returns records with `order` exactly `{0..n-1}`, trimmed content,
    /// every record's `file_timestamp` set to the last record's
    /// timestamp, and the media flag set on `<name> (file attached)`
    /// messages.
    pub fn parse_str(
        &self,
        text: &str,
        group_name: &str,
        file_idx: usize,
        media: &MediaTable,
    ) -> Result<Vec<Msg>> {
        let group_id = match self.anonymizer.as_deref() {
            Some(anon) => anon.anonymize(group_name, None),
            None => group_name.to_string(),
        };

        let mut msgs: Vec<Msg> = Vec::new();
        let mut current: Option<Msg> = None;

        for line in text.split('\n') {
            if self.action_re.is_match(line) {
                // A system notification ends the open message and is
                // itself dropped.
                if let Some(msg) = current.take() {
                    msgs.push(msg);
                }
                continue;
            }
            if let Some(caps) = self.header_re.captures(line) {
                if let Some(msg) = current.take() {
                    msgs.push(msg);
                }
                let timestamp = self.parse_timestamp(&caps["day"], &caps["tm"])?;
                let sender_raw = caps["sn"].trim();
                let sender_id = match self.anonymizer.as_deref() {
                    Some(anon) => anon.anonymize(sender_raw, Some(&group_id)),
                    None => sender_raw.to_string(),
                };
                current = Some(
                    Msg::new(timestamp, sender_id, group_id.clone(), &caps["tail"])
                        .with_source(self.config.source.clone())
                        .with_file_idx(file_idx),
                );
                continue;
            }
            // Continuation line; discarded when nothing is open yet.
            if let Some(msg) = current.as_mut() {
                msg.push_content_line(line);
            }
        }
        if let Some(msg) = current.take() {
            msgs.push(msg);
        }

        self.finish_file(&mut msgs, media);
        log::info!(
            "Parsed {} messages from group '{}' (file {})",
            msgs.len(),
            group_id,
            file_idx
        );
        Ok(msgs)
    }

    /// Post-pass over a fully scanned file: assign orders, trim content,
    /// stamp the file timestamp, and resolve attachments.
    fn finish_file(&self, msgs: &mut [Msg], media: &MediaTable) {
        let Some(file_timestamp) = msgs.last().map(|m| m.timestamp) else {
            return;
        };
        for (i, msg) in msgs.iter_mut().enumerate() {
            msg.order = i;
            msg.content = msg.content.trim().to_string();
            msg.file_timestamp = Some(file_timestamp);
            if let Some(caps) = self.attached_re.captures(&msg.content) {
                let record = media.get(&caps["name"]).cloned();
                msg.set_media(record);
            }
        }
    }

    fn parse_timestamp(&self, day: &str, tm: &str) -> Result<NaiveDateTime> {
        let date_format = self.config.date_order.date_format();
        let date = NaiveDate::parse_from_str(day, date_format)
            .map_err(|_| ChatstitchError::timestamp(day, date_format))?;
        let time = NaiveTime::parse_from_str(&tm.to_uppercase(), TIME_FORMAT)
            .map_err(|_| ChatstitchError::timestamp(tm, TIME_FORMAT))?;
        Ok(date.and_time(time))
    }
}
