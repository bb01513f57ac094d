//! Observation entries and the bounded, newest-first observation log.
//!
//! An observation is a caller-timestamped note of the form
//! `YYYY-MM-DD HH:MM[:SS] | text` (a `T` may separate date and time).
//! Zone suffixes are not accepted: timestamps are compared as naive local
//! times, so an ambiguous zone would make retention order ambiguous too.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Default maximum number of observations kept per entity.
pub const DEFAULT_OBSERVATION_CAP: usize = 15;

/// Canonical timestamp representation, sortable as text.
pub const CANONICAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const ACCEPTED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Reasons an observation entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("observation '{0}' is missing the ' | ' separator between timestamp and text")]
    MissingSeparator(String),

    #[error("observation timestamp '{0}' is not of the form YYYY-MM-DD HH:MM[:SS]")]
    InvalidTimestamp(String),

    #[error("observation '{0}' has no text after the timestamp")]
    EmptyText(String),
}

/// A validated observation entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    timestamp: NaiveDateTime,
    entry: String,
}

impl Observation {
    /// Parse and validate a raw entry. The entry is kept verbatim apart from
    /// surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, ObservationError> {
        let entry = raw.trim();
        let (stamp, text) = entry
            .split_once('|')
            .ok_or_else(|| ObservationError::MissingSeparator(entry.to_string()))?;

        if text.trim().is_empty() {
            return Err(ObservationError::EmptyText(entry.to_string()));
        }

        let timestamp = parse_timestamp(stamp.trim())?;
        Ok(Self {
            timestamp,
            entry: entry.to_string(),
        })
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Timestamp in [`CANONICAL_TIMESTAMP_FORMAT`].
    pub fn canonical_timestamp(&self) -> String {
        self.timestamp.format(CANONICAL_TIMESTAMP_FORMAT).to_string()
    }

    /// The full entry as stored.
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// The note after the separator.
    pub fn text(&self) -> &str {
        self.entry
            .split_once('|')
            .map(|(_, text)| text.trim())
            .unwrap_or_default()
    }
}

/// Parse an observation timestamp, accepting a space or `T` between date and time.
pub fn parse_timestamp(stamp: &str) -> Result<NaiveDateTime, ObservationError> {
    let normalized = match stamp.char_indices().nth(10) {
        Some((idx, 'T')) => {
            let mut s = stamp.to_string();
            s.replace_range(idx..idx + 1, " ");
            s
        }
        _ => stamp.to_string(),
    };

    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&normalized, fmt).ok())
        .ok_or_else(|| ObservationError::InvalidTimestamp(stamp.to_string()))
}

#[derive(Debug, Clone)]
struct LogEntry {
    entry: String,
    // None for stored entries that no longer parse; they sort oldest.
    timestamp: Option<NaiveDateTime>,
}

/// Newest-first, capacity-bounded observation log of one entity.
///
/// Appending inserts at the head. When the log grows past its cap, the entry
/// with the oldest timestamp is evicted, never the one just appended; among
/// equal timestamps the entry closest to the tail goes first.
#[derive(Debug, Clone)]
pub struct ObservationLog {
    entries: Vec<LogEntry>,
    last_update: Option<NaiveDateTime>,
    cap: usize,
}

impl ObservationLog {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            last_update: None,
            cap: cap.max(1),
        }
    }

    /// Rebuild a log from its stored form.
    pub fn from_stored<I>(entries: I, last_update: Option<&str>, cap: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let timestamp = Observation::parse(&entry).ok().map(|o| o.timestamp);
                LogEntry { entry, timestamp }
            })
            .collect();

        let last_update = last_update.and_then(|s| parse_timestamp(s).ok());

        Self {
            entries,
            last_update,
            cap: cap.max(1),
        }
    }

    /// Append an observation, returning the entries evicted to honour the cap.
    pub fn append(&mut self, observation: &Observation) -> Vec<String> {
        self.entries.insert(
            0,
            LogEntry {
                entry: observation.entry.clone(),
                timestamp: Some(observation.timestamp),
            },
        );

        if self.last_update.is_none_or(|latest| observation.timestamp > latest) {
            self.last_update = Some(observation.timestamp);
        }

        let mut evicted = Vec::new();
        while self.entries.len() > self.cap {
            let victim = self.oldest_index();
            evicted.push(self.entries.remove(victim).entry);
        }
        evicted
    }

    // Index of the oldest entry behind the head; ties resolve to the largest index.
    fn oldest_index(&self) -> usize {
        let mut victim = self.entries.len() - 1;
        for idx in (1..self.entries.len()).rev() {
            if self.entries[idx].timestamp < self.entries[victim].timestamp {
                victim = idx;
            }
        }
        victim
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Entries, newest first.
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.entry.clone()).collect()
    }

    /// Canonical timestamps parallel to [`entries`](Self::entries).
    pub fn timestamps(&self) -> Vec<Option<String>> {
        self.entries
            .iter()
            .map(|e| e.timestamp.map(|ts| ts.format(CANONICAL_TIMESTAMP_FORMAT).to_string()))
            .collect()
    }

    /// Maximum timestamp ever appended, in canonical form.
    pub fn last_update(&self) -> Option<String> {
        self.last_update
            .map(|ts| ts.format(CANONICAL_TIMESTAMP_FORMAT).to_string())
    }

    pub fn into_parts(self) -> (Vec<String>, Option<String>) {
        let last_update = self.last_update();
        let entries = self.entries.into_iter().map(|e| e.entry).collect();
        (entries, last_update)
    }
}

#[cfg(test)]
#[path = "observation_tests.rs"]
mod tests;
