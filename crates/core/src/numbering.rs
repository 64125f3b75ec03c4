//! Company prefixes and human-readable document numbers.
//!
//! Offers and projects share one counter per (prefix, year). A number reads
//! `{PREFIX}-{YEAR}-{SEQ}` with the sequence zero-padded to at least 3 digits.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LifecycleError;

/// Fixed company → prefix table. Never changes at runtime.
pub const COMPANY_PREFIXES: [(&str, &str); 6] = [
    ("gruppen", "GR"),
    ("stalbygg", "ST"),
    ("hybridbygg", "HB"),
    ("industri", "IN"),
    ("tak", "TK"),
    ("montasje", "MO"),
];

/// Prefix for companies missing from [`COMPANY_PREFIXES`].
pub const DEFAULT_PREFIX: &str = "GR";

/// Largest sequence value a counter may hand out.
pub const MAX_SEQUENCE: i64 = 2_147_483_647;

/// Identifier of an operating company, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanyId(String);

impl CompanyId {
    /// Creates a company id; surrounding whitespace and case are ignored.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_lowercase())
    }

    /// Returns the normalized id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number prefix for this company.
    ///
    /// Companies outside [`COMPANY_PREFIXES`] get [`DEFAULT_PREFIX`] and its counter.
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        COMPANY_PREFIXES
            .iter()
            .find(|(company, _)| *company == self.0)
            .map_or(DEFAULT_PREFIX, |(_, prefix)| *prefix)
    }

    /// Returns true if the company appears in the prefix table.
    #[must_use]
    pub fn is_known(&self) -> bool {
        COMPANY_PREFIXES.iter().any(|(company, _)| *company == self.0)
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CompanyId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A formatted document number such as `TK-2026-007`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentNumber {
    prefix: String,
    year: i32,
    sequence: i64,
}

impl DocumentNumber {
    /// Builds the number for `sequence` issued to `company` in `year`.
    ///
    /// # Errors
    ///
    /// `SequenceExhausted` when `sequence` is outside `1..=MAX_SEQUENCE`.
    pub fn new(company: &CompanyId, year: i32, sequence: i64) -> Result<Self, LifecycleError> {
        if !(1..=MAX_SEQUENCE).contains(&sequence) {
            return Err(LifecycleError::SequenceExhausted {
                company: company.to_string(),
                year,
            });
        }
        Ok(Self {
            prefix: company.prefix().to_string(),
            year,
            sequence,
        })
    }

    /// Parses `PREFIX-YEAR-SEQ`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '-');
        let prefix = parts.next()?;
        let year = parts.next()?.parse().ok()?;
        let sequence_part = parts.next()?;
        if prefix.is_empty() || sequence_part.len() < 3 {
            return None;
        }
        let sequence = sequence_part.parse().ok()?;
        Some(Self {
            prefix: prefix.to_string(),
            year,
            sequence,
        })
    }

    /// Company prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Year the number was issued in.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Counter value.
    #[must_use]
    pub const fn sequence(&self) -> i64 {
        self.sequence
    }
}

impl fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{:03}", self.prefix, self.year, self.sequence)
    }
}
