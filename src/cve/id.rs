use chrono::{Datelike, Local};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

use crate::error::CvecatError;

pub const DEFAULT_BASE_URL: &str = "https://raw.githubusercontent.com/CVEProject/cvelistV5/main/cves";

/// Identifier that reads the record body from standard input.
pub const STDIN_MARKER: &str = "-";

const PREFIX: &str = "CVE";
const MIN_SEQUENCE_LEN: usize = 4;

struct IdPatterns {
    year: Regex,
    sequence: Regex,
}

impl IdPatterns {
    fn get() -> &'static Self {
        static PATTERNS: OnceLock<IdPatterns> = OnceLock::new();
        PATTERNS.get_or_init(|| IdPatterns {
            year: Regex::new(r"^[0-9]{4}$").unwrap(),
            sequence: Regex::new(r"^[0-9]{4,}$").unwrap(),
        })
    }
}

/// A validated CVE identifier split into its three parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CveId {
    pub prefix: String,
    pub year: String,
    pub sequence: String,
}

impl CveId {
    /// Parses `CVE-YYYY-NNNN`, `YYYY-NNNN` or `NNNN`. Missing parts default
    /// to the `CVE` prefix and the current calendar year.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        Self::parse_with_year(raw, Local::now().year())
    }

    pub fn parse_with_year(raw: &str, current_year: i32) -> crate::Result<Self> {
        let parts: Vec<&str> = raw.split('-').collect();

        let (prefix, year, sequence) = match parts.as_slice() {
            [sequence] => (PREFIX.to_string(), current_year.to_string(), *sequence),
            [year, sequence] => (PREFIX.to_string(), year.to_string(), *sequence),
            [prefix, year, sequence] => (prefix.to_uppercase(), year.to_string(), *sequence),
            _ => return Err(CvecatError::InvalidIdentifier(raw.to_string())),
        };

        let sequence = format!("{:0>width$}", sequence, width = MIN_SEQUENCE_LEN);

        // Checked in this order so callers always see the prefix error first.
        if prefix != PREFIX {
            return Err(CvecatError::InvalidPrefix(prefix));
        }

        let patterns = IdPatterns::get();
        if !patterns.year.is_match(&year) {
            return Err(CvecatError::InvalidYear(year));
        }
        if !patterns.sequence.is_match(&sequence) {
            return Err(CvecatError::InvalidSequenceId(sequence));
        }

        Ok(Self {
            prefix,
            year,
            sequence,
        })
    }

    /// Directory the upstream repository shards this record into: records
    /// are grouped by thousands, so `5007` lives under `5xxx`.
    pub fn bucket(&self) -> String {
        let cut = self.sequence.len() - 3;
        format!("{}xxx", &self.sequence[..cut])
    }

    pub fn url(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}/{}.json",
            base_url.trim_end_matches('/'),
            self.year,
            self.bucket(),
            self
        )
    }
}

impl fmt::Display for CveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.prefix, self.year, self.sequence)
    }
}

/// Where a record body comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Stdin,
    Remote(String),
}

impl Location {
    pub fn resolve(raw: &str, base_url: &str) -> crate::Result<Self> {
        if raw == STDIN_MARKER {
            return Ok(Self::Stdin);
        }
        let id = CveId::parse(raw)?;
        Ok(Self::Remote(id.url(base_url)))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdin => f.write_str(STDIN_MARKER),
            Self::Remote(url) => f.write_str(url),
        }
    }
}
