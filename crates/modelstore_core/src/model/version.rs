//! Schema version parsing and ordering.
//!
//! # Responsibility
//! - Parse `major.minor.patch` schema version strings.
//! - Provide numeric ordering used by migration classification.
//!
//! # Invariants
//! - Ordering is numeric per component, never lexical (`1.10.0 > 1.9.0`).
//! - `FLOOR_SCHEMA_VERSION` compares strictly below every released version.
//! - Oversized or suffixed versions still order by their leading triplet, so
//!   `2.0.0-beta` and `99999999999999999999.0.0` rank above `1.2.0`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: &str = "1.2.0";

/// Version assumed for documents that declare no schema version at all.
pub const FLOOR_SCHEMA_VERSION: &str = "0.0.0";

static SEMVER_TRIPLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)$")
        .expect("valid semver regex")
});

static LEADING_TRIPLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+)\.([0-9]+)\.([0-9]+)(?:[-+][0-9A-Za-z.+-]*)?$")
        .expect("valid leading triplet regex")
});

/// Parsed `major.minor.patch` triplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SchemaVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SchemaVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Version this build migrates documents to.
    pub fn current() -> Self {
        Self::new(1, 2, 0)
    }

    /// Sentinel for documents without a declared version.
    pub fn floor() -> Self {
        Self::new(0, 0, 0)
    }
}

impl Ord for SchemaVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl PartialOrd for SchemaVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for SchemaVersion {
    type Err = SchemaVersionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let captures = SEMVER_TRIPLET
            .captures(trimmed)
            .ok_or_else(|| SchemaVersionError(value.to_string()))?;
        let component = |index: usize| -> Result<u64, SchemaVersionError> {
            captures
                .get(index)
                .and_then(|part| part.as_str().parse::<u64>().ok())
                .ok_or_else(|| SchemaVersionError(value.to_string()))
        };
        Ok(Self::new(component(1)?, component(2)?, component(3)?))
    }
}

/// Orders `raw` against `version` by its leading `major.minor.patch`.
///
/// Accepts what [`SchemaVersion::from_str`] rejects: components beyond `u64`,
/// leading zeros, and pre-release or build suffixes. Returns `None` when `raw`
/// does not start with a numeric triplet.
pub fn compare_leading_triplet(raw: &str, version: SchemaVersion) -> Option<Ordering> {
    let captures = LEADING_TRIPLET.captures(raw.trim())?;
    let ours = [version.major, version.minor, version.patch];
    for (index, known) in ours.iter().enumerate() {
        let digits = captures.get(index + 1)?.as_str();
        let ordering = compare_digit_strings(digits, &known.to_string());
        if ordering != Ordering::Equal {
            return Some(ordering);
        }
    }
    Some(Ordering::Equal)
}

fn compare_digit_strings(left: &str, right: &str) -> Ordering {
    let left = left.trim_start_matches('0');
    let right = right.trim_start_matches('0');
    left.len().cmp(&right.len()).then_with(|| left.cmp(right))
}

/// Raised when a schema version string is not a `major.minor.patch` triplet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaVersionError(pub String);

impl Display for SchemaVersionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "schema version is invalid: `{}` (expected major.minor.patch)",
            self.0
        )
    }
}

impl Error for SchemaVersionError {}
