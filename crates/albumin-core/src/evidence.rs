//! # Evidence Module
//!
//! Normalizes and orders single `(trust method, instant)` observations.
//!
//! Ordering is by trust rank only: two observations with the same method
//! compare equal even when their instants differ. Whether such a tie is a
//! conflict is decided by the reconciliation engine, not by `Ord`.

use crate::primitives::{EVIDENCE_LAYOUTS, NAMESPACE_SEPARATOR, TRUST_ORDER};
use crate::AlbuminError;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// METHOD
// =============================================================================

/// How a capture date was obtained, from most to least trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    /// Entered by a person who vouches for it.
    ManualTrusted,
    /// The camera's shutter time (`EXIF:DateTimeOriginal`).
    DateTimeOriginal,
    /// The time the image was written (`EXIF:CreateDate`).
    CreateDate,
    /// Entered by a person as a best guess.
    ManualUntrusted,
}

impl Method {
    /// All methods in trust order.
    pub const ALL: [Method; 4] = [
        Method::ManualTrusted,
        Method::DateTimeOriginal,
        Method::CreateDate,
        Method::ManualUntrusted,
    ];

    /// Position in the trust order; 0 is the most trusted.
    #[must_use]
    pub const fn rank(self) -> usize {
        match self {
            Method::ManualTrusted => 0,
            Method::DateTimeOriginal => 1,
            Method::CreateDate => 2,
            Method::ManualUntrusted => 3,
        }
    }

    /// The method name as stored in `datetime-method`.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        TRUST_ORDER[self.rank()]
    }
}

impl FromStr for Method {
    type Err = AlbuminError;

    /// Parse a possibly namespaced method name (`EXIF:CreateDate`).
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw
            .rsplit(NAMESPACE_SEPARATOR)
            .next()
            .unwrap_or(raw);
        Method::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or_else(|| AlbuminError::InvalidEvidence(format!("unranked method {raw:?}")))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// MOMENT
// =============================================================================

/// A point in time, with or without zone information.
///
/// EXIF timestamps carry no zone; they stay `Naive` until localized with
/// [`Moment::with_timezone`].
#[derive(Debug, Clone, Copy)]
pub enum Moment {
    Naive(NaiveDateTime),
    Zoned(DateTime<Tz>),
}

impl Moment {
    /// Parse a string in one of the accepted layouts; the first match wins.
    pub fn parse(raw: &str) -> Result<Self, AlbuminError> {
        EVIDENCE_LAYOUTS
            .iter()
            .find_map(|layout| NaiveDateTime::parse_from_str(raw.trim(), layout).ok())
            .map(Moment::Naive)
            .ok_or_else(|| AlbuminError::InvalidEvidence(format!("unparsable timestamp {raw:?}")))
    }

    /// Convert a zoned moment to `tz`, or localize a naive one in `tz`
    /// keeping its wall-clock numbers.
    ///
    /// Ambiguous local times resolve to the earlier instant; local times that
    /// do not exist in `tz` are rejected.
    pub fn with_timezone(self, tz: Tz) -> Result<Self, AlbuminError> {
        match self {
            Moment::Zoned(dt) => Ok(Moment::Zoned(dt.with_timezone(&tz))),
            Moment::Naive(naive) => tz
                .from_local_datetime(&naive)
                .earliest()
                .map(Moment::Zoned)
                .ok_or_else(|| {
                    AlbuminError::InvalidEvidence(format!("{naive} does not exist in {tz}"))
                }),
        }
    }

    /// The zoned instant, if zone information is present.
    #[must_use]
    pub fn zoned(&self) -> Option<DateTime<Tz>> {
        match self {
            Moment::Zoned(dt) => Some(*dt),
            Moment::Naive(_) => None,
        }
    }

    /// The instant, reading a naive moment as UTC.
    #[must_use]
    pub fn zoned_or_utc(&self) -> DateTime<Tz> {
        match self {
            Moment::Zoned(dt) => *dt,
            Moment::Naive(naive) => Tz::UTC.from_utc_datetime(naive),
        }
    }

    /// True if both denote the same instant (or the same wall clock when naive).
    #[must_use]
    pub fn same_instant(&self, other: &Moment) -> bool {
        match (self, other) {
            (Moment::Zoned(a), Moment::Zoned(b)) => a == b,
            (Moment::Naive(a), Moment::Naive(b)) => a == b,
            _ => false,
        }
    }
}

impl From<NaiveDateTime> for Moment {
    fn from(naive: NaiveDateTime) -> Self {
        Moment::Naive(naive)
    }
}

impl From<DateTime<Tz>> for Moment {
    fn from(dt: DateTime<Tz>) -> Self {
        Moment::Zoned(dt)
    }
}

impl From<DateTime<Utc>> for Moment {
    fn from(dt: DateTime<Utc>) -> Self {
        Moment::Zoned(dt.with_timezone(&Tz::UTC))
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Moment::Naive(naive) => write!(f, "{naive}"),
            Moment::Zoned(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %Z")),
        }
    }
}

// =============================================================================
// EVIDENCE
// =============================================================================

/// One observed candidate capture date for a file.
///
/// `Ord`/`Eq` compare trust rank only: `a > b` iff `a` is more trusted.
/// Use [`Evidence::same_instant`] to compare the observed times.
#[derive(Debug, Clone, Copy)]
pub struct Evidence {
    method: Method,
    moment: Moment,
}

impl Evidence {
    /// Construct evidence from a raw method name and a raw timestamp string.
    ///
    /// Returns `AlbuminError::InvalidEvidence` if the method (after stripping
    /// any namespace) is not ranked or the value matches no accepted layout.
    pub fn new(method: &str, raw: &str) -> Result<Self, AlbuminError> {
        Ok(Self {
            method: method.parse()?,
            moment: Moment::parse(raw)?,
        })
    }

    /// Construct evidence from a raw method name and an already parsed instant.
    pub fn from_moment(method: &str, moment: impl Into<Moment>) -> Result<Self, AlbuminError> {
        Ok(Self {
            method: method.parse()?,
            moment: moment.into(),
        })
    }

    /// Construct evidence from a typed method.
    #[must_use]
    pub fn with_method(method: Method, moment: impl Into<Moment>) -> Self {
        Self {
            method,
            moment: moment.into(),
        }
    }

    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    #[must_use]
    pub fn moment(&self) -> Moment {
        self.moment
    }

    #[must_use]
    pub fn rank(&self) -> usize {
        self.method.rank()
    }

    /// Convert or localize the instant to `tz`.
    pub fn with_timezone(self, tz: Tz) -> Result<Self, AlbuminError> {
        Ok(Self {
            method: self.method,
            moment: self.moment.with_timezone(tz)?,
        })
    }

    /// True if both observations denote the same instant.
    #[must_use]
    pub fn same_instant(&self, other: &Evidence) -> bool {
        self.moment.same_instant(&other.moment)
    }
}

impl PartialEq for Evidence {
    fn eq(&self, other: &Self) -> bool {
        self.rank() == other.rank()
    }
}

impl Eq for Evidence {}

impl PartialOrd for Evidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Evidence {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lower rank is more trusted, hence greater.
        other.rank().cmp(&self.rank())
    }
}

impl fmt::Display for Evidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.moment, self.method)
    }
}

// =============================================================================
// GATHERING
// =============================================================================

/// Raw `(namespaced method, timestamp string)` pairs per file.
pub type RawEvidence = BTreeMap<PathBuf, Vec<(String, String)>>;

/// Best evidence per file.
pub type EvidenceMap = BTreeMap<PathBuf, Evidence>;

/// Build the per-file best evidence from raw tag pairs.
///
/// Invalid pairs are discarded. Among equally ranked pairs of one file the
/// first one seen is kept. Files without any valid pair are left out.
pub fn gather_evidence(raw: &RawEvidence) -> EvidenceMap {
    let mut data = EvidenceMap::new();

    for (file, pairs) in raw {
        for (method, value) in pairs {
            let datum = match Evidence::new(method, value) {
                Ok(datum) => datum,
                Err(e) => {
                    tracing::debug!(file = %file.display(), "discarding evidence: {}", e);
                    continue;
                }
            };
            match data.get(file) {
                Some(current) if *current >= datum => {}
                _ => {
                    data.insert(file.clone(), datum);
                }
            }
        }
    }

    data
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate, Timelike};

    fn naive(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid date")
    }

    #[test]
    fn parses_exif_layout_with_namespace() {
        let ev = Evidence::new("EXIF:DateTimeOriginal", "2016:05:01 10:00:00").expect("valid");
        assert_eq!(ev.method(), Method::DateTimeOriginal);
        assert!(ev.moment().same_instant(&Moment::Naive(naive(2016, 5, 1, 10, 0, 0))));
    }

    #[test]
    fn parses_store_layout() {
        let ev = Evidence::new("ManualTrusted", "2016-05-01@10-00-00").expect("valid");
        assert_eq!(ev.method(), Method::ManualTrusted);
        assert!(ev.moment().same_instant(&Moment::Naive(naive(2016, 5, 1, 10, 0, 0))));
    }

    #[test]
    fn strips_nested_namespaces() {
        let method: Method = "File:EXIF:CreateDate".parse().expect("valid");
        assert_eq!(method, Method::CreateDate);
    }

    #[test]
    fn rejects_unranked_method() {
        let result = Evidence::new("EXIF:ModifyDate", "2016:05:01 10:00:00");
        assert!(matches!(result, Err(AlbuminError::InvalidEvidence(_))));
    }

    #[test]
    fn rejects_unparsable_value() {
        let result = Evidence::new("EXIF:CreateDate", "0000:00:00 00:00:00");
        assert!(matches!(result, Err(AlbuminError::InvalidEvidence(_))));
    }

    #[test]
    fn ordering_uses_rank_only() {
        let trusted = Evidence::with_method(Method::ManualTrusted, naive(2000, 1, 1, 0, 0, 0));
        let original = Evidence::with_method(Method::DateTimeOriginal, naive(2020, 1, 1, 0, 0, 0));
        let other_original =
            Evidence::with_method(Method::DateTimeOriginal, naive(2021, 1, 1, 0, 0, 0));

        assert!(trusted > original);
        assert!(original < trusted);
        assert_eq!(original, other_original);
        assert!(!original.same_instant(&other_original));
    }

    #[test]
    fn any_evidence_outranks_none() {
        let weakest = Evidence::with_method(Method::ManualUntrusted, naive(2000, 1, 1, 0, 0, 0));
        assert!(Some(weakest) > None);
    }

    #[test]
    fn localizing_keeps_wall_clock() {
        let ev = Evidence::new("CreateDate", "2016:05:01 10:00:00").expect("valid");
        let local = ev.with_timezone(chrono_tz::Europe::Istanbul).expect("localize");
        let dt = local.moment().zoned().expect("zoned");
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.timezone(), chrono_tz::Europe::Istanbul);
    }

    #[test]
    fn converting_keeps_instant() {
        let utc = Tz::UTC
            .from_local_datetime(&naive(2016, 5, 1, 7, 0, 0))
            .single()
            .expect("utc");
        let ev = Evidence::with_method(Method::ManualTrusted, utc);
        let local = ev.with_timezone(chrono_tz::Europe::Istanbul).expect("convert");
        let dt = local.moment().zoned().expect("zoned");
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.day(), 1);
        assert!(local.same_instant(&ev));
    }

    #[test]
    fn nonexistent_local_time_is_invalid() {
        // Clocks jumped from 02:00 to 03:00 in Berlin on 2016-03-27.
        let ev = Evidence::new("CreateDate", "2016:03:27 02:30:00").expect("valid");
        let result = ev.with_timezone(chrono_tz::Europe::Berlin);
        assert!(matches!(result, Err(AlbuminError::InvalidEvidence(_))));
    }

    #[test]
    fn gather_keeps_most_trusted_and_drops_invalid() {
        let mut raw = RawEvidence::new();
        raw.insert(
            PathBuf::from("a.jpg"),
            vec![
                ("SourceFile".into(), "a.jpg".into()),
                ("EXIF:CreateDate".into(), "2016:05:01 10:00:05".into()),
                ("EXIF:DateTimeOriginal".into(), "2016:05:01 10:00:00".into()),
            ],
        );
        raw.insert(
            PathBuf::from("b.jpg"),
            vec![("EXIF:DateTimeOriginal".into(), "garbage".into())],
        );

        let data = gather_evidence(&raw);

        assert_eq!(data.len(), 1);
        let a = data.get(&PathBuf::from("a.jpg")).expect("a present");
        assert_eq!(a.method(), Method::DateTimeOriginal);
    }

    #[test]
    fn gather_keeps_first_among_equal_ranks() {
        let mut raw = RawEvidence::new();
        raw.insert(
            PathBuf::from("a.jpg"),
            vec![
                ("CreateDate".into(), "2016:05:01 10:00:00".into()),
                ("CreateDate".into(), "2017:05:01 10:00:00".into()),
            ],
        );

        let data = gather_evidence(&raw);
        let a = data.get(&PathBuf::from("a.jpg")).expect("a present");
        assert!(a.moment().same_instant(&Moment::Naive(naive(2016, 5, 1, 10, 0, 0))));
    }

    #[test]
    fn display_names_method() {
        let ev = Evidence::new("CreateDate", "2016:05:01 10:00:00").expect("valid");
        assert_eq!(ev.to_string(), "2016-05-01 10:00:00 (CreateDate)");
        assert_eq!(ev.moment().zoned_or_utc().year(), 2016);
    }
}
