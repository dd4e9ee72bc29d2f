//! # Metadata Record Client
//!
//! Typed, per-key access to metadata records held by a [`MetadataService`].
//!
//! ## Reading
//!
//! [`Record::get`] returns a [`FieldValues`]: `Absent` for an empty field,
//! `Single` for exactly one value, `Multiple` otherwise. Values are decoded
//! by field name:
//! - `datetime`: stored UTC timestamp, presented in the requested zone, else
//!   the record's `timezone`, else UTC
//! - `*lastchanged`: UTC instant
//! - `timezone`: zone identifier
//!
//! Values that fail to decode are returned as `Text`, never dropped.
//!
//! ## Writing
//!
//! [`Record::set`] diffs the desired values against the stored ones and sends
//! one request adding only new values and removing only dropped ones. After a
//! successful write or delete of `datetime` the derived `year`, `month` and
//! `day` fields are rewritten from [`calendar_fields`].
//!
//! ## Single-valued fields
//!
//! `datetime` and `datetime-method` are single-valued. The generic `get`
//! still reports several values as `Multiple`; the typed accessors
//! ([`Record::datetime`], [`MetadataClient::recorded_evidence`]) fail with
//! `MultipleValues`, and writing several datetimes at once is refused.

use crate::evidence::{Evidence, Moment};
use crate::primitives::{
    DATETIME_FIELD, DATETIME_METHOD_FIELD, DAY_FIELD, MONTH_FIELD, STORE_LAYOUT, TIMEZONE_FIELD,
    YEAR_FIELD, is_reserved,
};
use crate::protocol::{MetadataService, Request, Response};
use crate::session::{ProtocolSession, SessionConfig};
use crate::{AlbuminError, ContentKey};
use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// TIMESTAMP CODEC
// =============================================================================

/// Encode an instant in the stored layout, in UTC.
#[must_use]
pub fn encode_timestamp<T: TimeZone>(dt: &DateTime<T>) -> String {
    dt.with_timezone(&Utc).format(STORE_LAYOUT).to_string()
}

/// Decode a stored UTC timestamp.
pub fn decode_timestamp(raw: &str) -> Result<DateTime<Utc>, AlbuminError> {
    NaiveDateTime::parse_from_str(raw.trim(), STORE_LAYOUT)
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| AlbuminError::InvalidEvidence(format!("timestamp {raw:?}: {e}")))
}

/// Zero-padded calendar components of an instant, in its own zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl CalendarFields {
    /// `(field name, value)` pairs in write order.
    #[must_use]
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            (YEAR_FIELD, self.year.as_str()),
            (MONTH_FIELD, self.month.as_str()),
            (DAY_FIELD, self.day.as_str()),
        ]
    }
}

/// Derive `year`/`month`/`day` from an instant.
#[must_use]
pub fn calendar_fields<T: TimeZone>(dt: &DateTime<T>) -> CalendarFields {
    CalendarFields {
        year: format!("{:04}", dt.year()),
        month: format!("{:02}", dt.month()),
        day: format!("{:02}", dt.day()),
    }
}

// =============================================================================
// FIELD VALUES
// =============================================================================

/// One decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    DateTime(DateTime<Tz>),
    Instant(DateTime<Utc>),
    Zone(Tz),
}

impl FieldValue {
    /// The string form sent on the wire.
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::DateTime(dt) => encode_timestamp(dt),
            FieldValue::Instant(dt) => encode_timestamp(dt),
            FieldValue::Zone(tz) => tz.name().to_string(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<DateTime<Tz>> {
        match self {
            FieldValue::DateTime(dt) => Some(*dt),
            FieldValue::Instant(dt) => Some(dt.with_timezone(&Tz::UTC)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_zone(&self) -> Option<Tz> {
        match self {
            FieldValue::Zone(tz) => Some(*tz),
            _ => None,
        }
    }

    /// Decode one raw value of `field`, falling back to `Text`.
    fn decode(field: &str, raw: &str, zone: Tz) -> Self {
        let decoded = if field == DATETIME_FIELD {
            decode_timestamp(raw)
                .ok()
                .map(|utc| FieldValue::DateTime(utc.with_timezone(&zone)))
        } else if is_reserved(field) {
            decode_timestamp(raw).ok().map(FieldValue::Instant)
        } else if field == TIMEZONE_FIELD {
            raw.parse::<Tz>().ok().map(FieldValue::Zone)
        } else {
            None
        };
        decoded.unwrap_or_else(|| FieldValue::Text(raw.to_string()))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S %Z")),
            FieldValue::Instant(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S UTC")),
            other => f.write_str(&other.encode()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<DateTime<Tz>> for FieldValue {
    fn from(dt: DateTime<Tz>) -> Self {
        FieldValue::DateTime(dt)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(dt: DateTime<Utc>) -> Self {
        FieldValue::Instant(dt)
    }
}

impl From<Tz> for FieldValue {
    fn from(tz: Tz) -> Self {
        FieldValue::Zone(tz)
    }
}

/// The values of one field, unwrapped by count.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValues {
    Absent,
    Single(FieldValue),
    Multiple(Vec<FieldValue>),
}

impl FieldValues {
    fn from_vec(mut values: Vec<FieldValue>) -> Self {
        match values.len() {
            0 => FieldValues::Absent,
            1 => values.pop().map_or(FieldValues::Absent, FieldValues::Single),
            _ => FieldValues::Multiple(values),
        }
    }

    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValues::Absent)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Absent => 0,
            FieldValues::Single(_) => 1,
            FieldValues::Multiple(values) => values.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.is_absent()
    }

    /// The value if there is exactly one.
    #[must_use]
    pub fn single(&self) -> Option<&FieldValue> {
        match self {
            FieldValues::Single(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<FieldValue> {
        match self {
            FieldValues::Absent => Vec::new(),
            FieldValues::Single(value) => vec![value],
            FieldValues::Multiple(values) => values,
        }
    }
}

// =============================================================================
// CLIENT
// =============================================================================

/// Typed accessor over one metadata service.
///
/// Owns the service; with a [`ProtocolSession`] the process lives exactly as
/// long as the client (or until [`MetadataClient::close`]).
#[derive(Debug)]
pub struct MetadataClient<S: MetadataService = ProtocolSession> {
    service: S,
}

impl MetadataClient<ProtocolSession> {
    /// Start a metadata service process and wrap it.
    pub fn start(config: SessionConfig) -> Result<Self, AlbuminError> {
        Ok(Self::new(ProtocolSession::start(config)?))
    }

    /// Stop the service process.
    ///
    /// With `allow_kill == false` a service that ignores termination yields
    /// `Timeout` and keeps running.
    pub fn close(&mut self, allow_kill: bool) -> Result<(), AlbuminError> {
        self.service.stop(allow_kill)
    }
}

impl<S: MetadataService> MetadataClient<S> {
    #[must_use]
    pub fn new(service: S) -> Self {
        Self { service }
    }

    #[must_use]
    pub fn service(&self) -> &S {
        &self.service
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.service
    }

    /// Accessor for the record of `key`.
    pub fn record(&mut self, key: &ContentKey) -> Record<'_, S> {
        Record {
            service: &mut self.service,
            key: key.clone(),
        }
    }

    /// The evidence currently recorded for `key`, if any.
    ///
    /// Requires both `datetime` and `datetime-method`; a record with only one
    /// of them, or with undecodable values, counts as having no evidence.
    pub fn recorded_evidence(
        &mut self,
        key: &ContentKey,
        tz: Option<Tz>,
    ) -> Result<Option<Evidence>, AlbuminError> {
        let response = self.record(key).fetch()?;
        let datetime = single_raw(key, &response, DATETIME_FIELD)?;
        let method = single_raw(key, &response, DATETIME_METHOD_FIELD)?;

        let (Some(datetime), Some(method)) = (datetime, method) else {
            return Ok(None);
        };
        let zone = tz.unwrap_or_else(|| record_zone(&response));
        let evidence = decode_timestamp(datetime)
            .and_then(|utc| Evidence::from_moment(method, utc.with_timezone(&zone)));
        match evidence {
            Ok(evidence) => Ok(Some(evidence)),
            Err(e) => {
                tracing::warn!(key = %key, "ignoring recorded datetime: {}", e);
                Ok(None)
            }
        }
    }

    /// Record `evidence` as the canonical datetime of `key`.
    ///
    /// Naive instants are written as UTC.
    pub fn write_evidence(
        &mut self,
        key: &ContentKey,
        evidence: &Evidence,
    ) -> Result<(), AlbuminError> {
        let moment = evidence.moment();
        if let Moment::Naive(_) = moment {
            tracing::warn!(key = %key, "writing zoneless datetime {} as UTC", moment);
        }
        let mut record = self.record(key);
        record.set_one(DATETIME_FIELD, moment.zoned_or_utc())?;
        record.set_one(DATETIME_METHOD_FIELD, evidence.method().as_str())
    }
}

// =============================================================================
// RECORD
// =============================================================================

/// Field access for one content key.
///
/// Every call issues at least one query; nothing is cached between calls.
#[derive(Debug)]
pub struct Record<'a, S: MetadataService> {
    service: &'a mut S,
    key: ContentKey,
}

impl<S: MetadataService> Record<'_, S> {
    #[must_use]
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    fn fetch(&mut self) -> Result<Response, AlbuminError> {
        self.service.query(&Request::read(self.key.clone()))
    }

    /// Values of `field`, presenting datetimes in the record's zone or UTC.
    pub fn get(&mut self, field: &str) -> Result<FieldValues, AlbuminError> {
        self.get_in(field, None)
    }

    /// Values of `field`, presenting datetimes in `tz` when given.
    pub fn get_in(&mut self, field: &str, tz: Option<Tz>) -> Result<FieldValues, AlbuminError> {
        let response = self.fetch()?;
        let zone = tz.unwrap_or_else(|| record_zone(&response));
        let values = response
            .values(field)
            .iter()
            .map(|raw| FieldValue::decode(field, raw, zone))
            .collect();
        Ok(FieldValues::from_vec(values))
    }

    /// The record's `datetime`, or `None` when unset.
    ///
    /// Fails with `MultipleValues` when several datetimes are stored.
    pub fn datetime(&mut self, tz: Option<Tz>) -> Result<Option<DateTime<Tz>>, AlbuminError> {
        match self.get_in(DATETIME_FIELD, tz)? {
            FieldValues::Absent => Ok(None),
            FieldValues::Single(value) => Ok(value.as_datetime()),
            FieldValues::Multiple(values) => Err(AlbuminError::MultipleValues {
                key: self.key.clone(),
                field: DATETIME_FIELD.to_string(),
                count: values.len(),
            }),
        }
    }

    /// Make `field` hold exactly `values`.
    pub fn set(&mut self, field: &str, values: &[FieldValue]) -> Result<(), AlbuminError> {
        if is_reserved(field) {
            return Err(AlbuminError::ImmutableField {
                field: field.to_string(),
            });
        }

        let desired: BTreeSet<String> = values.iter().map(FieldValue::encode).collect();
        if field != DATETIME_FIELD {
            return self.write_raw(field, desired);
        }

        let instant = match values {
            [] => None,
            [value] => Some(datetime_of(value)?),
            _ if desired.len() == 1 => Some(datetime_of(&values[0])?),
            _ => {
                return Err(AlbuminError::MultipleValues {
                    key: self.key.clone(),
                    field: field.to_string(),
                    count: desired.len(),
                });
            }
        };
        self.write_raw(field, desired)?;
        self.sync_calendar(instant.as_ref())
    }

    /// Make `field` hold exactly one value.
    pub fn set_one(
        &mut self,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<(), AlbuminError> {
        self.set(field, &[value.into()])
    }

    /// Remove every value of `field`.
    pub fn delete(&mut self, field: &str) -> Result<(), AlbuminError> {
        self.set(field, &[])
    }

    /// True if `field` has at least one value.
    pub fn contains(&mut self, field: &str) -> Result<bool, AlbuminError> {
        Ok(!self.get(field)?.is_absent())
    }

    /// Names of the non-reserved fields that hold values.
    pub fn fields(&mut self) -> Result<Vec<String>, AlbuminError> {
        let response = self.fetch()?;
        Ok(response
            .fields
            .into_iter()
            .filter(|(name, values)| !is_reserved(name) && !values.is_empty())
            .map(|(name, _)| name)
            .collect())
    }

    /// Number of non-reserved fields that hold values.
    pub fn count(&mut self) -> Result<usize, AlbuminError> {
        Ok(self.fields()?.len())
    }

    /// Diff `desired` against the stored values and send one edit.
    fn write_raw(&mut self, field: &str, desired: BTreeSet<String>) -> Result<(), AlbuminError> {
        let response = self.fetch()?;
        let current: BTreeSet<String> = response.values(field).iter().cloned().collect();

        let add: BTreeSet<String> = desired.difference(&current).cloned().collect();
        let remove: BTreeSet<String> = current.difference(&desired).cloned().collect();
        if add.is_empty() && remove.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            key = %self.key,
            field,
            added = add.len(),
            removed = remove.len(),
            "editing metadata field"
        );
        self.service
            .query(&Request::edit(self.key.clone(), field, add, remove))?;
        Ok(())
    }

    /// Rewrite the derived calendar fields after a datetime write or delete.
    fn sync_calendar(&mut self, instant: Option<&DateTime<Tz>>) -> Result<(), AlbuminError> {
        match instant {
            Some(dt) => {
                let calendar = calendar_fields(dt);
                for (field, value) in calendar.pairs() {
                    self.write_raw(field, BTreeSet::from([value.to_string()]))?;
                }
            }
            None => {
                for field in [YEAR_FIELD, MONTH_FIELD, DAY_FIELD] {
                    self.write_raw(field, BTreeSet::new())?;
                }
            }
        }
        Ok(())
    }
}

/// The zone stored in the record's `timezone` field, or UTC.
fn record_zone(response: &Response) -> Tz {
    match response.values(TIMEZONE_FIELD) {
        [zone] => zone.parse().unwrap_or(Tz::UTC),
        _ => Tz::UTC,
    }
}

/// At most one raw value of a single-valued field.
fn single_raw<'r>(
    key: &ContentKey,
    response: &'r Response,
    field: &str,
) -> Result<Option<&'r str>, AlbuminError> {
    match response.values(field) {
        [] => Ok(None),
        [value] => Ok(Some(value.as_str())),
        values => Err(AlbuminError::MultipleValues {
            key: key.clone(),
            field: field.to_string(),
            count: values.len(),
        }),
    }
}

/// The instant a value written to `datetime` denotes.
fn datetime_of(value: &FieldValue) -> Result<DateTime<Tz>, AlbuminError> {
    match value {
        FieldValue::Text(text) => {
            decode_timestamp(text).map(|utc| utc.with_timezone(&Tz::UTC))
        }
        other => other.as_datetime().ok_or_else(|| {
            AlbuminError::InvalidEvidence(format!("{other} is not a datetime"))
        }),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::Method;
    use crate::memory::MemoryService;
    use chrono::Timelike;

    fn key() -> ContentKey {
        ContentKey::new("SHA256E-s4--aa.jpg")
    }

    fn istanbul(y: i32, mo: u32, d: u32, h: u32) -> DateTime<Tz> {
        chrono_tz::Europe::Istanbul
            .with_ymd_and_hms(y, mo, d, h, 0, 0)
            .single()
            .expect("valid local time")
    }

    fn client() -> MetadataClient<MemoryService> {
        MetadataClient::new(MemoryService::new())
    }

    #[test]
    fn timestamp_codec_is_utc() {
        let dt = istanbul(2016, 5, 1, 10);
        assert_eq!(encode_timestamp(&dt), "2016-05-01@07-00-00");
        let back = decode_timestamp("2016-05-01@07-00-00").expect("decode");
        assert_eq!(back, dt.with_timezone(&Utc));
    }

    #[test]
    fn calendar_fields_are_zero_padded() {
        let calendar = calendar_fields(&istanbul(2016, 5, 1, 1));
        assert_eq!(calendar.year, "2016");
        assert_eq!(calendar.month, "05");
        assert_eq!(calendar.day, "01");
    }

    #[test]
    fn get_unwraps_by_count() {
        let service = MemoryService::new()
            .with_field(&key(), "tag", &["a"])
            .with_field(&key(), "album", &["x", "y"]);
        let mut client = MetadataClient::new(service);
        let mut record = client.record(&key());

        assert_eq!(record.get("missing").expect("get"), FieldValues::Absent);
        assert_eq!(
            record.get("tag").expect("get"),
            FieldValues::Single(FieldValue::from("a"))
        );
        assert_eq!(record.get("album").expect("get").len(), 2);
    }

    #[test]
    fn datetime_uses_record_timezone() {
        let service = MemoryService::new()
            .with_field(&key(), DATETIME_FIELD, &["2016-05-01@07-00-00"])
            .with_field(&key(), TIMEZONE_FIELD, &["Europe/Istanbul"]);
        let mut client = MetadataClient::new(service);
        let mut record = client.record(&key());

        let dt = record.datetime(None).expect("get").expect("present");
        assert_eq!(dt.hour(), 10);

        let utc = record.datetime(Some(Tz::UTC)).expect("get").expect("present");
        assert_eq!(utc.hour(), 7);

        let zone = record.get(TIMEZONE_FIELD).expect("get");
        assert_eq!(
            zone.single().and_then(FieldValue::as_zone),
            Some(chrono_tz::Europe::Istanbul)
        );
    }

    #[test]
    fn undecodable_values_pass_through() {
        let service = MemoryService::new().with_field(&key(), DATETIME_FIELD, &["yesterday"]);
        let mut client = MetadataClient::new(service);
        let value = client.record(&key()).get(DATETIME_FIELD).expect("get");
        assert_eq!(value, FieldValues::Single(FieldValue::from("yesterday")));
    }

    #[test]
    fn several_datetimes_are_an_error_for_typed_access() {
        let service = MemoryService::new().with_field(
            &key(),
            DATETIME_FIELD,
            &["2016-05-01@07-00-00", "2017-05-01@07-00-00"],
        );
        let mut client = MetadataClient::new(service);

        let generic = client.record(&key()).get(DATETIME_FIELD).expect("get");
        assert_eq!(generic.len(), 2);
        assert!(matches!(
            client.record(&key()).datetime(None),
            Err(AlbuminError::MultipleValues { count: 2, .. })
        ));
    }

    #[test]
    fn set_sends_only_the_difference() {
        let service = MemoryService::new().with_field(&key(), "tag", &["a", "b"]);
        let mut client = MetadataClient::new(service);

        client
            .record(&key())
            .set("tag", &[FieldValue::from("b"), FieldValue::from("c")])
            .expect("set");

        let service = client.into_inner();
        let writes = service.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].fields.get("tag+"), Some(&vec!["c".to_string()]));
        assert_eq!(writes[0].fields.get("tag-"), Some(&vec!["a".to_string()]));
        assert_eq!(service.values(&key(), "tag"), ["b", "c"]);
    }

    #[test]
    fn unchanged_set_sends_no_write() {
        let service = MemoryService::new().with_field(&key(), "tag", &["a"]);
        let mut client = MetadataClient::new(service);
        client.record(&key()).set_one("tag", "a").expect("set");
        assert!(client.service().writes().is_empty());
    }

    #[test]
    fn setting_datetime_derives_calendar_fields() {
        let mut client = client();
        let dt = istanbul(2016, 5, 1, 1);

        client.record(&key()).set_one(DATETIME_FIELD, dt).expect("set");

        let service = client.service();
        assert_eq!(service.values(&key(), DATETIME_FIELD), ["2016-04-30@22-00-00"]);
        assert_eq!(service.values(&key(), YEAR_FIELD), ["2016"]);
        assert_eq!(service.values(&key(), MONTH_FIELD), ["05"]);
        assert_eq!(service.values(&key(), DAY_FIELD), ["01"]);
    }

    #[test]
    fn deleting_datetime_clears_calendar_fields() {
        let mut client = client();
        client
            .record(&key())
            .set_one(DATETIME_FIELD, istanbul(2016, 5, 1, 10))
            .expect("set");

        client.record(&key()).delete(DATETIME_FIELD).expect("delete");

        let mut record = client.record(&key());
        assert!(!record.contains(DATETIME_FIELD).expect("contains"));
        assert!(!record.contains(YEAR_FIELD).expect("contains"));
        assert!(!record.contains(MONTH_FIELD).expect("contains"));
        assert!(!record.contains(DAY_FIELD).expect("contains"));
    }

    #[test]
    fn several_datetimes_cannot_be_written() {
        let mut client = client();
        let values = [
            FieldValue::from(istanbul(2016, 5, 1, 10)),
            FieldValue::from(istanbul(2017, 5, 1, 10)),
        ];
        let result = client.record(&key()).set(DATETIME_FIELD, &values);
        assert!(matches!(result, Err(AlbuminError::MultipleValues { .. })));
        assert!(client.service().writes().is_empty());
    }

    #[test]
    fn reserved_fields_are_immutable() {
        let mut client = client();
        let mut record = client.record(&key());
        assert!(matches!(
            record.set_one("lastchanged", "x"),
            Err(AlbuminError::ImmutableField { .. })
        ));
        assert!(matches!(
            record.delete("datetime-lastchanged"),
            Err(AlbuminError::ImmutableField { .. })
        ));
    }

    #[test]
    fn fields_hide_reserved_names() {
        let mut client = client();
        client.record(&key()).set_one("tag", "a").expect("set");

        let mut record = client.record(&key());
        assert_eq!(record.fields().expect("fields"), ["tag"]);
        assert_eq!(record.count().expect("count"), 1);

        let stamp = record.get("tag-lastchanged").expect("get");
        assert!(matches!(stamp.single(), Some(FieldValue::Instant(_))));
    }

    #[test]
    fn evidence_round_trips_through_record() {
        let mut client = client();
        let evidence = Evidence::with_method(Method::DateTimeOriginal, istanbul(2016, 5, 1, 10));

        client.write_evidence(&key(), &evidence).expect("write");
        let recorded = client
            .recorded_evidence(&key(), Some(chrono_tz::Europe::Istanbul))
            .expect("read")
            .expect("present");

        assert_eq!(recorded.method(), Method::DateTimeOriginal);
        assert!(recorded.same_instant(&evidence));
    }

    #[test]
    fn datetime_without_method_is_not_evidence() {
        let service =
            MemoryService::new().with_field(&key(), DATETIME_FIELD, &["2016-05-01@07-00-00"]);
        let mut client = MetadataClient::new(service);
        assert!(client.recorded_evidence(&key(), None).expect("read").is_none());
    }
}
