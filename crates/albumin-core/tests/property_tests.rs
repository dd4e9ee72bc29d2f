//! # Property-Based Tests
//!
//! Ordering, merge and codec invariants checked with proptest.

use albumin_core::primitives::{DATETIME_FIELD, DAY_FIELD, MONTH_FIELD, YEAR_FIELD};
use albumin_core::{
    AlbuminError, ContentKey, Evidence, EvidenceMap, FieldValue, KeyMap, MemoryService,
    MetadataClient, Method, RecordedMap, Tz, apply_updates, compute_updates, decode_timestamp,
    encode_timestamp, merge_by_key,
};
use chrono::{DateTime, TimeZone, Utc};
use proptest::collection::vec;
use proptest::prelude::*;
use std::path::PathBuf;

const ZONES: [Tz; 5] = [
    Tz::UTC,
    chrono_tz::Europe::Istanbul,
    chrono_tz::America::New_York,
    chrono_tz::Asia::Kathmandu,
    chrono_tz::Pacific::Auckland,
];

/// Seconds between 1990 and 2040.
fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (631_152_000i64..2_208_988_800).prop_filter_map("representable", |secs| {
        Utc.timestamp_opt(secs, 0).single()
    })
}

fn zone() -> impl Strategy<Value = Tz> {
    (0..ZONES.len()).prop_map(|i| ZONES[i])
}

fn method() -> impl Strategy<Value = Method> {
    (0..Method::ALL.len()).prop_map(|i| Method::ALL[i])
}

fn evidence(method: Method, at: DateTime<Utc>) -> Evidence {
    Evidence::with_method(method, at.with_timezone(&Tz::UTC))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Ordering follows trust rank alone.
    #[test]
    fn ordering_follows_rank(a in method(), b in method(), t1 in instant(), t2 in instant()) {
        let x = evidence(a, t1);
        let y = evidence(b, t2);
        prop_assert_eq!(x > y, a.rank() < b.rank());
        prop_assert_eq!(x == y, a == b);
    }

    /// Timestamps survive the store encoding to the second, in any zone.
    #[test]
    fn timestamp_codec_preserves_instant(at in instant(), tz in zone()) {
        let local = at.with_timezone(&tz);
        let decoded = decode_timestamp(&encode_timestamp(&local)).expect("decode");
        prop_assert_eq!(decoded, at);
    }

    /// The merged winner does not depend on which file carried which item.
    #[test]
    fn merge_is_order_independent(
        methods in vec(method(), 1..8),
        at in instant(),
        rotate in 0usize..8,
    ) {
        // One instant per rank keeps equal ranks in agreement.
        let items: Vec<Evidence> = methods
            .iter()
            .map(|m| evidence(*m, at + chrono::Duration::hours(m.rank() as i64)))
            .collect();
        let mut rotated = items.clone();
        rotated.rotate_left(rotate % items.len());

        let merge = |items: &[Evidence]| {
            let evidence: EvidenceMap = items
                .iter()
                .enumerate()
                .map(|(i, e)| (PathBuf::from(format!("f{i}")), *e))
                .collect();
            let keys: KeyMap = evidence
                .keys()
                .map(|f| (f.clone(), ContentKey::new("K")))
                .collect();
            merge_by_key(&evidence, &keys).expect("merge")
        };

        let first = merge(&items)[&ContentKey::new("K")];
        let second = merge(&rotated)[&ContentKey::new("K")];
        let best = methods.iter().map(|m| m.rank()).min();

        prop_assert_eq!(first.method(), second.method());
        prop_assert!(first.same_instant(&second));
        prop_assert_eq!(Some(first.rank()), best);
    }

    /// Two disagreeing items of one rank always conflict, whatever else is present.
    #[test]
    fn disagreeing_equal_ranks_conflict(
        m in method(),
        other in method(),
        at in instant(),
        offset in 1i64..100_000,
    ) {
        let evidence = EvidenceMap::from([
            (PathBuf::from("a"), evidence(m, at)),
            (PathBuf::from("b"), evidence(m, at + chrono::Duration::seconds(offset))),
            (PathBuf::from("c"), evidence(other, at)),
        ]);
        let keys: KeyMap = evidence
            .keys()
            .map(|f| (f.clone(), ContentKey::new("K")))
            .collect();

        let conflict = matches!(
            merge_by_key(&evidence, &keys),
            Err(AlbuminError::Conflict { .. })
        );
        prop_assert!(conflict);
    }

    /// Applying an update set a second time changes nothing.
    #[test]
    fn apply_is_idempotent(m in method(), at in instant(), tz in zone()) {
        let updates = compute_updates(
            &[(ContentKey::new("K"), Evidence::with_method(m, at.with_timezone(&tz)))]
                .into_iter()
                .collect(),
            &RecordedMap::new(),
        );
        let mut client = MetadataClient::new(MemoryService::new());

        apply_updates(&mut client, &updates).expect("first");
        let writes = client.service().writes().len();
        apply_updates(&mut client, &updates).expect("second");

        prop_assert_eq!(client.service().writes().len(), writes);
    }

    /// Calendar fields always describe the stored datetime in its own zone.
    #[test]
    fn calendar_fields_match_datetime(at in instant(), tz in zone()) {
        let local = at.with_timezone(&tz);
        let key = ContentKey::new("K");
        let mut client = MetadataClient::new(MemoryService::new());
        client.record(&key).set_one(DATETIME_FIELD, local).expect("set");

        let mut record = client.record(&key);
        for (field, layout) in [(YEAR_FIELD, "%Y"), (MONTH_FIELD, "%m"), (DAY_FIELD, "%d")] {
            let expected = FieldValue::from(local.format(layout).to_string());
            let stored = record.get(field).expect("get");
            prop_assert_eq!(stored.single(), Some(&expected));
        }
    }
}

#[test]
fn utc_offset_zones_are_distinct_instants() {
    let tokyo = chrono_tz::Asia::Tokyo
        .with_ymd_and_hms(2016, 5, 1, 9, 0, 0)
        .single()
        .expect("valid");
    let utc = Tz::UTC
        .with_ymd_and_hms(2016, 5, 1, 0, 0, 0)
        .single()
        .expect("valid");
    assert!(evidence(Method::CreateDate, tokyo.with_timezone(&Utc)).same_instant(
        &Evidence::with_method(Method::CreateDate, utc)
    ));
}
