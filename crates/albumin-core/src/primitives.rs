//! # Primitives
//!
//! Fixed constants of the reconciliation engine and the metadata wire format.
//!
//! These are compiled into the binary and are immutable at runtime.

use std::time::Duration;

/// Evidence methods ordered from most to least trusted.
///
/// The position in this list is the trust rank (index 0 = most trusted).
pub const TRUST_ORDER: [&str; 4] = [
    "ManualTrusted",
    "DateTimeOriginal",
    "CreateDate",
    "ManualUntrusted",
];

/// Separator between a tag namespace and the method name (`EXIF:CreateDate`).
pub const NAMESPACE_SEPARATOR: char = ':';

/// Timestamp layout written by cameras into EXIF tags.
pub const EXIF_LAYOUT: &str = "%Y:%m:%d %H:%M:%S";

/// Timestamp layout stored in metadata records, always in UTC.
///
/// Lexicographically sortable.
pub const STORE_LAYOUT: &str = "%Y-%m-%d@%H-%M-%S";

/// Layouts tried, in order, when constructing evidence from a string.
pub const EVIDENCE_LAYOUTS: [&str; 2] = [EXIF_LAYOUT, STORE_LAYOUT];

// =============================================================================
// RECORD FIELDS
// =============================================================================

/// Suffix of fields maintained by the metadata service itself.
pub const LASTCHANGED_SUFFIX: &str = "lastchanged";

/// Canonical capture instant of a record.
pub const DATETIME_FIELD: &str = "datetime";

/// Provenance (trust method) of the stored `datetime`.
pub const DATETIME_METHOD_FIELD: &str = "datetime-method";

/// Zone used to present `datetime` when the caller supplies none.
pub const TIMEZONE_FIELD: &str = "timezone";

/// Derived calendar year, four digits.
pub const YEAR_FIELD: &str = "year";

/// Derived calendar month, two digits.
pub const MONTH_FIELD: &str = "month";

/// Derived calendar day, two digits.
pub const DAY_FIELD: &str = "day";

/// Wire suffix for "add these values" directives.
pub const ADD_DIRECTIVE: char = '+';

/// Wire suffix for "remove these values" directives.
pub const REMOVE_DIRECTIVE: char = '-';

// =============================================================================
// SESSION LIMITS
// =============================================================================

/// How long a graceful stop waits for the metadata service to exit.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for the service to exit.
pub const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Maximum accepted length of one response line (16 MB), excluding the
/// terminating newline.
///
/// Responses longer than this are treated as a protocol failure.
pub const MAX_RESPONSE_LINE: usize = 16 * 1024 * 1024;

/// Returns true if `field` is maintained by the metadata service.
#[must_use]
pub fn is_reserved(field: &str) -> bool {
    field.ends_with(LASTCHANGED_SUFFIX)
}
