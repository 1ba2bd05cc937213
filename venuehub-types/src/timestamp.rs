//! Canonical timestamps and the raw-timestamp normalizer.
//!
//! Writes go through a two-phase commit: the store first records a pending
//! placeholder for every server timestamp and resolves it to the commit time
//! later. Depending on read timing a caller may see either shape, or a value
//! written by some other client as a date, an ISO string or an epoch number.
//! [`Timestamp::normalize`] folds all of them into one representation.
//!
//! Normalization is total. A pending placeholder maps to the estimate it
//! carries, which is the commit time the store will later resolve it to;
//! missing and unparseable inputs (and a placeholder without an estimate)
//! map to "now".

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

/// Key of the placeholder object the store writes while a commit time is
/// still unresolved.
pub const PENDING_TIMESTAMP_KEY: &str = "__pendingTimestamp";

/// Largest magnitude a JavaScript-style epoch value may have (±100M days).
const MAX_EPOCH_MILLIS: f64 = 8.64e15;

/// A canonical point in time: milliseconds since the Unix epoch, UTC.
///
/// Serialized as a plain integer so decoded records compare and sort without
/// further conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp at the current time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Creates a timestamp from milliseconds since the epoch.
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Creates a timestamp from a UTC date-time (sub-millisecond precision is dropped).
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// Returns milliseconds since the epoch.
    #[must_use]
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Converts back into a UTC date-time.
    #[must_use]
    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.0).unwrap_or_default()
    }

    /// Formats as RFC 3339 with millisecond precision.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
    }

    /// Returns a timestamp `millis` later, saturating at the representable range.
    #[must_use]
    pub const fn plus_millis(&self, millis: i64) -> Self {
        Self(self.0.saturating_add(millis))
    }

    /// Returns true if this timestamp is before the other.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }

    /// Returns true if this timestamp is after the other.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Normalizes any raw timestamp shape into a canonical timestamp.
    ///
    /// Never fails. Shapes are tried in priority order (server marker,
    /// convertible value, native date, string, epoch number); anything that
    /// cannot be interpreted becomes [`Timestamp::now`]. A pending value
    /// uses its estimate so that a later resolved read never goes backwards.
    #[must_use]
    pub fn normalize(raw: &RawTimestamp) -> Self {
        let parsed = match raw {
            RawTimestamp::ServerResolved { seconds, nanos } => seconds
                .checked_mul(1_000)
                .and_then(|ms| ms.checked_add(i64::from(*nanos / 1_000_000)))
                .map(Self),
            RawTimestamp::Convertible(value) => value.to_timestamp(),
            RawTimestamp::Native(dt) => Some(Self::from_datetime(*dt)),
            RawTimestamp::Text(text) => parse_text(text),
            RawTimestamp::Epoch(millis) => epoch_millis(*millis),
            RawTimestamp::Pending { estimate } => *estimate,
            RawTimestamp::Missing => None,
        };
        parsed.unwrap_or_else(Self::now)
    }

    /// Normalizes a JSON field value. Shorthand for
    /// `Timestamp::normalize(&RawTimestamp::from_json(value))`.
    #[must_use]
    pub fn normalize_json(value: &Value) -> Self {
        Self::normalize(&RawTimestamp::from_json(value))
    }

    /// Encodes this timestamp as the store's resolved commit marker.
    #[must_use]
    pub fn to_marker(&self) -> Value {
        let seconds = self.0.div_euclid(1_000);
        let nanos = self.0.rem_euclid(1_000) * 1_000_000;
        json!({ "seconds": seconds, "nanoseconds": nanos })
    }

    /// Encodes the placeholder a store shows before the commit time resolves.
    /// `estimate` is the commit time the placeholder will resolve to.
    #[must_use]
    pub fn pending_marker(estimate: Self) -> Value {
        json!({ PENDING_TIMESTAMP_KEY: { "estimate": estimate.0 } })
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(dt)
    }
}

/// A value that knows how to turn itself into a canonical timestamp.
///
/// Returning `None` means the value could not be converted; the normalizer
/// then falls back to "now".
pub trait ToTimestamp: fmt::Debug + Send + Sync {
    fn to_timestamp(&self) -> Option<Timestamp>;
}

impl ToTimestamp for Timestamp {
    fn to_timestamp(&self) -> Option<Timestamp> {
        Some(*self)
    }
}

/// Every timestamp shape the normalizer accepts.
#[derive(Debug, Clone)]
pub enum RawTimestamp {
    /// The store's resolved commit marker.
    ServerResolved { seconds: i64, nanos: u32 },
    /// A value exposing its own conversion.
    Convertible(Arc<dyn ToTimestamp>),
    /// A native date-time.
    Native(DateTime<Utc>),
    /// An ISO-8601 / RFC 3339 string.
    Text(String),
    /// Milliseconds since the epoch.
    Epoch(f64),
    /// The store has not resolved the commit time yet. `estimate` is the
    /// commit time the placeholder announces, when it carries one.
    Pending { estimate: Option<Timestamp> },
    /// Absent or of an unrecognised shape.
    Missing,
}

impl RawTimestamp {
    /// Classifies a JSON field value read from a document.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => {
                if let Some(pending) = map.get(PENDING_TIMESTAMP_KEY) {
                    let estimate = pending
                        .get("estimate")
                        .and_then(Value::as_i64)
                        .map(Timestamp);
                    return Self::Pending { estimate };
                }
                let seconds = map
                    .get("seconds")
                    .or_else(|| map.get("_seconds"))
                    .and_then(Value::as_i64);
                let Some(seconds) = seconds else {
                    return Self::Missing;
                };
                let nanos = map
                    .get("nanoseconds")
                    .or_else(|| map.get("_nanoseconds"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    .min(999_999_999) as u32;
                Self::ServerResolved { seconds, nanos }
            }
            Value::String(text) => Self::Text(text.clone()),
            Value::Number(n) => n.as_f64().map_or(Self::Missing, Self::Epoch),
            _ => Self::Missing,
        }
    }

    /// Returns false while the value is a pending placeholder or absent.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending { .. } | Self::Missing)
    }
}

impl From<SystemTime> for RawTimestamp {
    fn from(time: SystemTime) -> Self {
        Self::Native(DateTime::<Utc>::from(time))
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::Native(dt)
    }
}

impl From<&str> for RawTimestamp {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for RawTimestamp {
    fn from(millis: f64) -> Self {
        Self::Epoch(millis)
    }
}

impl From<i64> for RawTimestamp {
    fn from(millis: i64) -> Self {
        Self::Epoch(millis as f64)
    }
}

fn epoch_millis(millis: f64) -> Option<Timestamp> {
    if millis.is_finite() && millis.abs() <= MAX_EPOCH_MILLIS {
        Some(Timestamp(millis.trunc() as i64))
    } else {
        None
    }
}

fn parse_text(text: &str) -> Option<Timestamp> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(Timestamp::from_datetime(dt.with_timezone(&Utc)));
    }
    // Offset-less forms are read as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Timestamp::from_datetime(naive.and_utc()));
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Timestamp::from_datetime(naive.and_utc()))
}
