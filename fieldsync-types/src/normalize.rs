//! Conversion between a side's native JSON encoding and [`NormalizedValue`].
//!
//! Natives are `serde_json::Value`s, the shape both sides hand over at the
//! exchange boundary. The default conversion is lenient on input (numeric
//! strings, `0`/`1` booleans, unix-second datetimes) and canonical on output,
//! so `to_native(to_normalized(kind, v)) == v` holds for canonical natives:
//!
//! | kind       | canonical native                 |
//! |------------|----------------------------------|
//! | `int`      | JSON integer                     |
//! | `float`    | JSON number                      |
//! | `string`   | JSON string                      |
//! | `bool`     | JSON bool                        |
//! | `datetime` | RFC 3339 string (`+hh:mm` offset)|
//!
//! Lossy cases: datetimes come back in chrono's RFC 3339 rendering (`Z`
//! becomes `+00:00`; unix seconds and naive `YYYY-MM-DD HH:MM:SS` inputs,
//! read as UTC, come back as strings) and an integral float supplied for an
//! int field comes back as an integer. JSON `null` has no normalized form.

use crate::{NormalizationError, NormalizationResult, NormalizedValue, ValueKind};
use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::Value;

const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Converts values between one side's native encoding and [`NormalizedValue`].
///
/// Integrations whose API formats values in an unusual way implement this
/// trait and override the methods they need. The defaults delegate to
/// [`to_normalized`] and [`to_native`].
pub trait Normalizer: Send + Sync {
    /// Native -> normalized, for a field declared as `kind`.
    fn normalize(&self, kind: ValueKind, native: &Value) -> NormalizationResult<NormalizedValue> {
        to_normalized(kind, native)
    }

    /// Normalized -> native.
    fn denormalize(&self, value: &NormalizedValue) -> Value {
        to_native(value)
    }
}

/// The default normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueNormalizer;

impl Normalizer for ValueNormalizer {}

/// Converts a native value into a [`NormalizedValue`] of the given kind.
pub fn to_normalized(kind: ValueKind, native: &Value) -> NormalizationResult<NormalizedValue> {
    let fail = |reason: &str| NormalizationError::new(kind, native, reason);

    if native.is_null() {
        return Err(fail("null has no normalized form"));
    }

    match kind {
        ValueKind::Int => match native {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(integral_f64))
                .map(NormalizedValue::Int)
                .ok_or_else(|| fail("number is not a 64-bit integer")),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(NormalizedValue::Int)
                .map_err(|e| fail(&e.to_string())),
            _ => Err(fail("expected an integer")),
        },
        ValueKind::Float => match native {
            Value::Number(n) => n
                .as_f64()
                .map(NormalizedValue::Float)
                .ok_or_else(|| fail("number is not representable as f64")),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(NormalizedValue::Float(f)),
                Ok(_) => Err(fail("float is not finite")),
                Err(e) => Err(fail(&e.to_string())),
            },
            _ => Err(fail("expected a number")),
        },
        ValueKind::String => match native {
            Value::String(s) => Ok(NormalizedValue::String(s.clone())),
            Value::Number(n) => Ok(NormalizedValue::String(n.to_string())),
            Value::Bool(b) => Ok(NormalizedValue::String(b.to_string())),
            _ => Err(fail("expected a string")),
        },
        ValueKind::Bool => match native {
            Value::Bool(b) => Ok(NormalizedValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Ok(NormalizedValue::Bool(false)),
                Some(1) => Ok(NormalizedValue::Bool(true)),
                _ => Err(fail("only 0 and 1 are booleans")),
            },
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(NormalizedValue::Bool(true)),
                "false" | "0" | "no" => Ok(NormalizedValue::Bool(false)),
                _ => Err(fail("unrecognized boolean")),
            },
            _ => Err(fail("expected a boolean")),
        },
        ValueKind::DateTime => match native {
            Value::String(s) => parse_datetime(s.trim())
                .map(NormalizedValue::DateTime)
                .ok_or_else(|| fail("expected an RFC 3339 datetime")),
            Value::Number(n) => n
                .as_i64()
                .and_then(datetime_from_unix)
                .map(NormalizedValue::DateTime)
                .ok_or_else(|| fail("unix timestamp out of range")),
            _ => Err(fail("expected a datetime")),
        },
    }
}

/// Converts a [`NormalizedValue`] into its canonical native form.
pub fn to_native(value: &NormalizedValue) -> Value {
    match value {
        NormalizedValue::Int(i) => Value::from(*i),
        NormalizedValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        NormalizedValue::String(s) => Value::String(s.clone()),
        NormalizedValue::Bool(b) => Value::Bool(*b),
        NormalizedValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s).ok().or_else(|| {
        NaiveDateTime::parse_from_str(s, NAIVE_DATETIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc().fixed_offset())
    })
}

pub(crate) fn datetime_from_unix(secs: i64) -> Option<DateTime<FixedOffset>> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.fixed_offset())
}

pub(crate) fn integral_f64(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, which is out of range.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}
