use chrono::{DateTime, FixedOffset};
use fieldsync_types::{
    to_native, to_normalized, NormalizedValue, Normalizer, ValueKind, ValueNormalizer,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

// ── to_normalized ────────────────────────────────────────────────

#[test]
fn int_accepts_integers_integral_floats_and_numeric_strings() {
    assert_eq!(to_normalized(ValueKind::Int, &json!(5)).unwrap(), NormalizedValue::Int(5));
    assert_eq!(to_normalized(ValueKind::Int, &json!(5.0)).unwrap(), NormalizedValue::Int(5));
    assert_eq!(to_normalized(ValueKind::Int, &json!(" 17 ")).unwrap(), NormalizedValue::Int(17));
    assert!(to_normalized(ValueKind::Int, &json!(5.5)).is_err());
    assert!(to_normalized(ValueKind::Int, &json!(true)).is_err());
}

#[test]
fn string_stringifies_scalars() {
    assert_eq!(
        to_normalized(ValueKind::String, &json!(12)).unwrap(),
        NormalizedValue::from("12")
    );
    assert_eq!(
        to_normalized(ValueKind::String, &json!(false)).unwrap(),
        NormalizedValue::from("false")
    );
    assert!(to_normalized(ValueKind::String, &json!(["a"])).is_err());
}

#[test]
fn bool_accepts_common_spellings() {
    assert_eq!(to_normalized(ValueKind::Bool, &json!(1)).unwrap(), NormalizedValue::Bool(true));
    assert_eq!(to_normalized(ValueKind::Bool, &json!("No")).unwrap(), NormalizedValue::Bool(false));
    assert!(to_normalized(ValueKind::Bool, &json!(2)).is_err());
    assert!(to_normalized(ValueKind::Bool, &json!("maybe")).is_err());
}

#[test]
fn datetime_parses_rfc3339_naive_and_unix() {
    let v = to_normalized(ValueKind::DateTime, &json!("2018-08-02T10:02:00+05:00")).unwrap();
    let dt = v.as_datetime().unwrap();
    assert_eq!(dt.offset().local_minus_utc(), 5 * 3600);

    let naive = to_normalized(ValueKind::DateTime, &json!("2018-08-02 05:02:00")).unwrap();
    assert_eq!(naive, v);

    let unix = to_normalized(ValueKind::DateTime, &json!(1_533_186_120)).unwrap();
    assert_eq!(unix, v);
}

#[test]
fn unparsable_datetime_carries_raw_value() {
    let err = to_normalized(ValueKind::DateTime, &json!("not a date"))
        .unwrap_err()
        .with_field("last_modified");
    assert_eq!(err.field.as_deref(), Some("last_modified"));
    assert_eq!(err.raw, "\"not a date\"");
    assert!(err.to_string().contains("for field 'last_modified'"));
}

#[test]
fn null_is_rejected_for_every_kind() {
    for kind in [
        ValueKind::Int,
        ValueKind::String,
        ValueKind::DateTime,
        ValueKind::Bool,
        ValueKind::Float,
    ] {
        assert!(to_normalized(kind, &Value::Null).is_err(), "{kind}");
    }
}

// ── to_native ────────────────────────────────────────────────────

#[test]
fn datetime_native_is_canonical_rfc3339() {
    let v = to_normalized(ValueKind::DateTime, &json!("2018-08-02T05:02:00Z")).unwrap();
    assert_eq!(to_native(&v), json!("2018-08-02T05:02:00+00:00"));
}

#[test]
fn default_normalizer_delegates() {
    let normalizer = ValueNormalizer;
    let v = normalizer.normalize(ValueKind::Float, &json!("2.5")).unwrap();
    assert_eq!(v, NormalizedValue::Float(2.5));
    assert_eq!(normalizer.denormalize(&v), json!(2.5));
}

struct UpperCaseNormalizer;

impl Normalizer for UpperCaseNormalizer {
    fn denormalize(&self, value: &NormalizedValue) -> Value {
        match value {
            NormalizedValue::String(s) => Value::String(s.to_uppercase()),
            other => to_native(other),
        }
    }
}

#[test]
fn normalizer_can_be_overridden_per_side() {
    let n = UpperCaseNormalizer;
    let v = n.normalize(ValueKind::String, &json!("smith")).unwrap();
    assert_eq!(n.denormalize(&v), json!("SMITH"));
    assert_eq!(n.denormalize(&NormalizedValue::Int(1)), json!(1));
}

// ── Round-trip law ───────────────────────────────────────────────

fn rfc3339(secs: i64, offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(offset_hours * 3600).unwrap();
    DateTime::from_timestamp(secs, 0)
        .unwrap()
        .with_timezone(&offset)
        .to_rfc3339()
}

proptest! {
    #[test]
    fn int_round_trip(i in any::<i64>()) {
        let native = json!(i);
        prop_assert_eq!(to_native(&to_normalized(ValueKind::Int, &native).unwrap()), native);
    }

    #[test]
    fn float_round_trip(f in -1.0e15f64..1.0e15f64) {
        let native = json!(f);
        prop_assert_eq!(to_native(&to_normalized(ValueKind::Float, &native).unwrap()), native);
    }

    #[test]
    fn string_round_trip(s in ".*") {
        let native = json!(s);
        prop_assert_eq!(to_native(&to_normalized(ValueKind::String, &native).unwrap()), native);
    }

    #[test]
    fn bool_round_trip(b in any::<bool>()) {
        let native = json!(b);
        prop_assert_eq!(to_native(&to_normalized(ValueKind::Bool, &native).unwrap()), native);
    }

    #[test]
    fn canonical_datetime_round_trip(secs in 0i64..4_000_000_000, hours in -12i32..=14) {
        let native = json!(rfc3339(secs, hours));
        prop_assert_eq!(to_native(&to_normalized(ValueKind::DateTime, &native).unwrap()), native);
    }
}
