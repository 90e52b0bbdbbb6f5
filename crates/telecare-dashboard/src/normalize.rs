//! Payload normalization at the fetcher boundary
//!
//! Server payloads are loosely typed: numbers arrive as strings, arrays go
//! missing, objects come back `null`. Everything is defaulted here so the
//! state slices only ever hold well-formed values.

use crate::model::{DashboardStats, DataPoint, PointValue, TimeAxisKey, TrendSeries};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::num::FpCategory;
use telecare_core::{FilterSet, Granularity};

/// How a designated numeric field is treated when the server omits it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericPolicy {
    /// Coerce when present, `0` when absent or `null`
    ZeroDefault,
    /// Coerce when present, leave absent or `null` as it was
    PassThrough,
}

/// A designated numeric field of a point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRule {
    /// Field name
    pub field: &'static str,
    /// Missing-value policy
    pub policy: NumericPolicy,
}

impl FieldRule {
    /// Field defaulting to zero
    pub const fn zero(field: &'static str) -> Self {
        Self {
            field,
            policy: NumericPolicy::ZeroDefault,
        }
    }

    /// Field passed through when missing
    pub const fn pass_through(field: &'static str) -> Self {
        Self {
            field,
            policy: NumericPolicy::PassThrough,
        }
    }
}

/// Registration chart: `registrations` always numeric
pub const REGISTRATION_RULES: &[FieldRule] = &[FieldRule::zero("registrations")];

/// Consultation chart: `revenue` always numeric, `count` only when sent
pub const CONSULTATION_RULES: &[FieldRule] =
    &[FieldRule::zero("revenue"), FieldRule::pass_through("count")];

/// Purchase chart and best sellers: `revenue` always numeric, `orders` only when sent
pub const PURCHASE_RULES: &[FieldRule] =
    &[FieldRule::zero("revenue"), FieldRule::pass_through("orders")];

/// Doctor leaderboard: both counters always numeric
pub const TOP_DOCTOR_RULES: &[FieldRule] =
    &[FieldRule::zero("revenue"), FieldRule::zero("consultations")];

/// Shape of one trend endpoint's payload
#[derive(Debug, Clone, Copy)]
pub struct TrendShape {
    /// Rules for `chartData` rows
    pub rules: &'static [FieldRule],
    /// Granularity when neither payload nor axis says
    pub default_granularity: Granularity,
    /// Rules for `topProducts`, when the endpoint has them
    pub top_products: Option<&'static [FieldRule]>,
}

/// `/admin/trends/user-registrations`
pub const REGISTRATION_SHAPE: TrendShape = TrendShape {
    rules: REGISTRATION_RULES,
    default_granularity: Granularity::Daily,
    top_products: None,
};

/// `/admin/trends/consultations`
pub const CONSULTATION_SHAPE: TrendShape = TrendShape {
    rules: CONSULTATION_RULES,
    default_granularity: Granularity::Daily,
    top_products: None,
};

/// `/admin/trends/product-purchases`
pub const PURCHASE_SHAPE: TrendShape = TrendShape {
    rules: PURCHASE_RULES,
    default_granularity: Granularity::Monthly,
    top_products: Some(PURCHASE_RULES),
};

/// Loose numeric conversion following JavaScript `Number()`
///
/// Bools become 1/0, blank strings and `[]` become 0, a one-element array
/// converts its element as text, and anything unparseable is `NaN`.
pub fn coerce_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_numeric_text(s),
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [only] => coerce_as_text(only),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

/// Number of a value after it has been turned into text
fn coerce_as_text(value: &Value) -> f64 {
    match value {
        Value::Bool(_) | Value::Object(_) => f64::NAN,
        other => coerce_number(other),
    }
}

fn parse_numeric_text(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        return parse_radix(trimmed.get(2..).unwrap_or_default(), radix);
    }

    // Rust also accepts "inf"/"nan" spellings that are not numbers here
    if trimmed
        .trim_start_matches(['+', '-'])
        .starts_with(|c: char| c.is_ascii_alphabetic())
    {
        return f64::NAN;
    }

    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Unsigned digits in `radix`; no sign, no separators
fn parse_radix(digits: &str, radix: u32) -> f64 {
    if digits.is_empty() {
        return f64::NAN;
    }
    digits
        .chars()
        .try_fold(0.0_f64, |acc, c| {
            c.to_digit(radix)
                .map(|digit| acc.mul_add(f64::from(radix), f64::from(digit)))
        })
        .unwrap_or(f64::NAN)
}

/// JavaScript truthiness of a raw JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n
            .as_f64()
            .is_some_and(|f| !f.is_nan() && f.classify() != FpCategory::Zero),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Non-negative whole number, `0` for anything unusable
pub fn coerce_count(value: &Value) -> u64 {
    let n = coerce_number(value);
    if n.is_finite() && n >= 0.0 {
        n.floor() as u64
    } else {
        0
    }
}

/// Apply a policy to one field value
pub fn coerce_field(value: Option<&Value>, policy: NumericPolicy) -> Option<PointValue> {
    match (value, policy) {
        (None | Some(Value::Null), NumericPolicy::ZeroDefault) => Some(PointValue::Number(0.0)),
        (None, NumericPolicy::PassThrough) => None,
        (Some(Value::Null), NumericPolicy::PassThrough) => Some(PointValue::Null),
        (Some(value), _) => Some(PointValue::Number(coerce_number(value))),
    }
}

/// Normalize one row, keeping undesignated fields as sent
pub fn normalize_point(raw: &Value, rules: &[FieldRule]) -> DataPoint {
    let mut point = DataPoint::new();
    if let Some(object) = raw.as_object() {
        for (key, value) in object {
            point.insert(key.clone(), PointValue::from_json(value.clone()));
        }
    }

    for rule in rules {
        let raw_value = raw.get(rule.field);
        if let Some(value) = coerce_field(raw_value, rule.policy) {
            point.insert(rule.field, value);
        }
    }

    point
}

/// Normalize an array of rows; anything that is not an array becomes empty
pub fn normalize_points(raw: Option<&Value>, rules: &[FieldRule]) -> Vec<DataPoint> {
    raw.and_then(Value::as_array)
        .map(|rows| rows.iter().map(|row| normalize_point(row, rules)).collect())
        .unwrap_or_default()
}

fn truthy_label(value: Option<&Value>) -> Option<String> {
    match value.filter(|value| is_truthy(value))? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalize a trend payload requested with `requested`
pub fn normalize_trend<S>(data: &Value, requested: &FilterSet, shape: TrendShape) -> TrendSeries<S>
where
    S: DeserializeOwned + Default,
{
    let chart_data = normalize_points(data.get("chartData"), shape.rules);

    let granularity = data
        .get("granularity")
        .and_then(Value::as_str)
        .and_then(|g| g.parse::<Granularity>().ok())
        .unwrap_or_else(|| {
            if chart_data.is_empty() {
                shape.default_granularity
            } else {
                TimeAxisKey::detect(&chart_data).granularity()
            }
        });

    let period = FilterSet::new(
        truthy_label(data.get("month")).unwrap_or_else(|| requested.month.clone()),
        truthy_label(data.get("year")).unwrap_or_else(|| requested.year.clone()),
    );

    let stats = data
        .get("stats")
        .filter(|stats| stats.is_object())
        .and_then(|stats| S::deserialize(stats.clone()).ok())
        .unwrap_or_default();

    let top_products = shape
        .top_products
        .map(|rules| normalize_points(data.get("topProducts"), rules));

    TrendSeries {
        granularity,
        period,
        chart_data,
        stats,
        top_products,
    }
}

/// Normalize the dashboard counters; a non-object payload yields zeros
pub fn normalize_dashboard_stats(data: &Value) -> DashboardStats {
    if !data.is_object() {
        return DashboardStats::default();
    }
    DashboardStats::deserialize(data.clone()).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "dashboard stats did not match schema, using defaults");
        DashboardStats::default()
    })
}

/// Normalize the doctor leaderboard; a non-array payload yields an empty list
pub fn normalize_top_doctors(data: &Value) -> Vec<DataPoint> {
    normalize_points(Some(data), TOP_DOCTOR_RULES)
}

/// `deserialize_with` helpers that never fail on bad numbers
pub mod lenient {
    use super::{coerce_count, coerce_number};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn finite_or_zero(n: f64) -> f64 {
        if n.is_finite() { n } else { 0.0 }
    }

    /// Any JSON value as a finite number, `0` otherwise
    pub fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(finite_or_zero(coerce_number(&value)))
    }

    /// Any JSON value as a non-negative count
    pub fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(coerce_count(&value))
    }

    /// Object of loose numbers; anything else becomes empty
    pub fn number_map<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, f64>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(value
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .map(|(key, value)| (key.clone(), finite_or_zero(coerce_number(value))))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// Nested record, replaced by its default when missing or malformed
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(T::deserialize(value).unwrap_or_default())
    }
}
