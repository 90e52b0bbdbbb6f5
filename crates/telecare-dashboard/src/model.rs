//! State slices and normalized payload schemas

use crate::normalize::{is_truthy, lenient};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::FpCategory;
use std::sync::Arc;
use telecare_core::{FilterSet, Granularity};

/// One value inside a chart point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    /// Numeric value; `NaN` when a designated field held garbage
    Number(f64),
    /// Text value, typically a time-axis label or a name
    Text(String),
    /// Explicit `null` passed through from the server
    Null,
    /// Anything else (nested objects, arrays, booleans)
    Other(Value),
}

impl PointValue {
    /// Convert a raw JSON value without coercion
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Number(n) => n.as_f64().map_or(Self::Other(Value::Number(n)), Self::Number),
            Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }

    /// Numeric value, if this is a number
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Text value, if this is text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Self::Number(n) => !n.is_nan() && n.classify() != FpCategory::Zero,
            Self::Text(s) => !s.is_empty(),
            Self::Null => false,
            Self::Other(v) => is_truthy(v),
        }
    }
}

/// A chart point or ranked entry: string keys to values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataPoint {
    values: BTreeMap<String, PointValue>,
}

impl DataPoint {
    /// Empty point
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: PointValue) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: PointValue) {
        self.values.insert(key.into(), value);
    }

    /// Raw value under `key`
    pub fn get(&self, key: &str) -> Option<&PointValue> {
        self.values.get(key)
    }

    /// Whether `key` is present at all
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Numeric value under `key`
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PointValue::as_number)
    }

    /// Text value under `key`
    pub fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PointValue::as_text)
    }

    /// Label on the given time axis
    pub fn axis_label(&self, axis: TimeAxisKey) -> Option<&str> {
        self.text(axis.as_str())
    }

    /// Iterate over keys and values
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PointValue)> {
        self.values.iter()
    }

    fn truthy(&self, key: &str) -> bool {
        self.get(key).is_some_and(PointValue::is_truthy)
    }
}

/// Name of the time-axis field in a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeAxisKey {
    /// `date`, daily series
    #[serde(rename = "date")]
    Date,
    /// `weekStart`, weekly series
    #[serde(rename = "weekStart")]
    WeekStart,
    /// `month`, monthly series
    #[serde(rename = "month")]
    Month,
}

impl TimeAxisKey {
    /// Pick the axis from the first point: `date`, else `weekStart`, else `month`
    pub fn detect(points: &[DataPoint]) -> Self {
        match points.first() {
            Some(point) if point.truthy("date") => Self::Date,
            Some(point) if point.truthy("weekStart") => Self::WeekStart,
            _ => Self::Month,
        }
    }

    /// Field name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::WeekStart => "weekStart",
            Self::Month => "month",
        }
    }

    /// Granularity implied by the axis
    pub const fn granularity(self) -> Granularity {
        match self {
            Self::Date => Granularity::Daily,
            Self::WeekStart => Granularity::Weekly,
            Self::Month => Granularity::Monthly,
        }
    }
}

/// Count and revenue of one order status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusBucket {
    /// Orders in the bucket
    #[serde(deserialize_with = "lenient::count")]
    pub count: u64,
    /// Revenue of the bucket
    #[serde(deserialize_with = "lenient::number")]
    pub revenue: f64,
}

/// Orders grouped by fulfilment status
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderStatusBreakdown {
    /// Not yet picked up
    #[serde(deserialize_with = "lenient::or_default")]
    pub idle: StatusBucket,
    /// Waiting on payment or stock
    #[serde(deserialize_with = "lenient::or_default")]
    pub pending: StatusBucket,
    /// Being fulfilled
    #[serde(deserialize_with = "lenient::or_default")]
    pub processing: StatusBucket,
    /// Cancelled
    #[serde(deserialize_with = "lenient::or_default")]
    pub cancelled: StatusBucket,
}

/// Orders grouped by payment outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PaymentStatusBreakdown {
    /// Revenue per payment status name
    #[serde(deserialize_with = "lenient::number_map")]
    pub revenue_by_payment_status: BTreeMap<String, f64>,
    /// Refunded orders
    #[serde(deserialize_with = "lenient::count")]
    pub total_refunded_orders: u64,
    /// Orders still requiring payment
    #[serde(deserialize_with = "lenient::count")]
    pub total_requires_payment: u64,
    /// Orders paid successfully
    #[serde(deserialize_with = "lenient::count")]
    pub total_succeeded_payment: u64,
}

/// Platform wide counters shown on the dashboard cards
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardStats {
    /// Registered patients
    #[serde(deserialize_with = "lenient::count")]
    pub total_users: u64,
    /// Registered doctors
    #[serde(deserialize_with = "lenient::count")]
    pub total_doctors: u64,
    /// Products in the catalog
    #[serde(deserialize_with = "lenient::count")]
    pub total_products: u64,
    /// Orders placed
    #[serde(deserialize_with = "lenient::count")]
    pub total_orders: u64,
    /// Revenue from orders
    #[serde(deserialize_with = "lenient::number")]
    pub total_order_revenue: f64,
    /// Consultations booked
    #[serde(deserialize_with = "lenient::count")]
    pub total_consultations: u64,
    /// Revenue from consultations
    #[serde(deserialize_with = "lenient::number")]
    pub total_consultation_revenue: f64,
    /// Reports uploaded
    #[serde(deserialize_with = "lenient::count")]
    pub total_reports: u64,
    /// Orders by fulfilment status
    #[serde(deserialize_with = "lenient::or_default")]
    pub order_status: OrderStatusBreakdown,
    /// Orders by payment outcome
    #[serde(deserialize_with = "lenient::or_default")]
    pub order_payment_status: PaymentStatusBreakdown,
}

impl DashboardStats {
    /// Order revenue plus consultation revenue
    pub fn total_revenue(&self) -> f64 {
        self.total_order_revenue + self.total_consultation_revenue
    }
}

/// Summary of the registration trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegistrationStats {
    /// All time registrations
    #[serde(deserialize_with = "lenient::number")]
    pub total_registrations: f64,
    /// Registrations inside the selected period
    #[serde(deserialize_with = "lenient::number")]
    pub registrations_this_period: f64,
    /// Change against the previous period, in percent
    #[serde(deserialize_with = "lenient::number")]
    pub percent_change_from_previous_period: f64,
}

/// Summary of the consultation trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsultationTrendStats {
    /// Consultations in the period
    #[serde(deserialize_with = "lenient::number")]
    pub total_consultations: f64,
    /// Consultation revenue in the period
    #[serde(deserialize_with = "lenient::number")]
    pub total_revenue: f64,
    /// Mean consultation length
    #[serde(deserialize_with = "lenient::number")]
    pub avg_duration_minutes: f64,
}

/// Summary of the product purchase trend
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PurchaseStats {
    /// Orders in the period
    #[serde(deserialize_with = "lenient::number")]
    pub total_orders: f64,
    /// Order revenue in the period
    #[serde(deserialize_with = "lenient::number")]
    pub total_revenue: f64,
    /// Mean order value
    #[serde(deserialize_with = "lenient::number")]
    pub avg_order_value: f64,
}

/// Normalized trend for one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSeries<S> {
    /// Bucket size
    pub granularity: Granularity,
    /// Period echoed by the server, or the requested one
    pub period: FilterSet,
    /// Chart points, oldest first
    pub chart_data: Vec<DataPoint>,
    /// Summary numbers
    pub stats: S,
    /// Best sellers, product trend only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_products: Option<Vec<DataPoint>>,
}

impl<S: Default> TrendSeries<S> {
    /// Empty series with zeroed stats
    pub fn empty(granularity: Granularity) -> Self {
        Self {
            granularity,
            period: FilterSet::default(),
            chart_data: Vec::new(),
            stats: S::default(),
            top_products: None,
        }
    }
}

impl<S> TrendSeries<S> {
    /// Axis the chart should plot against
    pub fn time_axis(&self) -> TimeAxisKey {
        TimeAxisKey::detect(&self.chart_data)
    }
}

/// Registration chart
pub type RegistrationTrend = TrendSeries<RegistrationStats>;
/// Consultation chart
pub type ConsultationTrend = TrendSeries<ConsultationTrendStats>;
/// Product purchase chart
pub type PurchaseTrend = TrendSeries<PurchaseStats>;

/// Data plus its loading flag
///
/// `data` sits behind an [`Arc`] so untouched slices stay pointer-equal
/// across state updates.
#[derive(Debug, PartialEq, Serialize)]
pub struct ResourceState<T> {
    /// Last known-good value
    pub data: Arc<T>,
    /// A fetch for this slice is in flight
    pub loading: bool,
}

impl<T> ResourceState<T> {
    /// Idle slice holding `data`
    pub fn new(data: T) -> Self {
        Self {
            data: Arc::new(data),
            loading: false,
        }
    }

    /// Slice holding `data` with a fetch already under way
    pub fn pending(data: T) -> Self {
        Self {
            data: Arc::new(data),
            loading: true,
        }
    }
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            loading: self.loading,
        }
    }
}

impl<T: Default> Default for ResourceState<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
